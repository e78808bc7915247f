//===========================================================================//

/// The color depths a BMP embedded in an ICO entry may use.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum BmpDepth {
    One,
    Four,
    Eight,
    Sixteen,
    TwentyFour,
    ThirtyTwo,
}

impl BmpDepth {
    pub(crate) fn from_bits_per_pixel(
        bits_per_pixel: u16,
    ) -> Option<BmpDepth> {
        match bits_per_pixel {
            1 => Some(BmpDepth::One),
            4 => Some(BmpDepth::Four),
            8 => Some(BmpDepth::Eight),
            16 => Some(BmpDepth::Sixteen),
            24 => Some(BmpDepth::TwentyFour),
            32 => Some(BmpDepth::ThirtyTwo),
            _ => None,
        }
    }

    pub(crate) fn bits_per_pixel(&self) -> u16 {
        match *self {
            BmpDepth::One => 1,
            BmpDepth::Four => 4,
            BmpDepth::Eight => 8,
            BmpDepth::Sixteen => 16,
            BmpDepth::TwentyFour => 24,
            BmpDepth::ThirtyTwo => 32,
        }
    }

    /// Returns the number of color table entries that follow the header.
    /// Only depths of 8 bpp or less are palettized; for those, a nonzero
    /// `colors_used` header field may shrink the table below its maximum.
    pub(crate) fn palette_len(&self, colors_used: u32) -> usize {
        let max_colors = match *self {
            BmpDepth::One => 2,
            BmpDepth::Four => 16,
            BmpDepth::Eight => 256,
            _ => return 0,
        };
        if colors_used != 0 && (colors_used as usize) < max_colors {
            colors_used as usize
        } else {
            max_colors
        }
    }

    /// Returns the size in bytes of one row of `width` pixels, padded to a
    /// multiple of four bytes.
    pub(crate) fn row_size(&self, width: u32) -> u64 {
        let row_data_size =
            (width as u64 * self.bits_per_pixel() as u64 + 7) / 8;
        ((row_data_size + 3) / 4) * 4
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::BmpDepth;

    #[test]
    fn bmp_depth_round_trip() {
        let depths = &[
            BmpDepth::One,
            BmpDepth::Four,
            BmpDepth::Eight,
            BmpDepth::Sixteen,
            BmpDepth::TwentyFour,
            BmpDepth::ThirtyTwo,
        ];
        for &depth in depths.iter() {
            assert_eq!(
                BmpDepth::from_bits_per_pixel(depth.bits_per_pixel()),
                Some(depth)
            );
        }
        assert_eq!(BmpDepth::from_bits_per_pixel(2), None);
    }

    #[test]
    fn palette_len() {
        assert_eq!(BmpDepth::One.palette_len(0), 2);
        assert_eq!(BmpDepth::Four.palette_len(3), 3);
        assert_eq!(BmpDepth::Eight.palette_len(0), 256);
        assert_eq!(BmpDepth::Eight.palette_len(1000), 256);
        assert_eq!(BmpDepth::TwentyFour.palette_len(16), 0);
        assert_eq!(BmpDepth::ThirtyTwo.palette_len(0), 0);
    }

    #[test]
    fn rows_are_padded_to_four_bytes() {
        assert_eq!(BmpDepth::One.row_size(1), 4);
        assert_eq!(BmpDepth::One.row_size(33), 8);
        assert_eq!(BmpDepth::Four.row_size(5), 4);
        assert_eq!(BmpDepth::TwentyFour.row_size(5), 16);
        assert_eq!(BmpDepth::ThirtyTwo.row_size(3), 12);
    }
}

//===========================================================================//
