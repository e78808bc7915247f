//===========================================================================//

/// The maximum number of pixels a decoder will allocate for a single image.
/// Headers declaring more than this are rejected before any pixel buffer is
/// allocated.
pub const MAX_PIXELS: u64 = 1 << 30;

// Size limits for decoded images:
pub(crate) const MIN_WIDTH: u32 = 1;
pub(crate) const MIN_HEIGHT: u32 = 1;

//===========================================================================//

/// A decoded image: non-premultiplied RGBA pixels with the origin at (0, 0).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    rgba_data: Vec<u8>,
}

impl RasterImage {
    /// Creates a new image with the given dimensions and RGBA data.  The
    /// `width` and `height` must be nonzero, and `rgba_data` must have `4 *
    /// width * height` bytes and be in row-major order from top to bottom.
    /// Panics if the dimensions are out of range or if `rgba_data` is the
    /// wrong length.
    pub fn from_rgba_data(
        width: u32,
        height: u32,
        rgba_data: Vec<u8>,
    ) -> RasterImage {
        if width < MIN_WIDTH {
            panic!(
                "Invalid width (was {}, but must be at least {})",
                width, MIN_WIDTH
            );
        }
        if height < MIN_HEIGHT {
            panic!(
                "Invalid height (was {}, but must be at least {})",
                height, MIN_HEIGHT
            );
        }
        let expected_data_len = (width as u64) * (height as u64) * 4;
        if (rgba_data.len() as u64) != expected_data_len {
            panic!(
                "Invalid data length (was {}, but must be {} for {}x{} image)",
                rgba_data.len(),
                expected_data_len,
                width,
                height
            );
        }
        RasterImage { width, height, rgba_data }
    }

    /// Returns the width of the image, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the image, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the RGBA data for this image, in row-major order from top to
    /// bottom.
    pub fn rgba_data(&self) -> &[u8] {
        &self.rgba_data
    }

    /// Consumes the image and returns its RGBA data.
    pub fn into_rgba_data(self) -> Vec<u8> {
        self.rgba_data
    }

    /// Returns the RGBA value of the pixel at column `x`, row `y`, or `None`
    /// if the coordinates are out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = 4 * (y as usize * self.width as usize + x as usize);
        let mut rgba = [0u8; 4];
        rgba.copy_from_slice(&self.rgba_data[start..start + 4]);
        Some(rgba)
    }

    pub(crate) fn row_mut(&mut self, row: u32) -> &mut [u8] {
        let stride = 4 * self.width as usize;
        let start = row as usize * stride;
        &mut self.rgba_data[start..start + stride]
    }
}

/// Checks `width * height` against `MAX_PIXELS` and returns the pixel count.
pub(crate) fn checked_num_pixels(width: u32, height: u32) -> Option<usize> {
    let num_pixels = (width as u64) * (height as u64);
    if num_pixels >= MAX_PIXELS {
        None
    } else {
        Some(num_pixels as usize)
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{checked_num_pixels, RasterImage, MAX_PIXELS};

    #[test]
    fn pixel_lookup() {
        let rgba: &[u8] = b"\x01\x02\x03\x04\x05\x06\x07\x08\
                            \x09\x0a\x0b\x0c\x0d\x0e\x0f\x10";
        let image = RasterImage::from_rgba_data(2, 2, rgba.to_vec());
        assert_eq!(image.pixel(0, 0), Some([1, 2, 3, 4]));
        assert_eq!(image.pixel(1, 0), Some([5, 6, 7, 8]));
        assert_eq!(image.pixel(0, 1), Some([9, 10, 11, 12]));
        assert_eq!(image.pixel(2, 0), None);
        assert_eq!(image.pixel(0, 2), None);
        assert_eq!(image.into_rgba_data(), rgba);
    }

    #[test]
    fn row_access() {
        let mut image = RasterImage::from_rgba_data(3, 2, vec![0u8; 24]);
        assert_eq!(image.row_mut(1).len(), 12);
        image.row_mut(1)[0..4].copy_from_slice(&[255, 0, 0, 255]);
        assert_eq!(image.pixel(0, 1), Some([255, 0, 0, 255]));
        assert_eq!(image.pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn pixel_ceiling() {
        assert_eq!(checked_num_pixels(16, 16), Some(256));
        assert_eq!(checked_num_pixels(1 << 15, 1 << 15), None);
        assert_eq!(checked_num_pixels(u32::MAX, u32::MAX), None);
        assert!(checked_num_pixels(1, (MAX_PIXELS - 1) as u32).is_some());
    }

    #[test]
    #[should_panic]
    fn wrong_data_length() {
        RasterImage::from_rgba_data(2, 2, vec![0u8; 15]);
    }
}

//===========================================================================//
