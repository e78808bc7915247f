//! Decoding of the image data embedded in a single ICO directory entry.

use crate::bmpdepth::BmpDepth;
use crate::error::Result;
use crate::image::{checked_num_pixels, RasterImage, MIN_HEIGHT, MIN_WIDTH};
use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;

//===========================================================================//

// The signature that all PNG files start with.
const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G'];

// The size of a BITMAPINFOHEADER struct, in bytes.  Later header versions
// (BITMAPV4HEADER, BITMAPV5HEADER) extend it.
const BMP_HEADER_LEN: u32 = 40;

// Uncompressed BMP data; the only compression supported inside ICO files.
const BI_RGB: u32 = 0;

//===========================================================================//

/// Returns true if the entry data is an embedded PNG stream rather than a
/// BMP.
pub fn is_png(data: &[u8]) -> bool {
    data.starts_with(PNG_SIGNATURE)
}

/// Decodes the raw data of one ICO entry, which is either a complete PNG
/// file or a headerless BMP (BITMAPINFOHEADER, color table, color data and
/// AND mask).
pub fn decode_entry(data: &[u8]) -> Result<RasterImage> {
    if is_png(data) {
        debug!("Decoding {}-byte PNG entry", data.len());
        read_png(data)
    } else {
        debug!("Decoding {}-byte BMP entry", data.len());
        read_bmp(data)
    }
}

//===========================================================================//

fn read_png(data: &[u8]) -> Result<RasterImage> {
    let mut decoder = png::Decoder::new(data);
    // Palette and sub-byte images are expanded, and 16-bit channels are
    // reduced, so that every frame comes out with 8-bit samples.
    decoder.set_transformations(
        png::Transformations::EXPAND | png::Transformations::STRIP_16,
    );
    let mut png_reader = match decoder.read_info() {
        Ok(png_reader) => png_reader,
        Err(error) => invalid_format!("Malformed PNG data: {}", error),
    };
    let width = png_reader.info().width;
    let height = png_reader.info().height;
    if width < MIN_WIDTH {
        invalid_format!(
            "Invalid PNG width (was {}, but must be at least {})",
            width,
            MIN_WIDTH
        );
    }
    if height < MIN_HEIGHT {
        invalid_format!(
            "Invalid PNG height (was {}, but must be at least {})",
            height,
            MIN_HEIGHT
        );
    }
    if checked_num_pixels(width, height).is_none() {
        invalid_format!("PNG has too many pixels ({}x{})", width, height);
    }
    let mut buffer = vec![0u8; png_reader.output_buffer_size()];
    let frame = match png_reader.next_frame(&mut buffer) {
        Ok(frame) => frame,
        Err(error) => invalid_format!("Malformed PNG data: {}", error),
    };
    buffer.truncate(frame.buffer_size());
    if frame.bit_depth != png::BitDepth::Eight {
        invalid_format!("Unsupported PNG bit depth: {:?}", frame.bit_depth);
    }
    let rgba_data = match frame.color_type {
        png::ColorType::Rgba => buffer,
        png::ColorType::Rgb => {
            let mut rgba = Vec::with_capacity(buffer.len() / 3 * 4);
            for rgb in buffer.chunks_exact(3) {
                rgba.extend_from_slice(rgb);
                rgba.push(u8::MAX);
            }
            rgba
        }
        png::ColorType::GrayscaleAlpha => {
            let mut rgba = Vec::with_capacity(buffer.len() * 2);
            for gray_alpha in buffer.chunks_exact(2) {
                let gray = gray_alpha[0];
                rgba.extend_from_slice(&[gray, gray, gray, gray_alpha[1]]);
            }
            rgba
        }
        png::ColorType::Grayscale => {
            let mut rgba = Vec::with_capacity(buffer.len() * 4);
            for gray in buffer.into_iter() {
                rgba.extend_from_slice(&[gray, gray, gray, u8::MAX]);
            }
            rgba
        }
        png::ColorType::Indexed => {
            invalid_format!("Unexpanded PNG palette data");
        }
    };
    if (rgba_data.len() as u64) != 4 * (width as u64) * (height as u64) {
        invalid_format!("PNG frame does not match its {}x{} header", width, height);
    }
    Ok(RasterImage::from_rgba_data(width, height, rgba_data))
}

//===========================================================================//

fn read_bmp(data: &[u8]) -> Result<RasterImage> {
    let mut reader = data;

    // Read the BITMAPINFOHEADER struct:
    let header_len = reader.read_u32::<LittleEndian>()?;
    if header_len < BMP_HEADER_LEN {
        invalid_format!(
            "Invalid BMP header size (was {}, must be at least {})",
            header_len,
            BMP_HEADER_LEN
        );
    }
    let width = reader.read_i32::<LittleEndian>()?;
    if width < (MIN_WIDTH as i32) {
        invalid_format!(
            "Invalid BMP width (was {}, but must be at least {})",
            width,
            MIN_WIDTH
        );
    }
    let width = width as u32;
    let height = reader.read_i32::<LittleEndian>()?;
    if height % 2 != 0 {
        // The height is stored doubled, counting the rows of both the
        // color data and the alpha mask, so it should be divisible by 2.
        invalid_format!(
            "Invalid height field in BMP header \
             (was {}, but must be divisible by 2)",
            height
        );
    }
    let height = height / 2;
    if height < (MIN_HEIGHT as i32) {
        invalid_format!(
            "Invalid BMP height (was {}, but must be at least {})",
            height,
            MIN_HEIGHT
        );
    }
    let height = height as u32;
    let _planes = reader.read_u16::<LittleEndian>()?;
    let bits_per_pixel = reader.read_u16::<LittleEndian>()?;
    let compression = reader.read_u32::<LittleEndian>()?;
    let _image_size = reader.read_u32::<LittleEndian>()?;
    let _horz_ppm = reader.read_i32::<LittleEndian>()?;
    let _vert_ppm = reader.read_i32::<LittleEndian>()?;
    let colors_used = reader.read_u32::<LittleEndian>()?;
    let _colors_important = reader.read_u32::<LittleEndian>()?;
    let extra_header_len = (header_len - BMP_HEADER_LEN) as usize;
    if reader.len() < extra_header_len {
        missing_data!("BMP header is truncated ({} bytes declared)", header_len);
    }
    reader = &reader[extra_header_len..];

    let depth = match BmpDepth::from_bits_per_pixel(bits_per_pixel) {
        Some(depth) => depth,
        None => {
            invalid_format!(
                "Unsupported BMP bits-per-pixel ({})",
                bits_per_pixel
            );
        }
    };
    if compression != BI_RGB {
        invalid_format!("Unsupported BMP compression ({})", compression);
    }
    let num_pixels = match checked_num_pixels(width, height) {
        Some(num_pixels) => num_pixels,
        None => invalid_format!("BMP has too many pixels ({}x{})", width, height),
    };

    // Read in the color table:
    let num_colors = depth.palette_len(colors_used);
    if reader.len() < 4 * num_colors {
        missing_data!("BMP color table is truncated ({} colors)", num_colors);
    }
    let color_table: Vec<[u8; 3]> = reader[..4 * num_colors]
        .chunks_exact(4)
        .map(|bgrx| [bgrx[2], bgrx[1], bgrx[0]])
        .collect();
    reader = &reader[4 * num_colors..];

    // Read in the color data, which is stored row by row, starting from
    // the *bottom* row, with each row padded to a multiple of four bytes:
    let row_size = depth.row_size(width);
    let color_data_len = row_size * height as u64;
    if (reader.len() as u64) < color_data_len {
        missing_data!(
            "BMP color data is truncated (has {} bytes, needs {})",
            reader.len(),
            color_data_len
        );
    }
    let row_size = row_size as usize;
    let mut image = RasterImage::from_rgba_data(
        width,
        height,
        vec![u8::MAX; num_pixels * 4],
    );
    for (index, src) in
        reader[..row_size * height as usize].chunks_exact(row_size).enumerate()
    {
        let dest = image.row_mut(height - 1 - index as u32);
        decode_bmp_row(depth, &color_table, src, dest)?;
    }
    reader = &reader[row_size * height as usize..];

    // At 32 bpp the fourth byte of each pixel is alpha, unless every one of
    // them is zero, in which case the image relies on the AND mask instead.
    if depth == BmpDepth::ThirtyTwo {
        let rgba = image.rgba_data();
        if rgba.chunks_exact(4).any(|pixel| pixel[3] != 0) {
            return Ok(image);
        }
        debug!("32-bpp BMP has an all-zero alpha channel; using AND mask");
        let mut opaque = image.into_rgba_data();
        for pixel in opaque.chunks_exact_mut(4) {
            pixel[3] = u8::MAX;
        }
        image = RasterImage::from_rgba_data(width, height, opaque);
    }

    // Read in the alpha mask (1 bit per pixel), which again is stored row
    // by row, starting from the *bottom* row, with each row padded to a
    // multiple of four bytes:
    let mask_row_size = BmpDepth::One.row_size(width);
    let mask_len = mask_row_size * height as u64;
    if (reader.len() as u64) < mask_len {
        if depth == BmpDepth::ThirtyTwo {
            return Ok(image);
        }
        missing_data!(
            "BMP alpha mask is truncated (has {} bytes, needs {})",
            reader.len(),
            mask_len
        );
    }
    let mask_row_size = mask_row_size as usize;
    for (index, src) in reader[..mask_row_size * height as usize]
        .chunks_exact(mask_row_size)
        .enumerate()
    {
        let dest = image.row_mut(height - 1 - index as u32);
        for (col, pixel) in dest.chunks_exact_mut(4).enumerate() {
            if (src[col / 8] >> (7 - col % 8)) & 0x1 == 1 {
                pixel[3] = 0;
            }
        }
    }

    Ok(image)
}

fn decode_bmp_row(
    depth: BmpDepth,
    color_table: &[[u8; 3]],
    src: &[u8],
    dest: &mut [u8],
) -> Result<()> {
    for (col, pixel) in dest.chunks_exact_mut(4).enumerate() {
        let rgb = match depth {
            BmpDepth::One => {
                let index = (src[col / 8] >> (7 - col % 8)) & 0x1;
                lookup_color(color_table, index)?
            }
            BmpDepth::Four => {
                let byte = src[col / 2];
                let index = if col % 2 == 0 { byte >> 4 } else { byte & 0xf };
                lookup_color(color_table, index)?
            }
            BmpDepth::Eight => lookup_color(color_table, src[col])?,
            BmpDepth::Sixteen => {
                let color = u16::from_le_bytes([src[2 * col], src[2 * col + 1]]);
                let red = (color >> 10) & 0x1f;
                let green = (color >> 5) & 0x1f;
                let blue = color & 0x1f;
                [
                    ((red * 255 + 15) / 31) as u8,
                    ((green * 255 + 15) / 31) as u8,
                    ((blue * 255 + 15) / 31) as u8,
                ]
            }
            BmpDepth::TwentyFour => {
                let bgr = &src[3 * col..][..3];
                [bgr[2], bgr[1], bgr[0]]
            }
            BmpDepth::ThirtyTwo => {
                let bgra = &src[4 * col..][..4];
                pixel[3] = bgra[3];
                [bgra[2], bgra[1], bgra[0]]
            }
        };
        pixel[..3].copy_from_slice(&rgb);
    }
    Ok(())
}

fn lookup_color(color_table: &[[u8; 3]], index: u8) -> Result<[u8; 3]> {
    match color_table.get(index as usize) {
        Some(&rgb) => Ok(rgb),
        None => invalid_format!(
            "BMP color index {} is outside the {}-entry color table",
            index,
            color_table.len()
        ),
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{decode_entry, is_png};
    use crate::error::Error;

    // BITMAPINFOHEADER for a `width`x`height` image at `bpp`, with the
    // height doubled as ICO requires.
    fn bmp_header(width: i32, height: i32, bpp: u16, colors_used: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&40u32.to_le_bytes());
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&(2 * height).to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&bpp.to_le_bytes());
        data.extend_from_slice(&[0u8; 16]);
        data.extend_from_slice(&colors_used.to_le_bytes());
        data.extend_from_slice(&[0u8; 4]);
        data
    }

    #[test]
    fn detects_png_signature() {
        assert!(is_png(b"\x89PNG\r\n\x1a\n"));
        assert!(!is_png(b"\x28\x00\x00\x00"));
        assert!(!is_png(b""));
    }

    #[test]
    fn bmp_1bpp_with_mask() {
        let input: &[u8] = b"\
            \x28\x00\x00\x00\x02\x00\x00\x00\x04\x00\x00\x00\
            \x01\x00\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\
            \x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\
            \x00\x00\x00\x00\
            \
            \x55\x00\x55\x00\xff\xff\xff\x00\
            \
            \xc0\x00\x00\x00\
            \x40\x00\x00\x00\
            \
            \x40\x00\x00\x00\
            \x00\x00\x00\x00";
        let image = decode_entry(input).unwrap();
        assert_eq!(image.width(), 2);
        assert_eq!(image.height(), 2);
        let rgba: &[u8] = b"\
            \x55\x00\x55\xff\xff\xff\xff\xff\
            \xff\xff\xff\xff\xff\xff\xff\x00";
        assert_eq!(image.rgba_data(), rgba);
    }

    #[test]
    fn bmp_24bpp_rows_are_flipped() {
        let mut data = bmp_header(1, 2, 24, 0);
        // Bottom row blue, top row red; each row padded to four bytes.
        data.extend_from_slice(b"\xff\x00\x00\x00");
        data.extend_from_slice(b"\x00\x00\xff\x00");
        // Mask: everything opaque.
        data.extend_from_slice(&[0u8; 8]);
        let image = decode_entry(&data).unwrap();
        assert_eq!(image.pixel(0, 0), Some([0xff, 0, 0, 0xff]));
        assert_eq!(image.pixel(0, 1), Some([0, 0, 0xff, 0xff]));
    }

    #[test]
    fn bmp_32bpp_uses_alpha_channel() {
        let mut data = bmp_header(2, 1, 32, 0);
        data.extend_from_slice(b"\x10\x20\x30\x80\x00\x00\x00\x00");
        // A mask that would hide everything must be ignored.
        data.extend_from_slice(b"\xc0\x00\x00\x00");
        let image = decode_entry(&data).unwrap();
        assert_eq!(image.rgba_data(), b"\x30\x20\x10\x80\x00\x00\x00\x00");
    }

    #[test]
    fn bmp_32bpp_without_alpha_falls_back_to_mask() {
        let mut data = bmp_header(2, 1, 32, 0);
        data.extend_from_slice(b"\x10\x20\x30\x00\x40\x50\x60\x00");
        data.extend_from_slice(b"\x40\x00\x00\x00");
        let image = decode_entry(&data).unwrap();
        assert_eq!(image.rgba_data(), b"\x30\x20\x10\xff\x60\x50\x40\x00");
    }

    #[test]
    fn bmp_32bpp_without_alpha_or_mask_is_opaque() {
        let mut data = bmp_header(1, 1, 32, 0);
        data.extend_from_slice(b"\x10\x20\x30\x00");
        let image = decode_entry(&data).unwrap();
        assert_eq!(image.rgba_data(), b"\x30\x20\x10\xff");
    }

    #[test]
    fn bmp_8bpp_with_short_color_table() {
        let mut data = bmp_header(2, 1, 8, 2);
        data.extend_from_slice(b"\x00\x00\x00\x00\x00\xff\x00\x00");
        data.extend_from_slice(b"\x01\x00\x00\x00");
        data.extend_from_slice(b"\x00\x00\x00\x00");
        let image = decode_entry(&data).unwrap();
        assert_eq!(image.rgba_data(), b"\x00\xff\x00\xff\x00\x00\x00\xff");
    }

    #[test]
    fn bmp_color_index_out_of_range() {
        let mut data = bmp_header(1, 1, 8, 2);
        data.extend_from_slice(&[0u8; 8]);
        data.extend_from_slice(b"\x07\x00\x00\x00");
        data.extend_from_slice(b"\x00\x00\x00\x00");
        assert!(matches!(decode_entry(&data), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn bmp_16bpp() {
        let mut data = bmp_header(1, 1, 16, 0);
        // X1R5G5B5: pure red.
        data.extend_from_slice(b"\x00\x7c\x00\x00");
        data.extend_from_slice(b"\x00\x00\x00\x00");
        let image = decode_entry(&data).unwrap();
        assert_eq!(image.rgba_data(), b"\xff\x00\x00\xff");
    }

    #[test]
    fn bmp_missing_mask_is_an_error() {
        let mut data = bmp_header(1, 1, 24, 0);
        data.extend_from_slice(b"\x00\x00\xff\x00");
        assert!(matches!(decode_entry(&data), Err(Error::MissingData(_))));
    }

    #[test]
    fn bmp_truncated_color_data() {
        let mut data = bmp_header(4, 4, 24, 0);
        data.extend_from_slice(&[0u8; 10]);
        assert!(matches!(decode_entry(&data), Err(Error::MissingData(_))));
    }

    #[test]
    fn bmp_rejects_bad_headers() {
        let data = bmp_header(1, 1, 3, 0);
        assert!(matches!(decode_entry(&data), Err(Error::InvalidFormat(_))));
        let mut data = bmp_header(1, 1, 24, 0);
        data[8] = 3; // odd doubled height
        assert!(matches!(decode_entry(&data), Err(Error::InvalidFormat(_))));
        let data = bmp_header(0, 1, 24, 0);
        assert!(matches!(decode_entry(&data), Err(Error::InvalidFormat(_))));
        let data = bmp_header(1 << 16, 1 << 15, 32, 0);
        assert!(matches!(decode_entry(&data), Err(Error::InvalidFormat(_))));
        assert!(matches!(decode_entry(b"\x28\x00"), Err(Error::Io(_))));
    }

    #[test]
    fn png_grayscale() {
        let input: &[u8] = b"\
            \x89\x50\x4e\x47\x0d\x0a\x1a\x0a\x00\x00\x00\x0d\x49\x48\x44\x52\
            \x00\x00\x00\x02\x00\x00\x00\x02\x08\x00\x00\x00\x00\x57\xdd\x52\
            \xf8\x00\x00\x00\x0e\x49\x44\x41\x54\x78\x9c\x63\xb4\x77\x60\xdc\
            \xef\x00\x00\x04\x08\x01\x81\x86\x2e\xc9\x8d\x00\x00\x00\x00\x49\
            \x45\x4e\x44\xae\x42\x60\x82";
        let image = decode_entry(input).unwrap();
        assert_eq!(image.width(), 2);
        assert_eq!(image.height(), 2);
        let rgba: &[u8] = b"\
            \x3f\x3f\x3f\xff\x7f\x7f\x7f\xff\
            \xbf\xbf\xbf\xff\xff\xff\xff\xff";
        assert_eq!(image.rgba_data(), rgba);
    }

    #[test]
    fn malformed_png() {
        let input: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00";
        assert!(matches!(decode_entry(input), Err(Error::InvalidFormat(_))));
    }
}

//===========================================================================//
