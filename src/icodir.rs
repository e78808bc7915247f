use crate::entry::{decode_entry, is_png};
use crate::error::{Error, Result};
use crate::image::RasterImage;
use crate::restype::ResourceType;
use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, warn};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, SeekFrom};

//===========================================================================//

/// The directory of an ICO or CUR file: the resource type and one entry per
/// embedded image, in file order.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct IcoDirectory {
    restype: ResourceType,
    entries: Vec<IcoEntry>,
}

impl IcoDirectory {
    /// Returns the type of resource stored in this collection, either icons or
    /// cursors.
    pub fn resource_type(&self) -> ResourceType {
        self.restype
    }

    /// Returns the entries in this collection.
    pub fn entries(&self) -> &[IcoEntry] {
        &self.entries
    }

    /// Reads the ICONDIR header and its ICONDIRENTRY records, starting at the
    /// reader's current position.  The image data itself is not read; entry
    /// offsets are taken relative to where the header starts.
    pub fn read<R: Read + Seek>(mut reader: R) -> Result<IcoDirectory> {
        let base_offset = reader.stream_position()?;
        let reserved = reader.read_u16::<LittleEndian>()?;
        if reserved != 0 {
            invalid_format!(
                "Invalid reserved field value in ICONDIR \
                 (was {}, but must be 0)",
                reserved
            );
        }
        let restype = reader.read_u16::<LittleEndian>()?;
        let restype = match ResourceType::from_number(restype) {
            Some(restype) => restype,
            None => invalid_format!("Invalid resource type ({})", restype),
        };
        let num_entries = reader.read_u16::<LittleEndian>()? as usize;
        let mut entries = Vec::<IcoEntry>::with_capacity(num_entries);
        for _ in 0..num_entries {
            let width_byte = reader.read_u8()?;
            let height_byte = reader.read_u8()?;
            let num_colors = reader.read_u8()?;
            let reserved = reader.read_u8()?;
            if reserved != 0 {
                invalid_format!(
                    "Invalid reserved field value in ICONDIRENTRY \
                     (was {}, but must be 0)",
                    reserved
                );
            }
            let color_planes = reader.read_u16::<LittleEndian>()?;
            let bits_per_pixel = reader.read_u16::<LittleEndian>()?;
            let data_size = reader.read_u32::<LittleEndian>()?;
            let data_offset = reader.read_u32::<LittleEndian>()?;
            // A width/height byte of zero indicates a size of 256 (or, since
            // Windows Vista, anything larger; the image data has the truth).
            let width = if width_byte == 0 { 256 } else { width_byte as u32 };
            let height =
                if height_byte == 0 { 256 } else { height_byte as u32 };
            entries.push(IcoEntry {
                restype,
                width,
                height,
                num_colors,
                color_planes,
                bits_per_pixel,
                data_size,
                data_offset,
                base_offset,
            });
        }
        debug!("Read {} directory with {} entries", restype, entries.len());
        Ok(IcoDirectory { restype, entries })
    }

    /// Decodes every entry, in directory order.  Fails with
    /// `Error::NoEntries` if the directory is empty, and with the first
    /// entry's error if any entry can't be decoded.
    pub fn decode_all<R: Read + Seek>(
        &self,
        reader: &mut R,
    ) -> Result<Vec<RasterImage>> {
        if self.entries.is_empty() {
            return Err(Error::NoEntries);
        }
        let mut images = Vec::with_capacity(self.entries.len());
        for (index, entry) in self.entries.iter().enumerate() {
            debug!(
                "Decoding entry {} ({}x{}, {} bytes at offset {})",
                index,
                entry.width,
                entry.height,
                entry.data_size,
                entry.data_offset
            );
            images.push(entry.decode(reader)?);
        }
        Ok(images)
    }

    /// Decodes every entry and returns the image of the entry with the
    /// greatest declared width.  Ties go to the entry with the greater
    /// declared color depth, then to the earliest.
    pub fn decode_best<R: Read + Seek>(
        &self,
        reader: &mut R,
    ) -> Result<RasterImage> {
        let mut images = self.decode_all(reader)?;
        let rank = |index: usize| {
            let entry = &self.entries[index];
            (entry.width(), entry.color_depth())
        };
        let mut best = 0;
        for index in 1..images.len() {
            if rank(index) > rank(best) {
                best = index;
            }
        }
        debug!("Selected entry {} of {}", best, images.len());
        Ok(images.swap_remove(best))
    }
}

//===========================================================================//

/// One entry in an ICO or CUR directory; identifies the byte range holding a
/// single icon or cursor image.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct IcoEntry {
    restype: ResourceType,
    width: u32,
    height: u32,
    num_colors: u8,
    color_planes: u16,
    bits_per_pixel: u16,
    data_size: u32,
    data_offset: u32,
    base_offset: u64,
}

impl IcoEntry {
    /// Returns the type of resource stored in this entry, either an icon or a
    /// cursor.
    pub fn resource_type(&self) -> ResourceType {
        self.restype
    }

    /// Returns the width declared in the directory, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height declared in the directory, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the number of palette colors declared in the directory (zero
    /// for 256 or more).
    pub fn num_colors(&self) -> u8 {
        self.num_colors
    }

    /// Returns the bits-per-pixel (color depth) of the image.  Returns zero if
    /// `self.resource_type() == ResourceType::Cursor` (since CUR files store
    /// hotspot coordinates in place of this field).
    pub fn bits_per_pixel(&self) -> u16 {
        if self.restype == ResourceType::Cursor {
            0
        } else {
            self.bits_per_pixel
        }
    }

    /// Returns the declared color depth, falling back to the palette size
    /// when the bits-per-pixel field is zero.
    pub fn color_depth(&self) -> u16 {
        let bits = self.bits_per_pixel();
        if bits != 0 || self.num_colors == 0 {
            return bits;
        }
        (u8::BITS - (self.num_colors - 1).leading_zeros()) as u16
    }

    /// Returns the raw cursor hotspot fields, or `None` if
    /// `self.resource_type() != ResourceType::Cursor`.
    pub fn cursor_hotspot(&self) -> Option<(u16, u16)> {
        if self.restype == ResourceType::Cursor {
            Some((self.color_planes, self.bits_per_pixel))
        } else {
            None
        }
    }

    /// Returns the size of the image data, in bytes.
    pub fn data_size(&self) -> u32 {
        self.data_size
    }

    /// Returns the offset of the image data from the start of the ICO data.
    pub fn data_offset(&self) -> u32 {
        self.data_offset
    }

    /// Reads this entry's raw image data.  Returns `Error::MissingData` if
    /// the stream ends before `data_size` bytes are available.
    pub fn read_data<R: Read + Seek>(&self, reader: &mut R) -> Result<Vec<u8>> {
        let offset = self.base_offset + self.data_offset as u64;
        reader.seek(SeekFrom::Start(offset))?;
        // Never allocates more than the stream actually holds.
        let mut data = Vec::new();
        reader.by_ref().take(self.data_size as u64).read_to_end(&mut data)?;
        if data.len() != self.data_size as usize {
            missing_data!(
                "ICO entry data is truncated (has {} bytes, needs {} \
                 at offset {})",
                data.len(),
                self.data_size,
                self.data_offset
            );
        }
        Ok(data)
    }

    /// Reads and decodes this entry into an image.
    pub fn decode<R: Read + Seek>(&self, reader: &mut R) -> Result<RasterImage> {
        let data = self.read_data(reader)?;
        let image = decode_entry(&data)?;
        let width_ok = image.width() == self.width
            || (self.width == 256 && image.width() > 256);
        let height_ok = image.height() == self.height
            || (self.height == 256 && image.height() > 256);
        if !(width_ok && height_ok) {
            warn!(
                "{} entry is {}x{} but the directory declares {}x{}",
                if is_png(&data) { "PNG" } else { "BMP" },
                image.width(),
                image.height(),
                self.width,
                self.height
            );
        }
        Ok(image)
    }
}

//===========================================================================//

/// Decodes every image in an ICO or CUR stream, in directory order.
pub fn decode_all<R: Read + Seek>(mut reader: R) -> Result<Vec<RasterImage>> {
    let icodir = IcoDirectory::read(&mut reader)?;
    icodir.decode_all(&mut reader)
}

/// Decodes an ICO or CUR stream and returns the image of the entry with the
/// greatest declared width (ties broken by declared color depth).
pub fn decode<R: Read + Seek>(mut reader: R) -> Result<RasterImage> {
    let icodir = IcoDirectory::read(&mut reader)?;
    icodir.decode_best(&mut reader)
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{decode, decode_all, IcoDirectory};
    use crate::error::Error;
    use crate::restype::ResourceType;
    use std::io::Cursor;

    // A 32-bpp BMP payload filled with one opaque color.
    fn bmp32(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&40u32.to_le_bytes());
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&(2 * height).to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&32u16.to_le_bytes());
        data.extend_from_slice(&[0u8; 24]);
        for _ in 0..(width * height) {
            data.extend_from_slice(&[rgb[2], rgb[1], rgb[0], 0xff]);
        }
        data
    }

    // An ICO file holding the given (width byte, bits-per-pixel, payload)
    // entries.
    fn ico_file(entries: &[(u8, u16, Vec<u8>)]) -> Vec<u8> {
        let mut file = vec![0, 0, 1, 0];
        file.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        let mut offset = 6 + 16 * entries.len() as u32;
        for (size, bpp, payload) in entries.iter() {
            file.extend_from_slice(&[*size, *size, 0, 0, 1, 0]);
            file.extend_from_slice(&bpp.to_le_bytes());
            file.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            file.extend_from_slice(&offset.to_le_bytes());
            offset += payload.len() as u32;
        }
        for (_, _, payload) in entries.iter() {
            file.extend_from_slice(payload);
        }
        file
    }

    #[test]
    fn read_empty_icon_set() {
        let input = b"\x00\x00\x01\x00\x00\x00";
        let icodir = IcoDirectory::read(Cursor::new(input)).unwrap();
        assert_eq!(icodir.resource_type(), ResourceType::Icon);
        assert_eq!(icodir.entries().len(), 0);
    }

    #[test]
    fn read_empty_cursor_set() {
        let input = b"\x00\x00\x02\x00\x00\x00";
        let icodir = IcoDirectory::read(Cursor::new(input)).unwrap();
        assert_eq!(icodir.resource_type(), ResourceType::Cursor);
        assert_eq!(icodir.entries().len(), 0);
    }

    #[test]
    fn decode_empty_icon_set() {
        let input = b"\x00\x00\x01\x00\x00\x00";
        let result = decode_all(Cursor::new(input));
        assert!(matches!(result, Err(Error::NoEntries)));
        let result = decode(Cursor::new(input));
        assert!(matches!(result, Err(Error::NoEntries)));
    }

    #[test]
    fn read_rejects_bad_header() {
        let input = b"\x01\x00\x01\x00\x00\x00";
        let result = IcoDirectory::read(Cursor::new(input));
        assert!(matches!(result, Err(Error::InvalidFormat(_))));
        let input = b"\x00\x00\x03\x00\x00\x00";
        let result = IcoDirectory::read(Cursor::new(input));
        assert!(matches!(result, Err(Error::InvalidFormat(_))));
        let input = b"\x00\x00\x01\x00\x01\x00\x10\x10";
        let result = IcoDirectory::read(Cursor::new(input));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn read_directory_entries() {
        let input: &[u8] = b"\
            \x00\x00\x02\x00\x02\x00\
            \
            \x00\x00\x00\x00\x05\x00\x07\x00\
            \x10\x00\x00\x00\x26\x00\x00\x00\
            \
            \x10\x20\x10\x00\x01\x00\x04\x00\
            \x20\x00\x00\x00\x36\x00\x00\x00";
        let icodir = IcoDirectory::read(Cursor::new(input)).unwrap();
        assert_eq!(icodir.resource_type(), ResourceType::Cursor);
        let entries = icodir.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].width(), 256);
        assert_eq!(entries[0].height(), 256);
        assert_eq!(entries[0].cursor_hotspot(), Some((5, 7)));
        assert_eq!(entries[0].bits_per_pixel(), 0);
        assert_eq!(entries[0].data_size(), 0x10);
        assert_eq!(entries[0].data_offset(), 0x26);
        assert_eq!(entries[1].width(), 16);
        assert_eq!(entries[1].height(), 32);
        assert_eq!(entries[1].num_colors(), 16);
        assert_eq!(entries[1].color_depth(), 4);
    }

    #[test]
    fn decode_all_preserves_order() {
        let input = ico_file(&[
            (2, 32, bmp32(2, 2, [0xff, 0, 0])),
            (1, 32, bmp32(1, 1, [0, 0xff, 0])),
        ]);
        let images = decode_all(Cursor::new(&input)).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].width(), 2);
        assert_eq!(images[0].pixel(1, 1), Some([0xff, 0, 0, 0xff]));
        assert_eq!(images[1].width(), 1);
        assert_eq!(images[1].pixel(0, 0), Some([0, 0xff, 0, 0xff]));
    }

    #[test]
    fn decode_selects_widest_entry() {
        let input = ico_file(&[
            (16, 32, bmp32(16, 16, [1, 1, 1])),
            (32, 32, bmp32(32, 32, [2, 2, 2])),
            (24, 32, bmp32(24, 24, [3, 3, 3])),
        ]);
        let image = decode(Cursor::new(&input)).unwrap();
        assert_eq!(image.width(), 32);
        assert_eq!(image.pixel(0, 0), Some([2, 2, 2, 0xff]));
    }

    #[test]
    fn decode_breaks_width_ties_by_color_depth() {
        let input = ico_file(&[
            (4, 24, bmp32(4, 4, [1, 1, 1])),
            (4, 32, bmp32(4, 4, [2, 2, 2])),
            (4, 8, bmp32(4, 4, [3, 3, 3])),
        ]);
        let image = decode(Cursor::new(&input)).unwrap();
        assert_eq!(image.pixel(0, 0), Some([2, 2, 2, 0xff]));
    }

    #[test]
    fn decode_ranks_by_declared_width() {
        // The directory claims 48 pixels for a 16-pixel payload.
        let input = ico_file(&[
            (48, 32, bmp32(16, 16, [1, 1, 1])),
            (32, 32, bmp32(32, 32, [2, 2, 2])),
        ]);
        let image = decode(Cursor::new(&input)).unwrap();
        assert_eq!(image.width(), 16);
        assert_eq!(image.pixel(0, 0), Some([1, 1, 1, 0xff]));
    }

    #[test]
    fn offsets_are_relative_to_directory_start() {
        let mut input = b"junk".to_vec();
        input.extend(ico_file(&[(2, 32, bmp32(2, 2, [4, 5, 6]))]));
        let mut reader = Cursor::new(&input);
        reader.set_position(4);
        let icodir = IcoDirectory::read(&mut reader).unwrap();
        assert_eq!(icodir.entries()[0].data_offset(), 22);
        let image = icodir.decode_best(&mut reader).unwrap();
        assert_eq!(image.pixel(1, 1), Some([4, 5, 6, 0xff]));
    }

    #[test]
    fn corrupt_entry_aborts_decode() {
        let mut bad = bmp32(1, 1, [0, 0, 0]);
        bad[14] = 7; // unsupported bits-per-pixel
        let input = ico_file(&[(1, 32, bmp32(1, 1, [9, 9, 9])), (1, 32, bad)]);
        let result = decode_all(Cursor::new(&input));
        assert!(matches!(result, Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn truncated_entry_data() {
        let mut input = ico_file(&[(1, 32, bmp32(1, 1, [0, 0, 0]))]);
        input.truncate(input.len() - 2);
        let result = decode_all(Cursor::new(&input));
        assert!(matches!(result, Err(Error::MissingData(_))));
    }

    #[test]
    fn hostile_entry_size_is_bounded() {
        let mut input = ico_file(&[(1, 32, bmp32(1, 1, [0, 0, 0]))]);
        // Claim a 4 GiB payload.
        input[14..18].copy_from_slice(&u32::MAX.to_le_bytes());
        let result = decode_all(Cursor::new(&input));
        assert!(matches!(result, Err(Error::MissingData(_))));
    }
}

//===========================================================================//
