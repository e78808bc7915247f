use crate::error::{Error, Result};
use crate::image::RasterImage;
use crate::{icodir, xpm};
use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufRead, Read, Seek, SeekFrom};

//===========================================================================//

/// The image formats this crate can decode.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum ImageFormat {
    /// ICO and CUR files
    Ico,
    /// XPM3 text images
    Xpm,
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ImageFormat::Ico => f.write_str("ICO"),
            ImageFormat::Xpm => f.write_str("XPM"),
        }
    }
}

struct Signature {
    magic: &'static [u8],
    format: ImageFormat,
}

// Checked in order; the first match wins.
static SIGNATURES: &[Signature] = &[
    Signature { magic: b"/* XPM */", format: ImageFormat::Xpm },
    Signature { magic: b"static char", format: ImageFormat::Xpm },
    Signature { magic: b"\x00\x00\x01\x00", format: ImageFormat::Ico },
    Signature { magic: b"\x00\x00\x02\x00", format: ImageFormat::Ico },
];

// The longest signature above.
const MAX_SIGNATURE_LEN: u64 = 11;

//===========================================================================//

/// Guesses the format of an image from the first bytes of its data.
pub fn guess_format(prefix: &[u8]) -> Option<ImageFormat> {
    SIGNATURES
        .iter()
        .find(|signature| prefix.starts_with(signature.magic))
        .map(|signature| signature.format)
}

/// Sniffs the format of the stream and decodes it.  For ICO/CUR files, the
/// widest image is returned (see [`crate::ico::decode`]).  The stream is
/// rewound to its starting position before the decoder runs.
pub fn decode<R: BufRead + Seek>(mut reader: R) -> Result<RasterImage> {
    let start = reader.stream_position()?;
    let mut prefix = Vec::new();
    reader.by_ref().take(MAX_SIGNATURE_LEN).read_to_end(&mut prefix)?;
    reader.seek(SeekFrom::Start(start))?;
    let format = match guess_format(&prefix) {
        Some(format) => format,
        None => return Err(Error::UnknownFormat),
    };
    debug!("Detected {} data", format);
    match format {
        ImageFormat::Ico => icodir::decode(reader),
        ImageFormat::Xpm => xpm::decode(reader),
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{guess_format, ImageFormat, SIGNATURES, MAX_SIGNATURE_LEN};

    #[test]
    fn max_signature_len() {
        let longest = SIGNATURES.iter().map(|s| s.magic.len()).max();
        assert_eq!(longest, Some(MAX_SIGNATURE_LEN as usize));
    }

    #[test]
    fn guesses() {
        assert_eq!(guess_format(b"/* XPM */\n"), Some(ImageFormat::Xpm));
        assert_eq!(guess_format(b"static char *x[]"), Some(ImageFormat::Xpm));
        assert_eq!(guess_format(b"\x00\x00\x01\x00\x02\x00"), Some(ImageFormat::Ico));
        assert_eq!(guess_format(b"\x00\x00\x02\x00\x01\x00"), Some(ImageFormat::Ico));
        assert_eq!(guess_format(b"\x89PNG\r\n\x1a\n"), None);
        assert_eq!(guess_format(b"/* XP"), None);
        assert_eq!(guess_format(b""), None);
    }
}

//===========================================================================//
