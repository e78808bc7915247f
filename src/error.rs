use std::io;
use thiserror::Error;

//===========================================================================//

/// Errors that can occur while decoding an ICO or XPM image.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying reader failed (including unexpected end of stream
    /// while reading a fixed-size structure).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The ICO directory declares zero images.
    #[error("ICO directory has no entries")]
    NoEntries,
    /// A header, dimension, or structural field is malformed.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    /// The stream ends before the data its headers declare.
    #[error("missing data: {0}")]
    MissingData(String),
    /// An XPM color line has no key or no `c` (color visual) definition.
    #[error("invalid format: missing color specification")]
    MissingColorSpec,
    /// An XPM color line uses a visual key other than `c`, `m`, `s`, `g4`
    /// or `g`.
    #[error("unknown visual {0:?}")]
    UnknownVisual(String),
    /// A `#` color is not of the form `#rgb` or `#rrggbb`.
    #[error("invalid format: invalid hex color {0:?}")]
    InvalidHexColor(String),
    /// A color name is not in the X11 color table.
    #[error("invalid format: invalid X11 color {0:?}")]
    InvalidColorName(String),
    /// An XPM pixel row is shorter than `width * chars_per_pixel`.
    #[error("invalid format: missing pixel data (row {row})")]
    MissingPixelData {
        /// Zero-based index of the offending pixel row.
        row: u32,
    },
    /// An XPM document has more pixel rows than its declared height.
    #[error("invalid format: too much pixel data")]
    TooMuchPixelData,
    /// The stream does not start with any known image signature.
    #[error("unrecognized image format")]
    UnknownFormat,
}

impl Error {
    /// Returns true if the error reports malformed image content, as opposed
    /// to an I/O failure or an empty ICO directory.
    pub fn is_invalid_format(&self) -> bool {
        !matches!(self, Error::Io(_) | Error::NoEntries)
    }
}

impl From<Error> for io::Error {
    fn from(error: Error) -> io::Error {
        match error {
            Error::Io(error) => error,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// A specialized `Result` type for decoding operations.
pub type Result<T> = std::result::Result<T, Error>;

//===========================================================================//


//===========================================================================//
