//! Decoding of XPM images.
//!
//! XPM (X PixMap) is a plain text image format whose files are valid C code:
//! an array of string literals holding a header, a color table, and the
//! pixel rows.  This decoder is line oriented.  Every line whose first
//! non-blank character is `"` contributes the text up to the next `"`;
//! everything else (comments, the C declaration, braces) is skipped.
//!
//! ```text
//! /* XPM */
//! static char *example[] = {
//! "4 2 2 1",          <- width height ncolors chars_per_pixel
//! ". c None",         <- color table, one line per color
//! "# c #ff0000",
//! "#..#",             <- pixel rows
//! ".##.",
//! };
//! ```
//!
//! A color definition may provide values for several X11 visuals (`c`
//! color, `m` mono, `s` symbolic, `g4` and `g` grayscale); only the `c`
//! value is used, and it is required.  Pixels whose key is missing from the
//! color table come out transparent.

mod color;
mod x11colors;

pub use self::color::{resolve, TRANSPARENT};

use crate::error::{Error, Result};
use crate::image::{checked_num_pixels, RasterImage, MAX_PIXELS};
use log::{debug, warn};
use std::collections::HashMap;
use std::io::BufRead;

//===========================================================================//

/// The values section of an XPM image: its first quoted string.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct XpmHeader {
    /// Width of the image, in pixels.
    pub width: u32,
    /// Height of the image, in pixels.
    pub height: u32,
    /// Number of entries in the color table.
    pub num_colors: u32,
    /// Number of characters that make up one pixel's color key.
    pub chars_per_pixel: u32,
}

impl XpmHeader {
    /// Parses `"width height ncolors chars_per_pixel"`.  Any further fields
    /// (hotspot coordinates, `XPMEXT`) are ignored.  All four values must be
    /// positive, and `width * height` must be below `MAX_PIXELS`.
    pub fn parse(values: &[u8]) -> Result<XpmHeader> {
        let text = match std::str::from_utf8(values) {
            Ok(text) => text,
            Err(_) => invalid_format!("XPM header is not valid text"),
        };
        let fields: Vec<&str> = text.split_whitespace().collect();
        if fields.len() < 4 {
            invalid_format!(
                "XPM header must have 4 values (was {:?})",
                text
            );
        }
        let names = ["width", "height", "number of colors", "characters per pixel"];
        let mut numbers = [0u32; 4];
        for ((number, field), name) in
            numbers.iter_mut().zip(fields.iter()).zip(names.iter())
        {
            *number = match field.parse::<u32>() {
                Ok(value) if value > 0 => value,
                _ => invalid_format!(
                    "Invalid XPM {} (was {:?}, but must be a positive integer)",
                    name,
                    field
                ),
            };
        }
        let [width, height, num_colors, chars_per_pixel] = numbers;
        if checked_num_pixels(width, height).is_none() {
            invalid_format!(
                "Too many pixels ({} x {}), must be fewer than {}",
                width,
                height,
                MAX_PIXELS
            );
        }
        Ok(XpmHeader { width, height, num_colors, chars_per_pixel })
    }
}

//===========================================================================//

/// The section of the document the parser expects next.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseState {
    /// Waiting for the values line.
    AwaitHeader,
    /// Reading the color table; `remaining` definitions are still expected.
    ReadingColors {
        /// Number of color definitions not yet read.
        remaining: u32,
    },
    /// Reading pixel rows; `row` is the index of the next row.
    ReadingPixels {
        /// Zero-based index of the next pixel row.
        row: u32,
    },
    /// Every declared pixel row has been read.
    Done,
}

/// The visuals a color definition may provide a value for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Visual {
    Mono,
    Symbolic,
    Grayscale4,
    Grayscale,
    Color,
}

impl Visual {
    fn from_key(key: &str) -> Option<Visual> {
        match key {
            "m" => Some(Visual::Mono),
            "s" => Some(Visual::Symbolic),
            "g4" => Some(Visual::Grayscale4),
            "g" => Some(Visual::Grayscale),
            "c" => Some(Visual::Color),
            _ => None,
        }
    }
}

//===========================================================================//

/// An XPM parser that is fed one line at a time.
///
/// The color table and pixel buffer belong to a single parser, which is
/// consumed by [`XpmParser::finish`].
pub struct XpmParser {
    state: ParseState,
    header: XpmHeader,
    colors: HashMap<Vec<u8>, [u8; 4]>,
    rgba_data: Vec<u8>,
    in_extensions: bool,
}

impl XpmParser {
    /// Creates a parser waiting for the values line.
    pub fn new() -> XpmParser {
        XpmParser {
            state: ParseState::AwaitHeader,
            header: XpmHeader {
                width: 0,
                height: 0,
                num_colors: 0,
                chars_per_pixel: 0,
            },
            colors: HashMap::new(),
            rgba_data: Vec::new(),
            in_extensions: false,
        }
    }

    /// Returns the section the parser expects next.
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Returns the parsed header, or `None` before the values line.
    pub fn header(&self) -> Option<&XpmHeader> {
        if self.state == ParseState::AwaitHeader {
            None
        } else {
            Some(&self.header)
        }
    }

    /// Feeds one line of input, without its line terminator.  Lines that
    /// are not string literals are ignored.
    pub fn feed_line(&mut self, line: &[u8]) -> Result<()> {
        let content = match quoted_content(line) {
            Some(content) => content,
            None => return Ok(()),
        };
        self.state = match self.state {
            ParseState::AwaitHeader => {
                let header = XpmHeader::parse(content)?;
                debug!(
                    "XPM header: {}x{}, {} colors, {} chars per pixel",
                    header.width,
                    header.height,
                    header.num_colors,
                    header.chars_per_pixel
                );
                let num_bytes =
                    4 * (header.width as usize) * (header.height as usize);
                self.rgba_data = vec![0u8; num_bytes];
                self.header = header;
                ParseState::ReadingColors { remaining: header.num_colors }
            }
            ParseState::ReadingColors { remaining } => {
                let chars_per_pixel = self.header.chars_per_pixel as usize;
                let (key, rgba) = parse_color(content, chars_per_pixel)?;
                self.colors.insert(key.to_vec(), rgba);
                if remaining > 1 {
                    ParseState::ReadingColors { remaining: remaining - 1 }
                } else {
                    ParseState::ReadingPixels { row: 0 }
                }
            }
            ParseState::ReadingPixels { row } => {
                self.read_pixels(content, row)?;
                if row + 1 < self.header.height {
                    ParseState::ReadingPixels { row: row + 1 }
                } else {
                    ParseState::Done
                }
            }
            ParseState::Done => {
                // Extension data runs from an XPMEXT string to XPMENDEXT;
                // anything else after the pixels is an error.
                if content.starts_with(b"XPMENDEXT") {
                    self.in_extensions = false;
                } else if content.starts_with(b"XPMEXT") {
                    self.in_extensions = true;
                } else if !self.in_extensions {
                    return Err(Error::TooMuchPixelData);
                }
                ParseState::Done
            }
        };
        Ok(())
    }

    fn read_pixels(&mut self, content: &[u8], row: u32) -> Result<()> {
        let width = self.header.width as usize;
        let chars_per_pixel = self.header.chars_per_pixel as usize;
        let row_len = match chars_per_pixel.checked_mul(width) {
            Some(row_len) if row_len <= content.len() => row_len,
            _ => return Err(Error::MissingPixelData { row }),
        };
        let stride = 4 * width;
        let start = row as usize * stride;
        let dest = match self.rgba_data.get_mut(start..start + stride) {
            Some(dest) => dest,
            None => return Err(Error::TooMuchPixelData),
        };
        for (pixel, key) in dest
            .chunks_exact_mut(4)
            .zip(content[..row_len].chunks_exact(chars_per_pixel))
        {
            let rgba = self.colors.get(key).copied().unwrap_or(TRANSPARENT);
            pixel.copy_from_slice(&rgba);
        }
        Ok(())
    }

    /// Finishes parsing and returns the image.  If the input ended before
    /// every pixel row was read, the rows that were not read are left
    /// transparent.
    pub fn finish(self) -> Result<RasterImage> {
        match self.state {
            ParseState::AwaitHeader => {
                invalid_format!("XPM data has no values line")
            }
            ParseState::ReadingColors { remaining } => {
                warn!(
                    "XPM data ended with {} color definitions unread",
                    remaining
                );
            }
            ParseState::ReadingPixels { row } => {
                warn!(
                    "XPM data ended after {} of {} pixel rows",
                    row,
                    self.header.height
                );
            }
            ParseState::Done => {}
        }
        Ok(RasterImage::from_rgba_data(
            self.header.width,
            self.header.height,
            self.rgba_data,
        ))
    }
}

impl Default for XpmParser {
    fn default() -> XpmParser {
        XpmParser::new()
    }
}

//===========================================================================//

/// Decodes an XPM image from a stream of text lines.
pub fn decode<R: BufRead>(reader: R) -> Result<RasterImage> {
    let mut parser = XpmParser::new();
    for line in reader.split(b'\n') {
        parser.feed_line(&line?)?;
    }
    parser.finish()
}

/// Parses one color definition, such as `"r g gray g4 #888888 c red"`,
/// returning the `chars_per_pixel`-byte key and its `c` color.
///
/// A value runs until the next visual key, so it may span several words.
/// Visuals before the `c` one are checked but discarded.
pub fn parse_color(
    line: &[u8],
    chars_per_pixel: usize,
) -> Result<(&[u8], [u8; 4])> {
    if line.len() < chars_per_pixel {
        return Err(Error::MissingColorSpec);
    }
    let (key, rest) = line.split_at(chars_per_pixel);
    let rest = String::from_utf8_lossy(rest);
    let words: Vec<&str> = rest.split_whitespace().collect();
    let mut pos = 0;
    while words.len() - pos >= 2 {
        let visual_key = words[pos];
        pos += 1;
        let end = words[pos..]
            .iter()
            .position(|word| Visual::from_key(word).is_some())
            .map_or(words.len(), |offset| pos + offset);
        if end == pos {
            return Err(Error::MissingColorSpec);
        }
        let value = words[pos..end].join(" ");
        pos = end;
        match Visual::from_key(visual_key) {
            Some(Visual::Color) => return Ok((key, resolve(&value)?)),
            Some(_) => continue,
            None => return Err(Error::UnknownVisual(visual_key.to_string())),
        }
    }
    Err(Error::MissingColorSpec)
}

/// Returns the text between the opening quote and the next quote (or the
/// end of the line, if the string is unterminated), or `None` if the line
/// is not a string literal.
fn quoted_content(line: &[u8]) -> Option<&[u8]> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let start = line.iter().position(|&b| b != b' ' && b != b'\t')?;
    let content = line[start..].strip_prefix(b"\"")?;
    match content.iter().position(|&b| b == b'"') {
        Some(end) => Some(&content[..end]),
        None => Some(content),
    }
}

//===========================================================================//


//===========================================================================//
