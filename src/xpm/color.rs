//! Resolution of XPM color specifications (`#rgb`, `#rrggbb`, X11 color
//! names and `None`) into RGBA values.

use super::x11colors::X11_COLORS;
use crate::error::{Error, Result};

/// The RGBA value of a fully transparent pixel.
pub const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// Resolves one color specification into a non-premultiplied RGBA value.
///
/// - `none` (in any case) is fully transparent.
/// - `#rrggbb` gives two hex digits per channel.
/// - `#rgb` gives one hex digit per channel, *shifted* rather than repeated,
///   as X11 does it: `#fff` is `#f0f0f0`, not `#ffffff`.
/// - Anything else is looked up, case-sensitively, in the X11 color name
///   table.  Multi-word names must be separated by single spaces.
pub fn resolve(spec: &str) -> Result<[u8; 4]> {
    if spec.eq_ignore_ascii_case("none") {
        return Ok(TRANSPARENT);
    }
    if let Some(digits) = spec.strip_prefix('#') {
        return parse_hex(spec, digits.as_bytes());
    }
    match lookup_name(spec) {
        Some([red, green, blue]) => Ok([red, green, blue, u8::MAX]),
        None => Err(Error::InvalidColorName(spec.to_string())),
    }
}

fn parse_hex(spec: &str, digits: &[u8]) -> Result<[u8; 4]> {
    let invalid = || Error::InvalidHexColor(spec.to_string());
    let mut rgba = [0, 0, 0, u8::MAX];
    match digits.len() {
        6 => {
            for (channel, pair) in rgba.iter_mut().zip(digits.chunks_exact(2)) {
                let high = hex_value(pair[0]).ok_or_else(invalid)?;
                let low = hex_value(pair[1]).ok_or_else(invalid)?;
                *channel = (high << 4) | low;
            }
        }
        3 => {
            for (channel, &digit) in rgba.iter_mut().zip(digits.iter()) {
                *channel = hex_value(digit).ok_or_else(invalid)? << 4;
            }
        }
        _ => return Err(invalid()),
    }
    Ok(rgba)
}

fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

fn lookup_name(name: &str) -> Option<[u8; 3]> {
    X11_COLORS
        .binary_search_by(|&(entry, _)| entry.cmp(name))
        .ok()
        .map(|index| X11_COLORS[index].1)
}

//===========================================================================//


//===========================================================================//
