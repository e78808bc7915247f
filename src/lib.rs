//! A library for decoding legacy raster images: ICO/CUR icon containers and
//! XPM text pixmaps.
//!
//! Every decoder produces a [`RasterImage`], a plain non-premultiplied RGBA
//! buffer.
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! // The widest image in an icon file:
//! let file = File::open("app.ico").unwrap();
//! let image = rasterdec::ico::decode(file).unwrap();
//!
//! // Or let the format be sniffed from the data:
//! let file = BufReader::new(File::open("app.xpm").unwrap());
//! let image = rasterdec::decode(file).unwrap();
//! println!("{}x{}", image.width(), image.height());
//! ```

#![warn(missing_docs)]

#[macro_use]
mod macros;

mod bmpdepth;
mod entry;
mod error;
mod format;
mod icodir;
mod image;
mod restype;
pub mod xpm;

pub use crate::error::{Error, Result};
pub use crate::format::{decode, guess_format, ImageFormat};
pub use crate::image::{RasterImage, MAX_PIXELS};

/// Decoding of ICO and CUR files.
///
/// An ICO file is a directory of images at different sizes and depths; each
/// image is stored either as a PNG file or as a BMP with an AND mask.
pub mod ico {
    pub use crate::entry::{decode_entry, is_png};
    pub use crate::icodir::{decode, decode_all, IcoDirectory, IcoEntry};
    pub use crate::restype::ResourceType;
}
