//! # libtekdump
//!
//!
//! This library decodes the screen dumps produced by the Tektronix 11801 family of digital
//! sampling oscilloscopes into portable anymap (PPM/PBM) raster documents.
//!
//! The scope sends its screen over a serial line as a short text header followed by one line of
//! ASCII-hex per screen row. Each row is compressed with a small run-length scheme where every
//! byte carries two 3-bit pixels (trace, cursor and graticule colors) and a 2-bit run tag.
//!
//! It aims to provide a minimal, low-level API to build upon: reading the header, decoding rows
//! under the declared column budget, and rendering pixels through one of two fixed palettes. Opening
//! devices and choosing where images end up is left to the users of this crate (see the `tekdump`
//! binary for one such user).
//!
//! ### Tolerance
//!
//! Serial links drop and mangle characters. A corrupted row never aborts a decode: the bad
//! characters are reported as [`RowFault`]s, the row is padded or truncated to the declared width
//! and the session continues. Only a missing or malformed header, a stream that ends early, or a
//! request for the unimplemented binary transport are fatal.
//!
//! ### Usage
//!
//! #### Converting a screen dump to a PPM document
//!
//! ```rust
//! use libtekdump::{DecodeConfig, Decoder, LineReader, Outcome};
//!
//! fn main() -> anyhow::Result<()> {
//!     let dump = "11801A date: 23-MAY-97 time: 10:41:07\n4\n1\n8b\n";
//!
//!     let decoder = Decoder::new(DecodeConfig::default())?;
//!     let mut lines = LineReader::new(dump.as_bytes());
//!     let mut ppm = Vec::new();
//!     let report = decoder.decode(&mut lines, &mut ppm)?;
//!
//!     assert_eq!(report.outcome(), Outcome::Clean);
//!     assert!(ppm.starts_with(b"P3\n4 1\n255\n"));
//!     Ok(())
//! }
//! ```
//!
//! #### Decoding to memory
//!
//! A [`ScreenDump`] keeps the decoded pixel indices around so they can be handed to an image
//! encoder such as the one in the [`image`](https://docs.rs/image) crate.
//!
//! ```rust
//! use libtekdump::{PaletteMode, ScreenDump};
//!
//! fn main() -> anyhow::Result<()> {
//!     let dump = "11801A date: 23-MAY-97 time: 10:41:07\n4\n1\n8b\n";
//!     let dump = ScreenDump::from_reader(dump.as_bytes(), &Default::default())?;
//!
//!     let as_rgb: Vec<u8> = dump.as_rgb_iter(PaletteMode::Color).flatten().collect();
//!     assert_eq!(as_rgb.len(), 4 * 3);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

mod error;
/// Module containing types for screen dump images
pub mod image;
mod reader;

pub use error::{Error, RowFault, Stage};
pub use image::bitmap::BitMap;
pub use image::config::{Compression, DecodeConfig, PaletteMode, Transport};
pub use image::header::CaptureHeader;
pub use image::palette::Pixel;
pub use image::raster::PnmWriter;
pub use image::{
    decode, DecodeReport, DecodeSession, Decoder, Outcome, RowSink, ScreenDump, SessionState,
    FILL_PIXEL,
};
pub use reader::LineReader;

/// Largest accepted row or column count
pub const MAX_DIMENSION: usize = 4096;

/// Encoded lines longer than this have their tail discarded
pub const MAX_LINE_LEN: usize = 64 * 1024;
