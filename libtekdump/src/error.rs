use std::fmt::Display;

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
/// Possible `libtekdump` errors
///
/// All of these end a decode session. Row-local problems are reported as [`RowFault`]s instead.
pub enum Error {
    /// The input ended before the header or before every declared row was read
    #[error("unexpected end of input while reading {stage}")]
    UnexpectedEndOfInput {
        /// Where in the capture the input ended
        stage: Stage,
    },
    /// The capture header could not be understood
    #[error("malformed header: {0}")]
    MalformedHeader(String),
    /// Binary body transport was requested, which is not implemented
    #[error("binary body decoding is not supported")]
    UnsupportedMode,
    /// A pixel index outside of `0..=7` reached the renderer
    #[error("pixel index {0} is outside of 0..=7")]
    PixelOutOfRange(u8),
    /// A decode session operation was called in the wrong state
    #[error("{0}")]
    OutOfOrder(String),
    /// Reading the capture or writing the raster failed
    #[error("i/o error")]
    Io(#[from] std::io::Error),
}

/// The part of a capture being read when the input ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// One of the header lines
    Header,
    /// The encoded line of the given (1-based) row
    Row(usize),
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Header => write!(f, "header"),
            Self::Row(row) => write!(f, "body at row {row}"),
        }
    }
}

/// A recoverable problem found while decoding a single row
///
/// The row is still rendered at the declared width.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RowFault {
    /// Characters that are not valid for the body encoding
    #[error("bad chars '{}' at offset {position}", String::from_utf8_lossy(.found))]
    BadEncodedChar {
        /// Offset of the first offending character in the line
        position: usize,
        /// The offending characters (empty when the line ended mid-pair)
        found: Vec<u8>,
    },
    /// The decoded runs produce more pixels than the row holds
    #[error("decoding error; line length too long for {columns} columns")]
    RowOverrun {
        /// Declared column count
        columns: usize,
    },
    /// The decoded pixel count differs from the declared column count
    #[error("expected {expected} columns, got {got}")]
    RowLengthMismatch {
        /// Declared column count
        expected: usize,
        /// Pixels actually decoded
        got: usize,
    },
}
