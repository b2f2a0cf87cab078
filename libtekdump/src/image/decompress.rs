use tracing::trace;

use crate::{
    error::RowFault,
    image::{
        config::Compression,
        hex::{BadPair, HexCursor},
        palette::Pixel,
        FILL_PIXEL,
    },
};

/// Run length selector held in the top two bits of an instruction byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTag {
    /// `0x40`: the pair is emitted once
    One,
    /// `0x80`: the pair is emitted twice
    Two,
    /// `0xC0`: the pair is emitted three times
    Three,
    /// `0x00`: the run length follows in one or two extra bytes
    Extended,
}

impl RunTag {
    /// Selects the tag from the top two bits of `b`
    #[must_use]
    pub const fn from_byte(b: u8) -> Self {
        match b & 0xC0 {
            0x40 => Self::One,
            0x80 => Self::Two,
            0xC0 => Self::Three,
            _ => Self::Extended,
        }
    }
}

/// One decoded run instruction: a pixel pair and how many times to repeat it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// The pair, in emission order
    pub pair: (Pixel, Pixel),
    /// Repetitions of the pair
    pub count: u16,
}

impl Run {
    /// Reads one instruction, including any extended length bytes
    fn read(cursor: &mut HexCursor<'_>) -> Result<Self, BadPair> {
        let b = cursor.next_byte()?;
        let pair = (Pixel::from_low_bits(b), Pixel::from_low_bits((b & 0x38) >> 3));
        let count = match RunTag::from_byte(b) {
            RunTag::One => 1,
            RunTag::Two => 2,
            RunTag::Three => 3,
            RunTag::Extended => {
                let b2 = cursor.next_byte()?;
                if b2 >= 4 {
                    u16::from(b2)
                } else {
                    let b3 = cursor.next_byte()?;
                    u16::from(b2) << 8 | u16::from(b3)
                }
            }
        };
        Ok(Self { pair, count })
    }
}

/// Decodes a compressed line into its run instructions
///
/// A bad pair is reported and skipped; decoding resumes at the following pair.
pub fn decode_runs(line: &[u8]) -> impl Iterator<Item = Result<Run, RowFault>> + '_ {
    let mut cursor = HexCursor::new(line);
    std::iter::from_fn(move || {
        if cursor.is_empty() {
            return None;
        }
        Some(Run::read(&mut cursor).map_err(|bad| RowFault::BadEncodedChar {
            position: bad.position,
            found: bad.found,
        }))
    })
}

/// The pixels of one row and the problems found decoding them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRow {
    /// Exactly `columns` pixels; positions that were not decoded hold [`FILL_PIXEL`]
    pub pixels: Vec<Pixel>,
    /// Recoverable problems, in the order they were found
    pub faults: Vec<RowFault>,
}

/// Collects pixels up to the declared width
struct RowBuilder {
    columns: usize,
    pixels: Vec<Pixel>,
    faults: Vec<RowFault>,
}

impl RowBuilder {
    fn new(columns: usize) -> Self {
        Self {
            columns,
            pixels: Vec::with_capacity(columns),
            faults: Vec::new(),
        }
    }

    /// Appends `p`, or records an overrun when the row is already full
    fn push(&mut self, p: Pixel) -> Result<(), RowFault> {
        if self.pixels.len() >= self.columns {
            return Err(RowFault::RowOverrun {
                columns: self.columns,
            });
        }
        self.pixels.push(p);
        Ok(())
    }

    fn push_run(&mut self, run: Run) -> Result<(), RowFault> {
        for _ in 0..run.count {
            self.push(run.pair.0)?;
            self.push(run.pair.1)?;
        }
        Ok(())
    }

    fn finish(mut self) -> DecodedRow {
        let got = self.pixels.len();
        if got != self.columns {
            self.faults.push(RowFault::RowLengthMismatch {
                expected: self.columns,
                got,
            });
        }
        self.pixels.resize(self.columns, FILL_PIXEL);
        DecodedRow {
            pixels: self.pixels,
            faults: self.faults,
        }
    }
}

/// Expands a compressed line into a row of `columns` pixels
#[must_use]
pub fn decode_compressed_row(line: &[u8], columns: usize) -> DecodedRow {
    let mut row = RowBuilder::new(columns);
    for run in decode_runs(line) {
        trace!("{run:?}");
        match run {
            Ok(run) => {
                if let Err(overrun) = row.push_run(run) {
                    row.faults.push(overrun);
                    break;
                }
            }
            Err(fault) => row.faults.push(fault),
        }
    }
    row.finish()
}

/// Reads an uncompressed line: one octal digit per pixel, at every odd offset
///
/// A character that is not `0..=7` is reported and stands in as [`FILL_PIXEL`] so the
/// following pixels stay in their columns.
#[must_use]
pub fn decode_uncompressed_row(line: &[u8], columns: usize) -> DecodedRow {
    let mut row = RowBuilder::new(columns);
    for (position, &c) in line.iter().enumerate().skip(1).step_by(2) {
        let p = match c {
            b'0'..=b'7' => Pixel::from_low_bits(c - b'0'),
            _ => {
                row.faults.push(RowFault::BadEncodedChar {
                    position,
                    found: vec![c],
                });
                FILL_PIXEL
            }
        };
        if let Err(overrun) = row.push(p) {
            row.faults.push(overrun);
            break;
        }
    }
    row.finish()
}

/// Decodes a line with the given body encoding
#[must_use]
pub fn decode_row(line: &[u8], columns: usize, compression: Compression) -> DecodedRow {
    match compression {
        Compression::Compressed => decode_compressed_row(line, columns),
        Compression::Uncompressed => decode_uncompressed_row(line, columns),
    }
}
