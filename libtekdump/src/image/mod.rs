#![allow(clippy::module_name_repetitions)]

pub(crate) mod bitmap;
pub(crate) mod config;
pub(crate) mod decompress;
pub(crate) mod header;
pub(crate) mod hex;
pub(crate) mod palette;
pub(crate) mod raster;

/// Module containing the body grammar
///
/// These functions work on a single encoded line and never touch any I/O, which makes them
/// useful for inspecting damaged captures line by line.
pub mod rows {
    pub use crate::image::decompress::{
        decode_compressed_row, decode_row, decode_runs, decode_uncompressed_row, DecodedRow, Run,
        RunTag,
    };
    pub use crate::image::hex::decode_pair;
}

/// Module containing the fixed palettes
pub mod colormap {
    pub use crate::image::palette::{BW_MAP, COLOR_MAP};
    pub use crate::image::raster::MAX_SAMPLE_VALUE;
}

use crate::{error::Stage, reader::LineReader, Error, RowFault};
use anyhow::{Context, Result};
use bitmap::BitMap;
use config::{DecodeConfig, PaletteMode, Transport};
use decompress::decode_row;
use header::CaptureHeader;
use palette::Pixel;
use raster::PnmWriter;
use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    path::Path,
};
use tracing::{debug, info, instrument, trace, warn};

/// Pixel written at row positions the encoded line did not cover
pub const FILL_PIXEL: Pixel = Pixel::BACKGROUND;

/// Receives the rendered output of a decode session
///
/// [`PnmWriter`] streams rows into an anymap document, [`BitMap`] keeps them in memory.
pub trait RowSink {
    /// Called once the header has been read, before any row
    ///
    /// # Errors
    ///
    /// Implementations error if the output cannot be written
    fn begin(&mut self, header: &CaptureHeader, palette: PaletteMode) -> Result<(), Error>;

    /// Called for every row (1-based) with exactly `columns` pixels
    ///
    /// # Errors
    ///
    /// Implementations error if the output cannot be written
    fn write_row(&mut self, row: usize, pixels: &[Pixel]) -> Result<(), Error>;

    /// Called after the last row
    ///
    /// # Errors
    ///
    /// Implementations error if the output cannot be flushed
    fn finish(&mut self) -> Result<(), Error>;
}

impl<S: RowSink + ?Sized> RowSink for &mut S {
    fn begin(&mut self, header: &CaptureHeader, palette: PaletteMode) -> Result<(), Error> {
        (**self).begin(header, palette)
    }

    fn write_row(&mut self, row: usize, pixels: &[Pixel]) -> Result<(), Error> {
        (**self).write_row(row, pixels)
    }

    fn finish(&mut self) -> Result<(), Error> {
        (**self).finish()
    }
}

/// Overall result of a session that ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every row decoded to exactly the declared width without errors
    Clean,
    /// At least one row had recoverable errors
    Degraded,
}

/// Summary of a completed decode session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeReport {
    header: CaptureHeader,
    faults: Vec<(usize, RowFault)>,
}

impl DecodeReport {
    /// Returns the header of the decoded capture
    #[must_use]
    pub const fn header(&self) -> &CaptureHeader {
        &self.header
    }

    /// Returns every row fault with its (1-based) row number
    #[must_use]
    pub fn faults(&self) -> &[(usize, RowFault)] {
        &self.faults
    }

    /// Returns whether the image came out clean or degraded
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        if self.faults.is_empty() {
            Outcome::Clean
        } else {
            Outcome::Degraded
        }
    }
}

/// Where a [`DecodeSession`] is in its capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing read yet
    AwaitingHeader,
    /// The header is read; the given (1-based) row is next
    DecodingRows {
        /// Next row to decode
        row: usize,
    },
    /// Every row was decoded and the output finished
    Done,
    /// An unrecoverable error ended the session
    Failed,
}

/// Decodes screen dumps with a fixed [`DecodeConfig`]
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    config: DecodeConfig,
}

impl Decoder {
    /// Creates a new [`Decoder`]
    ///
    /// # Errors
    ///
    /// This function errors with [`Error::UnsupportedMode`] if the config asks for the
    /// binary transport
    pub fn new(config: DecodeConfig) -> Result<Self, Error> {
        if config.transport == Transport::Binary {
            warn!("{} transport is not supported", config.transport);
            return Err(Error::UnsupportedMode);
        }
        debug!(
            "decoding {} {} body, {} palette",
            config.compression, config.transport, config.palette
        );
        Ok(Self { config })
    }

    /// Returns the decoder's config
    #[must_use]
    pub const fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Starts a session reading from `lines` and rendering into `sink`
    pub fn session<'l, R: BufRead, S: RowSink>(
        &self,
        lines: &'l mut LineReader<R>,
        sink: S,
    ) -> DecodeSession<'l, R, S> {
        DecodeSession {
            config: self.config,
            lines,
            sink,
            state: SessionState::AwaitingHeader,
            header: None,
            faults: Vec::new(),
        }
    }

    /// Decodes the next capture in `lines` into an anymap document written to `output`
    ///
    /// # Errors
    ///
    /// This function errors if the header is missing or malformed, if the input ends before
    /// every row is read, or on i/o failure. Row errors are not fatal; they are listed in the
    /// returned [`DecodeReport`].
    pub fn decode<R: BufRead, W: Write>(
        &self,
        lines: &mut LineReader<R>,
        output: W,
    ) -> Result<DecodeReport, Error> {
        self.decode_with_progress(lines, PnmWriter::new(output), |_, _| {})
    }

    /// Like [`Self::decode`] but renders into any [`RowSink`], calling `progress` with
    /// `(row, rows)` after each row
    ///
    /// # Errors
    ///
    /// See [`Self::decode`]
    pub fn decode_with_progress<R: BufRead, S: RowSink>(
        &self,
        lines: &mut LineReader<R>,
        sink: S,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<DecodeReport, Error> {
        let mut session = self.session(lines, sink);
        let rows = session.read_header()?.rows;
        while let SessionState::DecodingRows { row } = session.state() {
            session.decode_next_row()?;
            progress(row, rows);
        }
        session.finish().map(|(report, _)| report)
    }
}

/// A single decode session over one capture
///
/// Moves from [`SessionState::AwaitingHeader`] through [`SessionState::DecodingRows`] to
/// [`SessionState::Done`]; any error moves it to [`SessionState::Failed`].
pub struct DecodeSession<'l, R, S> {
    config: DecodeConfig,
    lines: &'l mut LineReader<R>,
    sink: S,
    state: SessionState,
    header: Option<CaptureHeader>,
    faults: Vec<(usize, RowFault)>,
}

impl<R: BufRead, S: RowSink> DecodeSession<'_, R, S> {
    /// Returns the current state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the header, once read
    #[must_use]
    pub const fn header(&self) -> Option<&CaptureHeader> {
        self.header.as_ref()
    }

    fn track<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        if result.is_err() {
            self.state = SessionState::Failed;
        }
        result
    }

    fn out_of_order(&mut self, op: &str) -> Error {
        let state = self.state;
        self.state = SessionState::Failed;
        Error::OutOfOrder(format!("{op} called in session state {state:?}"))
    }

    /// Reads the header and writes the raster header to the sink
    ///
    /// # Errors
    ///
    /// This function errors if the header is missing or malformed, if the sink fails, or if
    /// the header was already read
    pub fn read_header(&mut self) -> Result<&CaptureHeader, Error> {
        if self.state != SessionState::AwaitingHeader {
            return Err(self.out_of_order("read_header"));
        }
        let header = CaptureHeader::read_from(&mut *self.lines);
        let header = self.track(header)?;
        let begun = self.sink.begin(&header, self.config.palette);
        self.track(begun)?;
        debug!("processing body");
        self.state = SessionState::DecodingRows { row: 1 };
        Ok(self.header.insert(header))
    }

    /// Decodes the next row, returning the faults found in it
    ///
    /// # Errors
    ///
    /// This function errors if the input ends, if the sink fails, or if no row is pending
    pub fn decode_next_row(&mut self) -> Result<Vec<RowFault>, Error> {
        let SessionState::DecodingRows { row } = self.state else {
            return Err(self.out_of_order("decode_next_row"));
        };
        let Some((columns, rows)) = self.header.as_ref().map(|h| (h.columns, h.rows)) else {
            return Err(self.out_of_order("decode_next_row"));
        };

        let line = match self.lines.next_line() {
            Ok(Some(line)) => line,
            Ok(None) => {
                self.state = SessionState::Failed;
                return Err(Error::UnexpectedEndOfInput {
                    stage: Stage::Row(row),
                });
            }
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(e.into());
            }
        };
        let decoded = decode_row(line, columns, self.config.compression);
        trace!("row {row}: {} faults", decoded.faults.len());
        for fault in &decoded.faults {
            warn!("{fault} at row {row}");
        }

        let written = self.sink.write_row(row, &decoded.pixels);
        self.track(written)?;

        self.faults
            .extend(decoded.faults.iter().cloned().map(|f| (row, f)));
        self.state = if row < rows {
            SessionState::DecodingRows { row: row + 1 }
        } else {
            SessionState::Done
        };
        Ok(decoded.faults)
    }

    /// Finishes the sink and returns the report together with the sink
    ///
    /// # Errors
    ///
    /// This function errors if rows are still pending or if the sink cannot be finished
    pub fn finish(mut self) -> Result<(DecodeReport, S), Error> {
        if self.state != SessionState::Done {
            return Err(self.out_of_order("finish"));
        }
        let finished = self.sink.finish();
        self.track(finished)?;
        let flushed = self.lines.flush_tee().map_err(Error::from);
        self.track(flushed)?;
        let Some(header) = self.header.take() else {
            return Err(self.out_of_order("finish"));
        };
        let report = DecodeReport {
            header,
            faults: self.faults,
        };
        info!(
            "decoded {}x{} capture with {} row faults",
            report.header.columns,
            report.header.rows,
            report.faults.len()
        );
        Ok((report, self.sink))
    }
}

/// Decodes one capture from `input` into an anymap document on `output`
///
/// This is the single-shot entry point: color output, hex transport, the given body encoding.
///
/// # Errors
///
/// See [`Decoder::decode`]
pub fn decode(
    input: impl BufRead,
    output: impl Write,
    compression: config::Compression,
) -> Result<DecodeReport, Error> {
    let config = DecodeConfig::builder().compression(compression).build();
    let decoder = Decoder::new(config)?;
    decoder.decode(&mut LineReader::new(input), output)
}

/// A decoded screen dump held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenDump {
    report: DecodeReport,
    bitmap: BitMap,
}

impl ScreenDump {
    /// Decodes the next capture in `lines`, calling `progress` with `(row, rows)` after each row
    ///
    /// # Errors
    ///
    /// See [`Decoder::decode`]
    pub fn decode_next<R: BufRead>(
        decoder: &Decoder,
        lines: &mut LineReader<R>,
        progress: impl FnMut(usize, usize),
    ) -> Result<Self, Error> {
        let mut bitmap = BitMap::empty(0, 0);
        let report = decoder.decode_with_progress(lines, &mut bitmap, progress)?;
        Ok(Self { report, bitmap })
    }

    /// Tries to read a [`Self`] from a buffer
    ///
    /// # Errors
    ///
    /// This function will error if the config is unsupported or the capture cannot be decoded.
    /// See [`Decoder::decode`]
    pub fn from_reader(r: impl BufRead, config: &DecodeConfig) -> Result<Self> {
        let decoder = Decoder::new(*config)?;
        let mut lines = LineReader::new(r);
        Self::decode_next(&decoder, &mut lines, |_, _| {}).context("decode screen dump")
    }

    /// Tries to read [`Self`] from a provided file path
    ///
    /// # Errors
    ///
    /// This function will error if the file cannot be opened or if the file contains invalid data.
    /// See [`Self::from_reader`] for potential errors
    #[instrument(skip_all)]
    pub fn from_file<P: AsRef<Path>>(
        filename: P,
        config: &DecodeConfig,
    ) -> Result<Self> {
        let file = File::open(&filename)
            .with_context(|| format!("open {}", filename.as_ref().display()))?;
        Self::from_reader(BufReader::new(file), config)
    }

    /// Returns the capture header
    #[must_use]
    pub const fn header(&self) -> &CaptureHeader {
        self.report.header()
    }

    /// Returns the decode report
    #[must_use]
    pub const fn report(&self) -> &DecodeReport {
        &self.report
    }

    /// Returns the decoded pixel indexes
    #[must_use]
    pub const fn bitmap(&self) -> &BitMap {
        &self.bitmap
    }

    /// Returns the image width
    #[must_use]
    pub const fn width(&self) -> usize {
        self.bitmap.width()
    }

    /// Returns the image height
    #[must_use]
    pub const fn height(&self) -> usize {
        self.bitmap.height()
    }

    /// Writes the image as an anymap document through the given palette
    ///
    /// # Errors
    ///
    /// This function errors if `output` cannot be written
    pub fn write_pnm(&self, output: impl Write, palette: PaletteMode) -> Result<(), Error> {
        let mut writer = PnmWriter::new(output);
        writer.begin(self.header(), palette)?;
        for (y, row) in self.bitmap.rows().enumerate() {
            writer.write_row(y + 1, row)?;
        }
        writer.finish()
    }

    /// Returns an iterator over the displayed colors of the pixels, row by row
    pub fn as_rgb_iter(&self, palette: PaletteMode) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.bitmap
            .pixel_indices()
            .iter()
            .map(move |p| p.display_rgb(palette))
    }
}
