use std::{
    fs::File,
    io::{BufRead, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::{Context, Result};
use image::{ImageFormat, RgbImage};
use libtekdump::{DecodeReport, Decoder, Error, LineReader, Outcome, ScreenDump, Stage};
use tracing::{debug, info, instrument};

/// The container a decoded screen dump is written as
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputType {
    /// Plain PPM, or plain PBM for monochrome dumps
    #[default]
    Ppm,
    /// PNG
    Png,
    /// GIF
    Gif,
    /// TIFF
    Tiff,
}

impl OutputType {
    /// The `image` format used for this type, [`None`] for anymaps
    #[must_use]
    pub const fn image_format(self) -> Option<ImageFormat> {
        match self {
            Self::Ppm => None,
            Self::Png => Some(ImageFormat::Png),
            Self::Gif => Some(ImageFormat::Gif),
            Self::Tiff => Some(ImageFormat::Tiff),
        }
    }

    /// File suffix for this type
    #[must_use]
    pub const fn suffix(self, monochrome: bool) -> &'static str {
        match self {
            Self::Ppm if monochrome => "pbm",
            Self::Ppm => "ppm",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
        }
    }
}

/// Tracks whether a line of hash marks is left open on the terminal
///
/// Log output written while marks are pending would land in the middle of the line, so the log
/// writer calls [`OpenLine::close`] first.
#[derive(Debug, Clone, Default)]
pub struct OpenLine(Arc<AtomicBool>);

impl OpenLine {
    /// Returns whether hash marks are pending on the current line
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Ends a pending line of hash marks on `out`
    pub fn close(&self, out: &mut impl Write) {
        if self.0.swap(false, Ordering::Relaxed) {
            let _ = out.write_all(b"\n");
        }
    }

    fn set(&self, open: bool) {
        self.0.store(open, Ordering::Relaxed);
    }
}

/// Hash-mark progress bar: 50 marks per image, then a newline
pub struct HashMarks<W: Write> {
    out: W,
    last: usize,
    open: OpenLine,
}

impl<W: Write> HashMarks<W> {
    /// Number of marks printed for a whole image
    pub const MARKS: usize = 50;

    /// Creates a new [`HashMarks`] printing to `out`
    pub fn new(out: W) -> Self {
        Self {
            out,
            last: 0,
            open: OpenLine::default(),
        }
    }

    /// Reports pending marks through `open`
    #[must_use]
    pub fn with_open_line(mut self, open: OpenLine) -> Self {
        self.open = open;
        self
    }

    /// Records that `row` of `rows` is done
    pub fn update(&mut self, row: usize, rows: usize) {
        let per = row * Self::MARKS / rows.max(1);
        // progress is cosmetic, a closed stderr must not stop a decode
        if per != self.last {
            let _ = self.out.write_all(b"#");
            self.open.set(true);
        }
        self.last = per;
        if row >= rows {
            let _ = self.out.write_all(b"\n");
            self.open.set(false);
            self.last = 0;
        }
        let _ = self.out.flush();
    }

    /// Consumes the progress bar, returning the underlying stream
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Exit status for a clean decode
pub const EXIT_CLEAN: u8 = 0;
/// Exit status for a capture decoded with row errors
pub const EXIT_DEGRADED: u8 = 2;
/// Exit status for a fatal error
pub const EXIT_FATAL: u8 = 1;

/// Maps the result of a run to the process exit status
#[must_use]
pub const fn exit_status<E>(result: &Result<Outcome, E>) -> u8 {
    match result {
        Ok(Outcome::Clean) => EXIT_CLEAN,
        Ok(Outcome::Degraded) => EXIT_DEGRADED,
        Err(_) => EXIT_FATAL,
    }
}

/// Returns the worse of two outcomes
#[must_use]
pub fn worst(a: Outcome, b: Outcome) -> Outcome {
    if a == Outcome::Clean {
        b
    } else {
        a
    }
}

/// Writes an in-memory screen dump to `output_name` in the given container
///
/// # Errors
///
/// This function errors if the file cannot be created or encoded
#[instrument(skip(dump))]
pub fn write_dump(
    dump: &ScreenDump,
    output_name: &Path,
    output_type: OutputType,
    monochrome: bool,
) -> Result<()> {
    let palette = if monochrome {
        libtekdump::PaletteMode::Monochrome
    } else {
        libtekdump::PaletteMode::Color
    };
    match output_type.image_format() {
        None => {
            let output = File::options()
                .create(true)
                .write(true)
                .truncate(true)
                .open(output_name)?;
            dump.write_pnm(output, palette)?;
        }
        Some(format) => {
            let as_rgb: Vec<u8> = dump.as_rgb_iter(palette).flatten().collect();
            let img = RgbImage::from_raw(
                u32::try_from(dump.width())?,
                u32::try_from(dump.height())?,
                as_rgb,
            )
            .context("rgb buffer does not match image size")?;
            img.save_with_format(output_name, format)?;
        }
    }
    info!("Successfully wrote image to {}", output_name.display());
    Ok(())
}

/// Decodes the next capture in `lines` and streams it out as an anymap document
///
/// # Errors
///
/// This function errors if the capture cannot be decoded or `output` cannot be written
#[instrument(skip_all)]
pub fn dump_to_writer<R: BufRead>(
    decoder: &Decoder,
    lines: &mut LineReader<R>,
    output: impl Write,
    progress: impl FnMut(usize, usize),
) -> Result<DecodeReport> {
    let sink = libtekdump::PnmWriter::new(output);
    let report = decoder.decode_with_progress(lines, sink, progress)?;
    Ok(report)
}

/// Decodes the next capture in `lines` into `output_name`
///
/// # Errors
///
/// This function errors if the capture cannot be decoded or the file cannot be written
#[instrument(skip(decoder, lines, progress))]
pub fn dump_to_file<R: BufRead>(
    decoder: &Decoder,
    lines: &mut LineReader<R>,
    output_name: &Path,
    output_type: OutputType,
    progress: impl FnMut(usize, usize),
) -> Result<DecodeReport> {
    let monochrome = decoder.config().palette == libtekdump::PaletteMode::Monochrome;
    if output_type.image_format().is_none() {
        let output = File::options()
            .create(true)
            .write(true)
            .truncate(true)
            .open(output_name)
            .with_context(|| format!("open {}", output_name.display()))?;
        let report = dump_to_writer(decoder, lines, output, progress)?;
        info!("Successfully wrote image to {}", output_name.display());
        return Ok(report);
    }
    let dump = ScreenDump::decode_next(decoder, lines, progress)?;
    write_dump(&dump, output_name, output_type, monochrome)?;
    Ok(dump.report().clone())
}

/// Decodes every capture in `lines` into numbered files `<prefix><n>.<suffix>`
///
/// Stops cleanly when the input ends where the next header would start.
///
/// # Errors
///
/// This function errors if a capture cannot be decoded or written
pub fn dump_series<R: BufRead>(
    decoder: &Decoder,
    lines: &mut LineReader<R>,
    prefix: &str,
    output_type: OutputType,
    mut progress: impl FnMut(usize, usize),
) -> Result<Vec<(PathBuf, DecodeReport)>> {
    let monochrome = decoder.config().palette == libtekdump::PaletteMode::Monochrome;
    let mut written = Vec::new();
    for dump_no in 0usize.. {
        let dump = match ScreenDump::decode_next(decoder, lines, &mut progress) {
            Ok(dump) => dump,
            Err(Error::UnexpectedEndOfInput {
                stage: Stage::Header,
            }) => {
                debug!("end of input after {dump_no} captures");
                break;
            }
            Err(e) => return Err(e).with_context(|| format!("decode capture {dump_no}")),
        };
        let output_name = PathBuf::from(format!(
            "{prefix}{dump_no}.{}",
            output_type.suffix(monochrome)
        ));
        let header = dump.header();
        info!(
            "{} {} writing file {}",
            header.date,
            header.time.as_deref().unwrap_or_default(),
            output_name.display()
        );
        write_dump(&dump, &output_name, output_type, monochrome)?;
        written.push((output_name, dump.report().clone()));
    }
    Ok(written)
}
