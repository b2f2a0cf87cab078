use libtekdump::{
    Compression, DecodeConfig, Decoder, LineReader, Outcome, PaletteMode, Transport,
};
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::PathBuf,
    process::ExitCode,
};
use tekdump::{
    dump_series, dump_to_file, dump_to_writer, exit_status, worst, HashMarks, OpenLine, OutputType,
};
use tracing::{error, info, warn, Level};

use anyhow::{bail, Context, Result};
use clap::Parser;

#[cfg(not(debug_assertions))]
const DEFAULT_DEBUG_LEVEL: u8 = 1;
#[cfg(debug_assertions)]
const DEFAULT_DEBUG_LEVEL: u8 = 99;

/// Convert screen dump images from a Tektronix 11801 scope to useful formats
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Turn debugging information on
    #[arg(short, long, default_value_t = DEFAULT_DEBUG_LEVEL, action = clap::ArgAction::Count)]
    verbosity: u8,

    /// The screen dump to read; `-` or nothing for stdin. A serial device that is already
    /// configured may be given as well
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// The output file name (single capture mode, defaults to stdout)
    #[arg(short, long, conflicts_with = "prefix")]
    output: Option<PathBuf>,

    /// Decode every capture in the input into numbered files `<PREFIX><n>.<type>`
    #[arg(short, long)]
    prefix: Option<String>,

    /// Body data is uncompressed
    #[arg(short = 'U', long)]
    uncompressed: bool,

    /// Body data is binary
    #[arg(short = 'B', long)]
    binary: bool,

    /// Map colors to monochrome
    #[arg(short, long)]
    monochrome: bool,

    /// Output image type
    #[arg(short = 't', long = "type", value_enum, default_value_t)]
    output_type: OutputType,

    /// Copy all raw input to this file
    #[arg(short = 'x', long)]
    raw: Option<PathBuf>,

    /// Print 50 hash marks per image to stderr while decoding
    #[arg(long)]
    progress: bool,
}

impl Cli {
    fn config(&self) -> DecodeConfig {
        DecodeConfig::builder()
            .compression(if self.uncompressed {
                Compression::Uncompressed
            } else {
                Compression::Compressed
            })
            .transport(if self.binary {
                Transport::Binary
            } else {
                Transport::Hex
            })
            .palette(if self.monochrome {
                PaletteMode::Monochrome
            } else {
                PaletteMode::Color
            })
            .build()
    }

    fn input(&self) -> Result<LineReader<Box<dyn BufRead>>> {
        let input: Box<dyn BufRead> = match &self.file {
            None => Box::new(io::stdin().lock()),
            Some(path) if path.as_os_str() == "-" => Box::new(io::stdin().lock()),
            Some(path) => Box::new(BufReader::new(
                File::open(path).with_context(|| format!("open {}", path.display()))?,
            )),
        };
        let mut lines = LineReader::new(input);
        if let Some(raw) = &self.raw {
            let raw =
                File::create(raw).with_context(|| format!("create raw file {}", raw.display()))?;
            lines = lines.with_tee(raw);
        }
        Ok(lines)
    }
}

fn run(cli: &Cli, open_line: OpenLine) -> Result<Outcome> {
    let decoder = Decoder::new(cli.config())?;
    let mut lines = cli.input()?;
    let mut marks = HashMarks::new(io::stderr()).with_open_line(open_line);
    let mut progress = |row, rows| {
        if cli.progress {
            marks.update(row, rows);
        }
    };

    if let Some(prefix) = &cli.prefix {
        let written = dump_series(&decoder, &mut lines, prefix, cli.output_type, &mut progress)?;
        if written.is_empty() {
            bail!("no screen dump found in input");
        }
        let mut outcome = Outcome::Clean;
        for (output_name, report) in &written {
            if report.outcome() == Outcome::Degraded {
                warn!(
                    "{} written with {} row errors",
                    output_name.display(),
                    report.faults().len()
                );
            }
            outcome = worst(outcome, report.outcome());
        }
        info!("done writing {} files", written.len());
        return Ok(outcome);
    }

    let report = match &cli.output {
        Some(output) => dump_to_file(&decoder, &mut lines, output, cli.output_type, &mut progress)?,
        None => {
            if cli.output_type != OutputType::Ppm {
                bail!("--type {:?} needs an --output file", cli.output_type);
            }
            dump_to_writer(&decoder, &mut lines, io::stdout().lock(), &mut progress)?
        }
    };
    let header = report.header();
    info!(
        "{} {} decoded {}x{}",
        header.date,
        header.time.as_deref().unwrap_or_default(),
        header.columns,
        header.rows
    );
    Ok(report.outcome())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let open_line = OpenLine::default();
    let log_open_line = open_line.clone();
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(move || {
            let mut stderr = io::stderr();
            log_open_line.close(&mut stderr);
            stderr
        })
        .with_file(true)
        .with_line_number(true)
        .init();

    let result = run(&cli, open_line);
    if let Err(e) = &result {
        error!("{e:#}");
    }
    ExitCode::from(exit_status(&result))
}
