/// Demonstrates how to create a png file from a [`ScreenDump`]
/// using the [`image`] crate
///
/// Usage: `cargo run --example dump_to_png -- <screen dump> <png>`
use image::{codecs::png::PngEncoder, ImageEncoder};
use libtekdump::{DecodeConfig, PaletteMode, ScreenDump};
use std::fs::File;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(input), Some(output)) = (args.next(), args.next()) else {
        anyhow::bail!("usage: dump_to_png <screen dump> <png>");
    };
    let dump = ScreenDump::from_file(&input, &DecodeConfig::default())?;
    for (row, fault) in dump.report().faults() {
        eprintln!("row {row}: {fault}");
    }

    let as_rgb: Vec<_> = dump.as_rgb_iter(PaletteMode::Color).flatten().collect();

    let output = File::options()
        .create(true)
        .write(true)
        .truncate(true)
        .open(output)?;

    let encoder = PngEncoder::new(output);
    encoder.write_image(
        &as_rgb,
        u32::try_from(dump.width())?,
        u32::try_from(dump.height())?,
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(())
}
