use std::fs::{self, File};

mod common;
use common::{small_capture, SMALL_PIXELS};
use image::{codecs::png::PngEncoder, ImageEncoder};
use libtekdump::{DecodeConfig, Decoder, LineReader, Outcome, PaletteMode, Pixel, ScreenDump};
use mktemp::Temp;

#[test]
fn screen_dump_from_file() -> anyhow::Result<()> {
    let tmp = Temp::new_file()?;
    fs::write(&tmp, small_capture())?;

    let dump = ScreenDump::from_file(&tmp, &DecodeConfig::default())?;
    assert_eq!((dump.width(), dump.height()), (8, 3));
    assert_eq!(dump.report().outcome(), Outcome::Clean);
    assert_eq!(
        dump.header().parsed_date().map(|d| d.to_string()).as_deref(),
        Some("1997-05-23")
    );

    let indexes: Vec<u8> = dump
        .bitmap()
        .pixel_indices()
        .iter()
        .map(|p| p.index())
        .collect();
    assert_eq!(indexes, SMALL_PIXELS.concat());
    assert_eq!(dump.bitmap().pixel(7, 1), Some(Pixel::try_from(7u8)?));
    assert_eq!(dump.bitmap().pixel(8, 1), None);
    Ok(())
}

#[test]
fn missing_file_is_an_error() {
    assert!(ScreenDump::from_file("does/not/exist.dump", &DecodeConfig::default()).is_err());
}

#[test]
fn rgb_iter_encodes_to_png() -> anyhow::Result<()> {
    let dump = ScreenDump::from_reader(small_capture().as_bytes(), &DecodeConfig::default())?;
    let as_rgb: Vec<u8> = dump.as_rgb_iter(PaletteMode::Color).flatten().collect();
    assert_eq!(as_rgb.len(), 8 * 3 * 3);

    let tmp_png = Temp::new_file()?;
    let output = File::options()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_png)?;
    let encoder = PngEncoder::new(output);
    encoder.write_image(
        &as_rgb,
        u32::try_from(dump.width())?,
        u32::try_from(dump.height())?,
        image::ExtendedColorType::Rgb8,
    )?;

    let img = image::load_from_memory_with_format(&fs::read(&tmp_png)?, image::ImageFormat::Png)?.to_rgb8();
    assert_eq!(img.get_pixel(3, 1).0, [255, 0, 0]);
    Ok(())
}

#[test]
fn monochrome_rgb_is_ink_on_paper() -> anyhow::Result<()> {
    let dump = ScreenDump::from_reader(small_capture().as_bytes(), &DecodeConfig::default())?;
    let mono: Vec<[u8; 3]> = dump.as_rgb_iter(PaletteMode::Monochrome).collect();
    assert_eq!(mono[0], [255, 255, 255]);
    assert_eq!(mono[8], [0, 0, 0]);
    Ok(())
}

#[test]
fn raw_tee_captures_the_stream() -> anyhow::Result<()> {
    let tmp_raw = Temp::new_file()?;
    let capture = small_capture();
    {
        let raw = File::create(&tmp_raw)?;
        let decoder = Decoder::new(DecodeConfig::default())?;
        let mut lines = LineReader::new(capture.as_bytes()).with_tee(raw);
        decoder.decode(&mut lines, std::io::sink())?;
    }
    let raw = fs::read_to_string(&tmp_raw)?;
    // the last CRLF's LF is only consumed by a following read
    assert_eq!(raw, capture.trim_end_matches('\n'));
    Ok(())
}

#[test]
fn bitmap_sink_keeps_rows_in_order() -> anyhow::Result<()> {
    let capture = small_capture();
    let decoder = Decoder::new(DecodeConfig::default())?;
    let mut lines = LineReader::new(capture.as_bytes());
    let mut progress = Vec::new();
    let mut bitmap = libtekdump::BitMap::empty(0, 0);
    decoder.decode_with_progress(&mut lines, &mut bitmap, |row, rows| progress.push((row, rows)))?;
    assert_eq!(progress, [(1, 3), (2, 3), (3, 3)]);
    assert_eq!(bitmap.pixel(0, 2), Some(Pixel::try_from(2u8)?));
    Ok(())
}

#[test]
fn in_memory_pnm_matches_streamed_pnm() -> anyhow::Result<()> {
    let capture = small_capture();
    for palette in [PaletteMode::Color, PaletteMode::Monochrome] {
        let config = DecodeConfig::builder().palette(palette).build();
        let decoder = Decoder::new(config)?;
        let mut streamed = Vec::new();
        decoder.decode(&mut LineReader::new(capture.as_bytes()), &mut streamed)?;

        let dump = ScreenDump::from_reader(capture.as_bytes(), &config)?;
        let mut written = Vec::new();
        dump.write_pnm(&mut written, palette)?;
        assert_eq!(streamed, written);
    }
    Ok(())
}
