use std::io::{BufWriter, Write};

use tracing::debug;

use crate::{
    image::{config::PaletteMode, header::CaptureHeader, palette::Pixel, RowSink},
    Error,
};

/// Maximum channel value written to color documents
pub const MAX_SAMPLE_VALUE: u8 = 255;

/// Streams decoded rows out as an ASCII anymap document
///
/// Color captures become plain PPM (`P3`) documents, monochrome ones plain PBM (`P1`).
pub struct PnmWriter<W: Write> {
    writer: BufWriter<W>,
    palette: PaletteMode,
}

impl<W: Write> PnmWriter<W> {
    /// Creates a new [`PnmWriter`] that writes to `writer`
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            palette: PaletteMode::default(),
        }
    }

    /// Consumes the writer, returning the underlying stream
    ///
    /// # Errors
    ///
    /// This function errors if buffered output cannot be flushed
    pub fn into_inner(self) -> Result<W, Error> {
        self.writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))
    }

    fn write_pixel(&mut self, p: Pixel) -> Result<(), Error> {
        match self.palette {
            PaletteMode::Monochrome => write!(self.writer, "{}", p.mono_bit())?,
            PaletteMode::Color => {
                let [r, g, b] = p.rgb();
                write!(self.writer, "{r} {g} {b} ")?;
            }
        }
        Ok(())
    }
}

impl<W: Write> RowSink for PnmWriter<W> {
    fn begin(&mut self, header: &CaptureHeader, palette: PaletteMode) -> Result<(), Error> {
        self.palette = palette;
        let (columns, rows) = (header.columns, header.rows);
        match palette {
            PaletteMode::Monochrome => write!(self.writer, "P1\n{columns} {rows}\n")?,
            PaletteMode::Color => {
                write!(self.writer, "P3\n{columns} {rows}\n{MAX_SAMPLE_VALUE}\n")?;
            }
        }
        debug!("wrote {palette} raster header for {columns}x{rows}");
        Ok(())
    }

    fn write_row(&mut self, _row: usize, pixels: &[Pixel]) -> Result<(), Error> {
        for &p in pixels {
            self.write_pixel(p)?;
        }
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(columns: usize, rows: usize) -> CaptureHeader {
        CaptureHeader::builder()
            .date("23-MAY-97".to_owned())
            .columns(columns)
            .rows(rows)
            .build()
    }

    fn render(palette: PaletteMode, pixels: &[u8]) -> String {
        let mut w = PnmWriter::new(Vec::new());
        let pixels: Vec<_> = pixels.iter().map(|&p| Pixel::from_low_bits(p)).collect();
        w.begin(&header(pixels.len(), 1), palette).unwrap();
        w.write_row(1, &pixels).unwrap();
        w.finish().unwrap();
        String::from_utf8(w.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn color_document_layout() {
        assert_eq!(
            render(PaletteMode::Color, &[0, 7]),
            "P3\n2 1\n255\n0 0 0 255 0 0 \n"
        );
    }

    #[test]
    fn monochrome_document_layout() {
        assert_eq!(
            render(PaletteMode::Monochrome, &[0, 1, 2, 3, 4, 5, 6, 7]),
            "P1\n8 1\n01111111\n"
        );
    }
}
