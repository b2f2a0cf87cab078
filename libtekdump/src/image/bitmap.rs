use crate::{
    image::{config::PaletteMode, header::CaptureHeader, palette::Pixel, RowSink, FILL_PIXEL},
    Error,
};

/// Decoded pixel indexes of a screen dump
///
/// Always holds exactly `width * height` pixels; [`BitMap::empty`] is the only constructor.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BitMap {
    /// The width of the image
    width: usize,
    /// The height of the image
    height: usize,
    /// Image pixels
    pixels: Vec<Pixel>,
}

impl BitMap {
    /// Creates a new [`BitMap`] filled with background pixels
    #[must_use]
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![FILL_PIXEL; width * height],
        }
    }

    /// Returns the width of the image
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Returns the height of the image
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Returns the pixel indexes of the image
    #[must_use]
    pub fn pixel_indices(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Returns the pixel at `(x, y)`, if it is inside the image
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> Option<Pixel> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    /// Returns an iterator over the rows of the image, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Pixel]> + '_ {
        // chunks_exact panics on 0
        self.pixels.chunks_exact(self.width.max(1))
    }

    // get an entire row of the bitmap
    pub(crate) fn get_row_mut(&mut self, y: usize) -> Option<&mut [Pixel]> {
        if y < self.height {
            let start_index = y * self.width;
            let end_index = start_index + self.width;
            Some(&mut self.pixels[start_index..end_index])
        } else {
            None
        }
    }
}

impl RowSink for BitMap {
    fn begin(&mut self, header: &CaptureHeader, _palette: PaletteMode) -> Result<(), Error> {
        *self = Self::empty(header.columns, header.rows);
        Ok(())
    }

    fn write_row(&mut self, row: usize, pixels: &[Pixel]) -> Result<(), Error> {
        // rows are 1-based
        if let Some(dst) = row.checked_sub(1).and_then(|y| self.get_row_mut(y)) {
            let n = dst.len().min(pixels.len());
            dst[..n].copy_from_slice(&pixels[..n]);
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(columns: usize, rows: usize) -> CaptureHeader {
        CaptureHeader::builder()
            .date("23-MAY-97".to_string())
            .columns(columns)
            .rows(rows)
            .build()
    }

    #[test]
    fn lookups_outside_the_image_are_none() {
        let bitmap = BitMap::empty(4, 2);
        assert_eq!(bitmap.pixel(3, 1), Some(FILL_PIXEL));
        assert_eq!(bitmap.pixel(4, 0), None);
        assert_eq!(bitmap.pixel(0, 2), None);
        assert_eq!(BitMap::empty(0, 0).pixel(0, 0), None);
    }

    #[test]
    fn rows_outside_the_image_are_ignored() -> Result<(), Error> {
        let mut bitmap = BitMap::empty(0, 0);
        bitmap.begin(&header(4, 2), PaletteMode::Color)?;
        let ink = [Pixel::from_low_bits(7); 6];
        bitmap.write_row(0, &ink)?;
        bitmap.write_row(2, &ink)?;
        bitmap.write_row(3, &ink)?;
        assert_eq!(bitmap.pixel_indices().len(), 8);
        assert_eq!(bitmap.rows().next(), Some(&[FILL_PIXEL; 4][..]));
        assert_eq!(bitmap.pixel(3, 1), Some(Pixel::from_low_bits(7)));
        Ok(())
    }
}
