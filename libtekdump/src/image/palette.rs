use std::fmt::Display;

use crate::{image::config::PaletteMode, Error};

/// A 3-bit screen pixel: an index into the scope's 8-entry colormap
///
/// A [`Pixel`] always holds a value in `0..=7`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pixel(u8);

impl Pixel {
    /// The background pixel
    pub const BACKGROUND: Self = Self(0);

    /// Builds a [`Pixel`] from the low three bits of `bits`
    #[must_use]
    pub const fn from_low_bits(bits: u8) -> Self {
        Self(bits & 0x7)
    }

    /// Returns the colormap index
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Returns the color of this pixel in the full-color palette
    #[must_use]
    pub const fn rgb(self) -> [u8; 3] {
        COLOR_MAP[self.0 as usize]
    }

    /// Returns the PBM bit of this pixel in the monochrome palette (1 is ink)
    #[must_use]
    pub const fn mono_bit(self) -> u8 {
        BW_MAP[self.0 as usize]
    }

    /// Returns the color this pixel is displayed with in the given palette mode
    ///
    /// Monochrome pixels come out as black ink on white paper.
    #[must_use]
    pub const fn display_rgb(self, mode: PaletteMode) -> [u8; 3] {
        match mode {
            PaletteMode::Color => self.rgb(),
            PaletteMode::Monochrome => {
                if self.mono_bit() == 1 {
                    [0, 0, 0]
                } else {
                    [255, 255, 255]
                }
            }
        }
    }
}

impl TryFrom<u8> for Pixel {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value <= 7 {
            Ok(Self(value))
        } else {
            Err(Error::PixelOutOfRange(value))
        }
    }
}

impl From<Pixel> for u8 {
    fn from(value: Pixel) -> Self {
        value.0
    }
}

impl Display for Pixel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Default colors of the 11801A screen, tweaked by hand
pub const COLOR_MAP: [[u8; 3]; 8] = [
    // black, background
    [0, 0, 0],
    // trace color 2
    [255, 255, 200],
    // trace color 1 and misc text
    [255, 130, 130],
    // green, trace color 3
    [0, 255, 0],
    // magenta, trace color 4
    [255, 0, 255],
    // cyan, window trace
    [0, 255, 255],
    // grey, graticules and selectors
    [140, 140, 140],
    // red, cursors and measurement zones
    [255, 0, 0],
];

/// Black-on-white reduction of [`COLOR_MAP`] for documents
///
/// Everything but the background becomes ink. Settings text at the bottom of the screen is often
/// illegible this way but the traces come out fine.
pub const BW_MAP: [u8; 8] = [0, 1, 1, 1, 1, 1, 1, 1];
