use bon::Builder;
use strum::Display;

/// Settings for a decode session
///
/// Built once and handed to [`crate::Decoder::new`]; a session never changes them.
#[derive(Builder, Default, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct DecodeConfig {
    /// Whether the body lines are run-length compressed
    #[builder(default)]
    pub compression: Compression,
    /// How the body bytes are carried on the wire
    #[builder(default)]
    pub transport: Transport,
    /// The palette pixels are rendered through
    #[builder(default)]
    pub palette: PaletteMode,
}

/// Body line encoding
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Compression {
    /// Run-length instructions written as ASCII-hex pairs
    #[default]
    Compressed,
    /// One octal digit per pixel, at every other character
    Uncompressed,
}

/// Body transport
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Transport {
    /// Printable text lines
    #[default]
    Hex,
    /// Raw binary bytes after a NUL-terminated header (not supported)
    Binary,
}

/// Palette used to render pixels
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PaletteMode {
    /// The scope's screen colors, written as a PPM document
    #[default]
    Color,
    /// Black ink on white paper, written as a PBM document
    Monochrome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_compressed_hex_color() {
        let config = DecodeConfig::default();
        assert_eq!(config.compression, Compression::Compressed);
        assert_eq!(config.transport, Transport::Hex);
        assert_eq!(config.palette, PaletteMode::Color);
        assert_eq!(DecodeConfig::builder().build(), config);
    }

    #[test]
    fn modes_display_lowercase() {
        assert_eq!(Compression::Uncompressed.to_string(), "uncompressed");
        assert_eq!(Transport::Binary.to_string(), "binary");
        assert_eq!(PaletteMode::Monochrome.to_string(), "monochrome");
    }
}
