/// Returns the value of a single ASCII hex digit
const fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decodes two ASCII hex characters into a byte
///
/// Returns [`None`] if either character is not a hex digit.
#[must_use]
pub const fn decode_pair(hi: u8, lo: u8) -> Option<u8> {
    match (nibble(hi), nibble(lo)) {
        (Some(hi), Some(lo)) => Some(hi << 4 | lo),
        _ => None,
    }
}

/// A hex pair that could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BadPair {
    pub position: usize,
    pub found: Vec<u8>,
}

/// Cursor over an encoded line, yielding one byte per hex pair
pub(crate) struct HexCursor<'a> {
    line: &'a [u8],
    pos: usize,
}

impl<'a> HexCursor<'a> {
    pub(crate) const fn new(line: &'a [u8]) -> Self {
        Self { line, pos: 0 }
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.pos >= self.line.len()
    }

    /// Decodes the next pair, always advancing past it (even when it is bad)
    pub(crate) fn next_byte(&mut self) -> Result<u8, BadPair> {
        let position = self.pos;
        let end = (position + 2).min(self.line.len());
        let found = &self.line[position.min(end)..end];
        self.pos = position + 2;
        match found {
            [hi, lo] => decode_pair(*hi, *lo).ok_or_else(|| BadPair {
                position,
                found: found.to_vec(),
            }),
            _ => Err(BadPair {
                position,
                found: found.to_vec(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_both_cases() {
        assert_eq!(decode_pair(b'4', b'1'), Some(0x41));
        assert_eq!(decode_pair(b'c', b'7'), Some(0xC7));
        assert_eq!(decode_pair(b'F', b'f'), Some(0xFF));
        assert_eq!(decode_pair(b'0', b'0'), Some(0));
    }

    #[test]
    fn rejects_non_hex() {
        assert_eq!(decode_pair(b'g', b'0'), None);
        assert_eq!(decode_pair(b'0', b' '), None);
        assert_eq!(decode_pair(b'x', b'z'), None);
    }

    #[test]
    fn cursor_reports_bad_and_truncated_pairs() {
        let mut cursor = HexCursor::new(b"41zz7");
        assert_eq!(cursor.next_byte(), Ok(0x41));
        assert_eq!(
            cursor.next_byte(),
            Err(BadPair {
                position: 2,
                found: b"zz".to_vec()
            })
        );
        assert_eq!(
            cursor.next_byte(),
            Err(BadPair {
                position: 4,
                found: b"7".to_vec()
            })
        );
        assert!(cursor.is_empty());
        assert_eq!(
            cursor.next_byte(),
            Err(BadPair {
                position: 6,
                found: vec![]
            })
        );
    }
}
