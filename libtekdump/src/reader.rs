use std::io::{self, BufRead, Write};

use tracing::{trace, warn};

use crate::MAX_LINE_LEN;

/// Line supplier for screen dump streams
///
/// Reads whole lines from any [`BufRead`] (a file, stdin or an already configured serial
/// device). Lines end at either CR or LF, control characters are dropped and blank lines are
/// skipped, so the scope's CRLF line endings and stray NULs never reach the decoder.
///
/// Every byte read can be mirrored verbatim to a raw tee for diagnostic captures.
pub struct LineReader<R> {
    inner: R,
    tee: Option<Box<dyn Write>>,
    line: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    /// Creates a new [`LineReader`] without a raw tee
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            tee: None,
            line: Vec::new(),
        }
    }

    /// Mirrors every consumed byte to `tee`
    #[must_use]
    pub fn with_tee(mut self, tee: impl Write + 'static) -> Self {
        self.tee = Some(Box::new(tee));
        self
    }

    /// Reads the next non-blank line
    ///
    /// Returns `Ok(None)` at end of input. A final line without a terminator is still returned.
    ///
    /// # Errors
    ///
    /// This function errors if reading from the underlying stream or writing to the tee fails
    pub fn next_line(&mut self) -> io::Result<Option<&[u8]>> {
        self.line.clear();
        let mut truncated = false;
        loop {
            let buf = match self.inner.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if buf.is_empty() {
                break;
            }

            let mut consumed = 0;
            let mut complete = false;
            for &c in buf {
                consumed += 1;
                if (c == b'\n' || c == b'\r') && !self.line.is_empty() {
                    complete = true;
                    break;
                }
                if c.is_ascii_control() {
                    continue;
                }
                if self.line.len() < MAX_LINE_LEN {
                    self.line.push(c);
                } else {
                    truncated = true;
                }
            }

            if let Some(tee) = self.tee.as_mut() {
                tee.write_all(&buf[..consumed])?;
            }
            self.inner.consume(consumed);
            if complete {
                break;
            }
        }

        if truncated {
            warn!("line longer than {MAX_LINE_LEN} bytes, discarding the tail");
        }
        if self.line.is_empty() {
            return Ok(None);
        }
        trace!("read line of {} bytes", self.line.len());
        Ok(Some(self.line.as_slice()))
    }

    /// Flushes the raw tee, if any
    ///
    /// # Errors
    ///
    /// This function errors if the tee cannot be flushed
    pub fn flush_tee(&mut self) -> io::Result<()> {
        if let Some(tee) = self.tee.as_mut() {
            tee.flush()?;
        }
        Ok(())
    }

    /// Consumes the reader, returning the underlying stream
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn collect_lines(input: &[u8]) -> Vec<Vec<u8>> {
        let mut reader = LineReader::new(input);
        let mut lines = vec![];
        while let Some(line) = reader.next_line().unwrap() {
            lines.push(line.to_vec());
        }
        lines
    }

    #[test]
    fn splits_on_cr_and_lf_and_skips_blank_lines() {
        let lines = collect_lines(b"first\r\n\r\nsecond\rthird\n\n");
        assert_eq!(lines, vec![b"first".to_vec(), b"second".to_vec(), b"third".to_vec()]);
    }

    #[test]
    fn strips_control_characters() {
        let lines = collect_lines(b"\x00ab\x07cd\x1b\n");
        assert_eq!(lines, vec![b"abcd".to_vec()]);
    }

    #[test]
    fn returns_unterminated_final_line() {
        let lines = collect_lines(b"one\ntwo");
        assert_eq!(lines, vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[test]
    fn empty_input_is_end_of_input() {
        assert!(collect_lines(b"\r\n\n").is_empty());
    }

    #[test]
    fn overlong_line_loses_its_tail() {
        let mut input = vec![b'a'; MAX_LINE_LEN + 10];
        input.extend_from_slice(b"\nnext\n");
        let lines = collect_lines(&input);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), MAX_LINE_LEN);
        assert!(lines[0].iter().all(|&c| c == b'a'));
        assert_eq!(lines[1], b"next");
    }

    #[test]
    fn tee_mirrors_consumed_bytes() {
        let tee = SharedBuf::default();
        let mut reader = LineReader::new(&b"ab\r\n\x00cd\nrest"[..]).with_tee(tee.clone());
        assert_eq!(reader.next_line().unwrap(), Some(&b"ab"[..]));
        assert_eq!(reader.next_line().unwrap(), Some(&b"cd"[..]));
        // the LF after "ab\r" is consumed while looking for "cd"
        assert_eq!(tee.0.borrow().as_slice(), b"ab\r\n\x00cd\n");
    }
}
