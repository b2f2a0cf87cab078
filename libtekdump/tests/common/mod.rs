#![allow(dead_code)]

/// Info line the scope sends ahead of every dump
pub const INFO_LINE: &str = "TEK 11801A SCREEN date: 23-MAY-97 time: 10:41:07";

/// An 8x3 capture:
/// - row 1: `00 04`, background extended to four pairs
/// - row 2: `ff 7f`, red everywhere
/// - row 3: `5a 8c 41`, a mix of inline runs
pub const SMALL_ROWS: [&str; 3] = ["0004", "ff7f", "5a8c41"];

/// Pixel indexes of [`SMALL_ROWS`]
pub const SMALL_PIXELS: [[u8; 8]; 3] = [
    [0, 0, 0, 0, 0, 0, 0, 0],
    [7, 7, 7, 7, 7, 7, 7, 7],
    [2, 3, 4, 1, 4, 1, 1, 0],
];

/// Builds a capture the way the scope sends it, with CRLF line endings
pub fn capture(columns: usize, rows: usize, body: &[&str]) -> String {
    let mut out = format!("{INFO_LINE}\r\n{columns}\r\n{rows}\r\n");
    for line in body {
        out.push_str(line);
        out.push_str("\r\n");
    }
    out
}

pub fn small_capture() -> String {
    capture(8, 3, &SMALL_ROWS)
}
