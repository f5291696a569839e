//! Hex dumps for rejected frames.

use std::fmt::Write;

const BYTES_PER_LINE: usize = 32;

/// Render `data` as space-prefixed uppercase hex, 32 bytes per line.
///
/// Every line ends with a newline; empty input renders as an empty string.
pub fn hex_dump(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3 + data.len() / BYTES_PER_LINE + 1);
    for line in data.chunks(BYTES_PER_LINE) {
        for byte in line {
            let _ = write!(out, " {}", hex::encode_upper([*byte]));
        }
        out.push('\n');
    }
    out
}
