//! Line-ending normalization for content comparison.
//!
//! Every `\r` that immediately precedes a `\n` is dropped. Nothing else is
//! touched: lone `\r` bytes survive, trailing terminators are never added or
//! stripped, and the input is treated as opaque bytes.

/// Return a normalized copy of `data`.
pub fn normalize(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut bytes = data.iter().copied().peekable();
    while let Some(byte) = bytes.next() {
        if byte == b'\r' && bytes.peek() == Some(&b'\n') {
            continue;
        }
        out.push(byte);
    }
    out
}

/// Normalize `data` in place, shrinking it when CRLF pairs are collapsed.
pub fn normalize_in_place(data: &mut Vec<u8>) {
    if !data.windows(2).any(|w| w == b"\r\n") {
        return;
    }

    let len = data.len();
    let mut write = 0;
    for read in 0..len {
        let byte = data[read];
        // `read + 1` is always ahead of `write`, so it still holds the original byte.
        if byte == b'\r' && data.get(read + 1) == Some(&b'\n') {
            continue;
        }
        data[write] = byte;
        write += 1;
    }
    data.truncate(write);
}
