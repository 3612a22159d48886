//! Aligned hex/ASCII rendering of byte buffers.

use crate::layout::GROUP_SIZE;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Translation table mapping every byte to the character shown in the ASCII
/// gutter: printable ASCII (`0x20..=0x7E`) maps to itself, everything else to
/// `.`.
pub const PRINTABLE: [u8; 256] = build_printable_table();

const fn build_printable_table() -> [u8; 256] {
    let mut table = [b'.'; 256];
    let mut byte = 0x20;
    while byte < 0x7F {
        table[byte] = byte as u8;
        byte += 1;
    }
    table
}

/// Returns the gutter character for `byte`.
#[inline]
pub const fn printable(byte: u8) -> char {
    PRINTABLE[byte as usize] as char
}

/// Appends the two upper-case hex digits of `byte` to `out`.
#[inline]
pub fn push_hex(out: &mut String, byte: u8) {
    out.push(HEX_DIGITS[usize::from(byte >> 4)] as char);
    out.push(HEX_DIGITS[usize::from(byte & 0x0F)] as char);
}

/// Renders one dump line for `chunk`, padded to `per_line` columns.
///
/// Blank columns follow the same grouping rule as filled ones, so the ` | `
/// gutter lands in the same column for every line of a dump.
pub fn format_line(prefix: &str, chunk: &[u8], per_line: usize) -> String {
    debug_assert!(chunk.len() <= per_line);

    let mut line = String::with_capacity(prefix.len() + 4 * per_line + per_line / GROUP_SIZE + 4);
    line.push_str(prefix);
    line.push(' ');

    for column in 0..per_line {
        match chunk.get(column) {
            Some(&byte) => push_hex(&mut line, byte),
            None => line.push_str("  "),
        }
        line.push(' ');
        if column % GROUP_SIZE == GROUP_SIZE - 1 && column + 1 != per_line {
            line.push(' ');
        }
    }

    line.push_str(" | ");
    line.extend(chunk.iter().map(|&byte| printable(byte)));
    line
}

/// Iterator over the lines of a hex dump.
///
/// Produces nothing for an empty buffer.
#[derive(Clone, Debug)]
pub struct HexDumpLines<'a> {
    prefix: &'a str,
    chunks: std::slice::Chunks<'a, u8>,
    per_line: usize,
}

impl<'a> HexDumpLines<'a> {
    /// Splits `data` into lines of `per_line` byte groups each.
    ///
    /// # Panics
    ///
    /// Panics if `per_line` is zero.
    pub fn new(prefix: &'a str, data: &'a [u8], per_line: usize) -> Self {
        assert!(per_line > 0, "a hex dump line needs at least one column");
        Self {
            prefix,
            chunks: data.chunks(per_line),
            per_line,
        }
    }
}

impl Iterator for HexDumpLines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.chunks
            .next()
            .map(|chunk| format_line(self.prefix, chunk, self.per_line))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for HexDumpLines<'_> {}
