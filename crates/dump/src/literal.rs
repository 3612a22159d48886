//! Rendering of byte buffers as pasteable Rust array literals.

use crate::hexdump::push_hex;

/// Bytes emitted per literal line.
pub const BYTES_PER_LITERAL_LINE: usize = 16;

const LITERAL_INDENT: &str = "       ";

/// Renders `data` as a `let` binding named `name`.
///
/// ```
/// let text = dump::render_literal("wbuf1", b"AB");
/// assert_eq!(text, "let wbuf1: &[u8] = &[\n        0x41, 0x42,\n];\n\n");
/// ```
pub fn render_literal(name: &str, data: &[u8]) -> String {
    let lines = data.len().div_ceil(BYTES_PER_LITERAL_LINE);
    let mut out = String::with_capacity(32 + name.len() + lines * (LITERAL_INDENT.len() + 97));

    out.push_str("let ");
    out.push_str(name);
    out.push_str(": &[u8] = &[\n");

    for chunk in data.chunks(BYTES_PER_LITERAL_LINE) {
        out.push_str(LITERAL_INDENT);
        for &byte in chunk {
            out.push_str(" 0x");
            push_hex(&mut out, byte);
            out.push(',');
        }
        out.push('\n');
    }

    out.push_str("];\n\n");
    out
}
