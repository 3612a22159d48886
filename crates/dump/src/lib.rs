#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! crates/dump/src/lib.rs
//!
//! # Overview
//!
//! `dump` renders the trace of a connection: one line per call event and,
//! for reads and writes, the bytes that crossed the connection. Output goes to
//! a [`TraceSink`], a thin wrapper around any [`std::io::Write`] destination
//! that carries the per-destination configuration from [`SinkOptions`].
//!
//! # Design
//!
//! Payloads are rendered in one of two [`RenderMode`]s:
//!
//! - [`RenderMode::HexDump`] prints upper-case hex byte groups followed by an
//!   ASCII gutter. The number of groups per line comes from
//!   [`bytes_per_line`], which keeps every line inside the configured width.
//! - [`RenderMode::SourceLiteral`] prints a `let wbufN: &[u8] = &[...];`
//!   binding that can be pasted straight into a test fixture. Call-event
//!   lines become `//` comments in this mode.
//!
//! # Invariants
//!
//! - Every line of one hex dump places the ` | ` gutter in the same column;
//!   blank padding columns follow the same grouping rule as filled ones.
//! - Line widths below 80 columns are clamped to 80 when a sink is built.
//! - The sent and received counters only ever increase.
//!
//! # Errors
//!
//! Sink methods never return errors. The first failure is stored as a
//! [`SinkError`] and silences the sink; callers inspect it through
//! [`TraceSink::error`]. Configuration parsing reports [`OptionsError`].
//!
//! # Examples
//!
//! ```
//! use dump::{RenderMode, SinkOptions, TraceSink};
//!
//! let options = SinkOptions::file().with_mode(RenderMode::SourceLiteral);
//! let mut sink = TraceSink::new(Vec::new(), "CONN[2]", options);
//! sink.write_received_bytes(&[0xDE, 0xAD]);
//!
//! let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
//! assert!(text.starts_with("let rbuf1: &[u8] = &[\n        0xDE, 0xAD,\n"));
//! ```

mod error;
mod hexdump;
mod layout;
mod literal;
mod mode;
mod options;
mod sink;
mod time_format;

pub use error::{OptionsError, SinkError};
pub use hexdump::{HexDumpLines, PRINTABLE, format_line, printable, push_hex};
pub use layout::{
    DEFAULT_LINE_WIDTH, GROUP_SIZE, MIN_BYTES_PER_LINE, MIN_LINE_WIDTH, budgeted_width,
    bytes_per_line,
};
pub use literal::{BYTES_PER_LITERAL_LINE, render_literal};
pub use mode::RenderMode;
pub use options::SinkOptions;
pub use sink::{Direction, TraceSink, WriterOwnership, open_error};
pub use time_format::{DEFAULT_TIME_FORMAT, TimeFormat};
