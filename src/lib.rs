#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # conntrace
//!
//! Transparent tracing for bidirectional byte connections. Wrap any
//! [`Connection`] in a [`TracedConnection`] and every read, write, close,
//! address query and deadline change is recorded, with timestamps,
//! arguments, results and durations, to one or more sinks. Payloads are
//! rendered as aligned hex dumps or as Rust byte-array literals ready to be
//! pasted into a test fixture.
//!
//! The workspace is split into two crates re-exported here:
//!
//! - [`dump`] renders call-event lines and payloads into a [`TraceSink`].
//! - [`conn`] provides the [`Connection`] trait, the [`TracedConnection`]
//!   decorator and the [`ConnectionRegistry`] that numbers connections.
//!
//! # Features
//!
//! - `tracing` (default): lifecycle diagnostics through the `tracing` crate.
//! - `serde`: `Serialize`/`Deserialize` for [`SinkOptions`] and [`RenderMode`].
//!
//! # Examples
//!
//! ```
//! use std::net::{TcpListener, TcpStream};
//! use conntrace::{RenderMode, SinkOptions, TracedConnection};
//!
//! let listener = TcpListener::bind("127.0.0.1:0")?;
//! let traced = TracedConnection::new(TcpStream::connect(listener.local_addr()?)?);
//! let (_server, _) = listener.accept()?;
//!
//! let hex = traced.attach_writer(Vec::new(), SinkOptions::file());
//! let literal = traced.attach_writer(
//!     Vec::new(),
//!     SinkOptions::file().with_mode(RenderMode::SourceLiteral),
//! );
//!
//! traced.write(b"\x00\x01hello")?;
//! assert_eq!(hex.prefix(), literal.prefix());
//! # Ok::<(), std::io::Error>(())
//! ```

pub use conn;
pub use dump;

pub use conn::{
    Connection, ConnectionRegistry, DynSink, SinkHandle, TracedConnection, instance_prefix,
    timeout_until,
};
pub use dump::{
    HexDumpLines, OptionsError, RenderMode, SinkError, SinkOptions, TimeFormat, TraceSink,
    WriterOwnership, bytes_per_line, render_literal,
};
