#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! crates/conn/src/lib.rs
//!
//! # Overview
//!
//! `conn` wraps any bidirectional byte connection in a [`TracedConnection`]
//! that records every operation performed on it. The wrapper implements the
//! same [`Connection`] contract as the value it wraps, so callers use it in
//! place of the wrapped value without other changes, and decorators stack.
//!
//! # Design
//!
//! - [`Connection`] is the contract: read, write, close, address queries
//!   and deadlines. Implementations are provided for [`std::net::TcpStream`]
//!   and, on Unix, [`std::os::unix::net::UnixStream`].
//! - Each traced connection draws an instance number from a
//!   [`ConnectionRegistry`] the first time it needs one; all of its sinks
//!   share the `CONN[n]` prefix.
//! - Sinks are [`dump::TraceSink`]s over boxed writers, held behind
//!   [`SinkHandle`]s so callers can inspect their sticky error and counters.
//! - Lifecycle diagnostics go through `tracing` under [`TARGET`] when the
//!   `tracing` feature is enabled.
//!
//! # Invariants
//!
//! - The wrapped connection's results are returned unchanged; sink failures
//!   never surface as connection errors.
//! - Lazy initialisation runs at most once per connection. A connection with
//!   no sinks gets exactly one quiet console sink.
//! - Every call produces a pre-call line before delegating and a post-call
//!   line after it, on every healthy sink, in attachment order.
//!
//! # Examples
//!
//! ```
//! use std::net::{TcpListener, TcpStream};
//! use conn::{RenderMode, SinkOptions, TracedConnection};
//!
//! let listener = TcpListener::bind("127.0.0.1:0")?;
//! let client = TracedConnection::new(TcpStream::connect(listener.local_addr()?)?);
//! let (server, _) = listener.accept()?;
//!
//! let sink = client.attach_writer(
//!     Vec::new(),
//!     SinkOptions::file().with_mode(RenderMode::SourceLiteral),
//! );
//! client.write(b"hello")?;
//! client.close()?;
//!
//! assert!(sink.is_closed());
//! drop(server);
//! # Ok::<(), std::io::Error>(())
//! ```

mod connection;
pub mod diagnostics;
mod handle;
mod registry;
mod traced;

pub use connection::{Connection, timeout_until};
pub use diagnostics::TARGET;
pub use handle::{DynSink, SinkHandle};
pub use registry::{ConnectionRegistry, instance_prefix};
pub use traced::TracedConnection;

pub use dump::{OptionsError, RenderMode, SinkError, SinkOptions, TimeFormat, WriterOwnership};
