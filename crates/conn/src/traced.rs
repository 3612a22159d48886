//! crates/conn/src/traced.rs
//!
//! The tracing decorator. Every intercepted call follows the same steps:
//! initialise once, announce the call to every sink, delegate, time the
//! delegate, report the outcome to every sink, and return the wrapped
//! connection's result untouched.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, Once, OnceLock, PoisonError};
use std::time::{Instant, SystemTime};

use dump::{SinkOptions, TimeFormat, TraceSink, WriterOwnership, open_error};

use crate::connection::Connection;
use crate::diagnostics;
use crate::handle::{DynSink, SinkHandle};
use crate::registry::{ConnectionRegistry, instance_prefix};

/// Wraps a [`Connection`] and traces every call to the attached sinks.
///
/// Sinks are visited in attachment order. Each fan-out phase holds the sink
/// list lock, so the lines of one phase never interleave with another
/// call's; the wrapped connection is never invoked under that lock.
///
/// # Examples
///
/// ```
/// use std::net::{TcpListener, TcpStream};
/// use conn::{SinkOptions, TracedConnection};
///
/// let listener = TcpListener::bind("127.0.0.1:0")?;
/// let stream = TcpStream::connect(listener.local_addr()?)?;
///
/// let traced = TracedConnection::new(stream);
/// let sink = traced.attach_writer(Vec::new(), SinkOptions::file());
/// traced.write(b"ping")?;
///
/// assert_eq!(sink.sent_dumps(), 1);
/// assert!(!sink.has_error());
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct TracedConnection<C> {
    inner: C,
    sinks: Mutex<Vec<SinkHandle>>,
    registry: Arc<ConnectionRegistry>,
    instance: OnceLock<u64>,
    init: Once,
}

impl<C> TracedConnection<C> {
    /// Wraps `inner`, numbering it from the process-wide registry.
    pub fn new(inner: C) -> Self {
        Self::with_registry(inner, ConnectionRegistry::global())
    }

    /// Wraps `inner`, numbering it from `registry`.
    pub fn with_registry(inner: C, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            inner,
            sinks: Mutex::new(Vec::new()),
            registry,
            instance: OnceLock::new(),
            init: Once::new(),
        }
    }

    /// Returns a reference to the wrapped connection.
    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    /// Consumes the decorator and returns the wrapped connection.
    ///
    /// Sinks are dropped without being closed.
    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Instance number, once one has been drawn.
    pub fn instance(&self) -> Option<u64> {
        self.instance.get().copied()
    }

    /// Reports whether lazy initialisation has run.
    pub fn is_initialized(&self) -> bool {
        self.init.is_completed()
    }

    /// Handles to the attached sinks, in attachment order.
    pub fn sinks(&self) -> Vec<SinkHandle> {
        self.lock_sinks().clone()
    }

    /// Attaches a quiet hex-dump sink writing to stderr.
    pub fn attach_console(&self) -> SinkHandle {
        self.attach_console_with(SinkOptions::console())
    }

    /// Attaches a stderr sink with explicit options.
    ///
    /// Closing the connection never closes stderr.
    pub fn attach_console_with(&self, options: SinkOptions) -> SinkHandle {
        self.attach_shared_writer(io::stderr(), options)
    }

    /// Attaches a verbose hex-dump sink appending to the file at `path`.
    pub fn attach_file(&self, path: impl AsRef<Path>) -> SinkHandle {
        self.attach_file_with(path, SinkOptions::file())
    }

    /// Attaches a sink appending to the file at `path`, creating it if needed.
    ///
    /// When the file cannot be opened the sink is still attached, reports
    /// the open error through [`SinkHandle::error_message`], and writes
    /// nothing. The connection itself is unaffected.
    pub fn attach_file_with(&self, path: impl AsRef<Path>, options: SinkOptions) -> SinkHandle {
        let path = path.as_ref();
        let prefix = self.prefix();

        let sink = match OpenOptions::new().append(true).create(true).open(path) {
            Ok(file) => TraceSink::new(Box::new(file) as Box<dyn Write + Send>, prefix, options),
            Err(error) => {
                let error = open_error(path, error);
                diagnostics::file_open_failed(&prefix, &error);
                TraceSink::failed(prefix, options, error)
            }
        };

        self.push_sink(sink)
    }

    /// Attaches a sink that owns `writer` and releases it when the connection closes.
    pub fn attach_writer<W>(&self, writer: W, options: SinkOptions) -> SinkHandle
    where
        W: Write + Send + 'static,
    {
        self.attach_with_ownership(writer, WriterOwnership::Owned, options)
    }

    /// Attaches a sink over `writer` that survives the connection's close.
    pub fn attach_shared_writer<W>(&self, writer: W, options: SinkOptions) -> SinkHandle
    where
        W: Write + Send + 'static,
    {
        self.attach_with_ownership(writer, WriterOwnership::Shared, options)
    }

    fn attach_with_ownership<W>(
        &self,
        writer: W,
        ownership: WriterOwnership,
        options: SinkOptions,
    ) -> SinkHandle
    where
        W: Write + Send + 'static,
    {
        let sink = TraceSink::with_ownership(
            Box::new(writer) as Box<dyn Write + Send>,
            ownership,
            self.prefix(),
            options,
        );
        self.push_sink(sink)
    }

    fn push_sink(&self, sink: DynSink) -> SinkHandle {
        let handle = SinkHandle::new(sink);
        self.lock_sinks().push(handle.clone());
        handle
    }

    fn prefix(&self) -> String {
        let instance = *self.instance.get_or_init(|| {
            let instance = self.registry.next_instance();
            diagnostics::instance_assigned(instance);
            instance
        });
        instance_prefix(instance)
    }

    fn lock_sinks(&self) -> MutexGuard<'_, Vec<SinkHandle>> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs lazy initialisation if it has not run yet.
    ///
    /// With no sinks attached, a default console sink is attached; otherwise
    /// every sink without a timestamp format receives the default one. Safe
    /// to call concurrently: the body runs at most once per connection.
    pub fn initialize(&self) {
        self.init.call_once(|| {
            if self.lock_sinks().is_empty() {
                let handle = self.attach_console();
                diagnostics::default_sink_attached(handle.lock().prefix());
                return;
            }

            let default = TimeFormat::default();
            for handle in self.lock_sinks().iter() {
                handle.lock().set_default_time_format(&default);
            }
        });
    }

    fn each_sink(&self, mut f: impl FnMut(&mut DynSink)) {
        let sinks = self.lock_sinks();
        for handle in sinks.iter() {
            let mut sink = handle.lock();
            let healthy = sink.error().is_none();
            f(&mut sink);
            if healthy && let Some(error) = sink.error() {
                diagnostics::sink_failed(sink.prefix(), error);
            }
        }
    }
}

/// Renders an `io::Result` for a post-call line: `Ok(value)` or `Err(message)`.
struct Outcome<'a, T>(&'a io::Result<T>);

impl<T: fmt::Debug> fmt::Display for Outcome<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Ok(value) => write!(f, "Ok({value:?})"),
            Err(error) => write!(f, "Err({error})"),
        }
    }
}

fn timed<T>(call: impl FnOnce() -> T) -> (T, std::time::Duration) {
    let start = Instant::now();
    let value = call();
    (value, start.elapsed())
}

fn deadline_argument(sink: &DynSink, deadline: Option<SystemTime>) -> String {
    deadline.map_or_else(|| String::from("none"), |instant| sink.format_system_time(instant))
}

impl<C: Connection> TracedConnection<C> {
    /// Traces and forwards a read.
    ///
    /// The inbound dump covers only the bytes the read reported, never the
    /// unfilled tail of `buf`; a failed read dumps nothing.
    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.initialize();
        let capacity = buf.len();
        self.each_sink(|sink| sink.event(format_args!("» Read(max {capacity} bytes)")));

        let (result, elapsed) = timed(|| self.inner.read(buf));

        let filled = result.as_ref().map_or(0, |&count| count.min(capacity));
        let received = &buf[..filled];
        self.each_sink(|sink| {
            sink.event(format_args!("« Read() returned {} in {elapsed:?}", Outcome(&result)));
            sink.write_received_bytes(received);
        });

        result
    }

    /// Traces and forwards a write. The payload is dumped before delegating.
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.initialize();
        self.each_sink(|sink| {
            sink.event(format_args!("» Write({} bytes)", buf.len()));
            sink.write_sent_bytes(buf);
        });

        let (result, elapsed) = timed(|| self.inner.write(buf));

        self.each_sink(|sink| {
            sink.event(format_args!(
                "« Write() returned {} in {elapsed:?}\n",
                Outcome(&result)
            ));
        });

        result
    }

    /// Traces and forwards a close, then closes every sink.
    ///
    /// Owned destinations are released whatever the wrapped close returned;
    /// shared destinations such as stderr are only flushed.
    pub fn close(&self) -> io::Result<()> {
        self.initialize();
        self.each_sink(|sink| sink.event(format_args!("» Close()")));

        let (result, elapsed) = timed(|| self.inner.close());

        self.each_sink(|sink| {
            sink.event(format_args!("« Close() returned {} in {elapsed:?}", Outcome(&result)));
            let owned = !sink.is_closed() && sink.ownership() == WriterOwnership::Owned;
            sink.close();
            if owned {
                diagnostics::sink_released(sink.prefix());
            }
        });

        result
    }

    /// Traces and forwards a local address query.
    pub fn local_addr(&self) -> io::Result<C::Addr> {
        self.initialize();
        self.each_sink(|sink| sink.event(format_args!("» LocalAddr()")));

        let (result, elapsed) = timed(|| self.inner.local_addr());

        self.each_sink(|sink| {
            sink.event(format_args!("« LocalAddr() returned {} in {elapsed:?}", Outcome(&result)));
        });

        result
    }

    /// Traces and forwards a remote address query.
    pub fn peer_addr(&self) -> io::Result<C::Addr> {
        self.initialize();
        self.each_sink(|sink| sink.event(format_args!("» RemoteAddr()")));

        let (result, elapsed) = timed(|| self.inner.peer_addr());

        self.each_sink(|sink| {
            sink.event(format_args!("« RemoteAddr() returned {} in {elapsed:?}", Outcome(&result)));
        });

        result
    }

    /// Traces and forwards [`Connection::set_deadline`].
    pub fn set_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        self.trace_deadline("SetDeadline", deadline, || self.inner.set_deadline(deadline))
    }

    /// Traces and forwards [`Connection::set_read_deadline`].
    pub fn set_read_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        self.trace_deadline("SetReadDeadline", deadline, || {
            self.inner.set_read_deadline(deadline)
        })
    }

    /// Traces and forwards [`Connection::set_write_deadline`].
    pub fn set_write_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        self.trace_deadline("SetWriteDeadline", deadline, || {
            self.inner.set_write_deadline(deadline)
        })
    }

    fn trace_deadline(
        &self,
        operation: &str,
        deadline: Option<SystemTime>,
        call: impl FnOnce() -> io::Result<()>,
    ) -> io::Result<()> {
        self.initialize();
        self.each_sink(|sink| {
            let argument = deadline_argument(sink, deadline);
            sink.event(format_args!("» {operation}({argument})"));
        });

        let (result, elapsed) = timed(call);

        self.each_sink(|sink| {
            sink.event(format_args!("« {operation}() returned {} in {elapsed:?}", Outcome(&result)));
        });

        result
    }
}

impl<C: Connection> Connection for TracedConnection<C> {
    type Addr = C::Addr;

    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        Self::read(self, buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        Self::write(self, buf)
    }

    fn close(&self) -> io::Result<()> {
        Self::close(self)
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        Self::local_addr(self)
    }

    fn peer_addr(&self) -> io::Result<Self::Addr> {
        Self::peer_addr(self)
    }

    fn set_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        Self::set_deadline(self, deadline)
    }

    fn set_read_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        Self::set_read_deadline(self, deadline)
    }

    fn set_write_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        Self::set_write_deadline(self, deadline)
    }
}

impl<C: Connection> Read for TracedConnection<C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Self::read(self, buf)
    }
}

impl<C: Connection> Read for &TracedConnection<C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        TracedConnection::read(*self, buf)
    }
}

impl<C: Connection> Write for TracedConnection<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Self::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<C: Connection> Write for &TracedConnection<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        TracedConnection::write(*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<C: fmt::Debug> fmt::Debug for TracedConnection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedConnection")
            .field("inner", &self.inner)
            .field("instance", &self.instance())
            .field("sinks", &self.lock_sinks().len())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
