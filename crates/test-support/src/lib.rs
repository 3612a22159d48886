#![deny(unsafe_code)]
#![deny(missing_docs)]

//! crates/test-support/src/lib.rs
//!
//! Test doubles shared by the workspace's integration tests: an in-memory
//! [`Connection`] with scripted reads and failures, a clonable capture buffer
//! for sink output, and a writer that always fails.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use conn::Connection;

/// Local address reported by a default [`MemoryConnection`].
pub const LOCAL_ADDR: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 40_000));

/// Remote address reported by a default [`MemoryConnection`].
pub const REMOTE_ADDR: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 873));

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct State {
    reads: VecDeque<Result<Vec<u8>, io::ErrorKind>>,
    written: Vec<u8>,
    write_limit: Option<usize>,
    write_error: Option<io::ErrorKind>,
    close_error: Option<io::ErrorKind>,
    closed: bool,
    read_deadline: Option<SystemTime>,
    write_deadline: Option<SystemTime>,
    deadline_calls: usize,
}

/// In-memory connection with scripted behaviour.
///
/// Reads pop scripted chunks in order and return `Ok(0)` once the script is
/// exhausted. Writes append to a capture buffer unless a failure has been
/// scripted. Operations after [`close`](Connection::close) fail with
/// [`io::ErrorKind::NotConnected`].
#[derive(Debug)]
pub struct MemoryConnection {
    state: Mutex<State>,
    local: SocketAddr,
    remote: SocketAddr,
}

impl Default for MemoryConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnection {
    /// Creates a connection between [`LOCAL_ADDR`] and [`REMOTE_ADDR`].
    pub fn new() -> Self {
        Self::with_addrs(LOCAL_ADDR, REMOTE_ADDR)
    }

    /// Creates a connection reporting the given endpoint addresses.
    pub fn with_addrs(local: SocketAddr, remote: SocketAddr) -> Self {
        Self {
            state: Mutex::new(State::default()),
            local,
            remote,
        }
    }

    /// Queues `data` to be returned by a future read.
    pub fn push_read(&self, data: impl Into<Vec<u8>>) -> &Self {
        lock(&self.state).reads.push_back(Ok(data.into()));
        self
    }

    /// Queues a read failure of the given kind.
    pub fn push_read_error(&self, kind: io::ErrorKind) -> &Self {
        lock(&self.state).reads.push_back(Err(kind));
        self
    }

    /// Caps how many bytes a single write accepts.
    pub fn limit_writes(&self, limit: usize) -> &Self {
        lock(&self.state).write_limit = Some(limit);
        self
    }

    /// Makes every write fail with `kind`.
    pub fn fail_writes(&self, kind: io::ErrorKind) -> &Self {
        lock(&self.state).write_error = Some(kind);
        self
    }

    /// Makes close fail with `kind`. The connection still counts as closed.
    pub fn fail_close(&self, kind: io::ErrorKind) -> &Self {
        lock(&self.state).close_error = Some(kind);
        self
    }

    /// Bytes accepted by writes so far.
    pub fn written(&self) -> Vec<u8> {
        lock(&self.state).written.clone()
    }

    /// Reports whether close has been called.
    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// Current read deadline.
    pub fn read_deadline(&self) -> Option<SystemTime> {
        lock(&self.state).read_deadline
    }

    /// Current write deadline.
    pub fn write_deadline(&self) -> Option<SystemTime> {
        lock(&self.state).write_deadline
    }

    /// Number of deadline setter calls that reached this connection.
    pub fn deadline_calls(&self) -> usize {
        lock(&self.state).deadline_calls
    }

    fn ensure_open(state: &State) -> io::Result<()> {
        if state.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "connection closed"));
        }
        Ok(())
    }
}

impl Connection for MemoryConnection {
    type Addr = SocketAddr;

    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = lock(&self.state);
        Self::ensure_open(&state)?;

        match state.reads.pop_front() {
            Some(Ok(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    state.reads.push_front(Ok(data.split_off(n)));
                }
                Ok(n)
            }
            Some(Err(kind)) => Err(io::Error::new(kind, "scripted read failure")),
            None => Ok(0),
        }
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut state = lock(&self.state);
        Self::ensure_open(&state)?;

        if let Some(kind) = state.write_error {
            return Err(io::Error::new(kind, "scripted write failure"));
        }
        let accepted = state.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        state.written.extend_from_slice(&buf[..accepted]);
        Ok(accepted)
    }

    fn close(&self) -> io::Result<()> {
        let mut state = lock(&self.state);
        Self::ensure_open(&state)?;
        state.closed = true;

        match state.close_error {
            Some(kind) => Err(io::Error::new(kind, "scripted close failure")),
            None => Ok(()),
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        Ok(self.local)
    }

    fn peer_addr(&self) -> io::Result<Self::Addr> {
        Ok(self.remote)
    }

    fn set_read_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        let mut state = lock(&self.state);
        Self::ensure_open(&state)?;
        state.read_deadline = deadline;
        state.deadline_calls += 1;
        Ok(())
    }

    fn set_write_deadline(&self, deadline: Option<SystemTime>) -> io::Result<()> {
        let mut state = lock(&self.state);
        Self::ensure_open(&state)?;
        state.write_deadline = deadline;
        state.deadline_calls += 1;
        Ok(())
    }
}

/// Clonable in-memory writer; every clone appends to the same buffer.
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        lock(&self.bytes).clone()
    }

    /// Everything written so far, decoded lossily as UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&lock(&self.bytes)).into_owned()
    }

    /// Written text split into lines.
    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_owned).collect()
    }

    /// Reports whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        lock(&self.bytes).is_empty()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.bytes).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writer whose every write and flush fails with a fixed error kind.
#[derive(Clone, Debug)]
pub struct FailingWriter {
    kind: io::ErrorKind,
    attempts: Arc<Mutex<usize>>,
}

impl FailingWriter {
    /// Creates a writer failing with `kind`.
    pub fn new(kind: io::ErrorKind) -> Self {
        Self {
            kind,
            attempts: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of write calls made so far, across clones.
    pub fn attempts(&self) -> usize {
        *lock(&self.attempts)
    }
}

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        *lock(&self.attempts) += 1;
        Err(io::Error::new(self.kind, "trace destination unavailable"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(self.kind, "trace destination unavailable"))
    }
}
