//! Shared handles to the sinks attached to a traced connection.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dump::{SinkError, TraceSink};

/// Sink type stored by a traced connection.
pub type DynSink = TraceSink<Box<dyn Write + Send>>;

/// Handle to one sink attached to a [`TracedConnection`](crate::TracedConnection).
///
/// The connection keeps its own clone; callers use theirs to inspect the
/// sticky error and counters while the connection is in use.
#[derive(Clone)]
pub struct SinkHandle {
    sink: Arc<Mutex<DynSink>>,
}

impl SinkHandle {
    pub(crate) fn new(sink: DynSink) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    // A panic while a sink was locked must not stop later tracing.
    pub(crate) fn lock(&self) -> MutexGuard<'_, DynSink> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the sink.
    pub fn with<R>(&self, f: impl FnOnce(&DynSink) -> R) -> R {
        f(&self.lock())
    }

    /// Trace prefix, e.g. `CONN[3]`.
    pub fn prefix(&self) -> String {
        self.lock().prefix().to_owned()
    }

    /// Reports whether the sink has recorded an error.
    pub fn has_error(&self) -> bool {
        self.lock().error().is_some()
    }

    /// Rendered sticky error, if any.
    pub fn error_message(&self) -> Option<String> {
        self.lock().error().map(ToString::to_string)
    }

    /// I/O error kind behind the sticky error, if any.
    pub fn error_kind(&self) -> Option<io::ErrorKind> {
        self.lock().error().and_then(SinkError::kind)
    }

    /// Reports whether the destination failed to open.
    pub fn failed_to_open(&self) -> bool {
        matches!(self.lock().error(), Some(SinkError::Open { .. }))
    }

    /// Number of writes traced so far.
    pub fn sent_dumps(&self) -> u64 {
        self.lock().sent_dumps()
    }

    /// Number of reads traced so far.
    pub fn received_dumps(&self) -> u64 {
        self.lock().received_dumps()
    }

    /// Reports whether the sink has released its destination.
    pub fn is_closed(&self) -> bool {
        self.lock().is_closed()
    }

    /// Reports whether two handles refer to the same sink.
    pub fn same_sink(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.sink, &other.sink)
    }
}

impl fmt::Debug for SinkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SinkHandle").field(&*self.lock()).finish()
    }
}
