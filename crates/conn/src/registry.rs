//! Connection instance numbering.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Hands out connection instance numbers, starting at 1.
///
/// Each [`TracedConnection`](crate::TracedConnection) draws its number from a
/// registry the first time it needs a trace prefix. Numbers are unique per
/// registry regardless of how many threads draw concurrently. Tests that
/// need predictable numbering build their own registry instead of using
/// [`global`](Self::global).
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    issued: AtomicU64,
}

impl ConnectionRegistry {
    /// Creates an empty registry whose first number is 1.
    pub const fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
        }
    }

    /// Returns the process-wide registry.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<ConnectionRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new())))
    }

    /// Allocates the next instance number.
    pub fn next_instance(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Number of instance numbers handed out so far.
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Acquire)
    }
}

/// Trace prefix for connection instance `instance`.
pub fn instance_prefix(instance: u64) -> String {
    format!("CONN[{instance}]")
}
