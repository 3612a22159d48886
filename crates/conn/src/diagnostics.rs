//! Lifecycle diagnostics emitted through `tracing`.
//!
//! These events describe the tracer itself (instance numbering, sink
//! failures), never the traffic; traffic goes to the sinks. Without the
//! `tracing` feature every helper compiles to a no-op.

#[cfg(feature = "tracing")]
use tracing::{debug, trace, warn};

/// Target used for every diagnostic event.
pub const TARGET: &str = "conntrace::conn";

/// A connection drew its instance number.
#[cfg(feature = "tracing")]
#[inline]
pub fn instance_assigned(instance: u64) {
    debug!(target: TARGET, instance, "assigned connection instance number");
}

/// A connection drew its instance number - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn instance_assigned(_instance: u64) {}

/// Lazy initialisation attached the default console sink.
#[cfg(feature = "tracing")]
#[inline]
pub fn default_sink_attached(prefix: &str) {
    debug!(target: TARGET, prefix, "no sinks attached; tracing to stderr");
}

/// Lazy initialisation attached the default console sink - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn default_sink_attached(_prefix: &str) {}

/// A file sink could not open its destination.
#[cfg(feature = "tracing")]
#[inline]
pub fn file_open_failed(prefix: &str, error: &dump::SinkError) {
    warn!(target: TARGET, prefix, %error, "trace file unavailable; sink disabled");
}

/// A file sink could not open its destination - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn file_open_failed(_prefix: &str, _error: &dump::SinkError) {}

/// A sink recorded its sticky error.
#[cfg(feature = "tracing")]
#[inline]
pub fn sink_failed(prefix: &str, error: &dump::SinkError) {
    warn!(target: TARGET, prefix, %error, "trace sink failed; further output skipped");
}

/// A sink recorded its sticky error - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn sink_failed(_prefix: &str, _error: &dump::SinkError) {}

/// An owned sink destination was released on close.
#[cfg(feature = "tracing")]
#[inline]
pub fn sink_released(prefix: &str) {
    trace!(target: TARGET, prefix, "released trace destination");
}

/// An owned sink destination was released on close - no-op when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[inline]
pub fn sink_released(_prefix: &str) {}

#[cfg(test)]
mod tests {
    use super::*;

    // The helpers must be callable with or without the `tracing` feature.
    #[test]
    fn helpers_compile_and_run() {
        instance_assigned(1);
        default_sink_attached("CONN[1]");
        file_open_failed("CONN[1]", &dump::SinkError::Closed);
        sink_failed("CONN[1]", &dump::SinkError::Closed);
        sink_released("CONN[1]");
    }
}
