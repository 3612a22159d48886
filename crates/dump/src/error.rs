//! Error types surfaced by sink configuration and sink destinations.

use std::io;
use std::path::PathBuf;

/// Error returned when sink options cannot be built from user-supplied text.
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    /// The timestamp format description could not be parsed.
    #[error("invalid timestamp format {format:?}: {source}")]
    TimeFormat {
        /// The rejected format description.
        format: String,
        /// Parser diagnostic from the `time` crate.
        #[source]
        source: time::error::InvalidFormatDescription,
    },

    /// The rendering mode name is not recognised.
    #[error("unknown rendering mode {0:?} (expected \"hex-dump\" or \"source-literal\")")]
    UnknownMode(String),
}

/// Sticky failure recorded by a [`TraceSink`](crate::TraceSink).
///
/// Once a sink holds one of these it skips every later emission. The error is
/// never propagated to the traced connection's caller.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The destination file could not be opened.
    #[error("failed to open trace file {}: {source}", path.display())]
    Open {
        /// Path that was passed to the sink constructor.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Writing to the destination failed.
    #[error("failed to write trace output: {0}")]
    Write(#[source] io::Error),

    /// The destination has already been released.
    #[error("trace destination is closed")]
    Closed,
}

impl SinkError {
    /// Returns the [`io::ErrorKind`] behind the failure, if any.
    pub fn kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Open { source, .. } | Self::Write(source) => Some(source.kind()),
            Self::Closed => None,
        }
    }
}
