//! crates/dump/src/options.rs
//! Construction-time configuration for a trace sink.

use crate::layout::{DEFAULT_LINE_WIDTH, MIN_LINE_WIDTH};
use crate::mode::RenderMode;
use crate::time_format::TimeFormat;

/// Options applied when a [`TraceSink`](crate::TraceSink) is built.
///
/// Fields are public so callers can populate them directly; the `with_*`
/// helpers exist for chained construction.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SinkOptions {
    /// Timestamp format; `None` is replaced with the default format when the
    /// owning connection initialises.
    pub time_format: Option<TimeFormat>,
    /// Render payload bytes. When `false` only call-event lines are written.
    pub verbose: bool,
    /// Maximum output line width, clamped to at least 80 columns.
    pub line_width: usize,
    /// How payload bytes are rendered.
    pub mode: RenderMode,
}

impl SinkOptions {
    /// Options used for console sinks: quiet, hex-dump, 120 columns.
    pub fn console() -> Self {
        Self {
            time_format: Some(TimeFormat::default()),
            verbose: false,
            line_width: DEFAULT_LINE_WIDTH,
            mode: RenderMode::HexDump,
        }
    }

    /// Options used for file sinks: verbose, hex-dump, 120 columns.
    pub fn file() -> Self {
        Self {
            verbose: true,
            ..Self::console()
        }
    }

    /// Sets the timestamp format.
    pub fn with_time_format(mut self, format: TimeFormat) -> Self {
        self.time_format = Some(format);
        self
    }

    /// Clears the timestamp format so the connection default applies.
    pub fn without_time_format(mut self) -> Self {
        self.time_format = None;
        self
    }

    /// Enables or disables payload rendering.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets the maximum line width.
    pub fn with_line_width(mut self, line_width: usize) -> Self {
        self.line_width = line_width;
        self
    }

    /// Sets the payload rendering mode.
    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the line width after clamping to the 80 column minimum.
    pub fn effective_line_width(&self) -> usize {
        self.line_width.max(MIN_LINE_WIDTH)
    }
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self::console()
    }
}
