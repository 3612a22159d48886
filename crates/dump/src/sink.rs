//! crates/dump/src/sink.rs
//!
//! A single trace destination: call-event lines, payload dumps, and the
//! sticky error that silences the sink after its first failure.

use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::SystemTime;

use crate::error::SinkError;
use crate::hexdump::HexDumpLines;
use crate::layout::bytes_per_line;
use crate::literal::render_literal;
use crate::mode::RenderMode;
use crate::options::SinkOptions;
use crate::time_format::TimeFormat;

/// Direction of a payload relative to the local endpoint.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Direction {
    /// Bytes handed to the connection by a write.
    Sent,
    /// Bytes returned by the connection from a read.
    Received,
}

impl Direction {
    /// Variable-name stem used by source-literal dumps.
    pub const fn literal_stem(self) -> &'static str {
        match self {
            Self::Sent => "wbuf",
            Self::Received => "rbuf",
        }
    }
}

/// Whether closing a sink releases its writer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum WriterOwnership {
    /// The sink owns the writer (for example a file it opened) and drops it on close.
    #[default]
    Owned,
    /// The writer outlives the sink (for example stderr); close only flushes it.
    Shared,
}

/// Renders trace events for one connection into a [`Write`] destination.
///
/// Every failure is recorded as a sticky [`SinkError`]. From then on the sink
/// skips all output; none of its methods return an error, so tracing can never
/// disturb the traced call.
///
/// # Examples
///
/// ```
/// use dump::{SinkOptions, TraceSink};
///
/// let mut sink = TraceSink::new(Vec::new(), "CONN[1]", SinkOptions::file());
/// sink.write_sent_bytes(b"ABC");
///
/// let output = String::from_utf8(sink.into_inner().unwrap()).unwrap();
/// assert!(output.starts_with("CONN[1] 41 42 43 "));
/// assert!(output.trim_end().ends_with("| ABC"));
/// ```
pub struct TraceSink<W> {
    writer: Option<W>,
    ownership: WriterOwnership,
    prefix: String,
    time_format: Option<TimeFormat>,
    mode: RenderMode,
    verbose: bool,
    line_width: usize,
    sent_dumps: u64,
    received_dumps: u64,
    error: Option<SinkError>,
}

impl<W> TraceSink<W> {
    /// Creates a sink that owns `writer`.
    pub fn new(writer: W, prefix: impl Into<String>, options: SinkOptions) -> Self {
        Self::with_ownership(writer, WriterOwnership::Owned, prefix, options)
    }

    /// Creates a sink with explicit writer ownership.
    pub fn with_ownership(
        writer: W,
        ownership: WriterOwnership,
        prefix: impl Into<String>,
        options: SinkOptions,
    ) -> Self {
        Self::from_parts(Some(writer), ownership, prefix.into(), options, None)
    }

    /// Creates a sink whose destination could not be opened.
    ///
    /// The sink keeps its configuration but never writes anything;
    /// [`error`](Self::error) reports `error` from the start.
    pub fn failed(prefix: impl Into<String>, options: SinkOptions, error: SinkError) -> Self {
        Self::from_parts(None, WriterOwnership::Owned, prefix.into(), options, Some(error))
    }

    fn from_parts(
        writer: Option<W>,
        ownership: WriterOwnership,
        prefix: String,
        options: SinkOptions,
        error: Option<SinkError>,
    ) -> Self {
        let line_width = options.effective_line_width();
        Self {
            writer,
            ownership,
            prefix,
            time_format: options.time_format,
            mode: options.mode,
            verbose: options.verbose,
            line_width,
            sent_dumps: 0,
            received_dumps: 0,
            error,
        }
    }

    /// Text written at the start of every line.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Configured timestamp format, if any.
    pub fn time_format(&self) -> Option<&TimeFormat> {
        self.time_format.as_ref()
    }

    /// Installs `format` unless a format is already configured.
    ///
    /// Returns `true` when the format was installed.
    pub fn set_default_time_format(&mut self, format: &TimeFormat) -> bool {
        if self.time_format.is_some() {
            return false;
        }
        self.time_format = Some(format.clone());
        true
    }

    /// Payload rendering mode.
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Whether payloads are rendered.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Line width after clamping.
    pub fn line_width(&self) -> usize {
        self.line_width
    }

    /// Writer ownership recorded at construction.
    pub fn ownership(&self) -> WriterOwnership {
        self.ownership
    }

    /// Number of outbound payloads seen so far.
    pub fn sent_dumps(&self) -> u64 {
        self.sent_dumps
    }

    /// Number of inbound payloads seen so far.
    pub fn received_dumps(&self) -> u64 {
        self.received_dumps
    }

    /// The sticky error, if the sink has failed.
    pub fn error(&self) -> Option<&SinkError> {
        self.error.as_ref()
    }

    /// Hex-dump byte groups per line for this sink's width and prefix.
    pub fn bytes_per_line(&self) -> usize {
        bytes_per_line(self.line_width, self.prefix.len())
    }

    /// Renders `instant` with this sink's timestamp format, or the default.
    pub fn format_system_time(&self, instant: SystemTime) -> String {
        match &self.time_format {
            Some(format) => format.system_time(instant),
            None => TimeFormat::default().system_time(instant),
        }
    }

    /// Returns a reference to the writer, unless it has been released.
    pub fn get_ref(&self) -> Option<&W> {
        self.writer.as_ref()
    }

    /// Consumes the sink and returns the writer, unless it has been released.
    pub fn into_inner(self) -> Option<W> {
        self.writer
    }

    fn timestamp(&self) -> String {
        match &self.time_format {
            Some(format) => format.now(),
            None => TimeFormat::default().now(),
        }
    }
}

impl<W: Write> TraceSink<W> {
    /// Writes one call-event line: `[// ]<prefix> <timestamp> <event>`.
    ///
    /// A newline is appended; an `event` ending in `\n` therefore produces a
    /// trailing blank line.
    pub fn event(&mut self, event: fmt::Arguments<'_>) {
        if self.error.is_some() {
            return;
        }

        let mut line = String::with_capacity(self.prefix.len() + 64);
        if self.mode.comments_events() {
            line.push_str("// ");
        }
        line.push_str(&self.prefix);
        line.push(' ');
        line.push_str(&self.timestamp());
        line.push(' ');
        let _ = fmt::write(&mut line, event);
        line.push('\n');

        self.emit(line.as_bytes());
    }

    /// Records an outbound payload and renders it per the sink's mode.
    pub fn write_sent_bytes(&mut self, data: &[u8]) {
        self.sent_dumps += 1;
        self.write_payload(Direction::Sent, self.sent_dumps, data);
    }

    /// Records an inbound payload and renders it per the sink's mode.
    pub fn write_received_bytes(&mut self, data: &[u8]) {
        self.received_dumps += 1;
        self.write_payload(Direction::Received, self.received_dumps, data);
    }

    fn write_payload(&mut self, direction: Direction, sequence: u64, data: &[u8]) {
        if !self.verbose {
            return;
        }

        match self.mode {
            RenderMode::HexDump => self.write_hex_dump(data),
            RenderMode::SourceLiteral => {
                let name = format!("{}{sequence}", direction.literal_stem());
                self.write_source_literal(&name, data);
            }
        }
    }

    /// Writes `data` as hex-dump lines. An empty buffer writes nothing.
    pub fn write_hex_dump(&mut self, data: &[u8]) {
        let per_line = self.bytes_per_line();
        let lines: Vec<String> = HexDumpLines::new(&self.prefix, data, per_line).collect();
        for mut line in lines {
            if self.error.is_some() {
                return;
            }
            line.push('\n');
            self.emit(line.as_bytes());
        }
    }

    /// Writes `data` as a source literal bound to `name`.
    pub fn write_source_literal(&mut self, name: &str, data: &[u8]) {
        if self.error.is_some() {
            return;
        }
        let text = render_literal(name, data);
        self.emit(text.as_bytes());
    }

    /// Flushes the destination, releasing it if the sink owns it.
    ///
    /// Shared writers stay usable by their owner. Any later emission on an
    /// owned sink records [`SinkError::Closed`].
    pub fn close(&mut self) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };

        if let Err(error) = writer.flush() {
            self.record(SinkError::Write(error));
        }

        if self.ownership == WriterOwnership::Owned {
            self.writer = None;
        }
    }

    /// Reports whether the sink has released its writer.
    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    fn emit(&mut self, bytes: &[u8]) {
        let result = match self.writer.as_mut() {
            Some(writer) => writer.write_all(bytes).map_err(SinkError::Write),
            None => Err(SinkError::Closed),
        };

        if let Err(error) = result {
            self.record(error);
        }
    }

    fn record(&mut self, error: SinkError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

impl<W> fmt::Debug for TraceSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceSink")
            .field("prefix", &self.prefix)
            .field("ownership", &self.ownership)
            .field("mode", &self.mode)
            .field("verbose", &self.verbose)
            .field("line_width", &self.line_width)
            .field("sent_dumps", &self.sent_dumps)
            .field("received_dumps", &self.received_dumps)
            .field("error", &self.error)
            .field("closed", &self.writer.is_none())
            .finish_non_exhaustive()
    }
}

/// Convenience for building a [`SinkError::Open`].
pub fn open_error(path: impl Into<PathBuf>, source: io::Error) -> SinkError {
    SinkError::Open {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenPipe {
        attempts: usize,
    }

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            self.attempts += 1;
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn quiet_format() -> TimeFormat {
        TimeFormat::parse("T").unwrap()
    }

    fn output(sink: TraceSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn event_line_has_prefix_timestamp_and_text() {
        let options = SinkOptions::console().with_time_format(quiet_format());
        let mut sink = TraceSink::new(Vec::new(), "CONN[4]", options);
        sink.event(format_args!("» Close()"));
        assert_eq!(output(sink), "CONN[4] T » Close()\n");
    }

    #[test]
    fn source_literal_mode_comments_events() {
        let options = SinkOptions::console()
            .with_time_format(quiet_format())
            .with_mode(RenderMode::SourceLiteral);
        let mut sink = TraceSink::new(Vec::new(), "CONN[1]", options);
        sink.event(format_args!("» Read(max {} bytes)", 8));
        assert_eq!(output(sink), "// CONN[1] T » Read(max 8 bytes)\n");
    }

    #[test]
    fn quiet_sink_skips_payloads_but_counts_them() {
        let mut sink = TraceSink::new(Vec::new(), "p", SinkOptions::console());
        sink.write_sent_bytes(b"hello");
        sink.write_received_bytes(b"world");
        sink.write_sent_bytes(b"again");
        assert_eq!(sink.sent_dumps(), 2);
        assert_eq!(sink.received_dumps(), 1);
        assert!(output(sink).is_empty());
    }

    #[test]
    fn literal_names_follow_direction_counters() {
        let options = SinkOptions::file().with_mode(RenderMode::SourceLiteral);
        let mut sink = TraceSink::new(Vec::new(), "p", options);
        sink.write_sent_bytes(b"a");
        sink.write_received_bytes(b"b");
        sink.write_sent_bytes(b"c");
        let text = output(sink);
        assert!(text.contains("let wbuf1: &[u8] = &["));
        assert!(text.contains("let rbuf1: &[u8] = &["));
        assert!(text.contains("let wbuf2: &[u8] = &["));
    }

    #[test]
    fn empty_payload_writes_no_dump_lines() {
        let mut sink = TraceSink::new(Vec::new(), "p", SinkOptions::file());
        sink.write_sent_bytes(&[]);
        assert_eq!(sink.sent_dumps(), 1);
        assert!(output(sink).is_empty());
    }

    #[test]
    fn failure_is_sticky_and_silences_sink() {
        let mut sink = TraceSink::new(BrokenPipe { attempts: 0 }, "p", SinkOptions::file());
        sink.event(format_args!("first"));
        sink.event(format_args!("second"));
        sink.write_sent_bytes(&[0u8; 100]);

        assert_eq!(sink.error().and_then(SinkError::kind), Some(io::ErrorKind::BrokenPipe));
        assert_eq!(sink.get_ref().unwrap().attempts, 1);
    }

    #[test]
    fn failed_sink_reports_open_error() {
        let error = open_error("/missing/trace.log", io::Error::from(io::ErrorKind::NotFound));
        let mut sink: TraceSink<Vec<u8>> = TraceSink::failed("p", SinkOptions::file(), error);
        sink.event(format_args!("ignored"));
        assert!(matches!(sink.error(), Some(SinkError::Open { .. })));
        assert!(sink.into_inner().is_none());
    }

    #[test]
    fn closing_owned_sink_releases_writer() {
        let mut sink = TraceSink::new(Vec::new(), "p", SinkOptions::console());
        sink.close();
        assert!(sink.is_closed());
        assert!(sink.error().is_none());

        sink.event(format_args!("late"));
        assert!(matches!(sink.error(), Some(SinkError::Closed)));
    }

    #[test]
    fn closing_shared_sink_keeps_writer() {
        let mut sink = TraceSink::with_ownership(
            Vec::new(),
            WriterOwnership::Shared,
            "p",
            SinkOptions::console().with_time_format(quiet_format()),
        );
        sink.close();
        assert!(!sink.is_closed());
        sink.event(format_args!("still here"));
        assert!(sink.error().is_none());
        assert_eq!(output(sink), "p T still here\n");
    }

    #[test]
    fn default_time_format_only_fills_unset() {
        let mut sink: TraceSink<Vec<u8>> =
            TraceSink::new(Vec::new(), "p", SinkOptions::console().without_time_format());
        assert!(sink.time_format().is_none());
        assert!(sink.set_default_time_format(&TimeFormat::default()));
        assert!(!sink.set_default_time_format(&quiet_format()));
        assert_eq!(sink.time_format(), Some(&TimeFormat::default()));
    }

    #[test]
    fn line_width_is_clamped_at_construction() {
        let sink: TraceSink<Vec<u8>> =
            TraceSink::new(Vec::new(), "p", SinkOptions::console().with_line_width(20));
        assert_eq!(sink.line_width(), 80);
    }
}
