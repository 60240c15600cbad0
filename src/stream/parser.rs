//! Multi-framing line parser.
//!
//! The platform mixes four framings on one wire (spec.md §4.5):
//! standard SSE (`event:`/`data:` pairs terminated by a blank line), compact
//! per-line JSON objects, prefixed inline `data: {...}` single-line events,
//! and raw unstructured text treated as step log output. This parser walks
//! an `Idle -> ReadingEvent -> (ReadingData) -> flush` state machine line by
//! line, tolerant of chunk boundaries that split a line across reads.

use super::events::{EventKind, StreamError, StreamEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    ReadingEvent,
    Terminated,
}

/// Incremental multi-framing parser. Feed it raw bytes as they arrive over
/// the wire; it returns every event (and any parser-level errors) that could
/// be completed from the bytes fed so far.
pub struct StreamParser {
    max_line_bytes: usize,
    line_buffer: Vec<u8>,
    skipping_overlong_line: bool,
    offset: usize,
    line_start_offset: usize,
    state: State,
    pending_event_type: Option<String>,
    pending_data: Vec<String>,
    last_step: Option<String>,
}

impl StreamParser {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            max_line_bytes,
            line_buffer: Vec::new(),
            skipping_overlong_line: false,
            offset: 0,
            line_start_offset: 0,
            state: State::Idle,
            pending_event_type: None,
            pending_data: Vec::new(),
            last_step: None,
        }
    }

    /// The step most recently started, if any — used to attribute
    /// unstructured log lines and is never reset by a `step.end`.
    pub fn current_step(&self) -> Option<&str> {
        self.last_step.as_deref()
    }

    /// Feed a chunk of bytes, returning every event/error produced.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<StreamEvent, StreamError>> {
        let mut out = Vec::new();
        for &byte in chunk {
            self.offset += 1;
            if byte == b'\n' {
                self.take_line(&mut out);
                continue;
            }
            if self.skipping_overlong_line {
                continue;
            }
            if self.line_buffer.len() >= self.max_line_bytes {
                out.push(Err(StreamError::LineTooLong {
                    offset: self.line_start_offset,
                    limit: self.max_line_bytes,
                }));
                self.skipping_overlong_line = true;
                continue;
            }
            self.line_buffer.push(byte);
        }
        out
    }

    /// Flush any event left pending once the stream ends without a final
    /// blank-line terminator.
    pub fn finish(&mut self) -> Vec<Result<StreamEvent, StreamError>> {
        let mut out = Vec::new();
        if !self.line_buffer.is_empty() {
            self.take_line(&mut out);
        }
        self.flush_pending(&mut out);
        out
    }

    fn take_line(&mut self, out: &mut Vec<Result<StreamEvent, StreamError>>) {
        let raw = std::mem::take(&mut self.line_buffer);
        let was_overlong = std::mem::replace(&mut self.skipping_overlong_line, false);
        let line_offset = self.line_start_offset;
        self.line_start_offset = self.offset;

        if was_overlong {
            return;
        }

        let trimmed = raw.strip_suffix(b"\r").unwrap_or(&raw);
        match std::str::from_utf8(trimmed) {
            Ok(line) => self.handle_line(line, line_offset, out),
            Err(_) => out.push(Err(StreamError::Decoding { offset: line_offset })),
        }
    }

    fn handle_line(&mut self, line: &str, line_offset: usize, out: &mut Vec<Result<StreamEvent, StreamError>>) {
        if line.is_empty() {
            self.flush_pending(out);
            return;
        }

        if let Some(comment) = line.strip_prefix(':') {
            out.push(Ok(StreamEvent::new(
                EventKind::Heartbeat,
                serde_json::json!({ "comment": comment.trim() }),
                line_offset,
            )));
            return;
        }

        if let Some(rest) = line.strip_prefix("event:") {
            self.state = State::ReadingEvent;
            self.pending_event_type = Some(rest.trim().to_string());
            return;
        }

        if let Some(rest) = line.strip_prefix("data:") {
            let data = rest.trim_start();
            if self.pending_event_type.is_none() {
                // Prefixed inline event: a self-contained `data: {...}` line
                // that is never followed by a blank-line terminator.
                if let Ok(payload) = serde_json::from_str::<serde_json::Value>(data) {
                    self.emit_from_payload(payload, line_offset, out);
                    return;
                }
            }
            self.state = State::ReadingEvent;
            self.pending_data.push(data.to_string());
            return;
        }

        if let Some(stripped) = line.strip_prefix('{') {
            let candidate = format!("{{{stripped}");
            if let Ok(payload) = serde_json::from_str::<serde_json::Value>(&candidate) {
                // Compact per-line JSON framing.
                self.emit_from_payload(payload, line_offset, out);
                return;
            }
        }

        // Raw text: treated as unstructured step log output, attributed to
        // the most recently started step.
        out.push(Ok(StreamEvent::new(
            EventKind::StepLog,
            serde_json::json!({ "line": line, "step": self.last_step }),
            line_offset,
        )));
    }

    fn flush_pending(&mut self, out: &mut Vec<Result<StreamEvent, StreamError>>) {
        if self.pending_event_type.is_none() && self.pending_data.is_empty() {
            return;
        }
        let event_type = self.pending_event_type.take().unwrap_or_default();
        let raw_data = self.pending_data.join("\n");
        self.pending_data.clear();
        self.state = State::Idle;

        let mut payload = serde_json::from_str::<serde_json::Value>(&raw_data)
            .unwrap_or_else(|_| serde_json::json!({ "raw": raw_data }));

        let kind = EventKind::resolve(&event_type);
        if kind == EventKind::StepLog {
            if let Some(obj) = payload.as_object_mut() {
                obj.entry("step").or_insert_with(|| self.last_step.clone().into());
            }
        }
        self.track_step(kind, &payload);
        out.push(Ok(StreamEvent::new(kind, payload, self.line_start_offset)));
    }

    fn emit_from_payload(
        &mut self,
        mut payload: serde_json::Value,
        offset: usize,
        out: &mut Vec<Result<StreamEvent, StreamError>>,
    ) {
        let kind_name = payload
            .get("kind")
            .or_else(|| payload.get("type"))
            .and_then(|v| v.as_str())
            .unwrap_or("error")
            .to_string();
        let kind = EventKind::resolve(&kind_name);
        if kind == EventKind::StepLog {
            if let Some(obj) = payload.as_object_mut() {
                obj.entry("step").or_insert_with(|| self.last_step.clone().into());
            }
        }
        self.track_step(kind, &payload);
        out.push(Ok(StreamEvent::new(kind, payload, offset)));
    }

    fn track_step(&mut self, kind: EventKind, payload: &serde_json::Value) {
        if kind == EventKind::StepStart {
            if let Some(name) = payload.get("name").and_then(|v| v.as_str()) {
                self.last_step = Some(name.to_string());
            }
        }
        if kind == EventKind::StreamBroken {
            self.state = State::Terminated;
        }
    }
}
