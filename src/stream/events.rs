//! Normalized stream events and the errors the parser itself can raise.

use serde::{Deserialize, Serialize};

/// The normalized kind of a parsed stream event (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    WorkflowStart,
    WorkflowEnd,
    StepStart,
    StepProgress,
    StepLog,
    StepEnd,
    Heartbeat,
    Error,
    StreamBroken,
}

impl EventKind {
    /// Resolves both the canonical dotted names and the legacy wire names
    /// the platform still emits on some executions (spec.md §4.5).
    pub(super) fn from_wire(name: &str) -> Option<Self> {
        Some(match name {
            "workflow.start" | "workflow_started" => EventKind::WorkflowStart,
            "workflow.end" | "workflow_complete" => EventKind::WorkflowEnd,
            "step.start" | "step_started" => EventKind::StepStart,
            "step.progress" | "step_progress" => EventKind::StepProgress,
            "step.log" | "text" | "chunk" => EventKind::StepLog,
            "step.end" | "step_complete" | "step_failed" => EventKind::StepEnd,
            "heartbeat" => EventKind::Heartbeat,
            "error" => EventKind::Error,
            "stream.broken" => EventKind::StreamBroken,
            _ => return None,
        })
    }

    /// Resolves a wire name to its `EventKind`, falling back to `Error` for
    /// anything unrecognized rather than dropping the event.
    pub(super) fn resolve(name: &str) -> Self {
        Self::from_wire(name).unwrap_or(EventKind::Error)
    }
}

/// A single normalized event delivered to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub kind: EventKind,
    pub payload: serde_json::Value,
    /// Byte offset into the raw response body where this event's framing
    /// began; used to prove arrival-order / no-reordering guarantees.
    pub raw_offset: usize,
}

impl StreamEvent {
    pub(crate) fn new(kind: EventKind, payload: serde_json::Value, raw_offset: usize) -> Self {
        Self {
            kind,
            payload,
            raw_offset,
        }
    }
}

/// Errors the parser itself raises, distinct from events relayed from the
/// platform (spec.md §7 "Stream" family).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StreamError {
    #[error("line exceeded the {limit} byte buffer cap at offset {offset}")]
    LineTooLong { offset: usize, limit: usize },

    #[error("invalid utf-8 in stream at offset {offset}")]
    Decoding { offset: usize },
}
