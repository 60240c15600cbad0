//! Canonical (wire) representation of a compiled workflow.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{CaptureMode, ContinueOnPolicy, Executor, ExecutionMode};

/// A compiled retry policy in wire shape (spec.md §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRetry {
    pub limit: u32,
    pub interval_sec: f64,
    pub exponential_base: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_codes: Option<Vec<i32>>,
}

/// A compiled precondition in wire shape; `expected` re-embeds the `re:`
/// prefix when the original was a regex literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPrecondition {
    pub condition: String,
    pub expected: String,
}

/// A compiled step, ready for submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalStep {
    pub name: String,
    pub depends: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<CanonicalRetry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_sec: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preconditions: Vec<CanonicalPrecondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_on: Option<ContinueOnPolicy>,
    #[serde(default)]
    pub capture: CaptureMode,
    pub executor: Executor,
}

/// The frozen, byte-stable workflow submitted to the platform.
///
/// Matches the wire schema in spec.md §6. Array order is insertion order;
/// for the purposes of content hashing, object keys are sorted
/// alphabetically (see [`crate::compiler::ContentHash`]) while the JSON
/// posted to the platform preserves declared/insertion order for
/// readability, exactly as spec.md §9 "Canonical ordering" describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalWorkflow {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner: Option<String>,
    #[serde(rename = "type")]
    pub mode: ExecutionMode,
    pub params: IndexMap<String, String>,
    pub env: IndexMap<String, String>,
    pub steps: Vec<CanonicalStep>,
}
