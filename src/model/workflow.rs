//! Workflow: a named graph of steps.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::step::Step;

/// Execution mode. `Chain` is a degenerate DAG requiring every step to
/// depend on the previous one; `Graph` is a general DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Chain,
    Graph,
}

/// The in-memory workflow graph produced by the builder.
///
/// This representation is mutable during construction; `compile()` (see
/// [`crate::compiler`]) freezes it into the immutable canonical wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub params: IndexMap<String, String>,
    #[serde(default)]
    pub env: IndexMap<String, String>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ExecutionMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner: Option<String>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            params: IndexMap::new(),
            env: IndexMap::new(),
            steps: Vec::new(),
            mode: None,
            runner: None,
        }
    }

    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.name.as_str())
    }
}

/// Identifier grammar shared by workflow names, step names, param names,
/// env var names and declared outputs: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier_safe(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_grammar_accepts_valid_names() {
        assert!(is_identifier_safe("foo"));
        assert!(is_identifier_safe("_foo_1"));
        assert!(is_identifier_safe("A1"));
    }

    #[test]
    fn identifier_grammar_rejects_invalid_names() {
        assert!(!is_identifier_safe(""));
        assert!(!is_identifier_safe("1foo"));
        assert!(!is_identifier_safe("foo-bar"));
        assert!(!is_identifier_safe("foo bar"));
    }

    #[test]
    fn workflow_looks_up_step_by_name() {
        use super::super::executor::Executor;
        use super::super::step::Step;
        let mut wf = Workflow::new("demo");
        wf.steps.push(Step::new(
            "a",
            Executor::Shell {
                command: "echo 1".into(),
            },
        ));
        assert!(wf.step("a").is_some());
        assert!(wf.step("b").is_none());
    }
}
