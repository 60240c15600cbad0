//! Step: a single node in a workflow graph.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::executor::Executor;
use super::retry::RetryPolicy;

/// The expected value of a precondition: either a literal string or a
/// regex literal (marked on the wire with the `re:` prefix).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpectedValue {
    Literal(String),
    Regex(String),
}

impl ExpectedValue {
    /// Parse a raw expected-value string, recognizing the `re:` prefix.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix("re:") {
            Some(pattern) => ExpectedValue::Regex(pattern.to_string()),
            None => ExpectedValue::Literal(raw.to_string()),
        }
    }

    pub fn matches(&self, actual: &str) -> bool {
        match self {
            ExpectedValue::Literal(expected) => expected == actual,
            ExpectedValue::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(actual))
                .unwrap_or(false),
        }
    }
}

/// A condition a step must satisfy before it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Precondition {
    pub condition: String,
    pub expected: ExpectedValue,
}

/// How a step's output is captured from its execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// The step's stdout, verbatim. This is the default — see DESIGN.md's
    /// resolution of spec.md §9's open question on default capture semantics.
    #[default]
    StdoutVerbatim,
    /// Only the final line of stdout.
    StdoutLastLine,
    /// Structured JSON emitted by the step.
    StructuredJson,
}

/// Policy for continuing execution past a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContinueOnPolicy {
    pub failure: bool,
    #[serde(default)]
    pub mark_success: bool,
}

/// A node in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub executor: Executor,
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "option_duration_millis"
    )]
    pub timeout: Option<Duration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preconditions: Vec<Precondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_on: Option<ContinueOnPolicy>,
    #[serde(default)]
    pub capture: CaptureMode,
}

impl Step {
    pub fn new(name: impl Into<String>, executor: Executor) -> Self {
        Self {
            name: name.into(),
            executor,
            depends: Vec::new(),
            output: None,
            retry: None,
            timeout: None,
            preconditions: Vec::new(),
            continue_on: None,
            capture: CaptureMode::default(),
        }
    }

    /// Validates a timeout per spec.md §3: "duration, >= 0".
    pub fn timeout_is_valid(&self) -> bool {
        match self.timeout {
            Some(d) => d.as_secs_f64() >= 0.0 && d.as_secs_f64().is_finite(),
            None => true,
        }
    }
}

mod option_duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_millis()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis: Option<u64> = Option::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_value_parses_regex_prefix() {
        assert_eq!(
            ExpectedValue::parse("re:^ok.*"),
            ExpectedValue::Regex("^ok.*".into())
        );
        assert_eq!(
            ExpectedValue::parse("ok"),
            ExpectedValue::Literal("ok".into())
        );
    }

    #[test]
    fn regex_expected_matches() {
        let expected = ExpectedValue::parse("re:^success");
        assert!(expected.matches("success-1"));
        assert!(!expected.matches("failure"));
    }

    #[test]
    fn default_capture_is_stdout_verbatim() {
        assert_eq!(CaptureMode::default(), CaptureMode::StdoutVerbatim);
    }
}
