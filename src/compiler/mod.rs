//! Compiles an in-memory [`crate::model::Workflow`] into the canonical wire
//! form, enforcing whole-graph invariants (spec.md §4.2).

mod canonical;
mod hash;
mod substitution;
mod topo;

pub use canonical::{CanonicalPrecondition, CanonicalRetry, CanonicalStep, CanonicalWorkflow};
pub use hash::ContentHash;
pub use substitution::ancestors_of;

use crate::model::{ExecutionMode, ExpectedValue, GraphError, RetryPolicy, Workflow};

/// Errors raised while compiling a workflow.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("cycle detected: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },
}

/// Stateless compiler entry point.
pub struct Compiler;

impl Compiler {
    /// Validate and compile `workflow`, returning the canonical form and a
    /// content hash over its stable serialization.
    #[tracing::instrument(skip(workflow), fields(workflow = %workflow.name))]
    pub fn compile(workflow: &Workflow) -> Result<(CanonicalWorkflow, ContentHash), CompileError> {
        Self::validate_identifiers(workflow)?;
        Self::validate_dependencies_exist(workflow)?;

        if let Some(path) = topo::find_cycle(workflow) {
            tracing::warn!(cycle = ?path, "compile rejected: cycle in dependency graph");
            return Err(CompileError::Cycle { path });
        }

        substitution::validate_references(workflow)?;

        let canonical = Self::to_canonical(workflow);
        let hash = ContentHash::compute(&canonical);
        tracing::debug!(hash = %hash, "compiled workflow");
        Ok((canonical, hash))
    }

    fn validate_identifiers(workflow: &Workflow) -> Result<(), GraphError> {
        use crate::model::is_identifier_safe;

        if !is_identifier_safe(&workflow.name) {
            return Err(GraphError::invalid_graph(format!(
                "workflow name '{}' is not identifier-safe",
                workflow.name
            )));
        }
        for name in workflow.params.keys() {
            if !is_identifier_safe(name) {
                return Err(GraphError::invalid_graph(format!(
                    "parameter name '{name}' is not identifier-safe"
                )));
            }
        }
        let mut seen = std::collections::HashSet::new();
        for step in &workflow.steps {
            if !is_identifier_safe(&step.name) {
                return Err(GraphError::invalid_graph(format!(
                    "step name '{}' is not identifier-safe",
                    step.name
                )));
            }
            if !seen.insert(step.name.as_str()) {
                return Err(GraphError::conflict(&step.name, "duplicate step name"));
            }
            if let Some(output) = &step.output {
                if !is_identifier_safe(output) {
                    return Err(GraphError::invalid_graph(format!(
                        "output name '{output}' is not identifier-safe"
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_dependencies_exist(workflow: &Workflow) -> Result<(), GraphError> {
        let names: std::collections::HashSet<&str> =
            workflow.steps.iter().map(|s| s.name.as_str()).collect();
        for step in &workflow.steps {
            for dep in &step.depends {
                if !names.contains(dep.as_str()) {
                    return Err(GraphError::invalid_graph(format!(
                        "step '{}' depends on undefined step '{}'",
                        step.name, dep
                    )));
                }
            }
        }
        Ok(())
    }

    fn to_canonical(workflow: &Workflow) -> CanonicalWorkflow {
        CanonicalWorkflow {
            name: workflow.name.clone(),
            description: workflow.description.clone(),
            runner: workflow.runner.clone(),
            mode: workflow.mode.unwrap_or(ExecutionMode::Graph),
            params: workflow.params.clone(),
            env: workflow.env.clone(),
            steps: workflow.steps.iter().map(Self::to_canonical_step).collect(),
        }
    }

    fn to_canonical_step(step: &crate::model::Step) -> CanonicalStep {
        CanonicalStep {
            name: step.name.clone(),
            depends: step.depends.clone(),
            output: step.output.clone(),
            retry: step.retry.as_ref().map(Self::to_canonical_retry),
            timeout_sec: step.timeout.map(|d| d.as_secs_f64()),
            preconditions: step
                .preconditions
                .iter()
                .map(|p| CanonicalPrecondition {
                    condition: p.condition.clone(),
                    expected: expected_to_wire(&p.expected),
                })
                .collect(),
            continue_on: step.continue_on,
            capture: step.capture,
            executor: step.executor.clone(),
        }
    }

    fn to_canonical_retry(policy: &RetryPolicy) -> CanonicalRetry {
        CanonicalRetry {
            limit: policy.max_attempts,
            interval_sec: policy.base_interval.as_secs_f64(),
            exponential_base: policy.exponential_base,
            exit_codes: policy.retryable_exit_codes.clone(),
        }
    }
}

fn expected_to_wire(expected: &ExpectedValue) -> String {
    match expected {
        ExpectedValue::Literal(s) => s.clone(),
        ExpectedValue::Regex(pattern) => format!("re:{pattern}"),
    }
}
