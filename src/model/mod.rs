//! Canonical in-memory representation of workflows, steps and executors.

mod executor;
mod retry;
mod step;
mod workflow;

pub use executor::{
    ContainerArg, Executor, FanoutTemplate, FileMount, ItemSource, SidecarService,
};
pub use retry::RetryPolicy;
pub use step::{CaptureMode, ContinueOnPolicy, ExpectedValue, Precondition, Step};
pub use workflow::{is_identifier_safe, ExecutionMode, Workflow};

/// Validation errors raised while building or compiling a workflow graph.
///
/// spec.md §7 groups `InvalidGraphError`, `ConflictError`,
/// `UnresolvedReferenceError` and `NonCausalReferenceError` under a single
/// "Validation" error family raised during build/compile and fatal to the
/// current build; they share one enum here for the same reason the teacher
/// keeps `StoreError`/`ExecutorError` each scoped to one subsystem rather
/// than splitting every call site into its own type (see DESIGN.md).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// A structural problem with the graph: unknown dependency, duplicate
    /// step name, or a cycle.
    #[error("invalid graph: {reason}")]
    InvalidGraph { reason: String },

    /// A second executor (or other exclusive attribute) was declared on a
    /// step that already has one.
    #[error("conflicting declaration on step '{step}': {reason}")]
    Conflict { step: String, reason: String },

    /// A `${NAME}` reference didn't resolve to any declared parameter, env
    /// var, or upstream step output.
    #[error("unresolved reference '${{{name}}}' in step '{step}'")]
    UnresolvedReference { name: String, step: String },

    /// A `${NAME}` reference resolved to a step output, but that step is not
    /// an ancestor of the referencing step in the dependency DAG.
    #[error("non-causal reference: step '{step}' references output of non-ancestor '{source_step}'")]
    NonCausalReference { step: String, source_step: String },
}

impl GraphError {
    pub fn invalid_graph(reason: impl Into<String>) -> Self {
        GraphError::InvalidGraph {
            reason: reason.into(),
        }
    }

    pub fn conflict(step: impl Into<String>, reason: impl Into<String>) -> Self {
        GraphError::Conflict {
            step: step.into(),
            reason: reason.into(),
        }
    }
}
