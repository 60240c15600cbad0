//! Fluent workflow construction.
//!
//! [`WorkflowBuilder`] accumulates a workflow graph and rejects structural
//! errors as soon as they're declared; [`StepBuilder`] configures the most
//! recently appended step. Both return owned `Self` from every setter,
//! matching the teacher's `with_*` builder idiom (see
//! `everruns_durable::reliability::RetryPolicy`).

mod step_builder;
mod workflow_builder;

pub use step_builder::StepBuilder;
pub use workflow_builder::{params, WorkflowBuilder};
