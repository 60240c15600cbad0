//! A client library for defining, compiling, submitting and streaming
//! deterministic workflow graphs against a remote execution platform.
//!
//! Build a [`model::Workflow`] with [`builder::WorkflowBuilder`], compile it
//! with [`compiler::Compiler`], and drive it end to end with
//! [`controller::ExecutionController`] — or use each piece independently.

pub mod builder;
pub mod compiler;
pub mod config;
pub mod controller;
pub mod model;
pub mod stream;
pub mod transport;

/// Commonly used types, re-exported for `use workflow_sdk::prelude::*;`.
pub mod prelude {
    pub use crate::builder::{StepBuilder, WorkflowBuilder};
    pub use crate::compiler::{CanonicalWorkflow, CompileError, Compiler, ContentHash};
    pub use crate::config::ClientConfig;
    pub use crate::controller::{ControlError, ExecutionController, ExecutionResult, ExecutionStatus};
    pub use crate::model::{
        CaptureMode, ContinueOnPolicy, Executor, ExecutionMode, GraphError, RetryPolicy, Step,
        Workflow,
    };
    pub use crate::stream::{EventKind, StreamError, StreamEvent};
    pub use crate::transport::TransportError;
}
