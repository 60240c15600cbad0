//! Errors raised while orchestrating an execution (spec.md §7 "Control" family).

use crate::compiler::CompileError;
use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("workflow failed to compile: {0}")]
    Compile(#[from] CompileError),

    #[error("transport error submitting workflow: {0}")]
    Transport(#[from] TransportError),
}
