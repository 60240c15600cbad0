use std::time::Duration;

use crate::model::{
    ContinueOnPolicy, Executor, ExpectedValue, FileMount, GraphError, Precondition, RetryPolicy,
    SidecarService,
};
use crate::model::CaptureMode;

use super::WorkflowBuilder;

/// Configures the step most recently appended via [`WorkflowBuilder::step`].
#[derive(Debug, Clone)]
pub struct StepBuilder {
    pub(crate) builder: WorkflowBuilder,
    pub(crate) index: usize,
}

impl StepBuilder {
    /// Declare dependencies on prior steps by name.
    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let step = &mut self.builder.workflow.steps[self.index];
        step.depends.extend(names.into_iter().map(Into::into));
        self
    }

    /// Declare the output variable this step produces, for downstream
    /// `${NAME}` substitution.
    pub fn output(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !crate::model::is_identifier_safe(&name) {
            self.builder.errors.push(GraphError::invalid_graph(format!(
                "output name '{name}' is not identifier-safe"
            )));
        }
        self.builder.workflow.steps[self.index].output = Some(name);
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        if !policy.is_valid() {
            self.builder.errors.push(GraphError::invalid_graph(
                "retry policy has non-finite attempts or interval",
            ));
        }
        self.builder.workflow.steps[self.index].retry = Some(policy);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.builder.workflow.steps[self.index].timeout = Some(timeout);
        self
    }

    pub fn precondition(mut self, condition: impl Into<String>, expected: &str) -> Self {
        self.builder.workflow.steps[self.index]
            .preconditions
            .push(Precondition {
                condition: condition.into(),
                expected: ExpectedValue::parse(expected),
            });
        self
    }

    pub fn continue_on_failure(mut self, mark_success: bool) -> Self {
        self.builder.workflow.steps[self.index].continue_on = Some(ContinueOnPolicy {
            failure: true,
            mark_success,
        });
        self
    }

    pub fn capture(mut self, mode: CaptureMode) -> Self {
        self.builder.workflow.steps[self.index].capture = mode;
        self
    }

    /// Attach an embedded file mount. Only meaningful for container steps;
    /// recorded regardless, validated at compile time against the executor
    /// kind is left to the platform (spec.md §4.3 treats mounts as
    /// container-executor specific but doesn't mandate builder-side
    /// rejection for other executor kinds).
    pub fn mount(mut self, destination: impl Into<String>, content: impl Into<String>) -> Self {
        if let Executor::Container { mounts, .. } = &mut self.builder.workflow.steps[self.index].executor {
            mounts.push(FileMount {
                destination: destination.into(),
                content: content.into(),
            });
        } else {
            self.builder.errors.push(GraphError::conflict(
                &self.builder.workflow.steps[self.index].name,
                "file mounts require a container executor",
            ));
        }
        self
    }

    pub fn sidecar(mut self, sidecar: SidecarService) -> Self {
        if let Executor::Container { sidecars, .. } = &mut self.builder.workflow.steps[self.index].executor {
            sidecars.push(sidecar);
        } else {
            self.builder.errors.push(GraphError::conflict(
                &self.builder.workflow.steps[self.index].name,
                "sidecar services require a container executor",
            ));
        }
        self
    }

    /// Declaring a second executor on a step is always a conflict: the step
    /// already received one from [`WorkflowBuilder::step`].
    pub fn executor(mut self, _executor: Executor) -> Self {
        let name = self.builder.workflow.steps[self.index].name.clone();
        self.builder
            .errors
            .push(GraphError::conflict(name, "executor already declared for this step"));
        self
    }

    /// Append another step, returning its builder.
    pub fn step(self, name: impl Into<String>, executor: Executor) -> StepBuilder {
        self.builder.step(name, executor)
    }

    /// Finish configuring steps and produce the validated [`crate::model::Workflow`].
    pub fn build(self) -> Result<crate::model::Workflow, GraphError> {
        self.builder.build()
    }

    /// Finish and compile in one call (see [`WorkflowBuilder::compile`]).
    pub fn compile(
        self,
    ) -> Result<(crate::compiler::CanonicalWorkflow, crate::compiler::ContentHash), crate::compiler::CompileError>
    {
        self.builder.compile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::WorkflowBuilder;

    #[test]
    fn output_and_retry_attach_to_correct_step() {
        let wf = WorkflowBuilder::new("demo")
            .step(
                "a",
                Executor::Shell {
                    command: "echo 1".into(),
                },
            )
            .output("result")
            .retry(RetryPolicy::exponential())
            .build()
            .unwrap();
        assert_eq!(wf.steps[0].output.as_deref(), Some("result"));
        assert!(wf.steps[0].retry.is_some());
    }

    #[test]
    fn mount_on_non_container_step_is_conflict() {
        let err = WorkflowBuilder::new("demo")
            .step(
                "a",
                Executor::Shell {
                    command: "echo 1".into(),
                },
            )
            .mount("/tmp/x", "data")
            .build()
            .unwrap_err();
        assert!(matches!(err, GraphError::Conflict { .. }));
    }
}
