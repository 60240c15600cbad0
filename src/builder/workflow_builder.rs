use indexmap::IndexMap;

use crate::model::{is_identifier_safe, Executor, ExecutionMode, GraphError, Step, Workflow};

use super::StepBuilder;

/// Fluent assembler for a [`Workflow`].
///
/// Structural errors (duplicate step names, dependencies on undeclared
/// steps, conflicting executor declarations, invalid identifiers) are
/// recorded as soon as they're detected and surfaced together from
/// [`WorkflowBuilder::build`].
#[derive(Debug, Clone)]
pub struct WorkflowBuilder {
    pub(crate) workflow: Workflow,
    pub(crate) errors: Vec<GraphError>,
}

impl WorkflowBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut errors = Vec::new();
        if name.is_empty() {
            errors.push(GraphError::invalid_graph("workflow name must not be empty"));
        } else if !is_identifier_safe(&name) {
            errors.push(GraphError::invalid_graph(format!(
                "workflow name '{name}' is not identifier-safe"
            )));
        }
        Self {
            workflow: Workflow::new(name),
            errors,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.workflow.description = Some(description.into());
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.workflow.mode = Some(mode);
        self
    }

    pub fn runner(mut self, runner: impl Into<String>) -> Self {
        self.workflow.runner = Some(runner.into());
        self
    }

    /// Declare a parameter with a default value.
    pub fn param(mut self, name: impl Into<String>, default: impl Into<String>) -> Self {
        let name = name.into();
        if !is_identifier_safe(&name) {
            self.errors.push(GraphError::invalid_graph(format!(
                "parameter name '{name}' is not identifier-safe"
            )));
        }
        self.workflow.params.insert(name, default.into());
        self
    }

    /// Declare an environment variable.
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        if !is_identifier_safe(&name) {
            self.errors.push(GraphError::invalid_graph(format!(
                "environment variable name '{name}' is not identifier-safe"
            )));
        }
        self.workflow.env.insert(name, value.into());
        self
    }

    /// Append a new step with the given executor and begin configuring it.
    ///
    /// In `chain` mode, a dependency on the previously appended step is
    /// added automatically at [`WorkflowBuilder::build`] time, unless this
    /// step already declares explicit dependencies.
    pub fn step(mut self, name: impl Into<String>, executor: Executor) -> StepBuilder {
        let name = name.into();
        if !is_identifier_safe(&name) {
            self.errors.push(GraphError::invalid_graph(format!(
                "step name '{name}' is not identifier-safe"
            )));
        }
        if self.workflow.steps.iter().any(|s| s.name == name) {
            self.errors
                .push(GraphError::conflict(&name, "duplicate step name"));
        }
        self.workflow.steps.push(Step::new(name, executor));
        let index = self.workflow.steps.len() - 1;
        StepBuilder {
            builder: self,
            index,
        }
    }

    /// Finalize structural validation and produce the in-memory [`Workflow`].
    ///
    /// This does *not* perform `${NAME}` reference resolution or cycle
    /// detection — those are whole-graph invariants enforced by
    /// [`crate::compiler::Compiler::compile`].
    pub fn build(mut self) -> Result<Workflow, GraphError> {
        self.apply_chain_mode_dependencies();
        self.check_dependencies_exist();
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }
        Ok(self.workflow)
    }

    /// Convenience: build, then compile in one call, surfacing compiler
    /// errors (`UnresolvedReferenceError`, `NonCausalReferenceError`, cycles)
    /// through the same error path.
    pub fn compile(
        self,
    ) -> Result<(crate::compiler::CanonicalWorkflow, crate::compiler::ContentHash), crate::compiler::CompileError>
    {
        let workflow = self.build()?;
        crate::compiler::Compiler::compile(&workflow)
    }

    fn apply_chain_mode_dependencies(&mut self) {
        if self.workflow.mode != Some(ExecutionMode::Chain) {
            return;
        }
        for i in 1..self.workflow.steps.len() {
            if self.workflow.steps[i].depends.is_empty() {
                let prev = self.workflow.steps[i - 1].name.clone();
                self.workflow.steps[i].depends.push(prev);
            }
        }
    }

    fn check_dependencies_exist(&mut self) {
        let names: std::collections::HashSet<&str> =
            self.workflow.steps.iter().map(|s| s.name.as_str()).collect();
        for step in &self.workflow.steps {
            for dep in &step.depends {
                if !names.contains(dep.as_str()) {
                    self.errors.push(GraphError::invalid_graph(format!(
                        "step '{}' depends on undefined step '{}'",
                        step.name, dep
                    )));
                }
            }
        }
    }
}

/// Sugar for passing a literal ordered map of parameter overrides to the
/// transport client without pulling in `indexmap` at call sites.
pub fn params(pairs: impl IntoIterator<Item = (String, String)>) -> IndexMap<String, String> {
    pairs.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Executor;

    fn shell(cmd: &str) -> Executor {
        Executor::Shell {
            command: cmd.to_string(),
        }
    }

    #[test]
    fn s1_chain_builder_auto_dependencies() {
        // S1 from spec.md §8
        let wf = WorkflowBuilder::new("demo")
            .mode(ExecutionMode::Chain)
            .step("a", shell("echo 1"))
            .step("b", shell("echo 2"))
            .step("c", shell("echo 3"))
            .build()
            .unwrap();

        assert_eq!(wf.steps[0].depends, Vec::<String>::new());
        assert_eq!(wf.steps[1].depends, vec!["a".to_string()]);
        assert_eq!(wf.steps[2].depends, vec!["b".to_string()]);
    }

    #[test]
    fn chain_mode_respects_explicit_dependencies() {
        let wf = WorkflowBuilder::new("demo")
            .mode(ExecutionMode::Chain)
            .step("a", shell("echo 1"))
            .step("b", shell("echo 2"))
            .depends_on(["a"])
            .build()
            .unwrap();
        assert_eq!(wf.steps[1].depends, vec!["a".to_string()]);
    }

    #[test]
    fn duplicate_step_name_is_conflict_error() {
        let err = WorkflowBuilder::new("demo")
            .step("a", shell("echo 1"))
            .step("a", shell("echo 2"))
            .build()
            .unwrap_err();
        assert!(matches!(err, GraphError::Conflict { .. }));
    }

    #[test]
    fn dependency_on_undefined_step_is_invalid_graph() {
        let err = WorkflowBuilder::new("demo")
            .step("a", shell("echo 1"))
            .depends_on(["missing"])
            .build()
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidGraph { .. }));
    }

    #[test]
    fn invalid_workflow_name_is_rejected() {
        let err = WorkflowBuilder::new("not valid!").build().unwrap_err();
        assert!(matches!(err, GraphError::InvalidGraph { .. }));
    }
}
