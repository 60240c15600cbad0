//! `${NAME}` / `${NAME:default}` token parsing and reference resolution.

use std::collections::{HashSet, VecDeque};
use std::sync::OnceLock;

use regex::Regex;

use crate::model::{Executor, GraphError, Workflow};

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::([^}]*))?\}").unwrap())
}

/// The `NAME`s referenced by `${NAME}` / `${NAME:default}` tokens in `text`.
pub fn referenced_names(text: &str) -> Vec<&str> {
    token_regex()
        .captures_iter(text)
        .map(|c| c.get(1).unwrap().as_str())
        .collect()
}

/// Steps that produce a declared `output`, keyed by output name.
fn outputs_by_name(workflow: &Workflow) -> std::collections::HashMap<&str, &str> {
    workflow
        .steps
        .iter()
        .filter_map(|s| s.output.as_deref().map(|out| (out, s.name.as_str())))
        .collect()
}

/// Direct dependency edges: step name -> its declared `depends`.
fn direct_deps(workflow: &Workflow) -> std::collections::HashMap<&str, &[String]> {
    workflow
        .steps
        .iter()
        .map(|s| (s.name.as_str(), s.depends.as_slice()))
        .collect()
}

/// Every step transitively reachable from `step_name` via `depends` edges
/// (i.e. every ancestor that must run before it).
pub fn ancestors_of(workflow: &Workflow, step_name: &str) -> HashSet<String> {
    let deps = direct_deps(workflow);
    let mut seen = HashSet::new();
    let mut queue: VecDeque<&str> = deps
        .get(step_name)
        .copied()
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect();
    while let Some(name) = queue.pop_front() {
        if seen.insert(name.to_string()) {
            if let Some(next) = deps.get(name) {
                queue.extend(next.iter().map(String::as_str));
            }
        }
    }
    seen
}

/// Verify every `${NAME}` reference in every step resolves to a declared
/// parameter, a declared env var, or an output produced by an ancestor step.
pub fn validate_references(workflow: &Workflow) -> Result<(), GraphError> {
    let outputs = outputs_by_name(workflow);

    for step in &workflow.steps {
        let ancestors = ancestors_of(workflow, &step.name);
        let is_fanout = matches!(step.executor, Executor::ParallelFanout { .. });

        for field in step.executor.template_fields() {
            for name in referenced_names(field) {
                if is_fanout && name == "ITEM" {
                    continue;
                }
                if workflow.params.contains_key(name) || workflow.env.contains_key(name) {
                    continue;
                }
                match outputs.get(name) {
                    Some(source_step) => {
                        if *source_step != step.name && !ancestors.contains(*source_step) {
                            return Err(GraphError::NonCausalReference {
                                step: step.name.clone(),
                                source_step: (*source_step).to_string(),
                            });
                        }
                    }
                    None => {
                        return Err(GraphError::UnresolvedReference {
                            name: name.to_string(),
                            step: step.name.clone(),
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::WorkflowBuilder;
    use crate::model::ExecutionMode;

    fn shell(cmd: &str) -> Executor {
        Executor::Shell {
            command: cmd.to_string(),
        }
    }

    #[test]
    fn s2_unresolved_reference_names_the_missing_param() {
        let wf = WorkflowBuilder::new("demo")
            .step("a", shell("echo ${FOO}"))
            .build()
            .unwrap();
        let err = validate_references(&wf).unwrap_err();
        match err {
            GraphError::UnresolvedReference { name, .. } => assert_eq!(name, "FOO"),
            other => panic!("expected UnresolvedReference, got {other:?}"),
        }
    }

    #[test]
    fn ancestor_output_reference_resolves() {
        let wf = WorkflowBuilder::new("demo")
            .mode(ExecutionMode::Chain)
            .step("a", shell("echo hi"))
            .output("greeting")
            .step("b", shell("echo ${greeting}"))
            .build()
            .unwrap();
        assert!(validate_references(&wf).is_ok());
    }

    #[test]
    fn non_ancestor_output_reference_is_non_causal() {
        let wf = WorkflowBuilder::new("demo")
            .step("a", shell("echo hi"))
            .output("greeting")
            .step("b", shell("echo hi 2"))
            .step("c", shell("echo ${greeting}"))
            .depends_on(["b"])
            .build()
            .unwrap();
        let err = validate_references(&wf).unwrap_err();
        assert!(matches!(err, GraphError::NonCausalReference { .. }));
    }

    #[test]
    fn item_token_allowed_only_in_fanout() {
        let wf = WorkflowBuilder::new("demo")
            .step(
                "a",
                Executor::ParallelFanout {
                    items: crate::model::ItemSource::Literal {
                        items: vec!["x".into(), "y".into()],
                    },
                    template: crate::model::FanoutTemplate::Command {
                        command: "echo ${ITEM}".into(),
                    },
                    concurrency: 0,
                },
            )
            .build()
            .unwrap();
        assert!(validate_references(&wf).is_ok());
    }
}
