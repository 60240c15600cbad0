//! Typed executor configurations.
//!
//! Each variant serializes on the wire as `{"type": <discriminator>, "config": {...}}`,
//! matching the tagged-enum shape the teacher uses for `WorkflowAction`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single typed argument declaration for a container executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerArg {
    pub name: String,
    #[serde(rename = "type")]
    pub arg_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A file to materialize inside the container filesystem before the step runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMount {
    pub destination: String,
    pub content: String,
}

/// A side-car service started alongside a container step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SidecarService {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub exposed_ports: Vec<u16>,
    #[serde(default)]
    pub env: IndexMap<String, String>,
}

/// Where a parallel-fanout executor draws its items from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ItemSource {
    /// A literal, fixed list of item values.
    Literal { items: Vec<String> },
    /// A `${NAME}` reference resolved at compile time to a param/env/output.
    Variable { reference: String },
}

/// What runs for each item of a parallel-fanout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FanoutTemplate {
    /// A shell command run once per item; may reference `${ITEM}`.
    Command { command: String },
    /// A nested step executor run once per item.
    Step { executor: Box<Executor> },
}

/// The tagged set of executor variants a step may run.
///
/// Each string-typed field may embed `${NAME}` or `${NAME:default}`
/// substitution tokens, resolved purely textually by the compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum Executor {
    /// Run a command string in a generic shell environment.
    Shell { command: String },

    /// Run a container image, optionally overriding its entrypoint, running
    /// an embedded script, declaring typed arguments, mounting files, and
    /// starting side-car services.
    Container {
        image: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        entrypoint: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        script: Option<String>,
        #[serde(default)]
        args: Vec<ContainerArg>,
        #[serde(default)]
        mounts: Vec<FileMount>,
        #[serde(default)]
        sidecars: Vec<SidecarService>,
    },

    /// Invoke another workflow definition by name or path.
    SubWorkflow {
        reference: String,
        #[serde(default)]
        params: IndexMap<String, String>,
    },

    /// Run a command or nested step once per item, bounded by a concurrency
    /// ceiling (0 means unbounded; see DESIGN.md).
    ParallelFanout {
        items: ItemSource,
        template: FanoutTemplate,
        #[serde(default)]
        concurrency: u32,
    },

    /// Issue an HTTP request.
    Http {
        url: String,
        #[serde(default = "default_http_method")]
        method: String,
        #[serde(default)]
        headers: IndexMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },

    /// An LLM-driven step. Opaque from the core's perspective: it serializes
    /// like any other executor and the platform is responsible for running it.
    InlineAgent {
        prompt: String,
        model: String,
        #[serde(default)]
        tools: Vec<Executor>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        runner: Option<String>,
    },
}

fn default_http_method() -> String {
    "GET".to_string()
}

impl Executor {
    /// All string-typed fields eligible for `${NAME}` substitution, in a
    /// stable order. Used by both the builder's reference check and the
    /// compiler's textual substitution pass.
    pub fn template_fields(&self) -> Vec<&str> {
        match self {
            Executor::Shell { command } => vec![command.as_str()],
            Executor::Container {
                command,
                entrypoint,
                script,
                mounts,
                ..
            } => {
                let mut fields: Vec<&str> = Vec::new();
                if let Some(c) = command {
                    fields.push(c.as_str());
                }
                if let Some(e) = entrypoint {
                    fields.push(e.as_str());
                }
                if let Some(s) = script {
                    fields.push(s.as_str());
                }
                for m in mounts {
                    fields.push(m.content.as_str());
                }
                fields
            }
            Executor::SubWorkflow { reference, params } => {
                let mut fields = vec![reference.as_str()];
                fields.extend(params.values().map(|v| v.as_str()));
                fields
            }
            Executor::ParallelFanout {
                items, template, ..
            } => {
                let mut fields = Vec::new();
                if let ItemSource::Variable { reference } = items {
                    fields.push(reference.as_str());
                }
                match template {
                    FanoutTemplate::Command { command } => fields.push(command.as_str()),
                    FanoutTemplate::Step { executor } => fields.extend(executor.template_fields()),
                }
                fields
            }
            Executor::Http {
                url, headers, body, ..
            } => {
                let mut fields = vec![url.as_str()];
                fields.extend(headers.values().map(|v| v.as_str()));
                if let Some(b) = body {
                    fields.push(b.as_str());
                }
                fields
            }
            Executor::InlineAgent { prompt, tools, .. } => {
                let mut fields = vec![prompt.as_str()];
                for t in tools {
                    fields.extend(t.template_fields());
                }
                fields
            }
        }
    }
}
