//! Execution Controller: orchestrates compile -> submit -> parse -> deliver,
//! accumulating step outputs and producing exactly one terminal
//! `workflow.end` event per execution.

mod error;

pub use error::ControlError;

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use crate::compiler::Compiler;
use crate::config::ClientConfig;
use crate::model::Workflow;
use crate::stream::{self, DeliveryError, EventKind, StreamEvent};
use crate::transport::TransportClient;

/// Terminal status of a completed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failure,
    Cancelled,
    Timeout,
    StreamBroken,
}

/// The full result of driving one execution to completion.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    /// Every normalized event observed, in arrival order.
    pub events: Vec<StreamEvent>,
    /// Step outputs captured via `output` declarations, keyed by name.
    pub outputs: IndexMap<String, String>,
}

/// Orchestrates one workflow execution end-to-end.
pub struct ExecutionController {
    transport: TransportClient,
    config: ClientConfig,
}

impl ExecutionController {
    pub fn new(config: ClientConfig) -> Self {
        let transport = TransportClient::new(config.clone());
        Self { transport, config }
    }

    /// Compile `workflow`, submit it, and drive its event stream to
    /// completion, honoring `cancel` and the configured execution timeout.
    ///
    /// Cancellation is idempotent: once a terminal event has been produced
    /// (by completion, error, or cancellation), further signals are ignored.
    #[tracing::instrument(skip(self, workflow, params, cancel), fields(workflow = %workflow.name))]
    pub async fn execute(
        &self,
        workflow: &Workflow,
        params: IndexMap<String, String>,
        cancel: CancellationToken,
    ) -> Result<ExecutionResult, ControlError> {
        let (canonical, _hash) = Compiler::compile(workflow)?;

        let byte_stream = match self.transport.submit_workflow(&canonical, params, &cancel).await {
            Ok(stream) => stream,
            Err(crate::transport::TransportError::Cancelled) => {
                return Ok(ExecutionResult {
                    status: ExecutionStatus::Cancelled,
                    events: vec![Self::synthetic_workflow_end("cancelled", None)],
                    outputs: IndexMap::new(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        let mut rx = stream::drive(
            Box::pin(byte_stream),
            self.config.max_line_bytes,
            self.config.event_channel_capacity,
        );

        let mut events = Vec::new();
        let mut outputs = IndexMap::new();

        let drain = async {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        events.push(Self::synthetic_workflow_end("cancelled", None));
                        return ExecutionStatus::Cancelled;
                    }
                    item = rx.recv() => {
                        match item {
                            Some(Ok(event)) => {
                                Self::capture_output(workflow, &event, &mut outputs);
                                let terminal = match event.kind {
                                    EventKind::WorkflowEnd => Some(Self::status_from_payload(&event)),
                                    EventKind::StreamBroken => Some(ExecutionStatus::StreamBroken),
                                    _ => None,
                                };
                                events.push(event);
                                if let Some(status) = terminal {
                                    return status;
                                }
                            }
                            Some(Err(DeliveryError::Stream(_))) => continue,
                            Some(Err(DeliveryError::Transport(_))) | None => {
                                events.push(StreamEvent::new(
                                    EventKind::StreamBroken,
                                    serde_json::json!({}),
                                    0,
                                ));
                                events.push(Self::synthetic_workflow_end("failure", Some("stream_broken")));
                                return ExecutionStatus::StreamBroken;
                            }
                        }
                    }
                }
            }
        };

        let status = match tokio::time::timeout(self.config.execution_timeout, drain).await {
            Ok(status) => status,
            Err(_) => {
                events.push(Self::synthetic_workflow_end("failure", Some("timeout")));
                ExecutionStatus::Timeout
            }
        };

        Ok(ExecutionResult {
            status,
            events,
            outputs,
        })
    }

    /// Builds a synthetic terminal `workflow.end` event for paths where the
    /// platform never emitted one (cancellation, stream failure, timeout).
    fn synthetic_workflow_end(status: &str, kind: Option<&str>) -> StreamEvent {
        let mut payload = serde_json::json!({ "status": status, "synthetic": true });
        if let Some(kind) = kind {
            payload["kind"] = serde_json::Value::String(kind.to_string());
        }
        StreamEvent::new(EventKind::WorkflowEnd, payload, 0)
    }

    fn status_from_payload(event: &StreamEvent) -> ExecutionStatus {
        match event.payload.get("status").and_then(|v| v.as_str()) {
            Some("failure") => ExecutionStatus::Failure,
            Some("cancelled") => ExecutionStatus::Cancelled,
            Some("timeout") => ExecutionStatus::Timeout,
            _ => ExecutionStatus::Success,
        }
    }

    fn capture_output(workflow: &Workflow, event: &StreamEvent, outputs: &mut IndexMap<String, String>) {
        if event.kind != EventKind::StepEnd {
            return;
        }
        let Some(step_name) = event.payload.get("name").and_then(|v| v.as_str()) else {
            return;
        };
        let Some(step) = workflow.step(step_name) else {
            return;
        };
        let Some(output_name) = &step.output else {
            return;
        };
        if let Some(value) = event.payload.get("output").and_then(|v| v.as_str()) {
            outputs.insert(output_name.clone(), value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::WorkflowBuilder;
    use crate::model::Executor;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn demo_workflow() -> Workflow {
        WorkflowBuilder::new("demo")
            .step(
                "a",
                Executor::Shell {
                    command: "echo 1".into(),
                },
            )
            .output("result")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn invariant_4_exactly_one_terminal_workflow_end() {
        let server = MockServer::start().await;
        let body = "{\"kind\":\"workflow.start\"}\n\
            {\"kind\":\"step.start\",\"name\":\"a\"}\n\
            {\"kind\":\"step.end\",\"name\":\"a\",\"output\":\"hi\"}\n\
            {\"kind\":\"workflow.end\",\"status\":\"success\"}\n";
        Mock::given(method("POST"))
            .and(path("/executions"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let config = ClientConfig::new("token").with_endpoint(server.uri());
        let controller = ExecutionController::new(config);
        let result = controller
            .execute(&demo_workflow(), IndexMap::new(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status, ExecutionStatus::Success);
        let terminal_count = result
            .events
            .iter()
            .filter(|e| e.kind == EventKind::WorkflowEnd)
            .count();
        assert_eq!(terminal_count, 1);
        assert_eq!(result.outputs.get("result"), Some(&"hi".to_string()));
    }

    #[tokio::test]
    async fn s5_broken_stream_surfaces_stream_broken_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/executions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"kind\":\"workflow.start\"}\n"))
            .mount(&server)
            .await;

        let config = ClientConfig::new("token").with_endpoint(server.uri());
        let controller = ExecutionController::new(config);
        let result = controller
            .execute(&demo_workflow(), IndexMap::new(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.status, ExecutionStatus::StreamBroken);
        assert_eq!(result.events.last().unwrap().kind, EventKind::WorkflowEnd);
        assert_eq!(
            result.events[result.events.len() - 2].kind,
            EventKind::StreamBroken
        );
    }

    #[tokio::test]
    async fn s6_cancellation_yields_cancelled_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/executions"))
            .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(5)))
            .mount(&server)
            .await;

        let config = ClientConfig::new("token").with_endpoint(server.uri());
        let controller = ExecutionController::new(config);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = controller
            .execute(&demo_workflow(), IndexMap::new(), cancel)
            .await
            .unwrap();
        assert_eq!(result.status, ExecutionStatus::Cancelled);
        assert_eq!(result.events.last().unwrap().kind, EventKind::WorkflowEnd);
    }
}
