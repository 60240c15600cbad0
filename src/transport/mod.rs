//! HTTP transport: submits a compiled workflow and hands back its raw byte
//! stream for [`crate::stream`] to parse.
//!
//! Grounded in the teacher's `AnthropicLlmDriver` (`reqwest::Client` +
//! `bytes_stream()`), generalized with connect-time retry (reusing
//! [`crate::model::RetryPolicy`]) and cooperative cancellation via
//! `tokio_util::sync::CancellationToken`, following the teacher's worker
//! pool's cancellation idiom.

mod error;

pub use error::TransportError;

use bytes::Bytes;
use futures::Stream;
use indexmap::IndexMap;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::compiler::CanonicalWorkflow;
use crate::config::ClientConfig;
use crate::model::RetryPolicy;

#[derive(serde::Serialize)]
struct SubmitBody<'a> {
    workflow: &'a CanonicalWorkflow,
    params: &'a IndexMap<String, String>,
}

/// Submits compiled workflows to the remote execution platform.
pub struct TransportClient {
    http: Client,
    config: ClientConfig,
}

impl TransportClient {
    pub fn new(config: ClientConfig) -> Self {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .expect("reqwest client builds with valid config");
        Self { http, config }
    }

    /// Submit `workflow` for execution, retrying connect-time failures up to
    /// `max_connect_retries` times with exponential backoff. Returns the raw
    /// response byte stream for [`crate::stream::StreamParser`] to frame.
    #[tracing::instrument(skip(self, workflow, params, cancel), fields(workflow = %workflow.name))]
    pub async fn submit_workflow(
        &self,
        workflow: &CanonicalWorkflow,
        params: IndexMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<impl Stream<Item = Result<Bytes, TransportError>>, TransportError> {
        let retry = RetryPolicy::exponential().with_max_attempts(self.config.max_connect_retries);
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }

            match self.try_submit(workflow, &params).await {
                Ok(response) => return Ok(response.bytes_stream().map(|r| r.map_err(TransportError::Connect))),
                Err(err) if err.is_retryable() && retry.has_attempts_remaining(attempt) => {
                    let delay = retry.delay_for_attempt(attempt + 1);
                    tracing::warn!(attempt, ?delay, error = %err, "retrying workflow submission");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn try_submit(
        &self,
        workflow: &CanonicalWorkflow,
        params: &IndexMap<String, String>,
    ) -> Result<reqwest::Response, TransportError> {
        let mut request = self
            .http
            .post(format!("{}/executions", self.config.endpoint))
            .query(&[("operation", "execute_workflow")])
            .header("Authorization", format!("Bearer {}", self.config.credential))
            .header("Accept", "text/event-stream")
            .json(&SubmitBody { workflow, params });

        if self.config.native_sse {
            request = request.query(&[("native_sse", "true")]);
        }

        let response = request.send().await.map_err(TransportError::Connect)?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(std::time::Duration::from_secs);
            let body = response.text().await.unwrap_or_default();
            let mut err = TransportError::from_status(status, body);
            if let TransportError::RateLimited { retry_after: slot } = &mut err {
                *slot = retry_after;
            }
            Err(err)
        }
    }
}

use futures::StreamExt;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::WorkflowBuilder;
    use crate::compiler::Compiler;
    use crate::model::Executor;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn demo_workflow() -> CanonicalWorkflow {
        let wf = WorkflowBuilder::new("demo")
            .step(
                "a",
                Executor::Shell {
                    command: "echo 1".into(),
                },
            )
            .build()
            .unwrap();
        Compiler::compile(&wf).unwrap().0
    }

    #[tokio::test]
    async fn submits_and_streams_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/executions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("data: {}\n\n"))
            .mount(&server)
            .await;

        let config = ClientConfig::new("token").with_endpoint(server.uri());
        let client = TransportClient::new(config);
        let cancel = CancellationToken::new();
        let mut stream = Box::pin(
            client
                .submit_workflow(&demo_workflow(), IndexMap::new(), &cancel)
                .await
                .unwrap(),
        );
        let first = stream.next().await.unwrap().unwrap();
        assert!(String::from_utf8_lossy(&first).contains("data:"));
    }

    #[tokio::test]
    async fn unauthorized_status_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/executions"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let config = ClientConfig::new("token").with_endpoint(server.uri());
        let client = TransportClient::new(config);
        let cancel = CancellationToken::new();
        let result = client
            .submit_workflow(&demo_workflow(), IndexMap::new(), &cancel)
            .await;
        match result {
            Err(err) => assert!(matches!(err, TransportError::Auth { status: 401 })),
            Ok(_) => panic!("expected an auth error"),
        }
    }

    #[tokio::test]
    async fn transient_5xx_is_retried_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/executions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/executions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("data: {}\n\n"))
            .mount(&server)
            .await;

        let config = ClientConfig::new("token")
            .with_endpoint(server.uri())
            .with_max_connect_retries(3);
        let client = TransportClient::new(config);
        let cancel = CancellationToken::new();
        let result = client
            .submit_workflow(&demo_workflow(), IndexMap::new(), &cancel)
            .await;
        assert!(result.is_ok());
    }
}
