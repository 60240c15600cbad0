//! Integration tests exercising the builder -> compiler -> controller
//! pipeline against a mocked execution platform.

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use workflow_sdk::prelude::*;

fn shell(cmd: &str) -> Executor {
    Executor::Shell {
        command: cmd.to_string(),
    }
}

#[tokio::test]
async fn chain_workflow_compiles_submits_and_streams_to_success() {
    let server = MockServer::start().await;
    let body = "{\"kind\":\"workflow.start\"}\n\
        {\"kind\":\"step.start\",\"name\":\"fetch\"}\n\
        {\"kind\":\"step.end\",\"name\":\"fetch\",\"output\":\"42\"}\n\
        {\"kind\":\"step.start\",\"name\":\"report\"}\n\
        {\"kind\":\"step.end\",\"name\":\"report\"}\n\
        {\"kind\":\"workflow.end\",\"status\":\"success\"}\n";
    Mock::given(method("POST"))
        .and(path("/executions"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let workflow = WorkflowBuilder::new("pipeline")
        .mode(ExecutionMode::Chain)
        .param("target", "https://example.com")
        .step("fetch", shell("curl ${target}"))
        .output("count")
        .step("report", shell("echo ${count}"))
        .build()
        .expect("workflow should build");

    let (canonical, hash) = Compiler::compile(&workflow).expect("workflow should compile");
    assert_eq!(canonical.steps[1].depends, vec!["fetch".to_string()]);
    assert!(!hash.as_str().is_empty());

    let config = ClientConfig::new("test-token").with_endpoint(server.uri());
    let controller = ExecutionController::new(config);
    let result = controller
        .execute(&workflow, IndexMap::new(), CancellationToken::new())
        .await
        .expect("execution should not error");

    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(result.outputs.get("count"), Some(&"42".to_string()));
    let terminal_count = result
        .events
        .iter()
        .filter(|e| e.kind == EventKind::WorkflowEnd)
        .count();
    assert_eq!(terminal_count, 1, "exactly one terminal workflow.end");
}

#[tokio::test]
async fn unresolved_reference_is_rejected_before_any_network_call() {
    let workflow = WorkflowBuilder::new("broken")
        .step("a", shell("echo ${MISSING}"))
        .build()
        .expect("structural build succeeds; reference errors surface at compile time");

    let err = Compiler::compile(&workflow).unwrap_err();
    assert!(matches!(err, CompileError::Graph(GraphError::UnresolvedReference { .. })));
}

#[tokio::test]
async fn rate_limited_response_is_not_silently_retried_past_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/executions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let workflow = WorkflowBuilder::new("demo")
        .step("a", shell("echo 1"))
        .build()
        .unwrap();

    let config = ClientConfig::new("token")
        .with_endpoint(server.uri())
        .with_max_connect_retries(2);
    let controller = ExecutionController::new(config);
    let err = controller
        .execute(&workflow, IndexMap::new(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ControlError::Transport(TransportError::RateLimited { .. })));
}
