//! HTTP-level scenarios driven in-process via `tower::ServiceExt::oneshot`.
//!
//! Covers the paths that don't require a live LLM: simulate (mock, no LLM
//! calls), request validation, and unknown/disabled expert routing. The
//! live-LLM scenarios (S1-S4 from the testable-properties list) need a
//! mock-backed `AgentFactory` injection point that isn't wired up yet.

use std::sync::Arc;

use http_body_util::BodyExt;
use maestro_orchestrator::config::{ExpertDescriptor, OrchestratorPolicy, SessionPolicy};
use maestro_orchestrator::{ExpertsConfig, Orchestrator};
use tower::ServiceExt;

fn config_with_chitchat() -> ExpertsConfig {
    ExpertsConfig {
        orchestrator: OrchestratorPolicy::default(),
        experts: vec![ExpertDescriptor {
            id: "chitchat".to_string(),
            display_name: Some("Chitchat".to_string()),
            model: "gpt-4.1-mini".to_string(),
            temperature: 0.7,
            max_tokens: 256,
            session_policy: SessionPolicy::None,
            enabled: true,
            capability_tags: vec!["smalltalk".to_string()],
            tool_server: None,
            instructions: None,
        }],
        tool_servers: vec![],
    }
}

fn test_app(tmp: &tempfile::TempDir) -> axum::Router {
    let orchestrator = Arc::new(Orchestrator::new(config_with_chitchat(), tmp.path().to_path_buf()));
    maestro_server::router(orchestrator)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn simulate_echoes_input_with_mock_prefix_and_no_llm_call() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp);

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/agents/chitchat/simulate")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(r#"{"input":"hello there"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["response"], "[MOCK] hello there");
    assert_eq!(body["metadata"]["mode"], "mock");
    assert!(body["metadata"]["session-id"].as_str().unwrap().starts_with("chitchat-"));
}

#[tokio::test]
async fn simulate_is_idempotent_for_the_same_input() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp);

    for _ in 0..2 {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/agents/chitchat/simulate")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"input":"same query","session-id":"chitchat-aaaaaaaaaaaa"}"#))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["response"], "[MOCK] same query");
    }
}

#[tokio::test]
async fn simulate_rejects_unknown_expert_with_404() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp);

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/agents/no-such-expert/simulate")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(r#"{"input":"hi"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error-code"], "unknown_expert");
}

#[tokio::test]
async fn empty_input_is_rejected_with_422_before_any_dispatch() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp);

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/agents/chitchat/chat")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(r#"{"input":"   "}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn max_steps_above_the_bound_is_rejected_with_422() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp);

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/agents/chitchat/chat")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(r#"{"input":"hi","max-steps":100000}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn max_steps_of_zero_is_rejected_with_422() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp);

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/agents/chitchat/chat")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(r#"{"input":"hi","max-steps":0}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn stream_route_rejects_out_of_bound_max_steps_before_any_dispatch() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp);

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/agents/chitchat/chat/stream")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(r#"{"input":"hi","max-steps":101}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn oversized_input_is_rejected_with_422() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp);

    let oversized = "a".repeat(8_500);
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/agents/chitchat/chat")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::json!({"input": oversized}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
}
