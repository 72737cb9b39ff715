//! HTTP tests for the generation endpoint
//!
//! Drives the router with axum-test against the real runtime over an
//! in-memory queue and a scripted worker.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use genbridge_core::GenerationRequest;
use genbridge_runtime::{
    BackoffPolicy, ConsumerConfig, CorrelationTracker, GenerationClient, QueuePublisher,
    ResponseConsumer,
};
use genbridge_testing::{FakeWorker, FailingPublisher, InMemoryQueue, WorkerReply};
use genbridge_web::{AppState, router};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const REQUESTS: &str = "requests";
const RESPONSES: &str = "responses";

fn user_header() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-user-id"),
        HeaderValue::from_static("U1"),
    )
}

struct App {
    server: TestServer,
    queue: Arc<InMemoryQueue>,
    tracker: Arc<CorrelationTracker>,
    shutdown: CancellationToken,
}

fn app<F>(responder: F, timeout: Duration) -> App
where
    F: Fn(&GenerationRequest) -> WorkerReply + Send + Sync + 'static,
{
    let queue = Arc::new(InMemoryQueue::new());
    let tracker = Arc::new(CorrelationTracker::new());
    let shutdown = CancellationToken::new();

    let config = ConsumerConfig {
        receive: genbridge_core::ReceiveOptions {
            max_messages: 10,
            wait_time: Duration::from_millis(20),
            visibility_timeout: Duration::from_secs(30),
        },
        backoff: BackoffPolicy::builder()
            .initial_delay(Duration::from_millis(5))
            .jitter(0.0)
            .build(),
        ..ConsumerConfig::default()
    };
    ResponseConsumer::new(queue.clone(), RESPONSES, tracker.clone(), config)
        .spawn(shutdown.clone());
    FakeWorker::new(queue.clone(), REQUESTS).spawn(responder, shutdown.clone());

    let publisher = Arc::new(QueuePublisher::new(queue.clone(), REQUESTS, RESPONSES));
    let client = GenerationClient::new(tracker.clone(), publisher).with_default_timeout(timeout);
    let server = TestServer::new(router(AppState::new(client, shutdown.clone()))).unwrap();

    App {
        server,
        queue,
        tracker,
        shutdown,
    }
}

#[tokio::test]
async fn generate_returns_file_and_key() {
    let app = app(
        |request| WorkerReply::Succeed {
            file_id: "F9".into(),
            key: format!("generated/{}.pdf", request.file_ids.join("-")),
        },
        Duration::from_secs(2),
    );
    let (name, value) = user_header();

    let response = app
        .server
        .post("/api/v1/files/generate")
        .add_header(name, value)
        .json(&json!({ "file_ids": ["F1", "F2"] }))
        .await;

    response.assert_status(StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({ "file_id": "F9", "key": "generated/F1-F2.pdf" })
    );
    assert!(app.tracker.is_empty());
    app.shutdown.cancel();
}

#[tokio::test]
async fn missing_file_ids_is_bad_request() {
    let app = app(|_| WorkerReply::Ignore, Duration::from_secs(2));
    let (name, value) = user_header();

    let response = app
        .server
        .post("/api/v1/files/generate")
        .add_header(name, value)
        .json(&json!({ "file_ids": [] }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "file_ids is required");
    app.shutdown.cancel();
}

#[tokio::test]
async fn missing_user_header_is_bad_request() {
    let app = app(|_| WorkerReply::Ignore, Duration::from_secs(2));

    let response = app
        .server
        .post("/api/v1/files/generate")
        .json(&json!({ "file_ids": ["F1"] }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "BAD_REQUEST");
    app.shutdown.cancel();
}

#[tokio::test]
async fn worker_failure_is_bad_gateway() {
    let app = app(
        |_| WorkerReply::Fail(Some("render failed".into())),
        Duration::from_secs(2),
    );
    let (name, value) = user_header();

    let response = app
        .server
        .post("/api/v1/files/generate")
        .add_header(name, value)
        .json(&json!({ "file_ids": ["F1"] }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(
        response.json::<Value>(),
        json!({ "code": "GENERATION_FAILED", "message": "render failed" })
    );
    app.shutdown.cancel();
}

#[tokio::test]
async fn silent_worker_is_gateway_timeout() {
    let app = app(|_| WorkerReply::Ignore, Duration::from_millis(50));
    let (name, value) = user_header();

    let response = app
        .server
        .post("/api/v1/files/generate")
        .add_header(name, value)
        .json(&json!({ "file_ids": ["F1"] }))
        .await;

    response.assert_status(StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(
        response.headers().get("retry-after"),
        Some(&HeaderValue::from_static("5"))
    );
    assert!(app.tracker.is_empty());
    app.shutdown.cancel();
}

#[tokio::test]
async fn generate_after_shutdown_is_refused() {
    let app = app(
        |_| WorkerReply::Succeed {
            file_id: "F1".into(),
            key: "K1".into(),
        },
        Duration::from_secs(2),
    );
    app.shutdown.cancel();
    let (name, value) = user_header();

    let response = app
        .server
        .post("/api/v1/files/generate")
        .add_header(name, value)
        .json(&json!({ "file_ids": ["F1"] }))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        response.json::<Value>(),
        json!({ "code": "SERVICE_UNAVAILABLE", "message": "Server is shutting down" })
    );
    assert!(app.queue.is_empty(REQUESTS));
    assert!(app.tracker.is_empty());
}

#[tokio::test]
async fn unreachable_request_queue_is_service_unavailable() {
    let tracker = Arc::new(CorrelationTracker::new());
    let client = GenerationClient::new(tracker.clone(), Arc::new(FailingPublisher::new()));
    let server =
        TestServer::new(router(AppState::new(client, CancellationToken::new()))).unwrap();
    let (name, value) = user_header();

    let response = server
        .post("/api/v1/files/generate")
        .add_header(name, value)
        .json(&json!({ "file_ids": ["F1"] }))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert!(tracker.is_empty());
}

#[tokio::test]
async fn health_reports_pending_requests() {
    let app = app(|_| WorkerReply::Ignore, Duration::from_secs(2));

    let response = app.server.get("/health").await;

    response.assert_status(StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["pending_requests"], 0);

    app.shutdown.cancel();
    app.server
        .get("/health")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn metrics_without_recorder_is_not_found() {
    let app = app(|_| WorkerReply::Ignore, Duration::from_secs(2));

    app.server
        .get("/metrics")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.shutdown.cancel();
}
