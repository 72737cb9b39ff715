//! End-to-end tests for the request/response bridge
//!
//! Runs the real publisher, consumer loop, tracker and client against an
//! in-memory queue with a scripted worker on the other side.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use genbridge_core::{
    CompletionSink, CorrelationId, GeneratedFile, GenerationError, GenerationRequest,
    GenerationResult, MessageQueue, ReceiveOptions,
};
use genbridge_runtime::{
    BackoffPolicy, ConsumerConfig, CorrelationTracker, GenerationClient, MessageDisposition,
    QueuePublisher, ResponseConsumer,
};
use genbridge_testing::{FakeWorker, InMemoryQueue, WorkerReply};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const REQUESTS: &str = "openexam-test-queue";
const RESPONSES: &str = "openexam-test-queue-responses";

// ============================================================================
// Test Fixtures
// ============================================================================

/// Log output for failing runs: `RUST_LOG=genbridge_runtime=debug cargo test`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn consumer_config() -> ConsumerConfig {
    ConsumerConfig {
        receive: ReceiveOptions {
            max_messages: 10,
            wait_time: Duration::from_millis(20),
            visibility_timeout: Duration::from_secs(30),
        },
        max_receive_count: 3,
        backoff: BackoffPolicy::builder()
            .initial_delay(Duration::from_millis(5))
            .max_delay(Duration::from_millis(20))
            .jitter(0.0)
            .build(),
    }
}

struct Bridge {
    queue: Arc<InMemoryQueue>,
    tracker: Arc<CorrelationTracker>,
    client: GenerationClient,
    shutdown: CancellationToken,
    consumer: JoinHandle<()>,
}

impl Bridge {
    fn start() -> Self {
        init_tracing();
        let queue = Arc::new(InMemoryQueue::new());
        let tracker = Arc::new(CorrelationTracker::new());
        let publisher = Arc::new(QueuePublisher::new(queue.clone(), REQUESTS, RESPONSES));
        let shutdown = CancellationToken::new();

        let consumer =
            ResponseConsumer::new(queue.clone(), RESPONSES, tracker.clone(), consumer_config())
                .spawn(shutdown.clone());

        Self {
            client: GenerationClient::new(tracker.clone(), publisher),
            queue,
            tracker,
            shutdown,
            consumer,
        }
    }

    fn worker<F>(&self, responder: F) -> JoinHandle<()>
    where
        F: Fn(&GenerationRequest) -> WorkerReply + Send + Sync + 'static,
    {
        FakeWorker::new(self.queue.clone(), REQUESTS).spawn(responder, self.shutdown.clone())
    }

    async fn generate(
        &self,
        file_ids: &[&str],
        timeout: Duration,
    ) -> Result<GeneratedFile, GenerationError> {
        self.client
            .generate_and_wait(
                file_ids.iter().map(|id| (*id).to_string()).collect(),
                "U1",
                timeout,
                &CancellationToken::new(),
            )
            .await
    }

    async fn stop(self) {
        self.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), self.consumer)
            .await
            .expect("consumer did not stop")
            .unwrap();
    }
}

async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// ============================================================================
// Request / response
// ============================================================================

#[tokio::test]
async fn successful_generation_returns_file_and_clears_registry() {
    let bridge = Bridge::start();
    bridge.worker(|_| WorkerReply::Succeed {
        file_id: "F1".into(),
        key: "K1".into(),
    });

    let result = bridge.generate(&["F1", "F2"], Duration::from_secs(2)).await;

    assert_eq!(
        result,
        Ok(GeneratedFile {
            file_id: "F1".into(),
            key: "K1".into(),
        })
    );
    assert!(bridge.tracker.is_empty());
    eventually(|| bridge.queue.is_empty(RESPONSES)).await;
    bridge.stop().await;
}

#[tokio::test]
async fn request_carries_requester_files_and_response_destination() {
    let bridge = Bridge::start();
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let recorder = seen.clone();
    bridge.worker(move |request| {
        recorder.lock().unwrap().push(request.clone());
        WorkerReply::Succeed {
            file_id: "F".into(),
            key: "K".into(),
        }
    });

    bridge
        .generate(&["F1", "F1", "F2"], Duration::from_secs(2))
        .await
        .unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].file_ids, vec!["F1", "F2"]);
    assert_eq!(seen[0].requester_id, "U1");
    assert_eq!(seen[0].response_destination, RESPONSES);
    bridge.stop().await;
}

#[tokio::test]
async fn worker_failure_message_reaches_caller() {
    let bridge = Bridge::start();
    bridge.worker(|_| WorkerReply::Fail(Some("render failed".into())));

    let result = bridge.generate(&["F1"], Duration::from_secs(2)).await;

    assert_eq!(
        result,
        Err(GenerationError::WorkerFailure("render failed".into()))
    );
    assert!(bridge.tracker.is_empty());
    bridge.stop().await;
}

#[tokio::test]
async fn worker_failure_without_message_uses_generic_text() {
    let bridge = Bridge::start();
    bridge.worker(|_| WorkerReply::Fail(None));

    let result = bridge.generate(&["F1"], Duration::from_secs(2)).await;

    assert_eq!(
        result,
        Err(GenerationError::WorkerFailure("generation failed".into()))
    );
    bridge.stop().await;
}

#[tokio::test]
async fn slow_worker_times_out_and_late_response_is_discarded() {
    let bridge = Bridge::start();
    FakeWorker::new(bridge.queue.clone(), REQUESTS)
        .with_delay(Duration::from_millis(150))
        .spawn(
            |_| WorkerReply::Succeed {
                file_id: "F1".into(),
                key: "K1".into(),
            },
            bridge.shutdown.clone(),
        );

    let started = Instant::now();
    let result = bridge.generate(&["F1"], Duration::from_millis(50)).await;

    assert!(matches!(
        result,
        Err(GenerationError::Timeout { timeout, .. }) if timeout == Duration::from_millis(50)
    ));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(bridge.tracker.is_empty());

    // The late response arrives, finds no waiter, and is acknowledged.
    eventually(|| bridge.queue.deleted_count() == 2).await;
    assert!(bridge.queue.is_empty(RESPONSES));
    bridge.stop().await;
}

#[tokio::test]
async fn concurrent_requests_receive_their_own_results() {
    let bridge = Arc::new(Bridge::start());
    bridge.worker(|request| WorkerReply::Succeed {
        file_id: request.file_ids[0].clone(),
        key: format!("generated/{}", request.file_ids[0]),
    });

    let mut handles = Vec::new();
    for i in 0..20 {
        let bridge = bridge.clone();
        handles.push(tokio::spawn(async move {
            let file_id = format!("F{i}");
            let result = bridge.generate(&[file_id.as_str()], Duration::from_secs(5)).await;
            (file_id, result)
        }));
    }

    for handle in handles {
        let (file_id, result) = handle.await.unwrap();
        assert_eq!(result.map(|file| file.key), Ok(format!("generated/{file_id}")));
    }
    assert!(bridge.tracker.is_empty());
}

// ============================================================================
// Consumer robustness
// ============================================================================

#[tokio::test]
async fn malformed_response_does_not_disturb_other_waiters() {
    let bridge = Bridge::start();
    bridge
        .queue
        .send(RESPONSES, "{\"request_id\": 42")
        .await
        .unwrap();
    bridge
        .queue
        .send(RESPONSES, r#"{"file_id":"F1","success":true}"#)
        .await
        .unwrap();
    bridge.worker(|_| WorkerReply::Succeed {
        file_id: "F1".into(),
        key: "K1".into(),
    });

    let result = bridge.generate(&["F1"], Duration::from_secs(2)).await;

    assert_eq!(result.map(|file| file.key), Ok("K1".to_string()));
    eventually(|| bridge.queue.is_empty(RESPONSES)).await;
    bridge.stop().await;
}

#[tokio::test]
async fn unknown_request_id_is_acknowledged() {
    let bridge = Bridge::start();
    bridge
        .queue
        .send(
            RESPONSES,
            &genbridge_testing::failure_body("never-registered", Some("boom")),
        )
        .await
        .unwrap();

    eventually(|| bridge.queue.is_empty(RESPONSES)).await;
    assert_eq!(bridge.queue.deleted_count(), 1);
    bridge.stop().await;
}

/// Sink that rejects every delivery with a non-`NotFound` error.
struct RejectingSink {
    calls: AtomicUsize,
}

impl CompletionSink for RejectingSink {
    fn complete(
        &self,
        correlation_id: &CorrelationId,
        _result: GenerationResult,
    ) -> Result<(), GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GenerationError::Released(correlation_id.clone()))
    }
}

#[tokio::test]
async fn poison_message_is_dropped_after_receive_ceiling() {
    let queue = Arc::new(InMemoryQueue::new());
    let sink = Arc::new(RejectingSink {
        calls: AtomicUsize::new(0),
    });
    let mut config = consumer_config();
    config.receive.visibility_timeout = Duration::ZERO;

    queue
        .send(RESPONSES, &genbridge_testing::success_body("R9", "F", "K"))
        .await
        .unwrap();

    let shutdown = CancellationToken::new();
    let handle = ResponseConsumer::new(queue.clone(), RESPONSES, sink.clone(), config)
        .spawn(shutdown.clone());

    eventually(|| queue.is_empty(RESPONSES)).await;
    shutdown.cancel();
    handle.await.unwrap();

    // Retained on deliveries 1-3, deleted on the 4th.
    assert_eq!(sink.calls.load(Ordering::SeqCst), 4);
    assert_eq!(queue.deleted_count(), 1);
}

#[tokio::test]
async fn consumer_recovers_after_receive_errors() {
    let bridge = Bridge::start();
    bridge.queue.fail_next_receives(2);
    bridge.worker(|_| WorkerReply::Succeed {
        file_id: "F1".into(),
        key: "K1".into(),
    });

    let result = bridge.generate(&["F1"], Duration::from_secs(2)).await;

    assert!(result.is_ok());
    bridge.stop().await;
}

#[tokio::test]
async fn response_replayed_after_failed_delete_is_acknowledged_as_orphan() {
    let queue = Arc::new(InMemoryQueue::new());
    let tracker = Arc::new(CorrelationTracker::new());
    let body = genbridge_testing::success_body("R5", "F5", "K5");
    queue.send(RESPONSES, &body).await.unwrap();

    let mut config = consumer_config();
    config.receive.wait_time = Duration::ZERO;
    let consumer = ResponseConsumer::new(queue.clone(), RESPONSES, tracker.clone(), config);
    let slot = tracker.register(CorrelationId::from("R5")).unwrap();

    // First delivery completes the waiter, but the delete is lost.
    queue.fail_next_deletes(1);
    let first = consumer.poll_once().await.unwrap();
    assert_eq!(first, vec![MessageDisposition::Completed]);
    assert_eq!(queue.bodies(RESPONSES), vec![body]);
    assert_eq!(queue.deleted_count(), 0);

    let file = tracker
        .wait(slot, Duration::from_secs(1), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(file.key, "K5");

    // Still inside the visibility window.
    assert!(consumer.poll_once().await.unwrap().is_empty());

    // Redelivery finds no waiter and removes the message for good.
    queue.make_visible(RESPONSES);
    let replay = consumer.poll_once().await.unwrap();
    assert_eq!(replay, vec![MessageDisposition::Orphaned]);
    assert!(queue.is_empty(RESPONSES));
    assert_eq!(queue.deleted_count(), 1);
    assert!(tracker.is_empty());
}

// ============================================================================
// Cancellation and shutdown
// ============================================================================

#[tokio::test]
async fn already_cancelled_caller_publishes_nothing() {
    let bridge = Bridge::start();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = bridge
        .client
        .generate_and_wait(vec!["F1".into()], "U1", Duration::from_secs(5), &cancel)
        .await;

    assert!(matches!(result, Err(GenerationError::Cancelled(_))));
    assert_eq!(bridge.queue.len(REQUESTS), 0);
    assert!(bridge.tracker.is_empty());
    bridge.stop().await;
}

#[tokio::test]
async fn caller_cancellation_ends_wait_promptly() {
    let bridge = Bridge::start();
    bridge.worker(|_| WorkerReply::Ignore);
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let result = bridge
        .client
        .generate_and_wait(vec!["F1".into()], "U1", Duration::from_secs(30), &cancel)
        .await;

    assert!(matches!(result, Err(GenerationError::Cancelled(_))));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(bridge.tracker.is_empty());
    bridge.stop().await;
}

#[tokio::test]
async fn cleanup_releases_waiters_on_shutdown() {
    let bridge = Arc::new(Bridge::start());
    bridge.worker(|_| WorkerReply::Ignore);

    let waiter = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.generate(&["F1"], Duration::from_secs(30)).await })
    };
    eventually(|| bridge.tracker.len() == 1).await;

    bridge.shutdown.cancel();
    assert_eq!(bridge.tracker.cleanup(), 1);

    let result = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter was not released")
        .unwrap();
    assert!(matches!(result, Err(GenerationError::Released(_))));
    assert!(bridge.tracker.is_empty());
}

#[tokio::test]
async fn publish_failure_leaves_nothing_behind() {
    let bridge = Bridge::start();
    bridge.queue.fail_sends(true);

    let result = bridge.generate(&["F1"], Duration::from_secs(2)).await;

    assert!(matches!(result, Err(GenerationError::PublishFailed(_))));
    assert!(bridge.tracker.is_empty());
    assert!(bridge.queue.is_empty(REQUESTS));
    bridge.stop().await;
}
