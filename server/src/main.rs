//! Genbridge server.
//!
//! Accepts `POST /api/v1/files/generate`, publishes the request to SQS, and
//! answers once the worker's response arrives on the response queue.
//!
//! Run with: cargo run --bin genbridge
//! Health: http://localhost:3000/health
//! Generate: POST http://localhost:3000/api/v1/files/generate

use axum::{Router, routing::get};
use genbridge_core::MessageQueue;
use genbridge_runtime::{
    BridgeConfig, CorrelationTracker, GenerationClient, MetricsServer, QueuePublisher,
    ResponseConsumer,
};
use genbridge_sqs::SqsMessageQueue;
use genbridge_web::{AppState, handlers, router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = BridgeConfig::from_env()?;
    info!(
        environment = %config.environment,
        region = %config.region,
        timeout_secs = config.generation_timeout.as_secs(),
        "Starting genbridge"
    );

    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let mut metrics = MetricsServer::new(config.metrics_addr.unwrap_or(http_addr));
    metrics.start()?;
    let metrics = Arc::new(metrics);

    let mut sqs = SqsMessageQueue::builder().region(&config.region);
    if let Some(endpoint_url) = &config.endpoint_url {
        sqs = sqs.endpoint_url(endpoint_url);
    }
    let sqs = sqs.build().await;

    let request_queue_url = sqs.resolve_queue_url(&config.request_queue_url).await?;
    let response_queue_url = sqs.resolve_queue_url(&config.response_queue_url).await?;
    let queue: Arc<dyn MessageQueue> = Arc::new(sqs);

    let tracker = Arc::new(CorrelationTracker::new());
    let publisher = Arc::new(QueuePublisher::new(
        queue.clone(),
        request_queue_url,
        response_queue_url.clone(),
    ));
    let client = GenerationClient::new(tracker.clone(), publisher)
        .with_default_timeout(config.generation_timeout);

    let shutdown = CancellationToken::new();
    let consumer = ResponseConsumer::new(
        queue,
        response_queue_url,
        tracker.clone(),
        config.consumer.clone(),
    )
    .spawn(shutdown.clone());

    let state = AppState::new(client, shutdown.clone()).with_metrics(metrics.clone());

    let metrics_handle = match config.metrics_addr {
        Some(addr) => {
            let app = Router::new()
                .route("/metrics", get(handlers::metrics))
                .with_state(state.clone());
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!(addr = %addr, "Metrics available at http://{addr}/metrics");
            let shutdown = shutdown.clone();
            Some(tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown.cancelled_owned())
                    .await
            }))
        }
        None => None,
    };

    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    info!(addr = %http_addr, "HTTP server listening");

    let signal_shutdown = shutdown.clone();
    let signal_tracker = tracker.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            signal_shutdown.cancel();
            let released = signal_tracker.cleanup();
            info!(released, "Released pending generation requests");
        })
        .await?;

    if let Err(e) = consumer.await {
        warn!("Consumer task error during shutdown: {}", e);
    }
    if let Some(handle) = metrics_handle {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Metrics server error during shutdown: {}", e),
            Err(e) => warn!("Metrics server task error during shutdown: {}", e),
        }
    }

    // Waits that raced the signal.
    tracker.cleanup();
    info!("Shutdown complete");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "genbridge=info,genbridge_runtime=info,genbridge_sqs=info,genbridge_web=info,\
                 tower_http=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Graceful shutdown signal handler.
///
/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (in production environments)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
