pub mod router;
pub mod state;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::bridge::QueueBridge;
use crate::broker::EventBroker;
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};

/// Start the HTTP server with the given configuration.
///
/// Runs until Ctrl+C. On shutdown the broker is closed so open streams end,
/// and the queue listener finishes its in-flight message before returning.
pub async fn start(config: RelayConfig) -> Result<()> {
    let broker = Arc::new(EventBroker::new());
    let bridge = QueueBridge::from_config(&config.queue).await?;
    let shutdown = CancellationToken::new();

    let listener_task = bridge
        .listener(broker.clone())
        .map(|listener| tokio::spawn(listener.run(shutdown.clone())));

    let publisher = bridge.publisher(broker.clone());
    tracing::info!(
        publisher = publisher.name(),
        provider = bridge.provider().unwrap_or("none"),
        "Initialized event relay"
    );

    let bind_addr = config.bind_address();
    let app = router::build(state::AppState::new(
        broker.clone(),
        publisher,
        shutdown.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| RelayError::Server(format!("Failed to bind to {bind_addr}: {e}")))?;

    tracing::info!("Server listening on {bind_addr}");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone(), broker.clone()))
        .await
        .map_err(|e| RelayError::Server(format!("Server error: {e}")));

    // The server may also stop on its own error
    shutdown.cancel();
    broker.close();

    if let Some(task) = listener_task {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Queue listener task failed");
        }
    }

    tracing::info!("Server stopped");
    served
}

async fn shutdown_signal(shutdown: CancellationToken, broker: Arc<EventBroker>) {
    tokio::select! {
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                shutdown.cancelled().await;
            }
        },
        _ = shutdown.cancelled() => {}
    }

    shutdown.cancel();
    broker.close();
}
