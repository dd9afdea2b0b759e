use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;

use tokio_util::sync::CancellationToken;

use crate::bridge::{EventPublisher, QueueBridge};
use crate::broker::EventBroker;
use crate::config::{QueueProvider, RelayConfig};
use crate::error::{RelayError, Result};
use crate::types::LaunchEvent;

/// Planets a simulated rocket can head for.
pub const DESTINATIONS: [&str; 7] = [
    "Mercury", "Venus", "Mars", "Jupiter", "Saturn", "Uranus", "Neptune",
];

const ROCKET_ID_LEN: usize = 10;

/// Execute the `send` command: enqueue simulated launches.
pub async fn execute(
    config_path: Option<&Path>,
    count: Option<u64>,
    interval_ms: u64,
    source: &str,
) -> Result<()> {
    let config = RelayConfig::load(config_path)?;
    if !config.queue.enabled {
        return Err(RelayError::Config(
            "queue bridge is disabled; set [queue] enabled = true or LAUNCH_RELAY_QUEUE_ENABLED=1"
                .to_string(),
        ));
    }
    if config.queue.provider == QueueProvider::Memory {
        tracing::warn!("Memory queue selected, launches will not leave this process");
    }

    let bridge = QueueBridge::from_config(&config.queue).await?;
    if !bridge.is_enabled() {
        return Err(RelayError::Config("no usable queue configured".to_string()));
    }
    let publisher = bridge.publisher(Arc::new(EventBroker::new()));

    println!(
        "Rocket client starting. Queue={} Count={} Interval={}ms",
        config.queue.queue_name,
        count.map_or_else(|| "unbounded".to_string(), |c| c.to_string()),
        interval_ms
    );
    println!("Press Ctrl+C to stop");

    let stop = CancellationToken::new();
    let signal = tokio::spawn({
        let stop = stop.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                stop.cancel();
            }
        }
    });

    let result = send_launches(
        publisher.as_ref(),
        count,
        Duration::from_millis(interval_ms),
        source,
        &stop,
    )
    .await;
    signal.abort();
    let sent = result?;

    bridge.close().await?;
    println!("Done. Sent {} launches", sent);
    Ok(())
}

/// Publish launches until `count` is reached or `stop` fires
///
/// `stop` interrupts a publish that is still waiting on the queue as well as
/// the pause between launches. Returns the number of launches sent.
async fn send_launches(
    publisher: &dyn EventPublisher,
    count: Option<u64>,
    interval: Duration,
    source: &str,
    stop: &CancellationToken,
) -> Result<u64> {
    let mut sent = 0u64;
    while count.map_or(true, |c| sent < c) {
        let event = random_launch(source, &mut rand::thread_rng());
        tokio::select! {
            _ = stop.cancelled() => break,
            published = publisher.publish(&event) => published?,
        }
        sent += 1;
        println!(
            "Sent {} {} -> {}",
            event.rocket_id, event.source, event.destination
        );

        if count.is_some_and(|c| sent >= c) {
            break;
        }
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    Ok(sent)
}

/// Build a launch from `source` to a random planet with a short random id
pub fn random_launch<R: Rng>(source: &str, rng: &mut R) -> LaunchEvent {
    let destination = DESTINATIONS.choose(rng).copied().unwrap_or("Mars");
    let rocket_id: String = uuid::Uuid::from_u128(rng.gen())
        .simple()
        .to_string()
        .chars()
        .take(ROCKET_ID_LEN)
        .collect();

    LaunchEvent::now(source, destination, rocket_id)
}
