//! JetStream setup: connection options, stream, and durable consumer

use super::config::{NatsConfig, StorageType};
use crate::error::{RelayError, Result};
use async_nats::jetstream;
use async_nats::jetstream::context::PublishErrorKind;
use std::time::Duration;

/// Build NATS connect options from config
pub(super) fn build_connect_options(config: &NatsConfig) -> async_nats::ConnectOptions {
    let mut opts = async_nats::ConnectOptions::new()
        .connection_timeout(Duration::from_secs(config.connect_timeout_secs))
        .request_timeout(Some(Duration::from_secs(config.request_timeout_secs)));

    if let Some(ref token) = config.token {
        opts = opts.token(token.clone());
    }

    opts
}

/// Ensure the work-queue stream for `subject` exists
pub(super) async fn ensure_stream(
    js: &jetstream::Context,
    config: &NatsConfig,
    subject: &str,
) -> Result<jetstream::stream::Stream> {
    let storage = match config.storage {
        StorageType::File => jetstream::stream::StorageType::File,
        StorageType::Memory => jetstream::stream::StorageType::Memory,
    };

    let stream_config = jetstream::stream::Config {
        name: config.stream_name.clone(),
        subjects: vec![subject.to_string()],
        storage,
        retention: jetstream::stream::RetentionPolicy::WorkQueue,
        ..Default::default()
    };

    let stream = js.get_or_create_stream(stream_config).await.map_err(|e| {
        RelayError::Stream(format!(
            "Failed to create/get stream '{}': {}",
            config.stream_name, e
        ))
    })?;

    tracing::info!(stream = %config.stream_name, subject, "JetStream stream ready");
    Ok(stream)
}

/// Durable pull consumer config for the queue subject
pub(super) fn build_consumer_config(
    consumer_name: &str,
    subject: &str,
    config: &NatsConfig,
) -> jetstream::consumer::pull::Config {
    jetstream::consumer::pull::Config {
        durable_name: Some(consumer_name.to_string()),
        filter_subject: subject.to_string(),
        ack_policy: jetstream::consumer::AckPolicy::Explicit,
        deliver_policy: jetstream::consumer::DeliverPolicy::All,
        ack_wait: Duration::from_secs(config.ack_wait_secs),
        ..Default::default()
    }
}

/// Map a JetStream publish failure onto the relay error taxonomy
///
/// Ack timeouts and broken pipes are transient; a missing stream or a
/// rejected sequence will not heal on retry.
pub(super) fn classify_publish_error(
    subject: &str,
    err: &jetstream::context::PublishError,
) -> RelayError {
    classify_publish_kind(subject, err.kind(), err.to_string())
}

fn classify_publish_kind(subject: &str, kind: PublishErrorKind, detail: String) -> RelayError {
    match kind {
        PublishErrorKind::TimedOut => {
            RelayError::Timeout(format!("publish ack for '{}': {}", subject, detail))
        }
        PublishErrorKind::BrokenPipe => {
            RelayError::Connection(format!("publish to '{}': {}", subject, detail))
        }
        _ => RelayError::Publish {
            subject: subject.to_string(),
            reason: detail,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumer_config() {
        let config = NatsConfig::default();
        let consumer = build_consumer_config("launch-relay", "rocket-messages", &config);
        assert_eq!(consumer.durable_name.as_deref(), Some("launch-relay"));
        assert_eq!(consumer.filter_subject, "rocket-messages");
        assert_eq!(consumer.ack_policy, jetstream::consumer::AckPolicy::Explicit);
        assert_eq!(consumer.ack_wait, Duration::from_secs(30));
    }

    #[test]
    fn test_publish_error_classification() {
        let timed_out = classify_publish_kind("q", PublishErrorKind::TimedOut, "t".into());
        assert!(timed_out.is_transient());

        let broken = classify_publish_kind("q", PublishErrorKind::BrokenPipe, "b".into());
        assert!(broken.is_transient());

        let err = classify_publish_kind("q", PublishErrorKind::StreamNotFound, "missing".into());
        assert!(!err.is_transient());
        assert!(matches!(err, RelayError::Publish { ref subject, .. } if subject == "q"));
    }
}
