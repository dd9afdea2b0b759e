//! Core event types for launch-relay
//!
//! All types use camelCase JSON serialization for wire compatibility with
//! browsers, the durable queue, and the `send` client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single rocket launch event
///
/// Immutable once it has entered the broker. `rocket_id` is the correlation
/// id carried end to end (`rocketId` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchEvent {
    /// Planet the rocket departs from
    pub source: String,

    /// Planet the rocket is headed to
    pub destination: String,

    /// Correlation id of the launch
    pub rocket_id: String,

    /// Launch time, always UTC
    pub launch_time: DateTime<Utc>,
}

impl LaunchEvent {
    /// Create an event launched at `launch_time`
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        rocket_id: impl Into<String>,
        launch_time: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            rocket_id: rocket_id.into(),
            launch_time,
        }
    }

    /// Create an event launched now
    pub fn now(
        source: impl Into<String>,
        destination: impl Into<String>,
        rocket_id: impl Into<String>,
    ) -> Self {
        Self::new(source, destination, rocket_id, Utc::now())
    }
}

/// Body of an HTTP publish request
///
/// Same shape as [`LaunchEvent`] except `launchTime` may be omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub source: String,
    pub destination: String,
    pub rocket_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_time: Option<DateTime<Utc>>,
}

impl PublishRequest {
    /// Turn the request into an event, filling an unset launch time with `now`
    ///
    /// This is the only place launch times are normalized.
    pub fn into_event(self, now: DateTime<Utc>) -> LaunchEvent {
        let launch_time = match self.launch_time {
            Some(t) if !is_unset(&t) => t,
            _ => now,
        };
        LaunchEvent {
            source: self.source,
            destination: self.destination,
            rocket_id: self.rocket_id,
            launch_time,
        }
    }
}

/// `0001-01-01T00:00:00Z`, the zero value most clients send for "no time"
const MIN_DATE_SECS: i64 = -62_135_596_800;

/// Only the exact zero sentinels count as unset: `0001-01-01T00:00:00Z` and
/// the Unix epoch. Any other instant, including pre-1970 ones, is kept.
fn is_unset(t: &DateTime<Utc>) -> bool {
    t.timestamp_subsec_nanos() == 0 && matches!(t.timestamp(), 0 | MIN_DATE_SECS)
}
