//! Jitter for retry delays.
//!
//! - [`Jitter::None`]: exact backoff delay
//! - [`Jitter::Full`]: random delay in `[0, delay]`
//! - [`Jitter::Equal`]: `delay/2 + random[0, delay/2]`

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Randomization applied to a computed backoff delay
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Jitter {
    /// Use the delay unchanged
    #[default]
    None,

    /// Random delay in `[0, delay]`
    Full,

    /// `delay/2 + random[0, delay/2]`; keeps delays non-decreasing while the
    /// exponential base doubles
    Equal,
}

impl Jitter {
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            Jitter::None => delay,
            Jitter::Full => full_jitter(delay),
            Jitter::Equal => equal_jitter(delay),
        }
    }
}

fn full_jitter(delay: Duration) -> Duration {
    let ms = delay.as_millis() as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=ms))
}

fn equal_jitter(delay: Duration) -> Duration {
    let ms = delay.as_millis() as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    let half = ms / 2;
    let jitter = if half == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=half)
    };
    Duration::from_millis(half + jitter)
}
