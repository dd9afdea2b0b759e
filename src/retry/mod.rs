//! Retry with backoff for infrastructure calls
//!
//! [`execute`] runs an async operation under a [`RetrySpec`]: failures the
//! spec classifies as transient are retried with exponential backoff until
//! `max_attempts` is reached; anything else is returned to the caller
//! unchanged. All state lives in one invocation, so one spec can be shared by
//! every call at a site while other sites tune their own.
//!
//! ```rust
//! use launch_relay::retry::{self, Backoff, RetrySpec};
//! use launch_relay::RelayError;
//!
//! # async fn example() -> launch_relay::Result<()> {
//! let spec = RetrySpec::new("queue-send", 4, Backoff::default(), RelayError::is_transient);
//! let value = retry::execute(&spec, || async { Ok::<_, RelayError>(42) }).await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

mod backoff;
mod jitter;

pub use backoff::Backoff;
pub use jitter::Jitter;

use std::fmt;
use std::future::Future;

/// Retry parameters for one call site
pub struct RetrySpec<E> {
    /// Call-site label used in logs
    pub name: &'static str,
    /// Total attempts including the first; `0` behaves as `1`
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Returns true for faults worth retrying
    pub is_transient: fn(&E) -> bool,
}

impl<E> RetrySpec<E> {
    pub fn new(
        name: &'static str,
        max_attempts: u32,
        backoff: Backoff,
        is_transient: fn(&E) -> bool,
    ) -> Self {
        Self {
            name,
            max_attempts,
            backoff,
            is_transient,
        }
    }
}

impl<E> Clone for RetrySpec<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for RetrySpec<E> {}

impl<E> fmt::Debug for RetrySpec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrySpec")
            .field("name", &self.name)
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish()
    }
}

/// Run `operation` under `spec`
///
/// Returns the first success, or the last error once it is fatal or the
/// attempts are used up.
pub async fn execute<T, E, F, Fut>(spec: &RetrySpec<E>, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let max_attempts = spec.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !(spec.is_transient)(&err) {
            tracing::debug!(site = spec.name, attempt, error = %err, "Fatal failure, not retrying");
            return Err(err);
        }
        if attempt >= max_attempts {
            tracing::warn!(site = spec.name, attempts = attempt, error = %err, "Retries exhausted");
            return Err(err);
        }

        let delay = spec.backoff.delay(attempt - 1);
        tracing::warn!(
            site = spec.name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying after transient failure"
        );
        tokio::time::sleep(delay).await;
    }
}
