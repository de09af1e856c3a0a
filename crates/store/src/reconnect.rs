//! Backoff schedule and retry loop for the realtime connection.
//!
//! A dropped event stream is re-established by [`reconnect_loop`], which
//! keeps calling the connect function, waiting longer after each failure,
//! until it succeeds or the feed's [`CancellationToken`] fires.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Exponential backoff between realtime connection attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Wait after the first failed attempt.
    pub initial_delay: Duration,
    /// Longest wait between two attempts.
    pub max_delay: Duration,
    /// Growth of the wait after every further failure.
    pub multiplier: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2,
        }
    }
}

impl ReconnectConfig {
    /// The wait following `current`, capped at `max_delay`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(self.multiplier).min(self.max_delay)
    }

    /// Endless sequence of waits, starting at `initial_delay`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        std::iter::successors(Some(self.initial_delay.min(self.max_delay)), |d| {
            Some(self.next_delay(*d))
        })
    }
}

/// Retry `connect` until it yields a connection.
///
/// Returns `None` as soon as `cancel` fires, whether mid-attempt or while
/// waiting for the next one.
pub async fn reconnect_loop<T, E, F, Fut>(
    topic: &str,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
    mut connect: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut waits = config.delays();
    let mut attempt = 1u32;

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(topic, attempt, "Realtime connect abandoned");
                return None;
            }
            result = connect() => result,
        };

        let error = match result {
            Ok(connection) => {
                if attempt > 1 {
                    tracing::info!(topic, attempt, "Realtime connection restored");
                }
                return Some(connection);
            }
            Err(e) => e,
        };

        let wait = waits.next().unwrap_or(config.max_delay);
        tracing::warn!(
            topic,
            attempt,
            error = %error,
            retry_in_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
            "Realtime connect failed"
        );

        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(wait) => {}
        }
        attempt += 1;
    }
}
