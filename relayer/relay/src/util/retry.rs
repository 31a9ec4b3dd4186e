//! Bounded exponential backoff for resubmitting messages after transient failures.

use std::convert::TryFrom;
use std::future::Future;
use std::time::Duration;

use retry::delay::Exponential;
use tracing::warn;

use crate::config::RelayConfig;
use crate::error::{Error, Kind};

/// Caps every delay of `strategy` at `max_delay`.
pub fn clamp(
    strategy: impl Iterator<Item = Duration>,
    max_delay: Duration,
) -> impl Iterator<Item = Duration> {
    strategy.map(move |delay| delay.min(max_delay))
}

/// Stops `strategy` after `max_retries` delays.
pub fn clamp_retries(
    strategy: impl Iterator<Item = Duration>,
    max_retries: u32,
) -> impl Iterator<Item = Duration> {
    strategy.take(max_retries as usize)
}

/// The delays between successive attempts: doubling from `initial_backoff`, capped at
/// `max_backoff`, at most `max_retries` of them.
pub fn backoff(config: &RelayConfig) -> impl Iterator<Item = Duration> {
    let initial = u64::try_from(config.initial_backoff.as_millis()).unwrap_or(u64::MAX);

    clamp_retries(
        clamp(
            Exponential::from_millis_with_factor(initial.max(1), 2.0),
            config.max_backoff,
        ),
        config.max_retries,
    )
}

/// Runs `op` until it succeeds, fails with an error that is not transient, or the delays of
/// [`backoff`] are used up, in which case the last error is wrapped in [`Kind::MaxRetry`].
pub async fn retry_transient<T, F, Fut>(config: &RelayConfig, what: &str, mut op: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut delays = backoff(config);
    let mut attempts = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.kind().is_transient() => match delays.next() {
                Some(delay) => {
                    warn!(
                        "{} failed on attempt {}: {}, retrying in {:?}",
                        what, attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempts += 1;
                }
                None => return Err(Kind::MaxRetry(attempts).context(e).into()),
            },
            Err(e) => return Err(e),
        }
    }
}
