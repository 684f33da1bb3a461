//! Bounded polling until a remote object reflects what was written
//!
//! Remote APIs are frequently read-after-write inconsistent: a fetch right
//! after an update may hit a replica or cache that has not caught up. The
//! poller re-fetches until a caller-supplied projection matches on several
//! consecutive reads, or the time budget runs out.

use crate::context::Context;
use crate::error::TfplugError;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant};

/// Polling policy. The defaults are 30s overall, 3 consecutive matches,
/// and backoff from 500ms doubling up to 3s.
#[derive(Debug, Clone, PartialEq)]
pub struct SettleConfig {
    pub timeout: Duration,
    pub required_matches: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            required_matches: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(3),
        }
    }
}

impl SettleConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A snapshot that matched on enough consecutive reads
#[derive(Debug)]
pub struct Settled<T> {
    pub snapshot: T,
    pub attempts: u32,
}

/// The poller gave up. `last` is the most recent successful fetch, if any,
/// so callers can continue with best-effort data.
#[derive(Debug)]
pub struct Unsettled<T> {
    pub last: Option<T>,
    pub error: TfplugError,
}

/// Polls `fetch` until `matches` holds on `required_matches` consecutive
/// successful fetches.
///
/// The budget is the smaller of `config.timeout` and whatever remains of
/// the context deadline. A failed fetch or a non-matching snapshot resets
/// the streak. Fetches never overlap.
pub async fn wait_until_settled<T, E, F, Fut, M>(
    ctx: &Context,
    config: &SettleConfig,
    mut fetch: F,
    mut matches: M,
) -> Result<Settled<T>, Unsettled<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    M: FnMut(&T) -> bool,
{
    let budget = match ctx.remaining() {
        Some(remaining) => remaining.min(config.timeout),
        None => config.timeout,
    };
    let started = Instant::now();
    let deadline = started + budget;
    let required = config.required_matches.max(1);

    let mut streak = 0u32;
    let mut attempts = 0u32;
    let mut backoff = config.initial_backoff;
    let mut last = None;

    loop {
        if ctx.is_cancelled() || Instant::now() >= deadline {
            break;
        }

        attempts += 1;
        let fetched = tokio::select! {
            biased;
            result = fetch() => Some(result),
            _ = time::sleep_until(deadline) => None,
            _ = ctx.cancelled() => None,
        };

        match fetched {
            Some(Ok(snapshot)) => {
                if matches(&snapshot) {
                    streak += 1;
                    tracing::debug!(attempts, streak, required, "settle poll matched");
                    if streak >= required {
                        return Ok(Settled { snapshot, attempts });
                    }
                } else {
                    tracing::debug!(attempts, "settle poll did not match yet");
                    streak = 0;
                }
                last = Some(snapshot);
            }
            Some(Err(e)) => {
                tracing::debug!(attempts, error = %e, "settle poll fetch failed");
                streak = 0;
            }
            None => break,
        }

        let now = Instant::now();
        if now >= deadline {
            break;
        }
        let pause = backoff.min(deadline - now);
        tokio::select! {
            _ = time::sleep(pause) => {}
            _ = ctx.cancelled() => break,
        }
        backoff = (backoff * 2).min(config.max_backoff);
    }

    let waited = started.elapsed();
    let error = if Instant::now() >= deadline {
        TfplugError::SettleTimeout { waited, attempts }
    } else {
        TfplugError::Cancelled
    };
    tracing::warn!(attempts, waited_ms = waited.as_millis() as u64, "remote state did not settle");

    Err(Unsettled { last, error })
}
