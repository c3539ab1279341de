//! Retry with exponential backoff for external gateway calls.
//!
//! Wraps any async operation whose failure carries a transient/permanent
//! classification. Transient failures are retried sequentially with
//! exponentially increasing delays (optionally jittered); permanent failures
//! surface immediately. The final error distinguishes "gave up after N
//! transient failures" from "failed permanently on attempt k".

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;

use crate::gateway::{FailureKind, GatewayError};

/// Retry policy for external calls.
///
/// Configuration value; not mutated at runtime. The delay before retry `n`
/// (1-based) is `initial_delay * multiplier^(n-1)`, capped at `max_delay`,
/// plus a uniform random amount in `[0, jitter]` when jitter is set.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first (e.g. 3 = one call plus
    /// up to two retries).
    pub max_attempts: usize,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplier for exponential backoff (e.g. 2.0 doubles each time).
    pub multiplier: f64,
    /// Cap on any single delay.
    pub max_delay: Duration,
    /// Optional upper bound on uniform jitter added to each delay.
    pub jitter: Option<Duration>,
}

impl RetryPolicy {
    /// Creates a policy with the given attempt count and backoff parameters,
    /// no jitter.
    pub fn new(max_attempts: usize, initial_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts,
            initial_delay,
            multiplier,
            max_delay: Duration::from_secs(32),
            jitter: None,
        }
    }

    /// Sets the cap on any single delay (builder).
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Sets the jitter bound (builder).
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Checks whether another attempt may be made after `attempt` completed
    /// attempts (1-based count of calls already issued).
    pub fn should_retry(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }

    /// Base delay before retry number `retry` (1-based), without jitter.
    ///
    /// `initial_delay * multiplier^(retry-1)`, capped at `max_delay`.
    pub fn delay(&self, retry: usize) -> Duration {
        let exp = retry.saturating_sub(1) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exp);
        Duration::from_secs_f64(secs).min(self.max_delay)
    }

    /// Delay with jitter applied, for the actual sleep.
    fn jittered_delay(&self, retry: usize) -> Duration {
        let base = self.delay(retry);
        match self.jitter {
            Some(bound) if !bound.is_zero() => {
                let extra = rand::thread_rng().gen_range(Duration::ZERO..=bound);
                base + extra
            }
            _ => base,
        }
    }
}

impl Default for RetryPolicy {
    /// Three attempts, 500ms initial delay, doubling, 32s cap, no jitter.
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500), 2.0)
    }
}

/// Failure of a retried operation.
///
/// Carries the classification decision so callers can tell exhaustion apart
/// from an immediate permanent failure.
#[derive(Debug, Error)]
pub enum RetryError {
    /// The operation failed permanently on attempt `attempt`; no retry was
    /// issued after it.
    #[error("permanent failure on attempt {attempt}: {source}")]
    Permanent {
        attempt: usize,
        source: GatewayError,
    },

    /// All attempts failed transiently; `last` is the final failure.
    #[error("gave up after {attempts} transient failures: {last}")]
    Exhausted { attempts: usize, last: GatewayError },
}

impl RetryError {
    /// The underlying gateway failure, whichever way the retry ended.
    pub fn last_failure(&self) -> &GatewayError {
        match self {
            RetryError::Permanent { source, .. } => source,
            RetryError::Exhausted { last, .. } => last,
        }
    }
}

/// Executes `op` under `policy`.
///
/// Attempts are strictly sequential; the elapsed time is bounded by the sum
/// of configured delays. The wrapper knows nothing about the operation it
/// runs — it is generic over both gateway kinds.
pub async fn execute<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut attempt = 0usize;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "retry succeeded");
                }
                return Ok(value);
            }
            Err(err) if err.kind == FailureKind::Permanent => {
                tracing::error!(attempt, error = %err, "permanent failure, not retrying");
                return Err(RetryError::Permanent {
                    attempt,
                    source: err,
                });
            }
            Err(err) => {
                if policy.should_retry(attempt) {
                    let delay = policy.jittered_delay(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                } else {
                    tracing::error!(attempts = attempt, error = %err, "all attempts failed");
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_follows_multiplier() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1), 2.0);
        assert_eq!(policy.delay(1), Duration::from_secs(1)); // 1 * 2^0
        assert_eq!(policy.delay(2), Duration::from_secs(2)); // 1 * 2^1
        assert_eq!(policy.delay(3), Duration::from_secs(4)); // 1 * 2^2
    }

    #[test]
    fn delay_is_capped_at_max() {
        let policy =
            RetryPolicy::new(5, Duration::from_secs(1), 2.0).with_max_delay(Duration::from_secs(5));
        // 1 * 2^3 = 8, capped at 5
        assert_eq!(policy.delay(4), Duration::from_secs(5));
    }

    #[test]
    fn should_retry_respects_attempt_budget() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), 2.0);
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    /// **Scenario**: A call that fails transiently twice then succeeds is
    /// accepted under a 3-attempt policy.
    #[tokio::test]
    async fn transient_failures_then_success_is_accepted() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), 2.0);
        let mut calls = 0usize;
        let result = execute(&policy, || {
            calls += 1;
            let n = calls;
            async move {
                if n < 3 {
                    Err(GatewayError::transient("connection reset"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    /// **Scenario**: A permanent failure on the first attempt is never retried.
    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), 2.0);
        let mut calls = 0usize;
        let result: Result<(), _> = execute(&policy, || {
            calls += 1;
            async { Err(GatewayError::permanent("malformed request")) }
        })
        .await;
        assert_eq!(calls, 1);
        match result {
            Err(RetryError::Permanent { attempt, source }) => {
                assert_eq!(attempt, 1);
                assert_eq!(source.kind, FailureKind::Permanent);
            }
            other => panic!("expected Permanent, got {:?}", other),
        }
    }

    /// **Scenario**: Exhaustion after only-transient failures reports the
    /// attempt count and the last failure.
    #[tokio::test]
    async fn exhaustion_reports_attempts_and_last_failure() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1), 2.0);
        let result: Result<(), _> = execute(&policy, || async {
            Err(GatewayError::transient("timeout"))
        })
        .await;
        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 2);
                assert!(last.message.contains("timeout"));
            }
            other => panic!("expected Exhausted, got {:?}", other),
        }
    }

    /// **Scenario**: With paused time, the measured sleeps between attempts
    /// follow the configured multiplier exactly (no jitter configured).
    #[tokio::test(start_paused = true)]
    async fn backoff_sleeps_follow_multiplier() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100), 2.0);
        let start = tokio::time::Instant::now();
        let mut calls = 0usize;
        let _ = execute(&policy, || {
            calls += 1;
            let n = calls;
            async move {
                if n < 3 {
                    Err(GatewayError::transient("timeout"))
                } else {
                    Ok(())
                }
            }
        })
        .await;
        // 100ms after attempt 1, 200ms after attempt 2.
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    /// **Scenario**: With a jitter bound configured, each measured delay stays
    /// within [base, base + jitter].
    #[tokio::test(start_paused = true)]
    async fn jittered_sleeps_stay_within_the_bound() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100), 2.0)
            .with_jitter(Duration::from_millis(50));
        let start = tokio::time::Instant::now();
        let mut calls = 0usize;
        let _ = execute(&policy, || {
            calls += 1;
            let n = calls;
            async move {
                if n < 3 {
                    Err(GatewayError::transient("timeout"))
                } else {
                    Ok(())
                }
            }
        })
        .await;
        let elapsed = start.elapsed();
        // Base delays are 100ms + 200ms; jitter adds at most 50ms to each.
        assert!(elapsed >= Duration::from_millis(300), "elapsed {elapsed:?}");
        assert!(elapsed <= Duration::from_millis(400), "elapsed {elapsed:?}");
    }
}
