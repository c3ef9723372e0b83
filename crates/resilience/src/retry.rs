//! Bounded exponential backoff (spec §7: the log writer's "bounded
//! retry-then-drop" policy for an update task that races ahead of its
//! parent's create — base 50ms, cap 500ms, 8 attempts).

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

/// A bounded exponential backoff schedule.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Number of attempts beyond the first before giving up.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Delay never grows past this.
    pub max_delay: Duration,
    /// Jitter fraction (0.0 = none, 1.0 = full range) applied to each
    /// computed delay so concurrent retries don't thunder in lockstep.
    pub jitter: f64,
}

impl RetryPolicy {
    /// The log writer's parent-race policy (spec §7
    /// `LogWriteMissingParent`): base 50ms, cap 500ms, 8 attempts total
    /// (1 initial + 7 retries fits within the spec's "8 attempts"
    /// wording counted inclusively of the first try).
    #[must_use]
    pub fn log_write_missing_parent() -> Self {
        Self {
            max_retries: 7,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(500),
            jitter: 0.2,
        }
    }

    /// A custom bounded exponential policy.
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            jitter: 0.2,
        }
    }

    /// Total attempts this policy allows, counting the first try.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
        let capped = exp.min(self.max_delay);
        if self.jitter <= 0.0 {
            return capped;
        }
        let jitter_ms = (capped.as_millis() as f64 * self.jitter) as u64;
        let extra = rand::thread_rng().gen_range(0..=jitter_ms.max(1));
        capped + Duration::from_millis(extra)
    }
}

/// Outcome of exhausting a [`RetryPolicy`] without success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetriesExhausted {
    /// Total attempts made before giving up.
    pub attempts: u32,
}

/// Run `operation` until it succeeds, the policy's attempts are
/// exhausted, or `should_retry` rejects the error as non-retryable.
///
/// Returns the last error seen, wrapped so the caller knows whether it
/// stopped due to exhaustion (`Err(Err(RetriesExhausted))`) or a
/// terminal error (`Err(Ok(error))`).
pub async fn retry<T, E, F, Fut>(
    policy: RetryPolicy,
    mut should_retry: impl FnMut(&E) -> bool,
    mut operation: F,
) -> Result<T, Result<E, RetriesExhausted>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Debug,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt, "operation succeeded after retrying");
                }
                return Ok(value);
            }
            Err(error) => {
                if !should_retry(&error) {
                    return Err(Ok(error));
                }
                if attempt >= policy.max_retries {
                    warn!(attempts = attempt + 1, ?error, "retries exhausted");
                    return Err(Err(RetriesExhausted {
                        attempts: attempt + 1,
                    }));
                }
                let delay = policy.delay_for(attempt);
                warn!(attempt = attempt + 1, ?delay, ?error, "retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn log_write_missing_parent_policy_matches_spec() {
        let policy = RetryPolicy::log_write_missing_parent();
        assert_eq!(policy.max_attempts(), 8);
        assert_eq!(policy.base_delay, Duration::from_millis(50));
        assert_eq!(policy.max_delay, Duration::from_millis(500));
    }

    #[test]
    fn delay_caps_at_max() {
        let policy = RetryPolicy::new(10, Duration::from_millis(50), Duration::from_millis(500));
        let late = policy.delay_for(10);
        assert!(late >= Duration::from_millis(500));
        assert!(late <= Duration::from_millis(500) + Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let counter = AtomicUsize::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5));
        let result = retry(
            policy,
            |_: &&str| true,
            || async {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("not yet")
                } else {
                    Ok("done")
                }
            },
        )
        .await;
        assert_eq!(result, Ok("done"));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_retries() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(5));
        let result = retry(policy, |_: &&str| true, || async { Err::<(), _>("always fails") }).await;
        assert_eq!(result, Err(Err(RetriesExhausted { attempts: 3 })));
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let counter = AtomicUsize::new(0);
        let policy = RetryPolicy::new(5, Duration::from_millis(1), Duration::from_millis(5));
        let result = retry(
            policy,
            |_: &&str| false,
            || async {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("terminal")
            },
        )
        .await;
        assert_eq!(result, Err(Ok("terminal")));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
