//! Bounded retry with exponential backoff and jitter.
//!
//! The delay schedule is a pure function of (attempt, base delay) so the
//! policy can be tested without real waiting; the async wrapper adds the
//! sleeps and a per-attempt timeout.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

/// Deterministic part of the schedule: `base * 2^attempt`, capped at 60s.
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    let capped = base.saturating_mul(2u32.saturating_pow(attempt));
    capped.min(Duration::from_secs(60))
}

/// Full delay for one attempt: exponential backoff plus up to one `base` of
/// uniform jitter.
pub fn backoff_delay_jittered(attempt: u32, base: Duration) -> Duration {
    let jitter = rand::thread_rng().gen_range(0.0..=1.0);
    backoff_delay(attempt, base) + base.mul_f64(jitter)
}

/// Run `op` up to `max_retries + 1` times, sleeping between attempts. Each
/// attempt is bounded by `attempt_timeout`. Returns the last error once the
/// budget is exhausted; callers downgrade that to their documented fallback.
pub async fn retry_with_backoff<T, F, Fut>(policy: RetryPolicy, mut op: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..=policy.max_retries {
        match tokio::time::timeout(policy.attempt_timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(attempt, error = %e, "external call failed");
                last_err = Some(e);
            }
            Err(_) => {
                tracing::warn!(attempt, "external call timed out");
                last_err = Some(anyhow::anyhow!(
                    "timed out after {:?}",
                    policy.attempt_timeout
                ));
            }
        }
        if attempt < policy.max_retries {
            tokio::time::sleep(backoff_delay_jittered(attempt, policy.base_delay)).await;
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("retry budget exhausted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(0, base), Duration::from_millis(100));
        assert_eq!(backoff_delay(1, base), Duration::from_millis(200));
        assert_eq!(backoff_delay(2, base), Duration::from_millis(400));
        assert_eq!(backoff_delay(30, base), Duration::from_secs(60));
    }

    #[test]
    fn jitter_stays_within_one_base() {
        let base = Duration::from_millis(100);
        for attempt in 0..4 {
            let lo = backoff_delay(attempt, base);
            let hi = lo + base;
            let d = backoff_delay_jittered(attempt, base);
            assert!(d >= lo && d <= hi, "{d:?} outside [{lo:?}, {hi:?}]");
        }
    }
}
