// Fixed-delay retry for source fetches.
//
// Attempts are capped and spaced by a constant delay: no backoff growth and
// no jitter. The outcome says how many attempts ran, so callers can tell an
// empty result apart from a failed one.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Pause between attempts (never after the last)
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

#[derive(Debug)]
pub enum Attempted<T> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_error: anyhow::Error },
}

/// Run `operation` until it succeeds or the attempt cap is reached.
pub async fn retry_fixed<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Attempted<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                return Attempted::Succeeded {
                    value,
                    attempts: attempt,
                }
            }
            Err(err) => {
                warn!(attempt, max_attempts, error = %err, "Attempt failed");
                if attempt >= max_attempts {
                    return Attempted::Exhausted {
                        attempts: attempt,
                        last_error: err,
                    };
                }
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let policy = RetryPolicy::new(3, Duration::from_millis(5));
        let outcome = retry_fixed(&policy, || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                anyhow::bail!("timeout")
            }
            Ok(n)
        })
        .await;
        match outcome {
            Attempted::Succeeded { value, attempts } => {
                assert_eq!(value, 2);
                assert_eq!(attempts, 3);
            }
            Attempted::Exhausted { .. } => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn stops_at_attempt_cap() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let outcome: Attempted<()> = retry_fixed(&policy, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("connection reset")
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match outcome {
            Attempted::Exhausted { attempts, last_error } => {
                assert_eq!(attempts, 3);
                assert!(last_error.to_string().contains("connection reset"));
            }
            Attempted::Succeeded { .. } => panic!("expected exhaustion"),
        }
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let policy = RetryPolicy::new(0, Duration::from_millis(1));
        let _: Attempted<()> = retry_fixed(&policy, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("down")
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_is_fixed_and_skipped_after_last_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_secs(3));
        let start = Instant::now();
        let _: Attempted<()> = retry_fixed(&policy, || async { anyhow::bail!("down") }).await;
        // two pauses between three attempts, no growth
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }
}
