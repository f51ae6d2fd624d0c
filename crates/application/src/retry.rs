use std::time::Duration;

use domain::alert::error::AlertError;

/// Retry schedule for blocking bus operations (connect, reconnect).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: usize,
    /// Delays between attempts; the last entry repeats when the schedule
    /// is shorter than `max_retries`.
    pub backoff: Vec<Duration>,
    /// Per-attempt timeout.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: vec![
                Duration::from_secs(1),
                Duration::from_secs(5),
                Duration::from_secs(15),
            ],
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: usize) -> Duration {
        self.backoff
            .get(attempt)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or(Duration::from_secs(1))
    }
}

/// Run `op` until it succeeds, the per-attempt timeout fires for the last
/// time, or the retry budget is spent. Sleeps the scheduled backoff
/// between attempts, never after the final one.
pub async fn retry_with_backoff<F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<(), AlertError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<(), AlertError>>,
{
    let mut last_error = None;

    for attempt in 0..=policy.max_retries {
        match tokio::time::timeout(policy.attempt_timeout, op()).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => last_error = Some(e),
            Err(_elapsed) => {
                last_error = Some(AlertError::ConnectFailed("attempt timed out".to_string()));
            }
        }

        if attempt < policy.max_retries {
            tokio::time::sleep(policy.delay_for(attempt)).await;
        }
    }

    Err(last_error
        .unwrap_or_else(|| AlertError::ConnectFailed("retry budget exhausted".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick_policy(max_retries: usize) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff: vec![Duration::from_millis(1)],
            attempt_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn first_attempt_success_makes_one_call() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);

        let result = retry_with_backoff(&quick_policy(3), || {
            calls_clone.fetch_add(1, Ordering::Relaxed);
            async { Ok(()) }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);

        let result = retry_with_backoff(&quick_policy(3), || {
            let attempt = calls_clone.fetch_add(1, Ordering::Relaxed);
            async move {
                if attempt < 2 {
                    Err(AlertError::ConnectFailed("transient".to_string()))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn budget_exhaustion_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);

        let result = retry_with_backoff(&quick_policy(2), || {
            calls_clone.fetch_add(1, Ordering::Relaxed);
            async { Err(AlertError::ConnectFailed("still down".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::Relaxed), 3); // initial + 2 retries
    }

    #[tokio::test]
    async fn slow_attempts_hit_the_timeout() {
        let policy = RetryPolicy {
            max_retries: 0,
            backoff: vec![Duration::from_millis(1)],
            attempt_timeout: Duration::from_millis(10),
        };

        let result = retry_with_backoff(&policy, || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        let message = result.unwrap_err().to_string();
        assert!(message.contains("timed out"), "got: {message}");
    }

    #[test]
    fn schedule_repeats_its_last_delay() {
        let policy = RetryPolicy {
            max_retries: 5,
            backoff: vec![Duration::from_millis(10), Duration::from_millis(20)],
            attempt_timeout: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(10));
        assert_eq!(policy.delay_for(1), Duration::from_millis(20));
        assert_eq!(policy.delay_for(4), Duration::from_millis(20));
    }
}
