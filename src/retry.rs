use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Delay base for session acquisition: attempt n sleeps n × 2s.
pub const LINEAR_BACKOFF_BASE: Duration = Duration::from_secs(2);

/// Linearly increasing backoff for [`with_retry`].
pub fn linear_backoff(attempt: u32) -> Duration {
    LINEAR_BACKOFF_BASE * attempt
}

/// Run `op` up to `max_attempts` times, sleeping `backoff(attempt)` between
/// consecutive attempts. The last underlying error is surfaced when every
/// attempt fails.
pub async fn with_retry<T, E, F, Fut, B>(mut op: F, max_attempts: u32, backoff: B) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    B: Fn(u32) -> Duration,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts => {
                let delay = backoff(attempt);
                tracing::warn!(
                    "attempt {}/{} failed: {} (retrying in {:?})",
                    attempt,
                    max_attempts,
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::warn!("attempt {}/{} failed: {}", attempt, max_attempts, err);
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn surfaces_last_error_after_exhausting_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = tokio::time::Instant::now();

        let result: Result<(), String> = with_retry(
            |attempt| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(format!("boom {attempt}"))
                }
            },
            3,
            linear_backoff,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err(), "boom 3");
        // 2s after attempt 1, 4s after attempt 2, nothing after the last.
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_retrying_on_first_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = tokio::time::Instant::now();

        let result: Result<u32, String> = with_retry(
            |attempt| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err("not yet".to_string())
                    } else {
                        Ok(attempt)
                    }
                }
            },
            5,
            linear_backoff,
        )
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let result: Result<(), String> =
            with_retry(|_| async { Err("nope".to_string()) }, 0, |_| Duration::ZERO).await;
        assert_eq!(result.unwrap_err(), "nope");
    }
}
