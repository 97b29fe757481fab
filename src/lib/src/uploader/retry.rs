use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::RestoreError;

/// Delay before retry number `retry` (0 based): `base_wait * 2^retry`
pub fn exponential_backoff(base_wait: Duration, retry: usize) -> Duration {
    let factor = 1u32.checked_shl(retry as u32).unwrap_or(u32::MAX);
    base_wait.saturating_mul(factor)
}

/// Sleeps for `wait` unless `cancel` fires first
pub async fn sleep_or_cancel(wait: Duration, cancel: &CancellationToken) -> Result<(), RestoreError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RestoreError::operation_cancelled()),
        _ = tokio::time::sleep(wait) => Ok(()),
    }
}

/// Whether a failed attempt is worth another try. Cancellation is not a
/// failure and a forgotten session needs a new one, not the same request again.
pub fn is_retryable(err: &RestoreError) -> bool {
    !(err.is_cancelled() || err.is_session_not_found())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use crate::error::RestoreError;
    use crate::uploader::retry::{exponential_backoff, is_retryable, sleep_or_cancel};

    #[test]
    fn test_exponential_backoff_doubles() {
        let base = Duration::from_secs(2);
        let waits: Vec<u64> = (0..5)
            .map(|retry| exponential_backoff(base, retry).as_secs())
            .collect();
        assert_eq!(waits, vec![2, 4, 8, 16, 32]);
    }

    #[test]
    fn test_exponential_backoff_saturates() {
        let wait = exponential_backoff(Duration::from_secs(2), 200);
        assert!(wait >= Duration::from_secs(2 * u32::MAX as u64));
    }

    #[test]
    fn test_is_retryable() {
        assert!(is_retryable(&RestoreError::basic_str("connection reset")));
        assert!(!is_retryable(&RestoreError::operation_cancelled()));
        assert!(!is_retryable(&RestoreError::session_not_found("u1")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_or_cancel() {
        let cancel = CancellationToken::new();
        let start = tokio::time::Instant::now();
        sleep_or_cancel(Duration::from_secs(4), &cancel).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(4));

        cancel.cancel();
        let result = sleep_or_cancel(Duration::from_secs(4), &cancel).await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
