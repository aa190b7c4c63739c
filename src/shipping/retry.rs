//! Bounded retry with exponential back-off and jitter for the rate provider.
//!
//! Only transient failures (timeouts, connection errors, HTTP 5xx) are
//! retried; provider-level errors and malformed responses are returned
//! immediately.

use std::future::Future;
use std::time::Duration;

use crate::shipping::client::ShippingError;

pub(crate) fn is_retriable(err: &ShippingError) -> bool {
    match err {
        ShippingError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        ShippingError::Api(_) | ShippingError::Deserialize { .. } => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient
/// errors. The delay doubles per attempt from `backoff_base_ms`, capped at
/// 30 s, with ±25 % jitter.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ShippingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ShippingError>>,
{
    const MAX_DELAY_MS: u64 = 30_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient rate-provider error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn deserialize_err() -> ShippingError {
        let src = serde_json::from_str::<()>("invalid").unwrap_err();
        ShippingError::Deserialize {
            context: "test".to_owned(),
            source: src,
        }
    }

    #[test]
    fn api_and_deserialize_errors_are_not_retriable() {
        assert!(!is_retriable(&ShippingError::Api("bad key".to_owned())));
        assert!(!is_retriable(&deserialize_err()));
    }

    #[tokio::test]
    async fn succeeds_on_first_try_without_retrying() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, ShippingError>(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_errors_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    let err = reqwest::Client::new()
                        .get("http://0.0.0.0:1")
                        .send()
                        .await
                        .unwrap_err();
                    Err::<u32, _>(ShippingError::Http(err))
                } else {
                    Ok(9)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 9);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_api_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(ShippingError::Api("invalid key".to_owned()))
            }
        })
        .await;
        assert!(matches!(result, Err(ShippingError::Api(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
