// [libs/infra/store/src/retry.rs]
use crate::errors::StoreError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Up to 3 attempts with linear back-off (1 tick, 2 ticks, 3 ticks of
/// `step`), retried only on `StoreError::is_transient()` — the write-lock
/// contention case called out in §4.3 / §7. Any other error returns
/// immediately.
pub async fn with_retry<T, F, Fut>(step: Duration, mut attempt: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut last_err = None;
    for n in 1..=3u32 {
        match attempt().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() => {
                warn!(attempt = n, "store write contended, retrying");
                tokio::time::sleep(step * n).await;
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_on_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_retry(Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(StoreError::Transient("locked".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_on_non_transient_error() {
        let result: Result<i32, _> =
            with_retry(Duration::from_millis(1), || async { Err(StoreError::NotFound("x".into())) }).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }
}
