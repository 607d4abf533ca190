//! Bounded retry and failsafe wrappers around backend calls.

use std::future::Future;
use std::time::Duration;

use banyan_core::BackendError;
use tracing::debug;

/// Run `attempt` up to `retry_count` times with a fixed `retry_delay` sleep
/// between tries, returning the first non-empty result list.
///
/// An empty list is the executor's encoding of "no quorum / not valid", so
/// exhaustion returns empty as well.
pub async fn with_retry<R, F, Fut>(retry_count: u32, retry_delay: Duration, mut attempt: F) -> Vec<R>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Vec<R>>,
{
    for round in 1..=retry_count {
        let results = attempt().await;
        if !results.is_empty() {
            return results;
        }
        if round < retry_count {
            debug!(round, retry_count, "attempt returned empty, retrying");
            tokio::time::sleep(retry_delay).await;
        }
    }
    Vec::new()
}

/// Await a fallible backend call; on error, log it and return `default`.
///
/// This is the single point where backend failures die. Everything above it
/// sees a nil reply and applies the same remedy it would for a lost quorum.
pub async fn failsafe<T, Fut>(default: T, operation: Fut) -> T
where
    Fut: Future<Output = Result<T, BackendError>>,
{
    match operation.await {
        Ok(value) => value,
        Err(error) => {
            debug!(%error, "backend call failed, treating as nil");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;

    use super::*;

    #[tokio::test]
    async fn first_non_empty_attempt_wins() {
        let calls = AtomicU32::new(0);
        let results = with_retry(3, Duration::from_millis(1), || {
            let round = calls.fetch_add(1, Ordering::SeqCst);
            async move { if round == 1 { vec!["ok"] } else { Vec::new() } }
        })
        .await;

        assert_eq!(results, vec!["ok"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhaustion_returns_empty() {
        let calls = AtomicU32::new(0);
        let results: Vec<&str> = with_retry(3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Vec::new() }
        })
        .await;

        assert!(results.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failsafe_swallows_errors() {
        let value = failsafe(None, async {
            Err::<Option<String>, _>(BackendError::Connection { reason: "down".into() })
        })
        .await;
        assert_eq!(value, None);

        let value = failsafe(None, async { Ok(Some("OK".to_string())) }).await;
        assert_eq!(value.as_deref(), Some("OK"));
    }
}
