//! Single-instance lock primitive and the single-backend lock built on it.
//!
//! [`LockInstance`] encapsulates the per-backend key lifecycle: a random
//! owner id generated at construction, a set-if-absent acquire, and a
//! conditional delete that only ever removes a key this instance wrote.
//! [`SimpleLock`] is the one-backend public shape; the quorum shape lives in
//! [`RedLock`](crate::RedLock). Both run the same acquire/compensate loop.

use std::sync::Arc;
use std::time::Duration;

use banyan_core::LockBackend;
use futures::future::join_all;
use tracing::debug;

use crate::error::CoordinationError;
use crate::executor;
use crate::pure::DEFAULT_CLOCK_DRIFT;
use crate::retry::failsafe;
use crate::strategies::WaitStrategy;
use crate::types::OwnerId;
use crate::types::RetryConfig;

/// Default lease TTL for `lock` convenience calls.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(10);

/// The smallest TTL that can survive the drift allowance.
const MIN_TTL: Duration = Duration::from_millis(2);

/// Per-backend lock operations bound to one owner id.
pub(crate) struct LockInstance {
    owner_id: OwnerId,
}

impl LockInstance {
    pub(crate) fn new() -> Self {
        Self {
            owner_id: OwnerId::generate(),
        }
    }

    pub(crate) fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    /// Set-if-absent with expiry; backend errors count as "not acquired".
    pub(crate) async fn lock_instance<B: LockBackend + ?Sized>(
        &self,
        backend: &B,
        key: &str,
        ttl: Duration,
    ) -> Option<String> {
        failsafe(None, backend.set_lock(key, self.owner_id.as_str(), ttl)).await
    }

    /// Conditional delete, ignoring per-backend errors.
    pub(crate) async fn unlock_instance<B: LockBackend + ?Sized>(&self, backend: &B, key: &str) -> Option<String> {
        failsafe(None, backend.remove_lock(key, self.owner_id.as_str())).await
    }
}

/// Validate the `lock` TTL precondition shared by every lock shape.
pub(crate) fn validate_ttl(ttl: Duration) -> Result<(), CoordinationError> {
    if ttl <= MIN_TTL {
        return Err(CoordinationError::InvalidTtl {
            ttl_ms: ttl.as_millis() as u64,
        });
    }
    Ok(())
}

/// The acquire/compensate loop shared by [`SimpleLock`] and
/// [`RedLock`](crate::RedLock).
///
/// Each attempt fans out `set_lock` to every backend under wait-all. A miss
/// (no quorum, or the fan-out outran its validity window) may still have
/// succeeded on a minority of backends, which would strand the key there
/// until TTL; every failed attempt therefore fires the conditional delete
/// across all backends before retrying.
pub(crate) async fn lock_with_quorum<B: LockBackend + ?Sized + 'static>(
    backends: &[Arc<B>],
    instance: &LockInstance,
    key: &str,
    ttl: Duration,
    retry: &RetryConfig,
) -> bool {
    for round in 1..=retry.retry_count {
        let owner = instance.owner_id().as_str().to_string();
        let key_owned = key.to_string();
        let results = executor::execute(backends, WaitStrategy::WaitAll, ttl, DEFAULT_CLOCK_DRIFT, move |backend| {
            let owner = owner.clone();
            let key = key_owned.clone();
            async move { failsafe(None, backend.set_lock(&key, &owner, ttl)).await }
        })
        .await;

        if !results.is_empty() {
            debug!(key, granted = results.len(), "lock acquired");
            return true;
        }

        debug!(key, round, "lock attempt missed quorum, compensating");
        unlock_all(backends, instance, key).await;
        if round < retry.retry_count {
            tokio::time::sleep(retry.retry_delay).await;
        }
    }
    false
}

/// Fire the conditional delete on every backend in parallel; no quorum
/// check, best effort.
pub(crate) async fn unlock_all<B: LockBackend + ?Sized>(backends: &[Arc<B>], instance: &LockInstance, key: &str) {
    join_all(backends.iter().map(|backend| instance.unlock_instance(backend.as_ref(), key))).await;
}

/// Mutual exclusion against a single backend.
///
/// The same `SET key owner NX PX ttl` / conditional-delete protocol as
/// [`RedLock`](crate::RedLock), with a backend list of one (so quorum is 1).
pub struct SimpleLock<B: LockBackend + ?Sized> {
    backend: Arc<B>,
    instance: LockInstance,
    retry: RetryConfig,
}

impl<B: LockBackend + ?Sized + 'static> SimpleLock<B> {
    /// Create a lock handle against one backend.
    pub fn new(backend: Arc<B>, retry: RetryConfig) -> Result<Self, CoordinationError> {
        retry.validate()?;
        Ok(Self {
            backend,
            instance: LockInstance::new(),
            retry,
        })
    }

    /// Acquire `key` with the default 10 second TTL.
    pub async fn lock(&self, key: &str) -> Result<bool, CoordinationError> {
        self.lock_with_ttl(key, DEFAULT_LOCK_TTL).await
    }

    /// Acquire `key` for `ttl`. Returns false when the backend denies the
    /// key or never answers inside the validity window.
    pub async fn lock_with_ttl(&self, key: &str, ttl: Duration) -> Result<bool, CoordinationError> {
        validate_ttl(ttl)?;
        let backends = std::slice::from_ref(&self.backend);
        Ok(lock_with_quorum(backends, &self.instance, key, ttl, &self.retry).await)
    }

    /// Release `key` if this instance holds it.
    pub async fn unlock(&self, key: &str) {
        self.instance.unlock_instance(self.backend.as_ref(), key).await;
    }
}

#[cfg(test)]
mod tests {
    use banyan_core::DeterministicBackend;

    use super::*;

    fn quick_retry() -> RetryConfig {
        RetryConfig {
            retry_count: 2,
            retry_delay: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn lock_and_unlock_cycle() {
        let backend = DeterministicBackend::new();
        let lock = SimpleLock::new(backend, quick_retry()).unwrap();

        assert!(lock.lock("job").await.unwrap());
        lock.unlock("job").await;
        assert!(lock.lock("job").await.unwrap());
    }

    #[tokio::test]
    async fn contention_denies_second_holder() {
        let backend = DeterministicBackend::new();
        let first = SimpleLock::new(Arc::clone(&backend), quick_retry()).unwrap();
        let second = SimpleLock::new(backend, quick_retry()).unwrap();

        assert!(first.lock("job").await.unwrap());
        assert!(!second.lock("job").await.unwrap());
    }

    #[tokio::test]
    async fn expired_lease_can_be_reacquired() {
        let backend = DeterministicBackend::new();
        let first = SimpleLock::new(Arc::clone(&backend), quick_retry()).unwrap();
        let second = SimpleLock::new(backend, quick_retry()).unwrap();

        assert!(first.lock_with_ttl("job", Duration::from_millis(30)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(second.lock("job").await.unwrap());
    }

    #[tokio::test]
    async fn unlock_by_non_owner_is_a_no_op() {
        let backend = DeterministicBackend::new();
        let holder = SimpleLock::new(Arc::clone(&backend), quick_retry()).unwrap();
        let intruder = SimpleLock::new(Arc::clone(&backend), quick_retry()).unwrap();

        assert!(holder.lock("job").await.unwrap());
        intruder.unlock("job").await;

        // The holder's lease must still be in place.
        let third = SimpleLock::new(backend, quick_retry()).unwrap();
        assert!(!third.lock("job").await.unwrap());
    }

    #[tokio::test]
    async fn ttl_precondition_is_enforced() {
        let backend = DeterministicBackend::new();
        let lock = SimpleLock::new(backend, quick_retry()).unwrap();

        let result = lock.lock_with_ttl("job", Duration::from_millis(2)).await;
        assert_eq!(result, Err(CoordinationError::InvalidTtl { ttl_ms: 2 }));
    }

    #[test]
    fn construction_preconditions() {
        let backend = DeterministicBackend::new();
        let config = RetryConfig {
            retry_count: 0,
            ..Default::default()
        };
        assert!(SimpleLock::new(backend, config).is_err());
    }
}
