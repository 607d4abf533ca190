//! Quorum lock across independent backends.

use std::sync::Arc;
use std::time::Duration;

use banyan_core::LockBackend;

use crate::error::CoordinationError;
use crate::lock::DEFAULT_LOCK_TTL;
use crate::lock::LockInstance;
use crate::lock::lock_with_quorum;
use crate::lock::unlock_all;
use crate::lock::validate_ttl;
use crate::types::RetryConfig;

/// Distributed mutual exclusion over `N` independent backends.
///
/// A lease is held only when a majority of backends granted it inside the
/// validity window (TTL minus elapsed decision time minus clock drift); a
/// failed acquisition compensates by deleting its tentative writes on every
/// backend, so a minority grant never strands the key until TTL.
///
/// The stored owner id substitutes for a fencing token: it is sufficient for
/// mutual exclusion, but it does not protect downstream resources from a
/// holder that stalls past its lease. Prefer short TTLs on safety-critical
/// paths.
///
/// # Example
///
/// ```ignore
/// let lock = RedLock::new(backends, RetryConfig::default())?;
/// if lock.lock("orders:refund").await? {
///     // critical section
///     lock.unlock("orders:refund").await;
/// }
/// ```
pub struct RedLock<B: LockBackend + ?Sized> {
    backends: Vec<Arc<B>>,
    instance: LockInstance,
    retry: RetryConfig,
}

impl<B: LockBackend + ?Sized + 'static> RedLock<B> {
    /// Create a quorum lock handle over `backends`.
    pub fn new(backends: Vec<Arc<B>>, retry: RetryConfig) -> Result<Self, CoordinationError> {
        if backends.is_empty() {
            return Err(CoordinationError::NoBackends);
        }
        retry.validate()?;
        Ok(Self {
            backends,
            instance: LockInstance::new(),
            retry,
        })
    }

    /// Acquire `key` with the default 10 second TTL.
    pub async fn lock(&self, key: &str) -> Result<bool, CoordinationError> {
        self.lock_with_ttl(key, DEFAULT_LOCK_TTL).await
    }

    /// Acquire `key` for `ttl`.
    ///
    /// Returns true iff a majority of backends granted the lease inside the
    /// validity window. On false, any minority grants have already been
    /// compensated.
    pub async fn lock_with_ttl(&self, key: &str, ttl: Duration) -> Result<bool, CoordinationError> {
        validate_ttl(ttl)?;
        Ok(lock_with_quorum(&self.backends, &self.instance, key, ttl, &self.retry).await)
    }

    /// Release `key` on every backend in parallel; no quorum check.
    pub async fn unlock(&self, key: &str) {
        unlock_all(&self.backends, &self.instance, key).await;
    }
}
