//! Distributed counting semaphore with crash-holder reclamation.
//!
//! A semaphore key maps to a leasers set (`semaphore:leasers:{key}`) plus one
//! marker key per holder under `semaphore:{key}:{owner}`. The marker carries
//! the lease TTL; a holder that dies without releasing leaves its marker to
//! expire, and the cleanup pass issued before every acquire prunes such
//! leasers so their slots return to the pool.
//!
//! Acquisition follows the same quorum discipline as the quorum lock: a
//! slot is held only when a majority of backends granted it inside the
//! validity window, and a failed acquisition releases its tentative grants
//! on every backend before retrying.

use std::sync::Arc;
use std::time::Duration;

use banyan_core::SemaphoreBackend;
use futures::future::join_all;
use tracing::debug;

use crate::error::CoordinationError;
use crate::executor;
use crate::lock::DEFAULT_LOCK_TTL;
use crate::lock::validate_ttl;
use crate::pure::DEFAULT_CLOCK_DRIFT;
use crate::retry::failsafe;
use crate::strategies::WaitStrategy;
use crate::types::OwnerId;
use crate::types::RetryConfig;

/// Bounded concurrency over `N` independent backends.
pub struct Semaphore<B: SemaphoreBackend + ?Sized> {
    backends: Vec<Arc<B>>,
    owner_id: OwnerId,
    max_leases: u32,
    retry: RetryConfig,
}

fn leasers_key(key: &str) -> String {
    format!("semaphore:leasers:{key}")
}

fn marker_prefix(key: &str) -> String {
    format!("semaphore:{key}")
}

impl<B: SemaphoreBackend + ?Sized + 'static> Semaphore<B> {
    /// Create a semaphore handle granting at most `max_leases` slots.
    pub fn new(backends: Vec<Arc<B>>, max_leases: u32, retry: RetryConfig) -> Result<Self, CoordinationError> {
        if backends.is_empty() {
            return Err(CoordinationError::NoBackends);
        }
        if max_leases < 1 {
            return Err(CoordinationError::InvalidLeaseCount { value: max_leases });
        }
        retry.validate()?;
        Ok(Self {
            backends,
            owner_id: OwnerId::generate(),
            max_leases,
            retry,
        })
    }

    /// Acquire a slot under `key` with the default 10 second lease.
    pub async fn lock(&self, key: &str) -> Result<bool, CoordinationError> {
        self.lock_with_ttl(key, DEFAULT_LOCK_TTL).await
    }

    /// Acquire a slot under `key` for `ttl`.
    ///
    /// Each per-backend attempt first prunes leasers whose marker expired,
    /// then tries the bounded set-add. Returns true iff a majority granted
    /// the slot inside the validity window; on false, tentative grants have
    /// been released.
    pub async fn lock_with_ttl(&self, key: &str, ttl: Duration) -> Result<bool, CoordinationError> {
        validate_ttl(ttl)?;

        let max_leases = self.max_leases;
        for round in 1..=self.retry.retry_count {
            let leasers = leasers_key(key);
            let markers = marker_prefix(key);
            let owner = self.owner_id.as_str().to_string();
            let results = executor::execute(
                &self.backends,
                WaitStrategy::WaitAll,
                ttl,
                DEFAULT_CLOCK_DRIFT,
                move |backend| {
                    let leasers = leasers.clone();
                    let markers = markers.clone();
                    let owner = owner.clone();
                    async move {
                        failsafe(None, backend.clean_up_expired_semaphore_locks(&leasers, &markers)).await;
                        failsafe(None, backend.set_semaphore_lock(&leasers, &markers, &owner, max_leases, ttl)).await
                    }
                },
            )
            .await;

            if !results.is_empty() {
                debug!(key, granted = results.len(), "semaphore slot acquired");
                return Ok(true);
            }

            debug!(key, round, "semaphore attempt missed quorum, releasing tentative grants");
            self.unlock(key).await;
            if round < self.retry.retry_count {
                tokio::time::sleep(self.retry.retry_delay).await;
            }
        }
        Ok(false)
    }

    /// Release this instance's slot on every backend; no quorum check.
    pub async fn unlock(&self, key: &str) {
        let leasers = leasers_key(key);
        let markers = marker_prefix(key);
        join_all(self.backends.iter().map(|backend| {
            failsafe(
                None,
                backend.remove_semaphore_lock(&leasers, &markers, self.owner_id.as_str()),
            )
        }))
        .await;
    }
}
