//! Backend capability traits.
//!
//! A backend is a single Redis-compatible endpoint. Rather than one wide
//! interface, each coordination primitive sees only the capability set it
//! needs: [`LockBackend`] for plain locks, [`SemaphoreBackend`] for leased
//! slots, and [`CountDownLatchBackend`] for the latch. A concrete client is
//! free to implement any subset.
//!
//! All operations map onto small atomic server-side scripts; the `Option` in
//! each return value models the Redis "OK"/nil (or integer/nil) reply. The
//! coordination layer converts `Err` into `None` before acting, so backend
//! implementations should report failures honestly rather than masking them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::BackendError;

/// Single-holder lock operations.
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Atomic set-if-absent with expiry: `SET key owner NX PX ttl`.
    ///
    /// Returns `Some("OK")` iff the key was set, `None` when another owner
    /// holds it.
    async fn set_lock(&self, key: &str, owner: &str, ttl: Duration) -> Result<Option<String>, BackendError>;

    /// Conditional delete: remove the key iff its value equals `owner`.
    ///
    /// Never deletes a key it does not own. Returns `Some("OK")` when the
    /// key was deleted, `None` otherwise.
    async fn remove_lock(&self, key: &str, owner: &str) -> Result<Option<String>, BackendError>;
}

/// Counting-semaphore operations.
///
/// A semaphore on a backend is a leasers set plus one companion marker key
/// per leaser at `{marker_prefix}:{owner}`. The marker carries the lease TTL;
/// a leaser whose marker has expired is considered dead and is reclaimed by
/// [`clean_up_expired_semaphore_locks`](SemaphoreBackend::clean_up_expired_semaphore_locks).
#[async_trait]
pub trait SemaphoreBackend: Send + Sync {
    /// Add `owner` to the leasers set iff the post-add cardinality stays
    /// within `max_leases`, writing the companion marker and refreshing the
    /// set TTL on success. A failed bound check rolls the add back.
    async fn set_semaphore_lock(
        &self,
        leasers_key: &str,
        marker_prefix: &str,
        owner: &str,
        max_leases: u32,
        ttl: Duration,
    ) -> Result<Option<String>, BackendError>;

    /// Remove `owner` from the leasers set and delete its companion marker.
    async fn remove_semaphore_lock(
        &self,
        leasers_key: &str,
        marker_prefix: &str,
        owner: &str,
    ) -> Result<Option<String>, BackendError>;

    /// Prune leasers whose companion marker has expired.
    async fn clean_up_expired_semaphore_locks(
        &self,
        leasers_key: &str,
        marker_prefix: &str,
    ) -> Result<Option<String>, BackendError>;
}

/// Count-down latch operations.
#[async_trait]
pub trait CountDownLatchBackend: Send + Sync {
    /// Record one decrement: `SADD latch_key "{client_id}:{count}"`, refresh
    /// the latch TTL without ever shrinking it (`PEXPIRE KEY TTL GT` semantics),
    /// and publish the literal `"open"` on `channel` once the cardinality
    /// reaches `initial_count`.
    async fn count(
        &self,
        latch_key: &str,
        channel: &str,
        client_id: &str,
        count: i64,
        initial_count: u32,
        ttl: Duration,
    ) -> Result<Option<String>, BackendError>;

    /// Remove a previously recorded decrement token. Returns the number of
    /// tokens removed (0 when the token was absent).
    async fn undo_count(&self, latch_key: &str, client_id: &str, count: i64) -> Result<Option<i64>, BackendError>;

    /// Current cardinality of the latch set (`SCARD`; 0 for a missing key).
    async fn check_count(&self, latch_key: &str) -> Result<Option<i64>, BackendError>;

    /// Subscribe to `channel` and emit each received message until the
    /// stream is dropped. Dropping the stream tears down the subscription;
    /// teardown failures are the backend's to log, not to raise.
    async fn listen(&self, channel: &str) -> Result<BoxStream<'static, String>, BackendError>;
}

// Blanket implementations for Arc<T>

#[async_trait]
impl<T: LockBackend + ?Sized> LockBackend for Arc<T> {
    async fn set_lock(&self, key: &str, owner: &str, ttl: Duration) -> Result<Option<String>, BackendError> {
        (**self).set_lock(key, owner, ttl).await
    }

    async fn remove_lock(&self, key: &str, owner: &str) -> Result<Option<String>, BackendError> {
        (**self).remove_lock(key, owner).await
    }
}

#[async_trait]
impl<T: SemaphoreBackend + ?Sized> SemaphoreBackend for Arc<T> {
    async fn set_semaphore_lock(
        &self,
        leasers_key: &str,
        marker_prefix: &str,
        owner: &str,
        max_leases: u32,
        ttl: Duration,
    ) -> Result<Option<String>, BackendError> {
        (**self).set_semaphore_lock(leasers_key, marker_prefix, owner, max_leases, ttl).await
    }

    async fn remove_semaphore_lock(
        &self,
        leasers_key: &str,
        marker_prefix: &str,
        owner: &str,
    ) -> Result<Option<String>, BackendError> {
        (**self).remove_semaphore_lock(leasers_key, marker_prefix, owner).await
    }

    async fn clean_up_expired_semaphore_locks(
        &self,
        leasers_key: &str,
        marker_prefix: &str,
    ) -> Result<Option<String>, BackendError> {
        (**self).clean_up_expired_semaphore_locks(leasers_key, marker_prefix).await
    }
}

#[async_trait]
impl<T: CountDownLatchBackend + ?Sized> CountDownLatchBackend for Arc<T> {
    async fn count(
        &self,
        latch_key: &str,
        channel: &str,
        client_id: &str,
        count: i64,
        initial_count: u32,
        ttl: Duration,
    ) -> Result<Option<String>, BackendError> {
        (**self).count(latch_key, channel, client_id, count, initial_count, ttl).await
    }

    async fn undo_count(&self, latch_key: &str, client_id: &str, count: i64) -> Result<Option<i64>, BackendError> {
        (**self).undo_count(latch_key, client_id, count).await
    }

    async fn check_count(&self, latch_key: &str) -> Result<Option<i64>, BackendError> {
        (**self).check_count(latch_key).await
    }

    async fn listen(&self, channel: &str) -> Result<BoxStream<'static, String>, BackendError> {
        (**self).listen(channel).await
    }
}
