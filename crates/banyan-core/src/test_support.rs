//! Test support: a scripted lock backend with call counters.
//!
//! [`ScriptedLockBackend`] answers every `set_lock` the same programmed way
//! (grant, deny, or fail) after an optional injected latency, and counts the
//! calls it receives. This is enough to drive quorum-matrix, retry-count,
//! and clock-drift scenarios without a network.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::traits::LockBackend;

/// How a scripted backend answers `set_lock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Reply `Some("OK")`: the lock was granted.
    Grant,
    /// Reply `None`: another owner holds the key.
    Deny,
    /// Reply with a connection error.
    Fail,
}

/// A `LockBackend` with a fixed scripted reply and atomic call counters.
pub struct ScriptedLockBackend {
    reply: ScriptedReply,
    latency: Duration,
    set_lock_calls: AtomicU64,
    remove_lock_calls: AtomicU64,
}

impl ScriptedLockBackend {
    /// Create a backend that answers `set_lock` with `reply` immediately.
    pub fn new(reply: ScriptedReply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            latency: Duration::ZERO,
            set_lock_calls: AtomicU64::new(0),
            remove_lock_calls: AtomicU64::new(0),
        })
    }

    /// Create a backend that sleeps for `latency` before every reply.
    pub fn with_latency(reply: ScriptedReply, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply,
            latency,
            set_lock_calls: AtomicU64::new(0),
            remove_lock_calls: AtomicU64::new(0),
        })
    }

    /// Number of `set_lock` calls received so far.
    pub fn set_lock_calls(&self) -> u64 {
        self.set_lock_calls.load(Ordering::SeqCst)
    }

    /// Number of `remove_lock` calls received so far.
    pub fn remove_lock_calls(&self) -> u64 {
        self.remove_lock_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LockBackend for ScriptedLockBackend {
    async fn set_lock(&self, _key: &str, _owner: &str, _ttl: Duration) -> Result<Option<String>, BackendError> {
        self.set_lock_calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.reply {
            ScriptedReply::Grant => Ok(Some("OK".to_string())),
            ScriptedReply::Deny => Ok(None),
            ScriptedReply::Fail => Err(BackendError::Connection {
                reason: "scripted failure".to_string(),
            }),
        }
    }

    async fn remove_lock(&self, _key: &str, _owner: &str) -> Result<Option<String>, BackendError> {
        self.remove_lock_calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(Some("OK".to_string()))
    }
}
