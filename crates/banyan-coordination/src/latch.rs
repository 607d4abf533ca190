//! Distributed count-down latch with pub/sub wake-up and polling fallback.
//!
//! The latch key holds a set of decrement tokens; once its cardinality
//! reaches the participant count, every backend that observes the threshold
//! publishes the literal `"open"` on the latch channel. Waiters race three
//! sources: the first `"open"` from any backend, a periodic cardinality poll
//! (the safety net for a publish that fired before the subscription was
//! established or was dropped in flight), and the deadline.
//!
//! Each instance owns a random owner id and a local pending-decrement
//! counter. The stored token is `{owner_id}:{current_count}`, so a retry
//! after a lost response resubmits the same token and the backend's set-add
//! deduplicates it; distinct instances never collide because their owner ids
//! differ.

use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use banyan_core::CountDownLatchBackend;
use futures::StreamExt;
use tokio::task::JoinSet;
use tracing::debug;

use crate::error::CoordinationError;
use crate::executor;
use crate::pure;
use crate::pure::DEFAULT_CLOCK_DRIFT;
use crate::retry::failsafe;
use crate::strategies;
use crate::strategies::WaitStrategy;
use crate::types::CallResult;
use crate::types::OwnerId;
use crate::types::RetryConfig;

/// The message a backend publishes when the latch opens.
const OPEN_MESSAGE: &str = "open";

/// Configuration for a count-down latch.
#[derive(Debug, Clone)]
pub struct LatchConfig {
    /// TTL of the latch key and the default `wait` deadline.
    pub max_duration: Duration,
    /// Retry behavior for `count_down`.
    pub retry: RetryConfig,
}

impl Default for LatchConfig {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(600),
            retry: RetryConfig::default(),
        }
    }
}

/// One-shot synchronization barrier across processes.
///
/// `count` participants each call [`count_down`](Self::count_down) once;
/// waiters block in [`wait`](Self::wait) until the threshold is reached or
/// the deadline passes. Once opened, the latch stays open until its TTL.
pub struct ListeningCountDownLatch<B: CountDownLatchBackend + ?Sized> {
    latch_key: String,
    channel: String,
    count: u32,
    max_duration: Duration,
    backends: Vec<Arc<B>>,
    owner_id: OwnerId,
    current_count: AtomicI64,
    retry: RetryConfig,
}

impl<B: CountDownLatchBackend + ?Sized + 'static> ListeningCountDownLatch<B> {
    /// Create a latch instance named `name` requiring `count` decrements.
    ///
    /// The latch key and channel are both derived from `name`, so instances
    /// sharing a name share state and instances with different names are
    /// fully isolated.
    pub fn new(
        name: &str,
        count: u32,
        backends: Vec<Arc<B>>,
        config: LatchConfig,
    ) -> Result<Self, CoordinationError> {
        if name.is_empty() {
            return Err(CoordinationError::InvalidLatchName);
        }
        if count < 1 {
            return Err(CoordinationError::InvalidLatchCount { value: count });
        }
        if backends.is_empty() {
            return Err(CoordinationError::NoBackends);
        }
        config.retry.validate()?;
        // The count operation must keep a non-negative validity window even
        // after the drift allowance is charged twice (decision + lease side).
        let drift = pure::clock_drift(config.max_duration, DEFAULT_CLOCK_DRIFT);
        let required = drift * 2;
        if config.max_duration < required {
            return Err(CoordinationError::DurationTooShort {
                max_duration_ms: config.max_duration.as_millis() as u64,
                required_ms: required.as_millis() as u64,
            });
        }
        Ok(Self {
            latch_key: format!("latch:{name}"),
            channel: format!("latch:channels:{name}"),
            count,
            max_duration: config.max_duration,
            backends,
            owner_id: OwnerId::generate(),
            current_count: AtomicI64::new(count as i64),
            retry: config.retry,
        })
    }

    /// Record one decrement from this instance.
    ///
    /// Returns [`CallResult::Failed`] when no quorum of backends accepted
    /// the token; local state is then unchanged and a best-effort rollback
    /// is scheduled, so the caller can retry without double-counting.
    /// Calling past exhaustion is a no-op reported as success.
    pub async fn count_down(&self) -> CallResult {
        let current = self.current_count.load(Ordering::Acquire);
        if current <= 0 {
            return CallResult::Success;
        }

        let latch_key = self.latch_key.clone();
        let channel = self.channel.clone();
        let owner = self.owner_id.as_str().to_string();
        let initial_count = self.count;
        let ttl = self.max_duration;
        let results = executor::execute_with_retry(
            &self.backends,
            WaitStrategy::WaitAll,
            self.max_duration,
            DEFAULT_CLOCK_DRIFT,
            self.retry.retry_count,
            self.retry.retry_delay,
            move |backend| {
                let latch_key = latch_key.clone();
                let channel = channel.clone();
                let owner = owner.clone();
                async move {
                    failsafe(
                        None,
                        backend.count(&latch_key, &channel, &owner, current, initial_count, ttl),
                    )
                    .await
                }
            },
        )
        .await;

        if results.is_empty() {
            debug!(latch_key = %self.latch_key, current, "count_down missed quorum, scheduling rollback");
            self.schedule_undo(current);
            return CallResult::Failed;
        }

        self.current_count.fetch_sub(1, Ordering::AcqRel);
        CallResult::Success
    }

    /// Best-effort removal of this instance's tentative token on every
    /// backend; a quorum may still hold it, and the set-add deduplication
    /// makes a later retry of the same token harmless either way.
    fn schedule_undo(&self, current: i64) {
        for backend in &self.backends {
            let backend = Arc::clone(backend);
            let latch_key = self.latch_key.clone();
            let owner = self.owner_id.as_str().to_string();
            tokio::spawn(async move {
                failsafe(None, backend.undo_count(&latch_key, &owner, current)).await;
            });
        }
    }

    /// Block until the latch opens, up to `max_duration`.
    pub async fn wait(&self) -> CallResult {
        self.wait_with_timeout(self.max_duration).await
    }

    /// Block until the latch opens, up to `timeout`.
    ///
    /// Returns [`CallResult::Success`] as soon as the threshold is observed
    /// through any of the fast path, a published `"open"`, or the polling
    /// safety net; [`CallResult::Failed`] once `timeout` passes.
    pub async fn wait_with_timeout(&self, timeout: Duration) -> CallResult {
        if self.is_open().await {
            return CallResult::Success;
        }

        let mut tasks = JoinSet::new();
        for backend in &self.backends {
            let backend = Arc::clone(backend);
            let channel = self.channel.clone();
            tasks.spawn(async move {
                let mut stream = match backend.listen(&channel).await {
                    Ok(stream) => stream,
                    Err(error) => {
                        debug!(%error, channel, "subscription failed");
                        return None;
                    }
                };
                while let Some(message) = stream.next().await {
                    if message == OPEN_MESSAGE {
                        return Some(());
                    }
                }
                None
            });
        }

        let mut wakeups = Vec::new();
        let listener = async {
            strategies::wait_any(&mut tasks, &mut wakeups).await;
            if wakeups.is_empty() {
                // Every subscription ended without an "open"; leave the
                // outcome to the poller and the deadline.
                std::future::pending::<()>().await;
            }
        };

        let interval = pure::poll_interval(timeout);
        let poller = async {
            loop {
                tokio::time::sleep(interval).await;
                if self.is_open().await {
                    return;
                }
            }
        };

        tokio::select! {
            _ = listener => CallResult::Success,
            _ = poller => CallResult::Success,
            _ = tokio::time::sleep(timeout) => CallResult::Failed,
        }
    }

    /// Decrements still required before the latch opens, as observed on one
    /// backend. A backend failure reports the full count (conservative).
    pub async fn get_count(&self) -> i64 {
        match failsafe(None, self.backends[0].check_count(&self.latch_key)).await {
            Some(cardinality) => (self.count as i64 - cardinality).max(0),
            None => self.count as i64,
        }
    }

    /// Threshold check on one backend; errors read as "not open yet".
    async fn is_open(&self) -> bool {
        failsafe(None, self.backends[0].check_count(&self.latch_key))
            .await
            .is_some_and(|cardinality| cardinality >= self.count as i64)
    }
}
