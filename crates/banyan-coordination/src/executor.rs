//! Quorum executor: fan out an operation to every backend under a time
//! budget and accept the outcome only on majority agreement.
//!
//! The executor runs one task per backend, collects non-nil results per the
//! waiting strategy, and then applies two validity rules:
//!
//! 1. **Quorum**: at least `⌊N/2⌋ + 1` backends answered non-nil.
//! 2. **Time budget**: the wall-clock time spent deciding, plus a clock
//!    drift allowance, still fits inside `timeout`. An acquisition that
//!    "succeeded" after its lease window has effectively closed is useless,
//!    so it is reported as a miss.
//!
//! Both misses look identical to callers (an empty result list) because the
//! remedy is the same: compensate and retry. Per-backend failures never
//! surface here; the operation must absorb them (see
//! [`failsafe`](crate::retry::failsafe)) and return `None`.
//!
//! Dropping the returned future aborts the whole fan-out; partial writes on
//! a minority of backends are not compensated on cancellation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::debug;

use crate::pure;
use crate::retry::with_retry;
use crate::strategies;
use crate::strategies::WaitStrategy;

pub use crate::pure::DEFAULT_CLOCK_DRIFT;

/// Run `operation` against every backend and enforce quorum and time-budget
/// validity. Returns the collected results, or empty on a miss.
pub async fn execute<B, R, F, Fut>(
    backends: &[Arc<B>],
    strategy: WaitStrategy,
    timeout: Duration,
    default_drift: Duration,
    operation: F,
) -> Vec<R>
where
    B: ?Sized + Send + Sync + 'static,
    R: Send + 'static,
    F: Fn(Arc<B>) -> Fut,
    Fut: Future<Output = Option<R>> + Send + 'static,
{
    let quorum = pure::quorum(backends.len());
    let drift = pure::clock_drift(timeout, default_drift);
    let started = Instant::now();

    let mut tasks = JoinSet::new();
    for backend in backends {
        tasks.spawn(operation(Arc::clone(backend)));
    }

    let mut results = Vec::with_capacity(backends.len());
    match strategy {
        WaitStrategy::WaitAll => strategies::wait_all(&mut tasks, &mut results).await,
        WaitStrategy::WaitAny => strategies::wait_any(&mut tasks, &mut results).await,
    }

    let validity_ms = pure::validity_ms(timeout, started.elapsed(), drift);
    if results.len() < quorum || validity_ms < 0 {
        debug!(
            collected = results.len(),
            quorum,
            validity_ms,
            "fan-out rejected"
        );
        return Vec::new();
    }
    results
}

/// [`execute`] wrapped in the bounded retry layer: `retry_count` total
/// attempts with a fixed `retry_delay` between them, first non-empty wins.
#[allow(clippy::too_many_arguments)]
pub async fn execute_with_retry<B, R, F, Fut>(
    backends: &[Arc<B>],
    strategy: WaitStrategy,
    timeout: Duration,
    default_drift: Duration,
    retry_count: u32,
    retry_delay: Duration,
    operation: F,
) -> Vec<R>
where
    B: ?Sized + Send + Sync + 'static,
    R: Send + 'static,
    F: Fn(Arc<B>) -> Fut,
    Fut: Future<Output = Option<R>> + Send + 'static,
{
    with_retry(retry_count, retry_delay, || {
        execute(backends, strategy, timeout, default_drift, &operation)
    })
    .await
}
