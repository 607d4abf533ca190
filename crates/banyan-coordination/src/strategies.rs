//! Waiting strategies over a set of in-flight backend tasks.
//!
//! A strategy coordinates a [`JoinSet`] of per-backend tasks and an
//! append-only result sink. It never looks inside a result beyond
//! Some/None: acquisitions need every verdict to decide quorum versus
//! rollback (wait-all), while the latch's wake-up path only needs the first
//! backend to report (wait-any).

use tokio::task::JoinSet;
use tracing::warn;

/// Which waiting strategy the executor applies to its fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Await every task; collect all non-nil results.
    WaitAll,
    /// Await the first non-nil result, then cancel the rest.
    WaitAny,
}

/// Await every task, appending each non-nil result to `results`.
pub(crate) async fn wait_all<R: Send + 'static>(tasks: &mut JoinSet<Option<R>>, results: &mut Vec<R>) {
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(value)) => results.push(value),
            Ok(None) => {}
            Err(error) if error.is_cancelled() => {}
            Err(error) => warn!(%error, "backend task failed"),
        }
    }
}

/// Await until one task yields a non-nil result, cancel the rest, and drain.
pub(crate) async fn wait_any<R: Send + 'static>(tasks: &mut JoinSet<Option<R>>, results: &mut Vec<R>) {
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(value)) => {
                results.push(value);
                tasks.abort_all();
                while tasks.join_next().await.is_some() {}
                return;
            }
            Ok(None) => {}
            Err(error) if error.is_cancelled() => {}
            Err(error) => warn!(%error, "backend task failed"),
        }
    }
}
