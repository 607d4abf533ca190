//! Distributed coordination primitives over independent Redis-like backends.
//!
//! This crate provides client-side coordination for fleets of workers that
//! share one or more Redis-compatible endpoints:
//!
//! - [`SimpleLock`] - Single-backend mutual exclusion
//! - [`RedLock`] - Quorum mutual exclusion across independent backends
//! - [`Semaphore`] - Bounded concurrency with crash-holder reclamation
//! - [`ListeningCountDownLatch`] - One-shot barrier with pub/sub wake-up
//!
//! All primitives sit on the same [`executor`] engine: fan an operation out
//! to every backend, collect results per a waiting strategy, and accept the
//! outcome only when a majority answered inside the remaining validity
//! window (time budget minus elapsed decision time minus clock drift). A
//! miss compensates across all backends and retries, so a minority write
//! never strands a key until TTL.
//!
//! Backends are abstract: anything implementing the capability traits of
//! [`banyan_core`] works, including the in-memory
//! [`DeterministicBackend`](banyan_core::DeterministicBackend) used
//! throughout the tests.
//!
//! ## Lock Example
//!
//! ```ignore
//! use banyan_coordination::{RedLock, RetryConfig};
//!
//! let lock = RedLock::new(backends, RetryConfig::default())?;
//! if lock.lock("reports:nightly").await? {
//!     // at most one worker across the fleet runs this
//!     lock.unlock("reports:nightly").await;
//! }
//! ```
//!
//! ## Latch Example
//!
//! ```ignore
//! use banyan_coordination::{ListeningCountDownLatch, LatchConfig};
//!
//! let latch = ListeningCountDownLatch::new("ingest", 3, backends, LatchConfig::default())?;
//! latch.count_down().await;
//! // elsewhere:
//! if latch.wait().await.is_success() {
//!     // all three participants arrived
//! }
//! ```
//!
//! ## What this crate does not do
//!
//! No strict linearizability across backends, no fencing tokens, no
//! reentrancy, and no fairness among waiters. The owner-equality conditional
//! delete is sufficient for mutual exclusion but does not protect downstream
//! resources from a holder that stalls past its lease; prefer short TTLs on
//! safety-critical paths.

mod error;
pub mod executor;
mod latch;
mod lock;
pub mod pure;
mod redlock;
pub mod retry;
mod semaphore;
mod strategies;
mod types;

pub use error::CoordinationError;
pub use latch::LatchConfig;
pub use latch::ListeningCountDownLatch;
pub use lock::DEFAULT_LOCK_TTL;
pub use lock::SimpleLock;
pub use redlock::RedLock;
pub use semaphore::Semaphore;
pub use strategies::WaitStrategy;
pub use types::CallResult;
pub use types::OwnerId;
pub use types::RetryConfig;
