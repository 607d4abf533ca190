//! Error types for coordination primitives.
//!
//! The public lock/semaphore/latch operations report ordinary failures as
//! boolean or [`CallResult`](crate::CallResult) outcomes; the only errors
//! they raise are argument and construction preconditions, collected here.

use snafu::Snafu;

/// Precondition violations at construction or call time.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum CoordinationError {
    /// The backend list was empty.
    #[snafu(display("at least one backend is required"))]
    NoBackends,

    /// `retry_count` was zero.
    #[snafu(display("retry count must be at least 1, got {value}"))]
    InvalidRetryCount {
        /// The rejected retry count.
        value: u32,
    },

    /// `retry_delay` was zero.
    #[snafu(display("retry delay must be positive"))]
    InvalidRetryDelay,

    /// The lock TTL was too short to survive the drift allowance.
    #[snafu(display("lock TTL must exceed 2ms, got {ttl_ms}ms"))]
    InvalidTtl {
        /// The rejected TTL in milliseconds.
        ttl_ms: u64,
    },

    /// `max_leases` was zero.
    #[snafu(display("max leases must be at least 1, got {value}"))]
    InvalidLeaseCount {
        /// The rejected lease count.
        value: u32,
    },

    /// The latch participant count was zero.
    #[snafu(display("latch count must be at least 1, got {value}"))]
    InvalidLatchCount {
        /// The rejected participant count.
        value: u32,
    },

    /// The latch name was empty.
    #[snafu(display("latch name must not be empty"))]
    InvalidLatchName,

    /// The latch `max_duration` cannot absorb its own clock-drift allowance.
    #[snafu(display("max duration {max_duration_ms}ms is below the {required_ms}ms minimum"))]
    DurationTooShort {
        /// The rejected duration in milliseconds.
        max_duration_ms: u64,
        /// The smallest acceptable duration in milliseconds.
        required_ms: u64,
    },
}
