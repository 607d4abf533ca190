//! Shared types for coordination primitives.

use std::time::Duration;
use uuid::Uuid;

use crate::error::CoordinationError;

/// Outcome of a latch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallResult {
    /// The operation took effect (or the deadline condition was observed).
    Success,
    /// Quorum was missed or the deadline passed; local state is unchanged.
    Failed,
}

impl CallResult {
    /// Returns true for [`CallResult::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, CallResult::Success)
    }
}

/// Random 128-bit identifier unique to one lock/semaphore/latch instance.
///
/// The owner id is the value stored under a lock key and the prefix of every
/// latch token. It is the sole credential the conditional delete accepts, so
/// an expired lease re-acquired by another client cannot be deleted by the
/// original holder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerId(String);

impl OwnerId {
    /// Generate a fresh random owner id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id as stored on the backends.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Retry behavior shared by every primitive.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts per operation (first try included).
    pub retry_count: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_count: 3,
            retry_delay: Duration::from_millis(100),
        }
    }
}

impl RetryConfig {
    /// Validate the construction preconditions.
    pub(crate) fn validate(&self) -> Result<(), CoordinationError> {
        if self.retry_count < 1 {
            return Err(CoordinationError::InvalidRetryCount { value: self.retry_count });
        }
        if self.retry_delay.is_zero() {
            return Err(CoordinationError::InvalidRetryDelay);
        }
        Ok(())
    }
}
