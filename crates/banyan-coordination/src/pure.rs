//! Pure decision functions for the quorum executor.
//!
//! Deterministic and side-effect free: no I/O, no clocks, no randomness.
//! Keeping the arithmetic here lets the executor's correctness-critical
//! decisions be tested exhaustively with explicit inputs.

use std::time::Duration;

/// Drift allowance added on top of the proportional term.
pub const DEFAULT_CLOCK_DRIFT: Duration = Duration::from_millis(3);

/// Majority size for `instance_count` backends.
pub fn quorum(instance_count: usize) -> usize {
    instance_count / 2 + 1
}

/// Clock drift allowance: 1% of the timeout (rounded up) plus `default_drift`.
///
/// Subtracted from the time budget when judging whether an attempt finished
/// inside its usable lease window, compensating for clock skew between
/// independent backends.
pub fn clock_drift(timeout: Duration, default_drift: Duration) -> Duration {
    let proportional = (timeout.as_millis() as u64).div_ceil(100);
    Duration::from_millis(proportional) + default_drift
}

/// Remaining usable lease window in milliseconds; negative means the attempt
/// took too long to be trusted.
pub fn validity_ms(timeout: Duration, elapsed: Duration, drift: Duration) -> i64 {
    timeout.as_millis() as i64 - elapsed.as_millis() as i64 - drift.as_millis() as i64
}

/// Polling cadence for the latch's safety net: a tenth of the timeout with a
/// 50ms floor.
pub fn poll_interval(timeout: Duration) -> Duration {
    (timeout / 10).max(Duration::from_millis(50))
}
