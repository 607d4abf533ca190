//! Error types for backend operations.
//!
//! Every variant here is an ordinary failure: the coordination layer treats a
//! backend error the same way it treats a nil reply, so these errors carry
//! context for logging but are never surfaced through the public lock/latch
//! API.

use snafu::Snafu;

/// Errors from a single backend call.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum BackendError {
    /// The connection to the backend was lost or could not be established.
    #[snafu(display("connection failed: {reason}"))]
    Connection {
        /// Description of the connection failure.
        reason: String,
    },

    /// A server-side script rejected the operation or failed mid-run.
    #[snafu(display("script execution failed: {reason}"))]
    Script {
        /// Description reported by the scripting host.
        reason: String,
    },

    /// A pub/sub subscription could not be established or was torn down.
    #[snafu(display("subscription failed: {reason}"))]
    Subscription {
        /// Description of the subscription failure.
        reason: String,
    },

    /// The backend did not answer within its own deadline.
    #[snafu(display("backend operation timed out after {duration_ms}ms"))]
    Timeout {
        /// Duration in milliseconds before the backend gave up.
        duration_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_display() {
        let err = BackendError::Connection {
            reason: "refused".to_string(),
        };
        assert_eq!(err.to_string(), "connection failed: refused");
    }

    #[test]
    fn timeout_display() {
        let err = BackendError::Timeout { duration_ms: 250 };
        assert_eq!(err.to_string(), "backend operation timed out after 250ms");
    }

    #[test]
    fn errors_are_comparable() {
        let a = BackendError::Script { reason: "x".into() };
        let b = BackendError::Script { reason: "x".into() };
        assert_eq!(a, b);
    }
}
