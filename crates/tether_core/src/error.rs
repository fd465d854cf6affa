//! Error types for connector operations.

use std::time::Duration;
use thiserror::Error;

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Errors that can occur while connecting, probing or disconnecting a backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    /// The backend was used before its `connect` resolved.
    #[error("connection not initialized: {backend}")]
    NotInitialized {
        /// Logical backend name.
        backend: String,
    },

    /// A connect or reconnect attempt failed.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the attempt may be retried.
        retryable: bool,
    },

    /// A liveness probe did not answer in time.
    #[error("probe timed out after {0:?}")]
    ProbeTimeout(Duration),

    /// A liveness probe answered with a failure.
    #[error("probe failed: {0}")]
    ProbeFailure(String),

    /// The retry ceiling was passed and the reconnect loop stopped.
    #[error("retries exhausted after {attempts} attempts: {cause}")]
    RetryExhausted {
        /// Number of failed attempts.
        attempts: u32,
        /// Cause of the last failure.
        cause: String,
    },

    /// The client was closed explicitly.
    #[error("client is closed")]
    Closed,

    /// Configuration rejected before connecting.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ConnectorError {
    /// Creates a `NotInitialized` error for the given backend.
    pub fn not_initialized(backend: impl Into<String>) -> Self {
        Self::NotInitialized {
            backend: backend.into(),
        }
    }

    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the failed operation can be attempted again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ConnectorError::Transport { retryable, .. } => *retryable,
            ConnectorError::ProbeTimeout(_) | ConnectorError::ProbeFailure(_) => true,
            _ => false,
        }
    }

    /// Returns true for probe failures (timeout or negative answer).
    pub fn is_probe_error(&self) -> bool {
        matches!(
            self,
            ConnectorError::ProbeTimeout(_) | ConnectorError::ProbeFailure(_)
        )
    }
}

impl From<std::io::Error> for ConnectorError {
    fn from(err: std::io::Error) -> Self {
        ConnectorError::transport_retryable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(ConnectorError::transport_retryable("connection refused").is_retryable());
        assert!(!ConnectorError::transport_fatal("bad uri").is_retryable());
        assert!(ConnectorError::ProbeTimeout(Duration::from_secs(1)).is_retryable());
        assert!(!ConnectorError::Closed.is_retryable());
        assert!(!ConnectorError::not_initialized("redis").is_retryable());
    }

    #[test]
    fn error_display() {
        let err = ConnectorError::not_initialized("mongodb");
        assert_eq!(err.to_string(), "connection not initialized: mongodb");

        let err = ConnectorError::RetryExhausted {
            attempts: 21,
            cause: "ECONNREFUSED".into(),
        };
        assert!(err.to_string().contains("21"));
        assert!(err.to_string().contains("ECONNREFUSED"));
    }

    #[test]
    fn io_errors_become_retryable_transport_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ConnectorError::from(io);
        assert!(matches!(err, ConnectorError::Transport { retryable: true, .. }));
    }
}
