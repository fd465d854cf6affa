//! Connection handles and the health-check contract.

use crate::status::HealthStatus;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Answers "how is this connection doing right now".
///
/// Implementations must never fail or panic: any internal failure degrades
/// to a `Disconnected` or `Error` status. Implementations that probe the
/// network must bound the probe with a timeout.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Returns the current health of the connection.
    async fn health_check(&self) -> HealthStatus;
}

/// The object returned by `connect`.
///
/// A handle identifies one physical connection. Reconnecting through the
/// adapter produces a new handle; handles are never mutated in place.
#[derive(Clone)]
pub struct ConnectionHandle {
    name: Arc<str>,
    check: Arc<dyn HealthCheck>,
}

impl ConnectionHandle {
    /// Creates a handle for the named backend.
    pub fn new(name: impl Into<Arc<str>>, check: Arc<dyn HealthCheck>) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }

    /// Returns the logical backend name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current health of the underlying connection.
    pub async fn health_check(&self) -> HealthStatus {
        self.check.health_check().await
    }

    /// Returns true if both handles refer to the same underlying connection.
    pub fn same_connection(&self, other: &ConnectionHandle) -> bool {
        Arc::ptr_eq(&self.check, &other.check)
    }
}

#[async_trait]
impl HealthCheck for ConnectionHandle {
    async fn health_check(&self) -> HealthStatus {
        self.check.health_check().await
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
