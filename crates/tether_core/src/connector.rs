//! The connector contract.

use crate::error::ConnectorResult;
use crate::handle::ConnectionHandle;
use crate::status::HealthStatus;
use async_trait::async_trait;

/// A backend adapter that manages the lifecycle of one connection.
///
/// # Contract
///
/// - `connect` does not resolve until the registry holds a usable handle.
///   Concurrent callers receive handles to the same connection.
/// - `disconnect` before `connect` is a no-op, never a hang.
/// - `health_check` always produces a value. Before `connect` and after
///   `disconnect` it reports `Disconnected`.
///
/// # Implementors
///
/// - `tether_docstore::DocumentStoreConnector` - readiness-code driven
/// - `tether_cache::CacheStoreConnector` - event driven, with reconnection policy
#[async_trait]
pub trait Connector: Send + Sync {
    /// Returns the logical backend name (the registry key).
    fn name(&self) -> &str;

    /// Establishes the connection and registers its handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake cannot be initiated. The host
    /// decides whether that is fatal.
    async fn connect(&self) -> ConnectorResult<ConnectionHandle>;

    /// Closes the connection and clears its registry slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to close cleanly. The slot is
    /// cleared either way.
    async fn disconnect(&self) -> ConnectorResult<()>;

    /// Returns the current health of the backend.
    async fn health_check(&self) -> HealthStatus;
}
