//! Document driver abstraction.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tether_core::{ConnectorResult, Listeners};

/// Readiness code: no connection.
pub const READY_STATE_DISCONNECTED: i32 = 0;
/// Readiness code: connection established.
pub const READY_STATE_CONNECTED: i32 = 1;
/// Readiness code: connection being opened.
pub const READY_STATE_CONNECTING: i32 = 2;
/// Readiness code: connection being closed.
pub const READY_STATE_DISCONNECTING: i32 = 3;

/// Lifecycle events published by a document driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// The connection is established.
    Connected,
    /// The connection was closed.
    Disconnected,
    /// The driver hit an error. The driver keeps running.
    Error(String),
}

/// A document-store driver.
///
/// Drivers are opaque: the adapter never interprets the wire protocol. It
/// only opens, closes, reads the readiness code, and listens to events.
///
/// # Invariants
///
/// - `open` returns once the handshake has been initiated; completion is
///   observed through `ready_state` and [`DocumentEvent::Connected`]
/// - `ready_state` is a cheap, synchronous read
/// - `close` is safe to call when nothing is open
#[async_trait]
pub trait DocumentDriver: Send + Sync + 'static {
    /// Initiates the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake cannot be started (bad URI,
    /// unsupported scheme). Network failures after that are reported
    /// through [`DocumentEvent::Error`].
    async fn open(&self, uri: &str, options: &BTreeMap<String, String>) -> ConnectorResult<()>;

    /// Returns the driver's current readiness code.
    fn ready_state(&self) -> i32;

    /// Returns the driver's event listeners.
    fn events(&self) -> &Listeners<DocumentEvent>;

    /// Closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails to shut down cleanly.
    async fn close(&self) -> ConnectorResult<()>;
}
