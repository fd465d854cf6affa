//! Cache client abstraction.

use crate::policy::Backoff;
use crate::state::CacheEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tether_core::{ConnectorResult, Listeners};

/// Callback the client's retry loop consults after every failed attempt.
///
/// Receives the attempt number (1-indexed) and the failure cause.
pub type RetryStrategy = Arc<dyn Fn(u32, &str) -> Backoff + Send + Sync>;

/// A cache client that owns its reconnection loop.
///
/// The adapter only observes the client: it registers an event listener,
/// hands over a [`RetryStrategy`], and pings for liveness.
///
/// # Event order
///
/// - `Connect` once the first connection is up
/// - `Error` for every failed attempt or broken link, followed by either
///   `Reconnecting` (strategy said retry) or `End` (strategy said stop)
/// - `Reconnect` when a retry succeeds
/// - `End` after `quit`
///
/// Events are delivered synchronously from the loop, so by the time
/// `connect` returns `Ok`, listeners have seen `Connect`.
#[async_trait]
pub trait CacheClient: Send + Sync + 'static {
    /// Starts the client and resolves once the first connection is up.
    ///
    /// # Errors
    ///
    /// Returns [`tether_core::ConnectorError::RetryExhausted`] if the
    /// strategy gives up before any connection succeeds, or
    /// [`tether_core::ConnectorError::Closed`] if the client is quit first.
    async fn connect(&self, strategy: RetryStrategy) -> ConnectorResult<()>;

    /// Returns the client's event listeners.
    fn events(&self) -> &Listeners<CacheEvent>;

    /// Round-trips a ping over the current connection.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection is up or the peer answers badly.
    async fn ping(&self) -> ConnectorResult<()>;

    /// Stops the reconnection loop and closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the loop could not be shut down cleanly.
    async fn quit(&self) -> ConnectorResult<()>;
}
