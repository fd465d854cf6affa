//! Generic reconnecting client.
//!
//! [`ReconnectingClient`] runs the native-style retry loop over a
//! [`Dialer`]: dial, watch the link, and on failure ask the retry strategy
//! whether to try again. Everything it does is published as
//! [`CacheEvent`]s.

use crate::client::{CacheClient, RetryStrategy};
use crate::policy::Backoff;
use crate::state::CacheEvent;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tether_core::{ConnectorError, ConnectorResult, Listeners};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

/// An established cache connection.
#[async_trait]
pub trait CacheConnection: Send + Sync + 'static {
    /// Round-trips a ping.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is broken or the peer answers badly.
    async fn ping(&self) -> ConnectorResult<()>;

    /// Resolves when the link is lost, with the cause.
    async fn closed(&self) -> String;
}

/// Opens cache connections.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    /// The connection type produced.
    type Connection: CacheConnection;

    /// Performs one connection attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt fails; the loop decides whether to retry.
    async fn dial(&self) -> ConnectorResult<Self::Connection>;
}

struct Inner<D: Dialer> {
    dialer: D,
    events: Listeners<CacheEvent>,
    current: RwLock<Option<Arc<D::Connection>>>,
    shutdown: watch::Sender<bool>,
}

/// A cache client with a built-in bounded reconnection loop.
pub struct ReconnectingClient<D: Dialer> {
    inner: Arc<Inner<D>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<D: Dialer> ReconnectingClient<D> {
    /// Creates a client. No connection is attempted until `connect`.
    pub fn new(dialer: D) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                dialer,
                events: Listeners::new(),
                current: RwLock::new(None),
                shutdown,
            }),
            task: Mutex::new(None),
        }
    }

    /// Returns the dialer.
    pub fn dialer(&self) -> &D {
        &self.inner.dialer
    }

    /// Returns true while a connection is established.
    pub fn is_connected(&self) -> bool {
        self.inner.current.read().is_some()
    }
}

async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

async fn run<D: Dialer>(
    inner: Arc<Inner<D>>,
    strategy: RetryStrategy,
    ready: oneshot::Sender<ConnectorResult<()>>,
) {
    let mut ready = Some(ready);
    let mut shutdown = inner.shutdown.subscribe();
    let mut attempt: u32 = 0;
    let mut connected_once = false;

    loop {
        let dialed = tokio::select! {
            dialed = inner.dialer.dial() => dialed,
            _ = wait_for_shutdown(&mut shutdown) => break,
        };

        let cause = match dialed {
            Ok(connection) => {
                let connection = Arc::new(connection);
                *inner.current.write() = Some(Arc::clone(&connection));
                attempt = 0;

                let event = if connected_once {
                    CacheEvent::Reconnect
                } else {
                    CacheEvent::Connect
                };
                connected_once = true;
                inner.events.emit(&event);
                if let Some(ready) = ready.take() {
                    let _ = ready.send(Ok(()));
                }

                let cause = tokio::select! {
                    cause = connection.closed() => cause,
                    _ = wait_for_shutdown(&mut shutdown) => break,
                };
                inner.current.write().take();
                cause
            }
            Err(e) => e.to_string(),
        };

        attempt = attempt.saturating_add(1);
        inner.events.emit(&CacheEvent::Error(cause.clone()));

        match strategy(attempt, &cause) {
            Backoff::Retry(delay) => {
                debug!(attempt, ?delay, "scheduling cache reconnect");
                inner
                    .events
                    .emit(&CacheEvent::Reconnecting { attempt, delay });
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = wait_for_shutdown(&mut shutdown) => break,
                }
            }
            Backoff::Stop => {
                inner.events.emit(&CacheEvent::End);
                if let Some(ready) = ready.take() {
                    let _ = ready.send(Err(ConnectorError::RetryExhausted {
                        attempts: attempt,
                        cause,
                    }));
                }
                return;
            }
        }
    }

    inner.current.write().take();
    inner.events.emit(&CacheEvent::End);
    if let Some(ready) = ready.take() {
        let _ = ready.send(Err(ConnectorError::Closed));
    }
}

#[async_trait]
impl<D: Dialer> CacheClient for ReconnectingClient<D> {
    async fn connect(&self, strategy: RetryStrategy) -> ConnectorResult<()> {
        let ready = {
            let mut task = self.task.lock();
            if task.as_ref().is_some_and(|t| !t.is_finished()) {
                return Err(ConnectorError::transport_fatal("client already started"));
            }

            self.inner.shutdown.send_replace(false);
            let (tx, rx) = oneshot::channel();
            *task = Some(tokio::spawn(run(Arc::clone(&self.inner), strategy, tx)));
            rx
        };

        ready.await.unwrap_or(Err(ConnectorError::Closed))
    }

    fn events(&self) -> &Listeners<CacheEvent> {
        &self.inner.events
    }

    async fn ping(&self) -> ConnectorResult<()> {
        let connection = self.inner.current.read().clone();
        match connection {
            Some(connection) => connection.ping().await,
            None => Err(ConnectorError::transport_retryable("no active connection")),
        }
    }

    async fn quit(&self) -> ConnectorResult<()> {
        self.inner.shutdown.send_replace(true);
        let task = self.task.lock().take();

        if let Some(task) = task {
            if let Err(e) = task.await {
                if e.is_panic() {
                    return Err(ConnectorError::transport_fatal(format!(
                        "reconnect loop panicked: {e}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl<D: Dialer> Drop for ReconnectingClient<D> {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}
