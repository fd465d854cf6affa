//! Cache-store adapter.

use crate::client::{CacheClient, RetryStrategy};
use crate::policy::ReconnectPolicy;
use crate::state::{CacheEvent, CacheSnapshot, ReconnectionState, StatusCell};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tether_core::{
    CacheStoreConfig, ConnectionHandle, ConnectionRegistry, Connector, ConnectorError,
    ConnectorResult, HealthCheck, HealthStatus, ListenerId,
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Health check that pings the client before trusting the cached status.
struct CacheHealth<C> {
    name: String,
    client: Arc<C>,
    state: Arc<StatusCell>,
    closed: Arc<AtomicBool>,
    probe_timeout: Duration,
}

impl<C: CacheClient> CacheHealth<C> {
    async fn probe(&self) -> ConnectorResult<()> {
        match tokio::time::timeout(self.probe_timeout, self.client.ping()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ConnectorError::ProbeFailure(e.to_string())),
            Err(_) => Err(ConnectorError::ProbeTimeout(self.probe_timeout)),
        }
    }
}

#[async_trait]
impl<C: CacheClient> HealthCheck for CacheHealth<C> {
    async fn health_check(&self) -> HealthStatus {
        if self.closed.load(Ordering::SeqCst) {
            return HealthStatus::disconnected();
        }

        match self.probe().await {
            Ok(()) => HealthStatus::new(self.state.status()),
            Err(e) => {
                warn!(backend = %self.name, error = %e, "cache liveness probe failed");
                HealthStatus::disconnected()
            }
        }
    }
}

/// Connector for a cache store.
///
/// The client owns the reconnection loop; this adapter supplies the retry
/// strategy, folds the client's events into a [`StatusCell`], and answers
/// health checks with a bounded ping.
///
/// A `disconnect` issued while `connect` is still inside the client's retry
/// loop quits the client, and the pending `connect` fails with
/// [`ConnectorError::Closed`].
pub struct CacheStoreConnector<C: CacheClient> {
    config: CacheStoreConfig,
    policy: ReconnectPolicy,
    client: Arc<C>,
    registry: Arc<ConnectionRegistry>,
    state: Arc<StatusCell>,
    listener: Mutex<Option<ListenerId>>,
    closed: Mutex<Arc<AtomicBool>>,
    /// Bumped by every `disconnect`; pending connects watch it.
    disconnects: watch::Sender<u64>,
}

impl<C: CacheClient> CacheStoreConnector<C> {
    /// Creates a connector. Nothing is opened until `connect`.
    pub fn new(config: CacheStoreConfig, client: C, registry: Arc<ConnectionRegistry>) -> Self {
        Self::with_shared_client(config, Arc::new(client), registry)
    }

    /// Creates a connector around a client the caller keeps a reference to.
    pub fn with_shared_client(
        config: CacheStoreConfig,
        client: Arc<C>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        let policy = ReconnectPolicy::from_config(&config);
        Self {
            config,
            policy,
            client,
            registry,
            state: Arc::new(StatusCell::new()),
            listener: Mutex::new(None),
            closed: Mutex::new(Arc::new(AtomicBool::new(true))),
            disconnects: watch::channel(0).0,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CacheStoreConfig {
        &self.config
    }

    /// Returns the reconnection policy derived from the configuration.
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Returns the raw client.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::NotInitialized`] until `connect` resolved,
    /// and again after `disconnect`.
    pub fn client(&self) -> ConnectorResult<Arc<C>> {
        if self.registry.contains(&self.config.name) {
            Ok(Arc::clone(&self.client))
        } else {
            Err(ConnectorError::not_initialized(&self.config.name))
        }
    }

    /// Returns status and retry bookkeeping as one consistent snapshot.
    pub fn snapshot(&self) -> CacheSnapshot {
        self.state.snapshot()
    }

    /// Returns the retry bookkeeping for the current outage.
    pub fn reconnection(&self) -> ReconnectionState {
        self.state.snapshot().reconnection
    }

    fn strategy(&self) -> RetryStrategy {
        let policy = self.policy.clone();
        let state = Arc::clone(&self.state);
        Arc::new(move |attempt, cause| {
            state.record_failure(attempt, cause);
            policy.next_backoff(attempt, cause)
        })
    }

    fn attach_listener(&self) {
        let name = self.config.name.clone();
        let state = Arc::clone(&self.state);
        let id = self.client.events().add(move |event| {
            let status = state.apply(event);
            match event {
                CacheEvent::Connect => info!(backend = %name, "cache connected"),
                CacheEvent::Error(cause) => {
                    error!(backend = %name, error = %cause, "cache connection error")
                }
                CacheEvent::Reconnecting { attempt, delay } => {
                    warn!(backend = %name, attempt, ?delay, "cache reconnecting")
                }
                CacheEvent::Reconnect => info!(backend = %name, "cache reconnected"),
                CacheEvent::End => warn!(backend = %name, "cache connection ended"),
            }
            debug!(backend = %name, %status, "cache status changed");
        });

        if let Some(stale) = self.listener.lock().replace(id) {
            self.client.events().remove(stale);
        }
    }

    fn detach_listener(&self) {
        if let Some(id) = self.listener.lock().take() {
            self.client.events().remove(id);
        }
    }
}

#[async_trait]
impl<C: CacheClient> Connector for CacheStoreConnector<C> {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn connect(&self) -> ConnectorResult<ConnectionHandle> {
        let mut disconnects = self.disconnects.subscribe();
        let slot = self.registry.slot(&self.config.name).await;
        if let Some(handle) = slot.get() {
            debug!(backend = %self.config.name, "reusing cache connection");
            return Ok(handle);
        }
        if disconnects.has_changed().unwrap_or(false) {
            debug!(backend = %self.config.name, "connect superseded by disconnect");
            return Err(ConnectorError::Closed);
        }

        self.config.validate()?;
        self.state.begin_connect();
        self.attach_listener();

        let connected = tokio::select! {
            result = self.client.connect(self.strategy()) => result,
            _ = disconnects.changed() => {
                info!(backend = %self.config.name, "cancelling in-flight cache connect");
                if let Err(e) = self.client.quit().await {
                    warn!(backend = %self.config.name, error = %e, "cache quit failed");
                }
                Err(ConnectorError::Closed)
            }
        };

        if let Err(e) = connected {
            self.detach_listener();
            self.state.mark_disconnected();
            error!(backend = %self.config.name, error = %e, "cache connect failed");
            return Err(e);
        }

        let closed = Arc::new(AtomicBool::new(false));
        *self.closed.lock() = Arc::clone(&closed);

        let check = CacheHealth {
            name: self.config.name.clone(),
            client: Arc::clone(&self.client),
            state: Arc::clone(&self.state),
            closed,
            probe_timeout: self.config.probe_timeout(),
        };
        let handle = ConnectionHandle::new(self.config.name.as_str(), Arc::new(check));
        slot.set(handle.clone());

        info!(
            backend = %self.config.name,
            max_retries = self.policy.max_retries,
            retry_interval = ?self.policy.retry_interval,
            "cache connection ready"
        );
        Ok(handle)
    }

    async fn disconnect(&self) -> ConnectorResult<()> {
        self.disconnects
            .send_modify(|count| *count = count.wrapping_add(1));
        let slot = self.registry.slot(&self.config.name).await;
        if slot.take().is_none() {
            debug!(backend = %self.config.name, "disconnect without open connection");
            return Ok(());
        }

        self.closed.lock().store(true, Ordering::SeqCst);
        let result = self.client.quit().await;
        self.detach_listener();
        self.state.mark_disconnected();

        match &result {
            Ok(()) => info!(backend = %self.config.name, "cache disconnected"),
            Err(e) => warn!(backend = %self.config.name, error = %e, "cache quit failed"),
        }
        result
    }

    async fn health_check(&self) -> HealthStatus {
        match self.registry.try_get(&self.config.name) {
            Some(handle) => handle.health_check().await,
            None => HealthStatus::disconnected(),
        }
    }
}
