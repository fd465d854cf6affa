//! CLI command implementations.

pub mod check;
pub mod serve;

use crate::config::TetherConfig;
use std::sync::Arc;
use tether_cache::{CacheStoreConnector, ReconnectingClient, TcpDialer};
use tether_core::{ConnectionRegistry, Connector};
use tether_docstore::{DocumentStoreConnector, TcpDocumentDriver};
use tether_health::HealthAggregator;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};

/// The configured backends, sharing one registry.
pub struct Backends {
    registry: Arc<ConnectionRegistry>,
    connectors: Vec<Arc<dyn Connector>>,
}

impl Backends {
    /// Builds a connector for every configured backend.
    pub fn from_config(config: &TetherConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut connectors: Vec<Arc<dyn Connector>> = Vec::new();

        if let Some(docs) = &config.document_store {
            let driver = TcpDocumentDriver::new(docs.connect_timeout());
            connectors.push(Arc::new(DocumentStoreConnector::new(
                docs.clone(),
                driver,
                Arc::clone(&registry),
            )));
        }

        if let Some(cache) = &config.cache_store {
            let dialer = TcpDialer::from_url(&cache.url)?.with_connect_timeout(cache.probe_timeout());
            connectors.push(Arc::new(CacheStoreConnector::new(
                cache.clone(),
                ReconnectingClient::new(dialer),
                Arc::clone(&registry),
            )));
        }

        if connectors.is_empty() {
            warn!("no backends configured");
        }
        Ok(Self {
            registry,
            connectors,
        })
    }

    /// Builds an aggregator that requires every configured backend.
    pub fn aggregator(&self, config: &TetherConfig) -> HealthAggregator {
        self.connectors.iter().fold(
            HealthAggregator::new(Arc::clone(&self.registry))
                .with_check_timeout(config.probe.check_timeout()),
            |aggregator, connector| aggregator.with_backend(connector.name()),
        )
    }

    /// Connects every backend concurrently.
    ///
    /// Failures are logged and leave that backend unregistered, so it
    /// reports `disconnected` instead of aborting the process.
    pub async fn connect_all(&self) -> usize {
        let mut attempts = JoinSet::new();
        for connector in &self.connectors {
            let connector = Arc::clone(connector);
            attempts.spawn(async move {
                let result = connector.connect().await;
                (connector.name().to_string(), result)
            });
        }

        let mut connected = 0;
        while let Some(joined) = attempts.join_next().await {
            match joined {
                Ok((_, Ok(_))) => connected += 1,
                Ok((name, Err(e))) => error!(backend = %name, error = %e, "connect failed"),
                Err(e) => error!(error = %e, "connect task failed"),
            }
        }
        connected
    }

    /// Connects every backend on a background task.
    ///
    /// Callers keep serving or polling while the cache client retries;
    /// [`shutdown`](Self::shutdown) cancels whatever is still in flight.
    pub fn spawn_connect(self: &Arc<Self>) -> JoinHandle<usize> {
        let backends = Arc::clone(self);
        tokio::spawn(async move {
            let connected = backends.connect_all().await;
            info!(
                connected,
                configured = backends.connectors.len(),
                "backend connects finished"
            );
            connected
        })
    }

    /// Disconnects every backend and waits for `connecting` to settle.
    ///
    /// Disconnecting first makes connects still inside a retry loop give
    /// up, so this does not wait for the retry budget to run out.
    pub async fn shutdown(&self, connecting: JoinHandle<usize>) {
        self.disconnect_all().await;
        if let Err(e) = connecting.await {
            error!(error = %e, "connect task failed");
        }
        // A connect that won the race against the first pass.
        self.disconnect_all().await;
    }

    /// Disconnects every backend, logging failures.
    pub async fn disconnect_all(&self) {
        for connector in &self.connectors {
            if let Err(e) = connector.disconnect().await {
                warn!(backend = %connector.name(), error = %e, "disconnect failed");
            }
        }
    }
}
