//! Document-store adapter.

use crate::driver::{DocumentDriver, DocumentEvent};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tether_core::{
    ConnectionHandle, ConnectionRegistry, Connector, ConnectorError, ConnectorResult,
    DocumentStoreConfig, HealthCheck, HealthStatus, ListenerId,
};
use tracing::{debug, error, info, warn};

/// Health check that reads the driver's readiness code.
struct ReadinessCheck<D> {
    driver: Arc<D>,
}

#[async_trait]
impl<D: DocumentDriver> HealthCheck for ReadinessCheck<D> {
    async fn health_check(&self) -> HealthStatus {
        HealthStatus::from_readiness_code(self.driver.ready_state())
    }
}

/// Connector for a document store.
///
/// Owns one driver. `connect` opens it once and registers its handle;
/// later calls return the registered handle.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tether_core::{ConnectionRegistry, Connector, DocumentStoreConfig};
/// use tether_docstore::{DocumentStoreConnector, MockDocumentDriver};
///
/// # tokio_test_block(async {
/// let registry = Arc::new(ConnectionRegistry::new());
/// let connector = DocumentStoreConnector::new(
///     DocumentStoreConfig::new("mongodb://localhost:27017/app"),
///     MockDocumentDriver::new(),
///     Arc::clone(&registry),
/// );
///
/// let handle = connector.connect().await.unwrap();
/// assert!(handle.health_check().await.is_connected());
/// connector.disconnect().await.unwrap();
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f);
/// # }
/// ```
pub struct DocumentStoreConnector<D: DocumentDriver> {
    config: DocumentStoreConfig,
    driver: Arc<D>,
    registry: Arc<ConnectionRegistry>,
    listeners: Mutex<Vec<ListenerId>>,
}

impl<D: DocumentDriver> DocumentStoreConnector<D> {
    /// Creates a connector. Nothing is opened until `connect`.
    pub fn new(config: DocumentStoreConfig, driver: D, registry: Arc<ConnectionRegistry>) -> Self {
        Self::with_shared_driver(config, Arc::new(driver), registry)
    }

    /// Creates a connector around a driver the caller keeps a reference to.
    pub fn with_shared_driver(
        config: DocumentStoreConfig,
        driver: Arc<D>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            config,
            driver,
            registry,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DocumentStoreConfig {
        &self.config
    }

    /// Returns the raw driver.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::NotInitialized`] until `connect` resolved,
    /// and again after `disconnect`.
    pub fn client(&self) -> ConnectorResult<Arc<D>> {
        if self.registry.contains(&self.config.name) {
            Ok(Arc::clone(&self.driver))
        } else {
            Err(ConnectorError::not_initialized(&self.config.name))
        }
    }

    fn attach_listeners(&self) {
        let events = self.driver.events();

        let name = self.config.name.clone();
        let announced = AtomicBool::new(false);
        let connected = events.add(move |event| {
            if *event == DocumentEvent::Connected && !announced.swap(true, Ordering::SeqCst) {
                info!(backend = %name, "document store connected");
            }
        });

        let name = self.config.name.clone();
        let failed = events.add(move |event| {
            if let DocumentEvent::Error(message) = event {
                error!(backend = %name, error = %message, "document store connection error");
            }
        });

        self.listeners.lock().extend([connected, failed]);
    }

    fn detach_listeners(&self) {
        let events = self.driver.events();
        for id in self.listeners.lock().drain(..) {
            events.remove(id);
        }
    }
}

#[async_trait]
impl<D: DocumentDriver> Connector for DocumentStoreConnector<D> {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn connect(&self) -> ConnectorResult<ConnectionHandle> {
        let slot = self.registry.slot(&self.config.name).await;
        if let Some(handle) = slot.get() {
            debug!(backend = %self.config.name, "reusing document store connection");
            return Ok(handle);
        }

        self.config.validate()?;
        self.attach_listeners();

        if let Err(e) = self.driver.open(&self.config.uri, &self.config.options).await {
            self.detach_listeners();
            error!(backend = %self.config.name, error = %e, "document store open failed");
            return Err(e);
        }

        let check = ReadinessCheck {
            driver: Arc::clone(&self.driver),
        };
        let handle = ConnectionHandle::new(self.config.name.as_str(), Arc::new(check));
        slot.set(handle.clone());

        info!(backend = %self.config.name, "document store connection initiated");
        Ok(handle)
    }

    async fn disconnect(&self) -> ConnectorResult<()> {
        let slot = self.registry.slot(&self.config.name).await;
        if slot.take().is_none() {
            debug!(backend = %self.config.name, "disconnect without open connection");
            return Ok(());
        }

        let result = self.driver.close().await;
        self.detach_listeners();

        match &result {
            Ok(()) => info!(backend = %self.config.name, "document store disconnected"),
            Err(e) => warn!(backend = %self.config.name, error = %e, "document store close failed"),
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
