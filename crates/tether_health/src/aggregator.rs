//! Rolls per-backend health into a liveness/readiness verdict.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tether_core::{ConnectionRegistry, ConnectionStatus, HealthStatus};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

/// A backend the aggregator polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolledBackend {
    /// Registry name.
    pub name: String,
    /// Whether readiness depends on this backend.
    pub required: bool,
}

/// Health of one backend in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendReport {
    /// Registry name.
    pub name: String,
    /// Whether readiness depends on this backend.
    pub required: bool,
    /// Reported status.
    pub status: ConnectionStatus,
    /// True iff `status` is `connected`.
    pub connected: bool,
}

impl BackendReport {
    fn new(backend: &PolledBackend, health: HealthStatus) -> Self {
        Self {
            name: backend.name.clone(),
            required: backend.required,
            status: health.status(),
            connected: health.is_connected(),
        }
    }
}

/// Aggregated health of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// True iff every required backend is connected.
    pub ready: bool,
    /// True while the process is able to answer.
    pub live: bool,
    /// Per-backend results, in registration order.
    pub backends: Vec<BackendReport>,
}

impl HealthReport {
    /// A report for a process that has not been polled yet.
    pub fn pending() -> Self {
        Self {
            ready: false,
            live: true,
            backends: Vec::new(),
        }
    }

    fn from_backends(backends: Vec<BackendReport>) -> Self {
        let ready = backends.iter().all(|b| !b.required || b.connected);
        Self {
            ready,
            live: true,
            backends,
        }
    }
}

/// Polls the handles in a [`ConnectionRegistry`].
///
/// Backends are looked up by name on every poll, so a backend that has not
/// connected yet (or was disconnected) reports `disconnected` instead of
/// failing the poll.
#[derive(Debug)]
pub struct HealthAggregator {
    registry: Arc<ConnectionRegistry>,
    backends: Vec<PolledBackend>,
    check_timeout: Duration,
}

impl HealthAggregator {
    /// Default per-check timeout.
    pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

    /// Creates an aggregator with no backends.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            backends: Vec::new(),
            check_timeout: Self::DEFAULT_CHECK_TIMEOUT,
        }
    }

    /// Adds a backend that readiness depends on.
    pub fn with_backend(mut self, name: impl Into<String>) -> Self {
        self.backends.push(PolledBackend {
            name: name.into(),
            required: true,
        });
        self
    }

    /// Adds a backend that is reported but does not gate readiness.
    pub fn with_optional_backend(mut self, name: impl Into<String>) -> Self {
        self.backends.push(PolledBackend {
            name: name.into(),
            required: false,
        });
        self
    }

    /// Sets the upper bound for a single health check.
    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    /// Returns the polled backends.
    pub fn backends(&self) -> &[PolledBackend] {
        &self.backends
    }

    /// Polls every backend concurrently and builds a report.
    ///
    /// Never fails: a missing handle, a hung check or a panicking check
    /// all report `disconnected` for that backend.
    pub async fn poll(&self) -> HealthReport {
        let mut reports: Vec<BackendReport> = self
            .backends
            .iter()
            .map(|backend| BackendReport::new(backend, HealthStatus::disconnected()))
            .collect();

        let mut checks = JoinSet::new();
        for (index, backend) in self.backends.iter().enumerate() {
            let Some(handle) = self.registry.try_get(&backend.name) else {
                debug!(backend = %backend.name, "backend not registered");
                continue;
            };

            let timeout = self.check_timeout;
            checks.spawn(async move {
                match tokio::time::timeout(timeout, handle.health_check()).await {
                    Ok(health) => (index, health),
                    Err(_) => {
                        warn!(backend = %handle.name(), ?timeout, "health check timed out");
                        (index, HealthStatus::disconnected())
                    }
                }
            });
        }

        while let Some(joined) = checks.join_next().await {
            match joined {
                Ok((index, health)) => {
                    if let Some(backend) = self.backends.get(index) {
                        reports[index] = BackendReport::new(backend, health);
                    }
                }
                Err(e) => warn!(error = %e, "health check task failed"),
            }
        }

        HealthReport::from_backends(reports)
    }

    /// Polls on a fixed interval and publishes the latest report.
    ///
    /// The first poll runs immediately. Polling stops when the returned
    /// [`HealthWatch`] is dropped.
    pub fn spawn_watch(self: Arc<Self>, interval: Duration) -> HealthWatch {
        let (tx, rx) = watch::channel(HealthReport::pending());
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let report = self.poll().await;
                if tx.send(report).is_err() {
                    return;
                }
            }
        });
        HealthWatch { rx, task }
    }
}

/// Background poller started by [`HealthAggregator::spawn_watch`].
#[derive(Debug)]
pub struct HealthWatch {
    rx: watch::Receiver<HealthReport>,
    task: JoinHandle<()>,
}

impl HealthWatch {
    /// Returns the latest report.
    pub fn latest(&self) -> HealthReport {
        self.rx.borrow().clone()
    }

    /// Returns a receiver that is notified on every new report.
    pub fn subscribe(&self) -> watch::Receiver<HealthReport> {
        self.rx.clone()
    }
}

impl Drop for HealthWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}
