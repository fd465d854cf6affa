//! Cache lifecycle events and the status state machine.

use parking_lot::RwLock;
use std::time::Duration;
use tether_core::{ConnectionStatus, HealthStatus};

/// Lifecycle events published by a cache client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// The first connection is established.
    Connect,
    /// An attempt failed or an established link broke.
    Error(String),
    /// The client will retry after `delay`.
    Reconnecting {
        /// Failed attempt number that triggered the retry (1-indexed).
        attempt: u32,
        /// Delay before the next attempt.
        delay: Duration,
    },
    /// A retry succeeded and the connection is usable again.
    Reconnect,
    /// The client stopped: retries exhausted or explicit quit.
    End,
}

/// Retry bookkeeping for the current outage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconnectionState {
    /// Failed attempts since the last successful connect.
    pub attempt: u32,
    /// Cause of the most recent failure.
    pub last_cause: Option<String>,
}

/// A consistent view of status and retry bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSnapshot {
    /// Last event-driven status.
    pub status: ConnectionStatus,
    /// Retry bookkeeping.
    pub reconnection: ReconnectionState,
}

impl CacheSnapshot {
    /// Returns the snapshot as a health status.
    pub fn health(&self) -> HealthStatus {
        HealthStatus::new(self.status)
    }
}

impl Default for CacheSnapshot {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            reconnection: ReconnectionState::default(),
        }
    }
}

/// Guarded status cell.
///
/// Written only from event callbacks and the adapter's connect/disconnect;
/// every write updates status and bookkeeping under one lock, so readers
/// never see a status from one transition paired with an attempt count
/// from another.
#[derive(Debug, Default)]
pub struct StatusCell {
    inner: RwLock<CacheSnapshot>,
}

impl StatusCell {
    /// Creates a cell in the `disconnected` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a consistent copy of the current state.
    pub fn snapshot(&self) -> CacheSnapshot {
        self.inner.read().clone()
    }

    /// Returns the current status.
    pub fn status(&self) -> ConnectionStatus {
        self.inner.read().status
    }

    /// Marks the start of an explicit connect.
    pub fn begin_connect(&self) {
        let mut inner = self.inner.write();
        inner.status = ConnectionStatus::Connecting;
        inner.reconnection = ReconnectionState::default();
    }

    /// Applies a lifecycle event and returns the resulting status.
    pub fn apply(&self, event: &CacheEvent) -> ConnectionStatus {
        let mut inner = self.inner.write();
        match event {
            CacheEvent::Connect | CacheEvent::Reconnect => {
                inner.status = ConnectionStatus::Connected;
                inner.reconnection = ReconnectionState::default();
            }
            CacheEvent::Error(cause) => {
                inner.status = ConnectionStatus::Error;
                inner.reconnection.last_cause = Some(cause.clone());
            }
            CacheEvent::Reconnecting { attempt, .. } => {
                inner.status = ConnectionStatus::Reconnecting;
                inner.reconnection.attempt = *attempt;
            }
            CacheEvent::End => {
                inner.status = ConnectionStatus::Disconnected;
            }
        }
        inner.status
    }

    /// Records a failed attempt as seen by the retry strategy.
    pub fn record_failure(&self, attempt: u32, cause: &str) {
        let mut inner = self.inner.write();
        inner.reconnection.attempt = attempt;
        inner.reconnection.last_cause = Some(cause.to_string());
    }

    /// Forces the `disconnected` state.
    pub fn mark_disconnected(&self) {
        self.inner.write().status = ConnectionStatus::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disconnected() {
        let cell = StatusCell::new();
        assert_eq!(cell.status(), ConnectionStatus::Disconnected);
        assert_eq!(cell.snapshot().reconnection, ReconnectionState::default());
    }

    #[test]
    fn lifecycle_transitions() {
        let cell = StatusCell::new();

        cell.begin_connect();
        assert_eq!(cell.status(), ConnectionStatus::Connecting);

        let steps = [
            (CacheEvent::Connect, ConnectionStatus::Connected),
            (CacheEvent::Error("reset".into()), ConnectionStatus::Error),
            (
                CacheEvent::Reconnecting {
                    attempt: 1,
                    delay: Duration::from_millis(500),
                },
                ConnectionStatus::Reconnecting,
            ),
            (CacheEvent::Reconnect, ConnectionStatus::Connected),
            (CacheEvent::End, ConnectionStatus::Disconnected),
        ];

        for (event, expected) in steps {
            assert_eq!(cell.apply(&event), expected);
            let snapshot = cell.snapshot();
            assert_eq!(snapshot.status, expected);
            assert_eq!(
                snapshot.health().is_connected(),
                expected == ConnectionStatus::Connected
            );
        }
    }

    #[test]
    fn bookkeeping_resets_on_success() {
        let cell = StatusCell::new();
        cell.apply(&CacheEvent::Connect);
        cell.apply(&CacheEvent::Error("timeout".into()));
        cell.record_failure(2, "timeout");
        cell.apply(&CacheEvent::Reconnecting {
            attempt: 2,
            delay: Duration::from_secs(1),
        });

        let snapshot = cell.snapshot();
        assert_eq!(snapshot.reconnection.attempt, 2);
        assert_eq!(snapshot.reconnection.last_cause.as_deref(), Some("timeout"));

        cell.apply(&CacheEvent::Reconnect);
        assert_eq!(cell.snapshot().reconnection, ReconnectionState::default());
    }

    #[test]
    fn begin_connect_clears_previous_outage() {
        let cell = StatusCell::new();
        cell.record_failure(7, "refused");
        cell.apply(&CacheEvent::End);

        cell.begin_connect();
        let snapshot = cell.snapshot();
        assert_eq!(snapshot.status, ConnectionStatus::Connecting);
        assert_eq!(snapshot.reconnection.attempt, 0);
    }

    #[test]
    fn concurrent_readers_see_consistent_snapshots() {
        use std::sync::Arc;

        let cell = Arc::new(StatusCell::new());
        let writer = {
            let cell = Arc::clone(&cell);
            std::thread::spawn(move || {
                for attempt in 1..=500 {
                    cell.apply(&CacheEvent::Reconnecting {
                        attempt,
                        delay: Duration::ZERO,
                    });
                    cell.apply(&CacheEvent::Reconnect);
                }
            })
        };

        for _ in 0..2000 {
            let snapshot = cell.snapshot();
            // A connected snapshot always carries reset bookkeeping.
            if snapshot.status == ConnectionStatus::Connected {
                assert_eq!(snapshot.reconnection.attempt, 0);
            }
        }
        writer.join().unwrap();
    }
}
