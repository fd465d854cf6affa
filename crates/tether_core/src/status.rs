//! Shared connection status model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The connection state of a backend, as seen by the health contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// The connection is established and usable.
    Connected,
    /// No connection exists (never opened, closed, or given up).
    Disconnected,
    /// The first connection attempt is in progress.
    Connecting,
    /// The client lost its connection and is retrying.
    Reconnecting,
    /// The connection is being closed.
    Disconnecting,
    /// The last observed event was a failure, or the state is unknown.
    Error,
}

impl ConnectionStatus {
    /// Maps a driver-native readiness code onto the shared status.
    ///
    /// | code | status          |
    /// |------|-----------------|
    /// | 0    | `Disconnected`  |
    /// | 1    | `Connected`     |
    /// | 2    | `Connecting`    |
    /// | 3    | `Disconnecting` |
    /// | else | `Error`         |
    pub fn from_readiness_code(code: i32) -> Self {
        match code {
            0 => ConnectionStatus::Disconnected,
            1 => ConnectionStatus::Connected,
            2 => ConnectionStatus::Connecting,
            3 => ConnectionStatus::Disconnecting,
            _ => ConnectionStatus::Error,
        }
    }

    /// Returns true for states that are expected to change on their own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Connecting
                | ConnectionStatus::Reconnecting
                | ConnectionStatus::Disconnecting
                | ConnectionStatus::Error
        )
    }

    /// Returns the lowercase wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Reconnecting => "reconnecting",
            ConnectionStatus::Disconnecting => "disconnecting",
            ConnectionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a health check.
///
/// `connected` is derived from `status` at construction and cannot drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    status: ConnectionStatus,
    connected: bool,
}

impl HealthStatus {
    /// Creates a health status from a connection status.
    pub fn new(status: ConnectionStatus) -> Self {
        Self {
            status,
            connected: status == ConnectionStatus::Connected,
        }
    }

    /// Shorthand for a connected status.
    pub fn connected() -> Self {
        Self::new(ConnectionStatus::Connected)
    }

    /// Shorthand for a disconnected status.
    pub fn disconnected() -> Self {
        Self::new(ConnectionStatus::Disconnected)
    }

    /// Maps a driver readiness code, see [`ConnectionStatus::from_readiness_code`].
    pub fn from_readiness_code(code: i32) -> Self {
        Self::new(ConnectionStatus::from_readiness_code(code))
    }

    /// Returns the connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Returns true iff the status is `Connected`.
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

impl From<ConnectionStatus> for HealthStatus {
    fn from(status: ConnectionStatus) -> Self {
        Self::new(status)
    }
}

impl<'de> Deserialize<'de> for HealthStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // `connected` on the wire is ignored and re-derived.
        #[derive(Deserialize)]
        struct Raw {
            status: ConnectionStatus,
        }

        let raw = Raw::deserialize(deserializer)?;
        Ok(Self::new(raw.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn known_codes_map_to_unique_statuses() {
        let expected = [
            (0, ConnectionStatus::Disconnected),
            (1, ConnectionStatus::Connected),
            (2, ConnectionStatus::Connecting),
            (3, ConnectionStatus::Disconnecting),
        ];

        let mut seen = HashSet::new();
        for (code, status) in expected {
            assert_eq!(ConnectionStatus::from_readiness_code(code), status);
            assert!(seen.insert(status));
        }
    }

    #[test]
    fn out_of_range_codes_map_to_error() {
        assert_eq!(ConnectionStatus::from_readiness_code(4), ConnectionStatus::Error);
        assert_eq!(ConnectionStatus::from_readiness_code(99), ConnectionStatus::Error);
        assert_eq!(ConnectionStatus::from_readiness_code(-1), ConnectionStatus::Error);
        assert_eq!(
            ConnectionStatus::from_readiness_code(i32::MIN),
            ConnectionStatus::Error
        );
    }

    #[test]
    fn connected_flag_follows_status() {
        assert!(HealthStatus::connected().is_connected());
        assert!(!HealthStatus::disconnected().is_connected());
        assert!(!HealthStatus::new(ConnectionStatus::Reconnecting).is_connected());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_value(HealthStatus::connected()).unwrap();
        assert_eq!(json["status"], "connected");
        assert_eq!(json["connected"], true);

        let json = serde_json::to_value(HealthStatus::new(ConnectionStatus::Reconnecting)).unwrap();
        assert_eq!(json["status"], "reconnecting");
        assert_eq!(json["connected"], false);
    }

    #[test]
    fn deserialize_rederives_connected() {
        let health: HealthStatus =
            serde_json::from_str(r#"{"status":"error","connected":true}"#).unwrap();
        assert_eq!(health.status(), ConnectionStatus::Error);
        assert!(!health.is_connected());
    }

    proptest! {
        #[test]
        fn mapping_is_total(code in any::<i32>()) {
            let health = HealthStatus::from_readiness_code(code);
            prop_assert_eq!(health.is_connected(), health.status() == ConnectionStatus::Connected);
            if !(0..=3).contains(&code) {
                prop_assert_eq!(health.status(), ConnectionStatus::Error);
            }
        }
    }
}
