//! Probe server configuration.

use crate::error::{ProbeServerError, ProbeServerResult};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use tether_core::saturating_millis;

/// Configuration for the health probes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Address the probe server listens on.
    pub bind_addr: SocketAddr,
    /// Upper bound for a single backend health check, in milliseconds.
    pub check_timeout_ms: u64,
}

impl ProbeConfig {
    /// Default per-check timeout.
    pub const DEFAULT_CHECK_TIMEOUT_MS: u64 = 3_000;

    /// Sets the listen address.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Sets the per-check timeout.
    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout_ms = saturating_millis(timeout);
        self
    }

    /// Returns the per-check timeout.
    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ProbeServerResult<()> {
        if self.check_timeout_ms == 0 {
            return Err(ProbeServerError::InvalidConfig(
                "check timeout must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8081)),
            check_timeout_ms: Self::DEFAULT_CHECK_TIMEOUT_MS,
        }
    }
}
