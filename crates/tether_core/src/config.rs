//! Adapter configuration.
//!
//! Configuration is plain data. Loading it (files, environment) is the
//! host's job; adapters take an owned copy and never mutate it.

use crate::error::{ConnectorError, ConnectorResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Converts to whole milliseconds, clamping at `u64::MAX`.
pub fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Configuration for the document-store adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStoreConfig {
    /// Logical backend name (registry key).
    pub name: String,
    /// Connection URI, e.g. `mongodb://localhost:27017/app`.
    pub uri: String,
    /// Driver-specific connection options, passed through untouched.
    pub options: BTreeMap<String, String>,
    /// Upper bound for the initial transport connect, in milliseconds.
    pub connect_timeout_ms: u64,
}

impl DocumentStoreConfig {
    /// Default logical name.
    pub const DEFAULT_NAME: &'static str = "mongodb";

    /// Creates a configuration for the given URI.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Sets the logical backend name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a driver option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = saturating_millis(timeout);
        self
    }

    /// Returns the connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Checks the configuration before it is handed to an adapter.
    pub fn validate(&self) -> ConnectorResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConnectorError::InvalidConfig(
                "document store name is empty".into(),
            ));
        }
        if self.uri.trim().is_empty() {
            return Err(ConnectorError::InvalidConfig(
                "document store uri is empty".into(),
            ));
        }
        Ok(())
    }
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            uri: String::new(),
            options: BTreeMap::new(),
            connect_timeout_ms: 10_000,
        }
    }
}

/// Configuration for the cache-store adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheStoreConfig {
    /// Logical backend name (registry key).
    pub name: String,
    /// Connection URL, e.g. `redis://localhost:6379`.
    pub url: String,
    /// Failed attempts tolerated before the reconnect loop stops.
    pub max_retries: u32,
    /// Linear backoff step in milliseconds.
    pub retry_interval_ms: u64,
    /// Upper bound for the health-check ping, in milliseconds.
    pub probe_timeout_ms: u64,
}

impl CacheStoreConfig {
    /// Default logical name.
    pub const DEFAULT_NAME: &'static str = "redis";
    /// Default retry ceiling.
    pub const DEFAULT_MAX_RETRIES: u32 = 20;
    /// Default backoff step.
    pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 500;

    /// Creates a configuration for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Sets the logical backend name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the retry ceiling.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the backoff step.
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval_ms = saturating_millis(interval);
        self
    }

    /// Sets the probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout_ms = saturating_millis(timeout);
        self
    }

    /// Returns the backoff step.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Returns the probe timeout.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Checks the configuration before it is handed to an adapter.
    pub fn validate(&self) -> ConnectorResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConnectorError::InvalidConfig(
                "cache store name is empty".into(),
            ));
        }
        if self.url.trim().is_empty() {
            return Err(ConnectorError::InvalidConfig(
                "cache store url is empty".into(),
            ));
        }
        if self.retry_interval_ms == 0 {
            return Err(ConnectorError::InvalidConfig(
                "retry interval must be positive".into(),
            ));
        }
        if self.probe_timeout_ms == 0 {
            return Err(ConnectorError::InvalidConfig(
                "probe timeout must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheStoreConfig {
    fn default() -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            url: String::new(),
            max_retries: Self::DEFAULT_MAX_RETRIES,
            retry_interval_ms: Self::DEFAULT_RETRY_INTERVAL_MS,
            probe_timeout_ms: 2_000,
        }
    }
}
