//! Configuration file loading.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tether_core::{CacheStoreConfig, DocumentStoreConfig};
use tether_health::ProbeConfig;
use thiserror::Error;

/// Errors raised while loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for [`TetherConfig`].
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Everything the binary needs to know.
///
/// Each backend section is optional; a missing section means the backend
/// is neither connected nor polled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    /// Document-store adapter settings.
    pub document_store: Option<DocumentStoreConfig>,
    /// Cache-store adapter settings.
    pub cache_store: Option<CacheStoreConfig>,
    /// Probe server settings.
    pub probe: ProbeConfig,
}

/// Values given on the command line, applied over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Document-store URI.
    pub mongo_uri: Option<String>,
    /// Cache-store URL.
    pub redis_url: Option<String>,
    /// Cache retry ceiling.
    pub max_retries: Option<u32>,
    /// Cache backoff step in milliseconds.
    pub retry_interval_ms: Option<u64>,
}

impl TetherConfig {
    /// Loads the file at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies command-line overrides.
    ///
    /// A URI or URL on the command line creates the backend section if the
    /// file did not have one.
    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(uri) = overrides.mongo_uri {
            match self.document_store.as_mut() {
                Some(docs) => docs.uri = uri,
                None => self.document_store = Some(DocumentStoreConfig::new(uri)),
            }
        }

        if let Some(url) = overrides.redis_url {
            match self.cache_store.as_mut() {
                Some(cache) => cache.url = url,
                None => self.cache_store = Some(CacheStoreConfig::new(url)),
            }
        }

        if let Some(cache) = self.cache_store.as_mut() {
            if let Some(max_retries) = overrides.max_retries {
                cache.max_retries = max_retries;
            }
            if let Some(interval) = overrides.retry_interval_ms {
                cache.retry_interval_ms = interval;
            }
        }
        self
    }
}
