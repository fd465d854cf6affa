//! # Tether Core
//!
//! Connector contract and shared status model for Tether.
//!
//! This crate provides:
//! - The [`Connector`] trait every backend adapter implements
//! - [`ConnectionStatus`] / [`HealthStatus`] and the readiness-code mapping
//! - [`ConnectionHandle`], the object handed out by `connect`
//! - [`ConnectionRegistry`], the injectable per-backend handle store
//! - [`Listeners`], the callback set drivers use to publish lifecycle events
//! - Plain-data adapter configuration
//!
//! ## Key Invariants
//!
//! - A handle is never exposed before the transport handshake was initiated
//! - `health_check` always produces a value; failures degrade the status
//! - `HealthStatus::connected` is true iff the status is `Connected`
//! - At most one live handle per backend name
//!
//! ## Example
//!
//! ```rust
//! use tether_core::{ConnectionStatus, HealthStatus};
//!
//! let health = HealthStatus::from_readiness_code(1);
//! assert_eq!(health.status(), ConnectionStatus::Connected);
//! assert!(health.is_connected());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod connector;
mod error;
mod events;
mod handle;
mod registry;
mod status;

pub use config::{saturating_millis, CacheStoreConfig, DocumentStoreConfig};
pub use connector::Connector;
pub use error::{ConnectorError, ConnectorResult};
pub use events::{ListenerId, Listeners};
pub use handle::{ConnectionHandle, HealthCheck};
pub use registry::{ConnectionRegistry, SlotGuard};
pub use status::{ConnectionStatus, HealthStatus};

/// Tether version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
