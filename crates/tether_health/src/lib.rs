//! # Tether Health
//!
//! Health aggregation for Tether connectors.
//!
//! The [`HealthAggregator`] polls the handles in a
//! `tether_core::ConnectionRegistry` on demand and rolls them into a
//! [`HealthReport`]: `ready` iff every required backend reports
//! `connected`. Adapters never push status; they only answer when asked.
//!
//! [`create_router`] exposes the verdict as `/livez`, `/readyz` and
//! `/health` for an orchestrator's probes.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod aggregator;
mod config;
mod error;
mod server;

pub use aggregator::{BackendReport, HealthAggregator, HealthReport, HealthWatch, PolledBackend};
pub use config::ProbeConfig;
pub use error::{ProbeServerError, ProbeServerResult};
pub use server::{create_router, ProbeServer};
