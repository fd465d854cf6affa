//! # Tether Cache Store
//!
//! Cache-store connector for Tether.
//!
//! The cache client runs its own reconnection loop and publishes discrete
//! lifecycle events. The adapter observes that loop and folds the events
//! into the shared status model.
//!
//! This crate provides:
//! - [`ReconnectPolicy`] - bounded linear backoff (`attempt * interval`)
//! - [`StatusCell`] - the event-driven status state machine
//! - [`CacheClient`] - the client seam, with [`ReconnectingClient`] as a
//!   generic retry loop over a [`Dialer`]
//! - [`TcpDialer`] - dialer for `redis://` endpoints
//! - [`MockCacheClient`] - a scriptable client for tests
//! - [`CacheStoreConnector`] - the adapter implementing `tether_core::Connector`
//!
//! ## State machine
//!
//! ```text
//! disconnected --connect()--> connecting --Connect--> connected
//! any --Error--> error --Reconnecting--> reconnecting --Reconnect--> connected
//! any --End--> disconnected
//! ```
//!
//! ## Key Invariants
//!
//! - The reconnect loop stops once `attempt > max_retries`; status then
//!   settles to `disconnected` and the process keeps running
//! - Health checks ping under a timeout; a failed or hung ping reports
//!   `disconnected` whatever the last event said

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod client;
mod connector;
mod mock;
mod policy;
mod reconnecting;
mod state;
mod tcp;

pub use client::{CacheClient, RetryStrategy};
pub use connector::CacheStoreConnector;
pub use mock::MockCacheClient;
pub use policy::{Backoff, ReconnectPolicy};
pub use reconnecting::{CacheConnection, Dialer, ReconnectingClient};
pub use state::{CacheEvent, CacheSnapshot, ReconnectionState, StatusCell};
pub use tcp::{TcpConnection, TcpDialer};
