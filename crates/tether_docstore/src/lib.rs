//! # Tether Document Store
//!
//! Document-store connector for Tether.
//!
//! The document driver exposes only a numeric readiness code plus a few
//! lifecycle events. This crate provides:
//! - [`DocumentDriver`], the opaque driver seam
//! - [`DocumentStoreConnector`], the adapter implementing `tether_core::Connector`
//! - [`TcpDocumentDriver`], a driver that tracks a plain TCP session
//! - [`MockDocumentDriver`], a scriptable driver for tests
//!
//! ## Readiness codes
//!
//! | code | meaning       |
//! |------|---------------|
//! | 0    | disconnected  |
//! | 1    | connected     |
//! | 2    | connecting    |
//! | 3    | disconnecting |
//!
//! Health checks read the code synchronously; they never touch the network.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod connector;
mod driver;
mod mock;
mod tcp;

pub use connector::DocumentStoreConnector;
pub use driver::{
    DocumentDriver, DocumentEvent, READY_STATE_CONNECTED, READY_STATE_CONNECTING,
    READY_STATE_DISCONNECTED, READY_STATE_DISCONNECTING,
};
pub use mock::MockDocumentDriver;
pub use tcp::{parse_address, TcpDocumentDriver};
