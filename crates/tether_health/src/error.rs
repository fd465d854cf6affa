//! Error types for the probe server.

use std::net::SocketAddr;
use thiserror::Error;

/// Result type for probe server operations.
pub type ProbeServerResult<T> = Result<T, ProbeServerError>;

/// Errors raised while starting or running the probe server.
///
/// Health checks themselves never fail; these only cover the HTTP side.
#[derive(Error, Debug)]
pub enum ProbeServerError {
    /// The listen socket could not be bound.
    #[error("failed to bind probe server to {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("probe server error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration rejected before binding.
    #[error("invalid probe configuration: {0}")]
    InvalidConfig(String),
}
