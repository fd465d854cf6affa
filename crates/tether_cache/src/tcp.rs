//! TCP dialer for `redis://` endpoints.
//!
//! The connection speaks just enough of the inline protocol to send `PING`
//! and recognise `+PONG`. Credentials in the URL are not sent; a server
//! that requires `AUTH` answers the ping with an error, which surfaces as a
//! failed probe.

use crate::reconnecting::{CacheConnection, Dialer};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tether_core::{ConnectorError, ConnectorResult};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

const DEFAULT_PORT: u16 = 6379;

/// Dials a cache server over TCP.
#[derive(Debug, Clone)]
pub struct TcpDialer {
    addr: String,
    connect_timeout: Duration,
    keepalive: Duration,
}

impl TcpDialer {
    /// Creates a dialer for `host:port`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout: Duration::from_secs(5),
            keepalive: Duration::from_secs(5),
        }
    }

    /// Creates a dialer from a `redis://[user:pass@]host[:port][/db]` URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidConfig`] for other schemes or a
    /// missing host, and a fatal transport error for `rediss://`.
    pub fn from_url(url: &str) -> ConnectorResult<Self> {
        if url.starts_with("rediss://") {
            return Err(ConnectorError::transport_fatal(
                "TLS endpoints are not supported by the TCP dialer",
            ));
        }

        let rest = url
            .strip_prefix("redis://")
            .ok_or_else(|| ConnectorError::InvalidConfig(format!("unsupported url scheme: {url}")))?;

        let authority = rest.split(['/', '?']).next().unwrap_or_default();
        let host = authority.rsplit('@').next().unwrap_or_default().trim();
        if host.is_empty() {
            return Err(ConnectorError::InvalidConfig(format!("no host in url: {url}")));
        }

        let has_port = if host.starts_with('[') {
            host.contains("]:")
        } else {
            host.contains(':')
        };

        let addr = if has_port {
            host.to_string()
        } else {
            format!("{host}:{DEFAULT_PORT}")
        };
        Ok(Self::new(addr))
    }

    /// Sets the per-attempt connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets how often an idle link is pinged to detect breakage.
    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Returns the `host:port` this dialer connects to.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    type Connection = TcpConnection;

    async fn dial(&self) -> ConnectorResult<TcpConnection> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| {
                ConnectorError::transport_retryable(format!(
                    "connect to {} timed out after {:?}",
                    self.addr, self.connect_timeout
                ))
            })??;

        let connection = TcpConnection {
            stream: Mutex::new(BufReader::new(stream)),
            pending: AtomicBool::new(false),
            keepalive: self.keepalive,
        };
        connection.ping().await?;
        Ok(connection)
    }
}

/// A TCP link to a cache server.
///
/// A ping abandoned between its write and its reply leaves the reply stream
/// one answer behind. The connection notices on the next ping and reports
/// the link as broken instead of trusting a stale `+PONG`.
#[derive(Debug)]
pub struct TcpConnection {
    stream: Mutex<BufReader<TcpStream>>,
    /// Set from the `PING` write until its reply is read.
    pending: AtomicBool,
    keepalive: Duration,
}

#[async_trait]
impl CacheConnection for TcpConnection {
    async fn ping(&self) -> ConnectorResult<()> {
        let mut stream = self.stream.lock().await;
        if self.pending.swap(true, Ordering::SeqCst) {
            return Err(ConnectorError::transport_retryable(
                "previous ping was abandoned before its reply",
            ));
        }
        stream.get_mut().write_all(b"PING\r\n").await?;

        let mut line = String::new();
        let read = stream.read_line(&mut line).await?;
        self.pending.store(false, Ordering::SeqCst);
        if read == 0 {
            return Err(ConnectorError::transport_retryable(
                "connection closed by peer",
            ));
        }

        let reply = line.trim_end();
        if reply == "+PONG" {
            Ok(())
        } else {
            Err(ConnectorError::ProbeFailure(format!(
                "unexpected ping reply: {reply}"
            )))
        }
    }

    async fn closed(&self) -> String {
        loop {
            tokio::time::sleep(self.keepalive).await;
            match tokio::time::timeout(self.keepalive, self.ping()).await {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => return e.to_string(),
                Err(_) => return format!("keepalive ping timed out after {:?}", self.keepalive),
            }
        }
    }
}
