//! TCP-backed document driver.
//!
//! Tracks a single TCP session to the first host of a `mongodb://` URI.
//! The session is opened in the background; `open` only validates the URI
//! and starts the attempt.

use crate::driver::{
    DocumentDriver, DocumentEvent, READY_STATE_CONNECTED, READY_STATE_CONNECTING,
    READY_STATE_DISCONNECTED, READY_STATE_DISCONNECTING,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tether_core::{ConnectorError, ConnectorResult, Listeners};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::debug;

const DEFAULT_PORT: u16 = 27017;
const CONNECT_TIMEOUT_OPTION: &str = "connectTimeoutMS";

/// Extracts `host:port` of the first host in a `mongodb://` URI.
///
/// Credentials, database path and query string are ignored. A missing port
/// defaults to 27017.
///
/// # Errors
///
/// Returns [`ConnectorError::InvalidConfig`] for a foreign scheme or an
/// empty host list, and a fatal transport error for `mongodb+srv://`, which
/// needs DNS SRV resolution.
pub fn parse_address(uri: &str) -> ConnectorResult<String> {
    if uri.starts_with("mongodb+srv://") {
        return Err(ConnectorError::transport_fatal(
            "mongodb+srv URIs require SRV resolution",
        ));
    }

    let rest = uri
        .strip_prefix("mongodb://")
        .ok_or_else(|| ConnectorError::InvalidConfig(format!("unsupported uri scheme: {uri}")))?;

    let authority = rest.split(['/', '?']).next().unwrap_or_default();
    let hosts = authority.rsplit('@').next().unwrap_or_default();
    let host = hosts.split(',').next().unwrap_or_default().trim();

    if host.is_empty() {
        return Err(ConnectorError::InvalidConfig(format!("no host in uri: {uri}")));
    }

    let has_port = if host.starts_with('[') {
        host.contains("]:")
    } else {
        host.contains(':')
    };

    if has_port {
        Ok(host.to_string())
    } else {
        Ok(format!("{host}:{DEFAULT_PORT}"))
    }
}

/// A document driver holding one TCP session.
#[derive(Debug)]
pub struct TcpDocumentDriver {
    state: Arc<AtomicI32>,
    events: Arc<Listeners<DocumentEvent>>,
    session: Arc<AsyncMutex<Option<TcpStream>>>,
    connect_timeout: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TcpDocumentDriver {
    /// Creates a driver; `connect_timeout` bounds each session attempt.
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            state: Arc::new(AtomicI32::new(READY_STATE_DISCONNECTED)),
            events: Arc::new(Listeners::new()),
            session: Arc::new(AsyncMutex::new(None)),
            connect_timeout,
            task: Mutex::new(None),
        }
    }

    fn timeout_for(&self, options: &BTreeMap<String, String>) -> Duration {
        options
            .get(CONNECT_TIMEOUT_OPTION)
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(self.connect_timeout)
    }
}

#[async_trait]
impl DocumentDriver for TcpDocumentDriver {
    async fn open(&self, uri: &str, options: &BTreeMap<String, String>) -> ConnectorResult<()> {
        let addr = parse_address(uri)?;
        let timeout = self.timeout_for(options);

        self.state.store(READY_STATE_CONNECTING, Ordering::SeqCst);

        let state = Arc::clone(&self.state);
        let events = Arc::clone(&self.events);
        let session = Arc::clone(&self.session);

        let task = tokio::spawn(async move {
            debug!(%addr, "opening document store session");
            match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
                Ok(Ok(stream)) => {
                    *session.lock().await = Some(stream);
                    state.store(READY_STATE_CONNECTED, Ordering::SeqCst);
                    events.emit(&DocumentEvent::Connected);
                }
                Ok(Err(e)) => {
                    state.store(READY_STATE_DISCONNECTED, Ordering::SeqCst);
                    events.emit(&DocumentEvent::Error(format!("connect to {addr}: {e}")));
                }
                Err(_) => {
                    state.store(READY_STATE_DISCONNECTED, Ordering::SeqCst);
                    events.emit(&DocumentEvent::Error(format!(
                        "connect to {addr} timed out after {timeout:?}"
                    )));
                }
            }
        });

        if let Some(previous) = self.task.lock().replace(task) {
            previous.abort();
        }
        Ok(())
    }

    fn ready_state(&self) -> i32 {
        self.state.load(Ordering::SeqCst)
    }

    fn events(&self) -> &Listeners<DocumentEvent> {
        &self.events
    }

    async fn close(&self) -> ConnectorResult<()> {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }

        self.state.store(READY_STATE_DISCONNECTING, Ordering::SeqCst);
        let stream = self.session.lock().await.take();
        let result = match stream {
            Some(mut stream) => stream.shutdown().await.map_err(ConnectorError::from),
            None => Ok(()),
        };
        self.state.store(READY_STATE_DISCONNECTED, Ordering::SeqCst);
        self.events.emit(&DocumentEvent::Disconnected);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn wait_for_state(driver: &TcpDocumentDriver, code: i32) {
        for _ in 0..200 {
            if driver.ready_state() == code {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("driver never reached state {code}, at {}", driver.ready_state());
    }

    #[test]
    fn parse_plain_host() {
        assert_eq!(parse_address("mongodb://localhost").unwrap(), "localhost:27017");
        assert_eq!(parse_address("mongodb://db:27018/app").unwrap(), "db:27018");
    }

    #[test]
    fn parse_strips_credentials_and_query() {
        assert_eq!(
            parse_address("mongodb://user:p@ss@db.internal:27019/app?authSource=admin").unwrap(),
            "db.internal:27019"
        );
        assert_eq!(
            parse_address("mongodb://a:1,b:2,c:3/?replicaSet=rs0").unwrap(),
            "a:1"
        );
    }

    #[test]
    fn parse_ipv6() {
        assert_eq!(parse_address("mongodb://[::1]:27017").unwrap(), "[::1]:27017");
        assert_eq!(parse_address("mongodb://[::1]").unwrap(), "[::1]:27017");
    }

    #[test]
    fn parse_rejects_bad_uris() {
        assert!(matches!(
            parse_address("redis://localhost"),
            Err(ConnectorError::InvalidConfig(_))
        ));
        assert!(matches!(
            parse_address("mongodb:///app"),
            Err(ConnectorError::InvalidConfig(_))
        ));
        assert!(matches!(
            parse_address("mongodb+srv://cluster.example.com"),
            Err(ConnectorError::Transport { retryable: false, .. })
        ));
    }

    #[tokio::test]
    async fn session_connects_and_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _conn = listener.accept().await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let driver = TcpDocumentDriver::new(Duration::from_secs(1));
        driver
            .open(&format!("mongodb://{addr}/app"), &BTreeMap::new())
            .await
            .unwrap();
        wait_for_state(&driver, READY_STATE_CONNECTED).await;

        driver.close().await.unwrap();
        assert_eq!(driver.ready_state(), READY_STATE_DISCONNECTED);
    }

    #[tokio::test]
    async fn refused_session_reports_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let driver = TcpDocumentDriver::new(Duration::from_secs(1));
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        driver.events().add(move |event| {
            if let DocumentEvent::Error(message) = event {
                sink.lock().push(message.clone());
            }
        });

        driver
            .open(&format!("mongodb://{addr}"), &BTreeMap::new())
            .await
            .unwrap();

        for _ in 0..200 {
            if !errors.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(errors.lock().len(), 1);
        assert_eq!(driver.ready_state(), READY_STATE_DISCONNECTED);
    }

    #[test]
    fn connect_timeout_option_overrides_default() {
        let driver = TcpDocumentDriver::new(Duration::from_secs(10));
        let mut options = BTreeMap::new();
        assert_eq!(driver.timeout_for(&options), Duration::from_secs(10));
        options.insert(CONNECT_TIMEOUT_OPTION.to_string(), "250".to_string());
        assert_eq!(driver.timeout_for(&options), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn close_without_open_is_ok() {
        let driver = TcpDocumentDriver::new(Duration::from_secs(1));
        driver.close().await.unwrap();
        assert_eq!(driver.ready_state(), READY_STATE_DISCONNECTED);
    }
}
