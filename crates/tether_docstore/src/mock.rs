//! A scriptable document driver for tests.

use crate::driver::{
    DocumentDriver, DocumentEvent, READY_STATE_CONNECTED, READY_STATE_CONNECTING,
    READY_STATE_DISCONNECTED, READY_STATE_DISCONNECTING,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::time::Duration;
use tether_core::{ConnectorError, ConnectorResult, Listeners};

/// A mock document driver.
///
/// By default `open` moves straight to `connected` and emits
/// [`DocumentEvent::Connected`]. Tests can delay or fail `open`, force any
/// readiness code, and emit events by hand.
#[derive(Debug)]
pub struct MockDocumentDriver {
    state: AtomicI32,
    events: Listeners<DocumentEvent>,
    connect_on_open: AtomicBool,
    open_calls: AtomicUsize,
    close_calls: AtomicUsize,
    open_delay: Mutex<Duration>,
    open_error: Mutex<Option<ConnectorError>>,
    last_uri: Mutex<Option<String>>,
}

impl MockDocumentDriver {
    /// Creates a new mock driver in the disconnected state.
    pub fn new() -> Self {
        Self {
            state: AtomicI32::new(READY_STATE_DISCONNECTED),
            events: Listeners::new(),
            connect_on_open: AtomicBool::new(true),
            open_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            open_delay: Mutex::new(Duration::ZERO),
            open_error: Mutex::new(None),
            last_uri: Mutex::new(None),
        }
    }

    /// Forces the readiness code.
    pub fn set_ready_state(&self, code: i32) {
        self.state.store(code, Ordering::SeqCst);
    }

    /// Emits an event to all listeners.
    pub fn emit(&self, event: DocumentEvent) {
        self.events.emit(&event);
    }

    /// When false, `open` stays in `connecting` until a test moves it on.
    pub fn set_connect_on_open(&self, value: bool) {
        self.connect_on_open.store(value, Ordering::SeqCst);
    }

    /// Delays every `open` call.
    pub fn set_open_delay(&self, delay: Duration) {
        *self.open_delay.lock() = delay;
    }

    /// Makes the next `open` calls fail with the given error.
    pub fn fail_open_with(&self, error: ConnectorError) {
        *self.open_error.lock() = Some(error);
    }

    /// Returns how many times `open` was called.
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    /// Returns how many times `close` was called.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Returns the URI passed to the last `open`.
    pub fn last_uri(&self) -> Option<String> {
        self.last_uri.lock().clone()
    }
}

impl Default for MockDocumentDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentDriver for MockDocumentDriver {
    async fn open(&self, uri: &str, _options: &BTreeMap<String, String>) -> ConnectorResult<()> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_uri.lock() = Some(uri.to_string());

        let delay = *self.open_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.open_error.lock().clone() {
            return Err(error);
        }

        self.state.store(READY_STATE_CONNECTING, Ordering::SeqCst);
        if self.connect_on_open.load(Ordering::SeqCst) {
            self.state.store(READY_STATE_CONNECTED, Ordering::SeqCst);
            self.events.emit(&DocumentEvent::Connected);
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
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.state.store(READY_STATE_DISCONNECTING, Ordering::SeqCst);
        self.state.store(READY_STATE_DISCONNECTED, Ordering::SeqCst);
        self.events.emit(&DocumentEvent::Disconnected);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_connects_by_default() {
        let driver = MockDocumentDriver::new();
        assert_eq!(driver.ready_state(), READY_STATE_DISCONNECTED);

        driver.open("mongodb://mock", &BTreeMap::new()).await.unwrap();
        assert_eq!(driver.ready_state(), READY_STATE_CONNECTED);
        assert_eq!(driver.open_calls(), 1);
        assert_eq!(driver.last_uri().as_deref(), Some("mongodb://mock"));
    }

    #[tokio::test]
    async fn open_can_stay_connecting() {
        let driver = MockDocumentDriver::new();
        driver.set_connect_on_open(false);
        driver.open("mongodb://mock", &BTreeMap::new()).await.unwrap();
        assert_eq!(driver.ready_state(), READY_STATE_CONNECTING);
    }

    #[tokio::test]
    async fn open_failure_is_returned() {
        let driver = MockDocumentDriver::new();
        driver.fail_open_with(ConnectorError::transport_fatal("bad uri"));

        let result = driver.open("mongodb://mock", &BTreeMap::new()).await;
        assert!(matches!(result, Err(ConnectorError::Transport { .. })));
        assert_eq!(driver.ready_state(), READY_STATE_DISCONNECTED);
    }
}
