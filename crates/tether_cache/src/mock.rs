//! A scriptable cache client for tests.

use crate::client::{CacheClient, RetryStrategy};
use crate::policy::Backoff;
use crate::state::CacheEvent;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;
use tether_core::{ConnectorError, ConnectorResult, Listeners};

/// A mock cache client.
///
/// `connect` succeeds immediately and emits [`CacheEvent::Connect`] unless
/// told otherwise. [`simulate_failure`](Self::simulate_failure) plays one
/// turn of a native retry loop: it emits `Error`, consults the strategy,
/// then emits `Reconnecting` or `End`.
pub struct MockCacheClient {
    events: Listeners<CacheEvent>,
    strategy: Mutex<Option<RetryStrategy>>,
    open: AtomicBool,
    attempt: AtomicU32,
    connect_calls: AtomicUsize,
    quit_calls: AtomicUsize,
    ping_calls: AtomicUsize,
    connect_delay: Mutex<Duration>,
    connect_error: Mutex<Option<ConnectorError>>,
    ping_delay: Mutex<Duration>,
    ping_error: Mutex<Option<ConnectorError>>,
}

impl MockCacheClient {
    /// Creates a new mock client.
    pub fn new() -> Self {
        Self {
            events: Listeners::new(),
            strategy: Mutex::new(None),
            open: AtomicBool::new(false),
            attempt: AtomicU32::new(0),
            connect_calls: AtomicUsize::new(0),
            quit_calls: AtomicUsize::new(0),
            ping_calls: AtomicUsize::new(0),
            connect_delay: Mutex::new(Duration::ZERO),
            connect_error: Mutex::new(None),
            ping_delay: Mutex::new(Duration::ZERO),
            ping_error: Mutex::new(None),
        }
    }

    /// Emits an event to all listeners.
    pub fn emit(&self, event: CacheEvent) {
        self.events.emit(&event);
    }

    /// Plays one failed attempt of the retry loop.
    ///
    /// Returns the strategy's decision, or `None` if `connect` was never called.
    pub fn simulate_failure(&self, cause: &str) -> Option<Backoff> {
        let strategy = self.strategy.lock().clone()?;
        let attempt = self.attempt.fetch_add(1, Ordering::SeqCst) + 1;

        self.events.emit(&CacheEvent::Error(cause.to_string()));
        let backoff = strategy(attempt, cause);
        match backoff {
            Backoff::Retry(delay) => {
                self.events.emit(&CacheEvent::Reconnecting { attempt, delay });
            }
            Backoff::Stop => {
                self.open.store(false, Ordering::SeqCst);
                self.events.emit(&CacheEvent::End);
            }
        }
        Some(backoff)
    }

    /// Plays a successful retry.
    pub fn simulate_reconnect(&self) {
        self.attempt.store(0, Ordering::SeqCst);
        self.open.store(true, Ordering::SeqCst);
        self.events.emit(&CacheEvent::Reconnect);
    }

    /// Delays every `connect` call.
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock() = delay;
    }

    /// Makes `connect` fail with the given error.
    pub fn fail_connect_with(&self, error: ConnectorError) {
        *self.connect_error.lock() = Some(error);
    }

    /// Delays every `ping` call.
    pub fn set_ping_delay(&self, delay: Duration) {
        *self.ping_delay.lock() = delay;
    }

    /// Makes `ping` fail with the given error, or succeed again with `None`.
    pub fn set_ping_error(&self, error: Option<ConnectorError>) {
        *self.ping_error.lock() = error;
    }

    /// Returns how many times `connect` was called.
    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    /// Returns how many times `quit` was called.
    pub fn quit_calls(&self) -> usize {
        self.quit_calls.load(Ordering::SeqCst)
    }

    /// Returns how many times `ping` was called.
    pub fn ping_calls(&self) -> usize {
        self.ping_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockCacheClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheClient for MockCacheClient {
    async fn connect(&self, strategy: RetryStrategy) -> ConnectorResult<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.connect_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.connect_error.lock().clone() {
            self.events.emit(&CacheEvent::Error(error.to_string()));
            self.events.emit(&CacheEvent::End);
            return Err(error);
        }

        *self.strategy.lock() = Some(strategy);
        self.attempt.store(0, Ordering::SeqCst);
        self.open.store(true, Ordering::SeqCst);
        self.events.emit(&CacheEvent::Connect);
        Ok(())
    }

    fn events(&self) -> &Listeners<CacheEvent> {
        &self.events
    }

    async fn ping(&self) -> ConnectorResult<()> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.ping_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if !self.open.load(Ordering::SeqCst) {
            return Err(ConnectorError::Closed);
        }
        match self.ping_error.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn quit(&self) -> ConnectorResult<()> {
        self.quit_calls.fetch_add(1, Ordering::SeqCst);
        if self.open.swap(false, Ordering::SeqCst) {
            self.events.emit(&CacheEvent::End);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ReconnectPolicy;
    use std::sync::Arc;

    fn strategy(max_retries: u32) -> RetryStrategy {
        let policy = ReconnectPolicy::new(max_retries, Duration::from_millis(500));
        Arc::new(move |attempt, cause| policy.next_backoff(attempt, cause))
    }

    #[tokio::test]
    async fn failure_before_connect_is_ignored() {
        let client = MockCacheClient::new();
        assert_eq!(client.simulate_failure("refused"), None);
    }

    #[tokio::test]
    async fn simulate_failure_consults_strategy() {
        let client = MockCacheClient::new();
        client.connect(strategy(1)).await.unwrap();

        assert_eq!(
            client.simulate_failure("refused"),
            Some(Backoff::Retry(Duration::from_millis(500)))
        );
        assert_eq!(client.simulate_failure("refused"), Some(Backoff::Stop));
        assert!(client.ping().await.is_err());
    }

    #[tokio::test]
    async fn quit_emits_end_once() {
        let client = MockCacheClient::new();
        let ends = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ends);
        client.events().add(move |event| {
            if *event == CacheEvent::End {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        client.connect(strategy(3)).await.unwrap();
        client.quit().await.unwrap();
        client.quit().await.unwrap();

        assert_eq!(ends.load(Ordering::SeqCst), 1);
        assert_eq!(client.quit_calls(), 2);
    }
}
