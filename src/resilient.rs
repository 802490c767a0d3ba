//! Retry wrapper over a session
//!
//! `ResilientClient` interposes exponential-backoff retry between callers
//! and the streaming search. Retryability is decided by the error
//! classifier; connection-level failures additionally trigger a reconnect
//! between attempts. Callbacks let the front-end narrate retries without
//! the core knowing about terminals.

use std::sync::Arc;

use ldap3::SearchEntry;
use rand::Rng;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use std::sync::RwLock;
use std::time::Duration;

use crate::attributes::{
    DEFAULT_RETRY_INITIAL_DELAY_MS, DEFAULT_RETRY_MAX_ATTEMPTS, DEFAULT_RETRY_MAX_DELAY_SECS,
    DEFAULT_RETRY_MULTIPLIER, ENTRY_CHANNEL_CAPACITY,
};
use crate::config::ConnectionConfig;
use crate::errors::{is_connection_error, is_retryable, AdError, Result};
use crate::session::Session;

/// Exponential backoff retry policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, first try included
    pub max_attempts: usize,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound on the delay between retries
    pub max_delay: Duration,
    /// Exponential backoff multiplier
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(DEFAULT_RETRY_INITIAL_DELAY_MS),
            max_delay: Duration::from_secs(DEFAULT_RETRY_MAX_DELAY_SECS),
            multiplier: DEFAULT_RETRY_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Clamps degenerate values back to usable defaults
    pub fn normalized(mut self) -> Self {
        if self.max_attempts == 0 {
            self.max_attempts = DEFAULT_RETRY_MAX_ATTEMPTS;
        }
        if self.initial_delay.is_zero() {
            self.initial_delay = Duration::from_millis(DEFAULT_RETRY_INITIAL_DELAY_MS);
        }
        if self.max_delay.is_zero() {
            self.max_delay = Duration::from_secs(DEFAULT_RETRY_MAX_DELAY_SECS);
        }
        if self.multiplier <= 1.0 {
            self.multiplier = DEFAULT_RETRY_MULTIPLIER;
        }
        self
    }

    /// Deterministic backoff for retry `attempt` (1-based):
    /// `min(max_delay, initial_delay * multiplier^(attempt-1))`
    pub fn backoff(&self, attempt: usize) -> Duration {
        let exp = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32 - 1);
        Duration::from_secs_f64(exp.min(self.max_delay.as_secs_f64()))
    }

    /// Backoff with ±25% jitter applied
    pub fn backoff_with_jitter(&self, attempt: usize) -> Duration {
        let base = self.backoff(attempt).as_secs_f64();
        let jitter = base * 0.25 * rand::thread_rng().gen_range(-1.0..=1.0);
        Duration::from_secs_f64((base + jitter).max(0.0))
    }
}

/// Called on each retry with `(attempt number, error)`
pub type RetryCallback = Box<dyn Fn(usize, &AdError) + Send + Sync>;
/// Called once when every attempt has failed
pub type FailureCallback = Box<dyn Fn(&AdError) + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    on_retry: Option<RetryCallback>,
    on_failure: Option<FailureCallback>,
}

/// A session wrapped with retry, reconnect, and failure reporting
pub struct ResilientClient {
    config: ConnectionConfig,
    session: Arc<Mutex<Session>>,
    retry: RetryPolicy,
    callbacks: Arc<RwLock<Callbacks>>,
}

impl ResilientClient {
    /// Opens a session with bind-level retry and wraps it.
    pub async fn connect(config: ConnectionConfig, retry: RetryPolicy) -> Result<Self> {
        let retry = retry.normalized();

        let mut last_err: Option<AdError> = None;
        for attempt in 1..=retry.max_attempts {
            if attempt > 1 {
                let delay = retry.backoff_with_jitter(attempt - 1);
                info!(
                    attempt,
                    max = retry.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "retrying LDAP connect"
                );
                tokio::time::sleep(delay).await;
            }

            match Session::open(config.clone()).await {
                Ok(session) => {
                    if attempt > 1 {
                        info!(attempts = attempt, "connected after retries");
                    }
                    return Ok(ResilientClient {
                        config,
                        session: Arc::new(Mutex::new(session)),
                        retry,
                        callbacks: Arc::new(RwLock::new(Callbacks::default())),
                    });
                }
                Err(e) => {
                    if !is_retryable(&e) {
                        return Err(e);
                    }
                    warn!(attempt, error = %e, "connect attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(AdError::RetriesExhausted {
            operation: "connect",
            attempts: retry.max_attempts,
            source: Box::new(last_err.unwrap_or(AdError::ConnectFailed {
                server: config.server,
                message: "no attempts were made".to_string(),
            })),
        })
    }

    /// Wraps an already-open session without a connect retry loop.
    pub fn new(config: ConnectionConfig, session: Session, retry: RetryPolicy) -> Self {
        ResilientClient {
            config,
            session: Arc::new(Mutex::new(session)),
            retry: retry.normalized(),
            callbacks: Arc::new(RwLock::new(Callbacks::default())),
        }
    }

    /// Installs a callback invoked on each retry attempt
    pub fn set_retry_callback(&self, callback: RetryCallback) {
        self.callbacks
            .write()
            .expect("callback lock poisoned")
            .on_retry = Some(callback);
    }

    /// Installs a callback invoked after all retries are exhausted
    pub fn set_failure_callback(&self, callback: FailureCallback) {
        self.callbacks
            .write()
            .expect("callback lock poisoned")
            .on_failure = Some(callback);
    }

    fn notify_retry(callbacks: &RwLock<Callbacks>, attempt: usize, err: &AdError) {
        if let Ok(guard) = callbacks.read() {
            if let Some(cb) = &guard.on_retry {
                cb(attempt, err);
            }
        }
    }

    fn notify_failure(callbacks: &RwLock<Callbacks>, err: &AdError) {
        if let Ok(guard) = callbacks.read() {
            if let Some(cb) = &guard.on_failure {
                cb(err);
            }
        }
    }

    async fn reconnect(
        config: &ConnectionConfig,
        session: &Mutex<Session>,
    ) {
        match Session::open(config.clone()).await {
            Ok(new_session) => {
                let mut guard = session.lock().await;
                guard.close().await;
                *guard = new_session;
                info!("reconnected after connection failure");
            }
            Err(e) => {
                // The retry loop keeps going; the next attempt may still work
                warn!("reconnect failed: {}", e);
            }
        }
    }

    /// Collecting search with retry.
    pub async fn search(
        &self,
        cancel: &CancellationToken,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<SearchEntry>> {
        let mut last_err: Option<AdError> = None;

        for attempt in 1..=self.retry.max_attempts {
            if attempt > 1 {
                let delay = self.retry.backoff_with_jitter(attempt - 1);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(AdError::Cancelled),
                }
            }

            let result = {
                let session = self.session.lock().await;
                session.search(cancel.child_token(), filter, attributes).await
            };

            match result {
                Ok(entries) => return Ok(entries),
                Err(e) => {
                    if !is_retryable(&e) {
                        Self::notify_failure(&self.callbacks, &e);
                        return Err(e);
                    }
                    Self::notify_retry(&self.callbacks, attempt, &e);
                    if is_connection_error(&e) {
                        Self::reconnect(&self.config, &self.session).await;
                    }
                    last_err = Some(e);
                }
            }
        }

        let err = AdError::RetriesExhausted {
            operation: "search",
            attempts: self.retry.max_attempts,
            source: Box::new(last_err.unwrap_or(AdError::SessionClosed)),
        };
        Self::notify_failure(&self.callbacks, &err);
        Err(err)
    }

    /// Streaming search with search-level retry.
    ///
    /// Entries already delivered before a mid-stream failure are delivered
    /// again by the retried search; the wrapper does not deduplicate.
    pub fn stream_search(
        &self,
        cancel: CancellationToken,
        filter: &str,
        attributes: &[&str],
    ) -> (mpsc::Receiver<SearchEntry>, mpsc::Receiver<AdError>) {
        let (entry_tx, entry_rx) = mpsc::channel::<SearchEntry>(ENTRY_CHANNEL_CAPACITY);
        let (err_tx, err_rx) = mpsc::channel::<AdError>(1);

        let config = self.config.clone();
        let session = Arc::clone(&self.session);
        let callbacks = Arc::clone(&self.callbacks);
        let retry = self.retry.clone();
        let filter = filter.to_string();
        let attributes: Vec<String> = attributes.iter().map(|s| s.to_string()).collect();

        tokio::spawn(async move {
            let mut last_err: Option<AdError> = None;

            'attempts: for attempt in 1..=retry.max_attempts {
                if attempt > 1 {
                    let delay = retry.backoff_with_jitter(attempt - 1);
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => {
                            drop(entry_tx);
                            let _ = err_tx.send(AdError::Cancelled).await;
                            return;
                        }
                    }
                }

                // A fresh sub-context per attempt so a failed attempt can be
                // torn down without cancelling the caller's token
                let attempt_cancel = cancel.child_token();
                let attr_refs: Vec<&str> = attributes.iter().map(String::as_str).collect();
                let (mut inner_entries, mut inner_err) = {
                    let session = session.lock().await;
                    session.stream_search(attempt_cancel.clone(), &filter, &attr_refs)
                };

                while let Some(entry) = inner_entries.recv().await {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            attempt_cancel.cancel();
                            drop(entry_tx);
                            let _ = err_tx.send(AdError::Cancelled).await;
                            return;
                        }
                        sent = entry_tx.send(entry) => {
                            if sent.is_err() {
                                // Caller stopped reading; tear down and exit
                                attempt_cancel.cancel();
                                return;
                            }
                        }
                    }
                }

                match inner_err.recv().await {
                    None => {
                        // Clean completion
                        return;
                    }
                    Some(err) => {
                        if !is_retryable(&err) {
                            Self::notify_failure(&callbacks, &err);
                            drop(entry_tx);
                            let _ = err_tx.send(err).await;
                            return;
                        }
                        Self::notify_retry(&callbacks, attempt, &err);
                        if is_connection_error(&err) {
                            Self::reconnect(&config, &session).await;
                        }
                        last_err = Some(err);
                        continue 'attempts;
                    }
                }
            }

            let err = AdError::RetriesExhausted {
                operation: "stream search",
                attempts: retry.max_attempts,
                source: Box::new(last_err.unwrap_or(AdError::SessionClosed)),
            };
            Self::notify_failure(&callbacks, &err);
            drop(entry_tx);
            let _ = err_tx.send(err).await;
        });

        (entry_rx, err_rx)
    }

    /// Health check with retry.
    pub async fn ping(&self, cancel: &CancellationToken) -> Result<()> {
        let mut last_err: Option<AdError> = None;

        for attempt in 1..=self.retry.max_attempts {
            if attempt > 1 {
                let delay = self.retry.backoff_with_jitter(attempt - 1);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(AdError::Cancelled),
                }
            }

            let result = {
                let mut session = self.session.lock().await;
                session.ping().await
            };

            match result {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if !is_retryable(&e) {
                        return Err(e);
                    }
                    Self::notify_retry(&self.callbacks, attempt, &e);
                    if is_connection_error(&e) {
                        Self::reconnect(&self.config, &self.session).await;
                    }
                    last_err = Some(e);
                }
            }
        }

        Err(AdError::RetriesExhausted {
            operation: "ping",
            attempts: self.retry.max_attempts,
            source: Box::new(last_err.unwrap_or(AdError::SessionClosed)),
        })
    }

    /// Closes the wrapped session.
    pub async fn close(&self) {
        self.session.lock().await.close().await;
    }
}
