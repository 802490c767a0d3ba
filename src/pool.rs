//! Session pool
//!
//! A fixed-size pool of bound sessions for workloads that run several
//! searches concurrently. Checkout hands exclusive use of one session to a
//! caller until the guard drops; a RootDSE liveness probe with a short
//! deadline decides whether an idle session is reused or discarded.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::errors::{AdError, Result};
use crate::session::Session;

/// Pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of live sessions
    pub max_sessions: usize,
    /// Deadline for the checkout liveness probe
    pub probe_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            max_sessions: 5,
            probe_timeout: Duration::from_secs(1),
        }
    }
}

/// Fixed-size pool of LDAP sessions
pub struct SessionPool {
    config: ConnectionConfig,
    pool_cfg: PoolConfig,
    idle: Mutex<Vec<Session>>,
    semaphore: Arc<Semaphore>,
    live: AtomicUsize,
    closed: AtomicBool,
}

impl SessionPool {
    /// Creates an empty pool; sessions are opened lazily on checkout.
    pub fn new(config: ConnectionConfig, pool_cfg: PoolConfig) -> Arc<SessionPool> {
        let max = pool_cfg.max_sessions.max(1);
        Arc::new(SessionPool {
            config,
            pool_cfg: PoolConfig {
                max_sessions: max,
                ..pool_cfg
            },
            idle: Mutex::new(Vec::with_capacity(max)),
            semaphore: Arc::new(Semaphore::new(max)),
            live: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Number of sessions currently alive (idle plus checked out)
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Whether the pool has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Checks out a session, creating one if no healthy idle session exists.
    ///
    /// Blocks when `max_sessions` are already checked out. Fails
    /// deterministically with [`AdError::PoolClosed`] once the pool closes.
    pub async fn checkout(self: &Arc<Self>) -> Result<PooledSession> {
        if self.is_closed() {
            return Err(AdError::PoolClosed);
        }

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AdError::PoolClosed)?;

        // The pool may have closed while this caller waited on the semaphore
        if self.is_closed() {
            return Err(AdError::PoolClosed);
        }

        // Reuse an idle session if one passes the liveness probe
        loop {
            let candidate = {
                let mut idle = self.idle.lock().await;
                idle.pop()
            };
            let Some(mut session) = candidate else { break };

            let alive = tokio::time::timeout(self.pool_cfg.probe_timeout, session.ping())
                .await
                .map(|r| r.is_ok())
                .unwrap_or(false);

            if alive {
                debug!("reusing pooled session");
                return Ok(PooledSession {
                    session: Some(session),
                    pool: Arc::clone(self),
                    permit: Some(permit),
                });
            }

            debug!("discarding dead pooled session");
            session.close().await;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }

        let session = Session::open(self.config.clone()).await?;
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        info!(live, max = self.pool_cfg.max_sessions, "created pooled session");

        Ok(PooledSession {
            session: Some(session),
            pool: Arc::clone(self),
            permit: Some(permit),
        })
    }

    /// Returns a session to the idle set; closes it when the pool is closed.
    async fn checkin(&self, mut session: Session) {
        if self.is_closed() {
            session.close().await;
            self.live.fetch_sub(1, Ordering::SeqCst);
            return;
        }
        let mut idle = self.idle.lock().await;
        idle.push(session);
    }

    /// Closes the pool: drains and closes idle sessions, fails all waiting
    /// and future checkouts. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.semaphore.close();

        let mut idle = self.idle.lock().await;
        let drained = idle.len();
        for mut session in idle.drain(..) {
            session.close().await;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
        if drained > 0 {
            info!(drained, "closed idle pool sessions");
        }
    }
}

/// RAII guard for a checked-out session.
///
/// Dereferences to [`Session`]. Dropping the guard returns the session to
/// the pool; sessions checked out when the pool closes are closed on return
/// instead of being pooled again.
pub struct PooledSession {
    session: Option<Session>,
    pool: Arc<SessionPool>,
    permit: Option<OwnedSemaphorePermit>,
}

impl std::ops::Deref for PooledSession {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.session.as_ref().expect("session taken")
    }
}

impl std::ops::DerefMut for PooledSession {
    fn deref_mut(&mut self) -> &mut Session {
        self.session.as_mut().expect("session taken")
    }
}

impl Drop for PooledSession {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let pool = Arc::clone(&self.pool);
        // The permit travels with the checkin so a waiting checkout cannot
        // open a fresh session before this one reaches the idle set; that
        // would let `live` exceed the pool maximum
        let permit = self.permit.take();

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                pool.checkin(session).await;
                drop(permit);
            });
        } else {
            warn!("no runtime available to return pooled session; dropping connection");
            pool.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_config() -> ConnectionConfig {
        ConnectionConfig {
            server: "dc01.corp.example.com".to_string(),
            base_dn: "DC=corp,DC=example,DC=com".to_string(),
            username: "alice".to_string(),
            password: "x".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_checkout() {
        let pool = SessionPool::new(pool_config(), PoolConfig::default());
        pool.close().await;
        assert!(matches!(pool.checkout().await, Err(AdError::PoolClosed)));
        // Close is idempotent
        pool.close().await;
        assert!(matches!(pool.checkout().await, Err(AdError::PoolClosed)));
    }

    #[tokio::test]
    async fn test_new_pool_is_empty_and_open() {
        let pool = SessionPool::new(pool_config(), PoolConfig::default());
        assert_eq!(pool.live(), 0);
        assert!(!pool.is_closed());
    }

    #[test]
    fn test_pool_config_defaults() {
        let cfg = PoolConfig::default();
        assert_eq!(cfg.max_sessions, 5);
        assert_eq!(cfg.probe_timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_zero_max_clamped_to_one() {
        let pool = SessionPool::new(
            pool_config(),
            PoolConfig {
                max_sessions: 0,
                ..Default::default()
            },
        );
        assert_eq!(pool.pool_cfg.max_sessions, 1);
    }
}
