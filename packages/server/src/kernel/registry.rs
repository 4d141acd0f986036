//! Per-connection session registry.
//!
//! Enforces the transport invariants: at most one running session per
//! connection, a bounded rate of start commands per connection, and
//! cancellation of orphaned sessions when a connection goes away.

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::collections::HashMap;
use std::num::NonZeroU32;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Why a start command was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRefusal {
    /// The connection already has a running session.
    AlreadyRunning,
    /// The connection exceeded its start-command budget.
    RateLimited,
}

impl std::fmt::Display for StartRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartRefusal::AlreadyRunning => write!(f, "a scrape session is already in progress"),
            StartRefusal::RateLimited => write!(f, "too many start commands, slow down"),
        }
    }
}

struct ActiveSession {
    session_id: Uuid,
    cancel: CancellationToken,
}

pub struct SessionRegistry {
    active: Mutex<HashMap<Uuid, ActiveSession>>,
    starts: DefaultKeyedRateLimiter<Uuid>,
}

impl SessionRegistry {
    pub fn new(starts_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(starts_per_minute.max(1)).unwrap_or(NonZeroU32::MIN);
        Self {
            active: Mutex::new(HashMap::new()),
            starts: RateLimiter::keyed(Quota::per_minute(per_minute)),
        }
    }

    /// Admit a start command for a connection, registering the
    /// session's cancellation handle.
    pub async fn try_begin(
        &self,
        connection_id: Uuid,
        session_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<(), StartRefusal> {
        let mut active = self.active.lock().await;

        // Check the single-session invariant before spending a rate
        // limit cell; a rejected duplicate must not eat the budget.
        if active.contains_key(&connection_id) {
            return Err(StartRefusal::AlreadyRunning);
        }
        if self.starts.check_key(&connection_id).is_err() {
            return Err(StartRefusal::RateLimited);
        }

        active.insert(connection_id, ActiveSession { session_id, cancel });
        Ok(())
    }

    /// Request cancellation of the connection's running session.
    /// Returns false when nothing is running.
    pub async fn stop(&self, connection_id: &Uuid) -> bool {
        let active = self.active.lock().await;
        match active.get(connection_id) {
            Some(session) => {
                tracing::info!(
                    connection_id = %connection_id,
                    session_id = %session.session_id,
                    "stop requested"
                );
                session.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Mark a session as finished, freeing the connection's slot.
    /// A stale finish (the slot was reused) is a no-op.
    pub async fn finish(&self, connection_id: &Uuid, session_id: Uuid) {
        let mut active = self.active.lock().await;
        if active
            .get(connection_id)
            .is_some_and(|s| s.session_id == session_id)
        {
            active.remove(connection_id);
        }
    }

    /// Connection closed: cancel whatever is still running and drop
    /// the slot.
    pub async fn disconnect(&self, connection_id: &Uuid) {
        let mut active = self.active.lock().await;
        if let Some(session) = active.remove(connection_id) {
            tracing::info!(
                connection_id = %connection_id,
                session_id = %session.session_id,
                "connection closed, cancelling session"
            );
            session.cancel.cancel();
        }
    }

    pub async fn active_count(&self) -> usize {
        self.active.lock().await.len()
    }
}
