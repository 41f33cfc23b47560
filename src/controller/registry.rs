//! Session registry.
//!
//! Maps session ids to live sessions. The map lock is held only for the
//! insert, remove or lookup itself.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::metrics::ControllerMetrics;
use super::session::{Session, SessionStats};
use crate::crypto::SharedSecret;
use crate::error::{Error, Result};
use crate::handshake::SessionId;

/// Manages all live sessions.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    max_sessions: usize,
    handshake_grace: Duration,
    /// Set by [`SessionRegistry::close_all`] under the map write lock
    closed: AtomicBool,
    metrics: Arc<ControllerMetrics>,
}

impl SessionRegistry {
    /// Create a new registry holding at most `max_sessions` sessions.
    ///
    /// When full, sessions that were never polled and have been idle for
    /// `handshake_grace` make room for new ones.
    pub fn new(
        max_sessions: usize,
        handshake_grace: Duration,
        metrics: Arc<ControllerMetrics>,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            handshake_grace,
            closed: AtomicBool::new(false),
            metrics,
        })
    }

    /// Build a pending session bound to this registry.
    pub fn create_session(self: &Arc<Self>, id: SessionId, secret: SharedSecret) -> Arc<Session> {
        Arc::new(Session::new(id, secret, Arc::downgrade(self)))
    }

    /// Insert a pending session and mark it connected.
    ///
    /// A live session with the same id (the agent re-ran the handshake with
    /// the same key) is displaced and closed. When the registry is full,
    /// abandoned sessions are evicted first; fails if that frees nothing.
    /// Fails with [`Error::ShuttingDown`] once [`SessionRegistry::close_all`]
    /// has run.
    pub fn register(&self, session: Arc<Session>) -> Result<()> {
        let (displaced, evicted) = {
            let mut sessions = self.sessions.write();

            if self.closed.load(Ordering::Acquire) {
                return Err(Error::ShuttingDown);
            }

            let mut evicted = Vec::new();
            if !sessions.contains_key(&session.id()) && sessions.len() >= self.max_sessions {
                let abandoned: Vec<SessionId> = sessions
                    .iter()
                    .filter(|(_, s)| s.is_abandoned(self.handshake_grace))
                    .map(|(id, _)| *id)
                    .collect();
                evicted.extend(abandoned.iter().filter_map(|id| sessions.remove(id)));

                if sessions.len() >= self.max_sessions {
                    return Err(Error::SessionLimit(self.max_sessions));
                }
            }

            // Connected before it becomes visible to lookups.
            session.mark_connected();
            (sessions.insert(session.id(), session), evicted)
        };

        self.metrics.increment_sessions_opened();

        if !evicted.is_empty() {
            info!(count = evicted.len(), "Evicted sessions never polled after handshake");
        }
        for old in &evicted {
            self.retire(old);
        }
        if let Some(old) = displaced {
            debug!(session = %old.id(), "displaced by a repeated handshake");
            self.retire(&old);
        }
        Ok(())
    }

    /// Get a session by ID.
    pub fn lookup(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Look up by the textual (lowercase hex) id carried on the wire.
    pub fn lookup_str(&self, id: &str) -> Option<Arc<Session>> {
        SessionId::parse(id).and_then(|id| self.lookup(&id))
    }

    /// Whether `id` names a live session.
    pub fn contains_str(&self, id: &str) -> bool {
        SessionId::parse(id).is_some_and(|id| self.sessions.read().contains_key(&id))
    }

    /// Remove and close a session. Idempotent.
    pub fn unregister(&self, id: &SessionId) {
        let removed = self.sessions.write().remove(id);
        if let Some(session) = removed {
            self.retire(&session);
        }
    }

    /// Remove this exact session, leaving any replacement under the same id
    /// untouched.
    pub fn unregister_session(&self, session: &Arc<Session>) {
        self.remove_if(&session.id(), |candidate| ptr_eq(candidate, session));
        if session.mark_closed() {
            self.metrics.increment_sessions_closed();
        }
    }

    pub(crate) fn remove_if<F>(&self, id: &SessionId, matches: F)
    where
        F: Fn(&Session) -> bool,
    {
        let removed = {
            let mut sessions = self.sessions.write();
            match sessions.get(id) {
                Some(current) if matches(current) => sessions.remove(id),
                _ => None,
            }
        };
        if let Some(session) = removed {
            self.retire(&session);
        }
    }

    fn retire(&self, session: &Session) {
        if session.mark_closed() {
            self.metrics.increment_sessions_closed();
        }
    }

    /// Whether [`SessionRegistry::close_all`] has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Get session count.
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Ids of every live session.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().keys().copied().collect()
    }

    /// Get statistics for all sessions.
    pub fn all_stats(&self) -> Vec<SessionStats> {
        self.sessions.read().values().map(|s| s.stats()).collect()
    }

    /// Close and remove every session, and refuse any later
    /// [`SessionRegistry::register`].
    pub fn close_all(&self) -> usize {
        let drained: Vec<_> = {
            let mut sessions = self.sessions.write();
            self.closed.store(true, Ordering::Release);
            sessions.drain().map(|(_, s)| s).collect()
        };
        for session in &drained {
            self.retire(session);
        }
        drained.len()
    }
}

fn ptr_eq(candidate: &Session, session: &Arc<Session>) -> bool {
    std::ptr::eq(candidate, Arc::as_ptr(session))
}
