//! Per-agent session state.
//!
//! A session owns the shared secret and two byte buffers. Inbound bytes
//! arrive from agent polls and are consumed by the embedding application
//! through [`Session::read`]. Outbound bytes are queued by the application
//! through [`Session::write`] and leave with the agent's next poll.

use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::registry::SessionRegistry;
use crate::crypto::SharedSecret;
use crate::error::{Error, Result};
use crate::handshake::SessionId;

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Keys agreed, not yet visible to the dispatcher
    Pending,
    /// Registered and eligible for polling
    Connected,
    /// Removed from the registry, buffers discarded
    Closed,
}

/// Result of [`Session::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Inbound data is available (bytes currently buffered)
    DataReceived(usize),
    /// The session was closed while waiting
    Closed,
    /// Nothing arrived before the deadline
    TimedOut,
}

struct Buffers {
    state: SessionState,
    inbound: BytesMut,
    outbound: BytesMut,
    last_activity: Instant,
    /// Set by the first authenticated poll
    polled: bool,
}

/// A single agent session.
pub struct Session {
    id: SessionId,
    secret: SharedSecret,
    created_at: Instant,
    buffers: Mutex<Buffers>,
    /// Woken when inbound data lands or the session closes
    inbound_ready: Notify,
    /// Woken when outbound data is queued or the session closes
    outbound_ready: Notify,
    registry: Weak<SessionRegistry>,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
}

impl Session {
    pub(crate) fn new(id: SessionId, secret: SharedSecret, registry: Weak<SessionRegistry>) -> Self {
        let now = Instant::now();

        Self {
            id,
            secret,
            created_at: now,
            buffers: Mutex::new(Buffers {
                state: SessionState::Pending,
                inbound: BytesMut::new(),
                outbound: BytesMut::new(),
                last_activity: now,
                polled: false,
            }),
            inbound_ready: Notify::new(),
            outbound_ready: Notify::new(),
            registry,
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
        }
    }

    /// Get session ID.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Get session state.
    pub fn state(&self) -> SessionState {
        self.buffers.lock().state
    }

    /// Whether the session is registered and usable.
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Queue bytes for the agent. They leave with the next poll.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        {
            let mut buffers = self.buffers.lock();
            if buffers.state != SessionState::Connected {
                return Err(Error::NotConnected);
            }
            buffers.outbound.extend_from_slice(data);
        }
        self.outbound_ready.notify_waiters();
        Ok(data.len())
    }

    /// Copy buffered inbound bytes into `buf`.
    ///
    /// Returns the number of bytes copied and whether the inbound buffer is
    /// now empty. Bytes that do not fit stay buffered for the next call.
    pub fn read(&self, buf: &mut [u8]) -> Result<(usize, bool)> {
        let mut buffers = self.buffers.lock();
        if buffers.state != SessionState::Connected {
            return Err(Error::NotConnected);
        }

        let n = buf.len().min(buffers.inbound.len());
        let chunk = buffers.inbound.split_to(n);
        buf[..n].copy_from_slice(&chunk);

        Ok((n, buffers.inbound.is_empty()))
    }

    /// Drain everything currently buffered inbound.
    pub fn take(&self) -> Result<Bytes> {
        let mut buffers = self.buffers.lock();
        if buffers.state != SessionState::Connected {
            return Err(Error::NotConnected);
        }
        Ok(buffers.inbound.split().freeze())
    }

    /// Wait until inbound data is buffered, the session closes, or
    /// `timeout` elapses.
    ///
    /// Fails with [`Error::NotConnected`] if the session is not connected
    /// when the call starts. A close observed during the wait is reported as
    /// [`WaitOutcome::Closed`].
    pub async fn wait(&self, timeout: Duration) -> Result<WaitOutcome> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut first = true;

        loop {
            let notified = self.inbound_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let buffers = self.buffers.lock();
                match buffers.state {
                    SessionState::Connected if !buffers.inbound.is_empty() => {
                        return Ok(WaitOutcome::DataReceived(buffers.inbound.len()));
                    }
                    SessionState::Connected => {}
                    _ if first => return Err(Error::NotConnected),
                    _ => return Ok(WaitOutcome::Closed),
                }
            }
            first = false;

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(WaitOutcome::TimedOut);
            }
        }
    }

    /// Close the session: unregister it, discard both buffers and wake
    /// every waiter. Idempotent.
    pub fn close(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove_if(&self.id, |candidate| ptr::eq(candidate, self));
        }
        self.mark_closed();
    }

    /// Get session statistics.
    pub fn stats(&self) -> SessionStats {
        let buffers = self.buffers.lock();
        SessionStats {
            id: self.id,
            state: buffers.state,
            created_at: self.created_at,
            last_activity: buffers.last_activity,
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            inbound_pending: buffers.inbound.len(),
            outbound_pending: buffers.outbound.len(),
        }
    }

    pub(crate) fn secret(&self) -> &SharedSecret {
        &self.secret
    }

    /// Record an authenticated poll from the agent.
    pub(crate) fn touch(&self) {
        let mut buffers = self.buffers.lock();
        buffers.polled = true;
        buffers.last_activity = Instant::now();
    }

    /// Connected, never polled, and idle for at least `grace`.
    pub(crate) fn is_abandoned(&self, grace: Duration) -> bool {
        let buffers = self.buffers.lock();
        buffers.state == SessionState::Connected
            && !buffers.polled
            && buffers.last_activity.elapsed() >= grace
    }

    pub(crate) fn mark_connected(&self) {
        let mut buffers = self.buffers.lock();
        if buffers.state == SessionState::Pending {
            buffers.state = SessionState::Connected;
        }
    }

    /// Returns `true` if this call performed the transition.
    pub(crate) fn mark_closed(&self) -> bool {
        let changed = {
            let mut buffers = self.buffers.lock();
            if buffers.state == SessionState::Closed {
                false
            } else {
                buffers.state = SessionState::Closed;
                buffers.inbound.clear();
                buffers.outbound.clear();
                true
            }
        };

        if changed {
            tracing::debug!(session = %self.id, "session closed");
            self.inbound_ready.notify_waiters();
            self.outbound_ready.notify_waiters();
        }
        changed
    }

    /// Deliver an agent payload and collect whatever is queued outbound,
    /// under one lock acquisition.
    pub(crate) fn exchange(&self, inbound: &[u8]) -> Result<Bytes> {
        let outbound = {
            let mut buffers = self.buffers.lock();
            if buffers.state != SessionState::Connected {
                return Err(Error::NotConnected);
            }
            buffers.inbound.extend_from_slice(inbound);
            buffers.last_activity = Instant::now();
            buffers.outbound.split().freeze()
        };

        self.bytes_received
            .fetch_add(inbound.len() as u64, Ordering::Relaxed);
        self.bytes_sent
            .fetch_add(outbound.len() as u64, Ordering::Relaxed);

        if !inbound.is_empty() {
            self.inbound_ready.notify_waiters();
        }
        Ok(outbound)
    }

    /// Wait up to `timeout` for outbound data, then drain it.
    ///
    /// Returns an empty buffer on timeout.
    pub(crate) async fn drain_outbound(&self, timeout: Duration) -> Result<Bytes> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let notified = self.outbound_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut buffers = self.buffers.lock();
                if buffers.state != SessionState::Connected {
                    return Err(Error::NotConnected);
                }
                buffers.last_activity = Instant::now();
                if !buffers.outbound.is_empty() {
                    let outbound = buffers.outbound.split().freeze();
                    self.bytes_sent
                        .fetch_add(outbound.len() as u64, Ordering::Relaxed);
                    return Ok(outbound);
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(Bytes::new());
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Session statistics (safe to expose, no sensitive data).
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// Session id
    pub id: SessionId,
    /// Lifecycle state at the time of the snapshot
    pub state: SessionState,
    /// When the handshake completed
    pub created_at: Instant,
    /// Last poll or data exchange
    pub last_activity: Instant,
    /// Bytes handed to the agent
    pub bytes_sent: u64,
    /// Bytes received from the agent
    pub bytes_received: u64,
    /// Inbound bytes not yet read by the application
    pub inbound_pending: usize,
    /// Outbound bytes waiting for the next poll
    pub outbound_pending: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn connected() -> Arc<Session> {
        let session = Arc::new(Session::new(
            SessionId::from_marshalled(b"agent key"),
            SharedSecret::from_bytes([7; 48]),
            Weak::new(),
        ));
        session.mark_connected();
        session
    }

    #[test]
    fn test_pending_session_rejects_io() {
        let session = Session::new(
            SessionId::from_marshalled(b"agent key"),
            SharedSecret::from_bytes([7; 48]),
            Weak::new(),
        );

        assert_eq!(session.state(), SessionState::Pending);
        assert!(matches!(session.write(b"x"), Err(Error::NotConnected)));
        assert!(matches!(session.read(&mut [0u8; 4]), Err(Error::NotConnected)));
        assert!(matches!(session.exchange(b"x"), Err(Error::NotConnected)));
    }

    #[test]
    fn test_exchange_collects_outbound() {
        let session = connected();

        session.write(b"PONG").unwrap();
        let outbound = session.exchange(b"PING").unwrap();
        assert_eq!(&outbound[..], b"PONG");

        // Drained exactly once
        assert!(session.exchange(b"").unwrap().is_empty());

        let mut buf = [0u8; 16];
        assert_eq!(session.read(&mut buf).unwrap(), (4, true));
        assert_eq!(&buf[..4], b"PING");
    }

    #[test]
    fn test_short_read_keeps_remainder() {
        let session = connected();
        session.exchange(b"abcdef").unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(session.read(&mut buf).unwrap(), (4, false));
        assert_eq!(&buf, b"abcd");
        assert_eq!(session.read(&mut buf).unwrap(), (2, true));
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(session.read(&mut buf).unwrap(), (0, true));
    }

    #[test]
    fn test_take_drains_everything() {
        let session = connected();
        session.exchange(b"one").unwrap();
        session.exchange(b"two").unwrap();

        assert_eq!(&session.take().unwrap()[..], b"onetwo");
        assert!(session.take().unwrap().is_empty());
    }

    #[test]
    fn test_close_discards_buffers() {
        let session = connected();
        session.write(b"queued").unwrap();
        session.exchange(b"unread").unwrap();

        session.close();
        session.close();

        assert_eq!(session.state(), SessionState::Closed);
        let stats = session.stats();
        assert_eq!(stats.inbound_pending, 0);
        assert_eq!(stats.outbound_pending, 0);
        assert!(matches!(session.take(), Err(Error::NotConnected)));
        assert!(!session.mark_closed());
    }

    #[test]
    fn test_abandoned_only_when_never_polled() {
        let session = connected();
        assert!(!session.is_abandoned(Duration::from_secs(60)));
        assert!(session.is_abandoned(Duration::ZERO));

        session.touch();
        assert!(!session.is_abandoned(Duration::ZERO));

        let closed = connected();
        closed.close();
        assert!(!closed.is_abandoned(Duration::ZERO));
    }

    #[test]
    fn test_stats_count_bytes() {
        let session = connected();
        session.write(b"12345").unwrap();
        session.exchange(b"abc").unwrap();

        let stats = session.stats();
        assert_eq!(stats.bytes_received, 3);
        assert_eq!(stats.bytes_sent, 5);
        assert_eq!(stats.inbound_pending, 3);
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let session = connected();

        let start = Instant::now();
        let outcome = session.wait(Duration::from_millis(50)).await.unwrap();
        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(45));
    }

    #[tokio::test]
    async fn test_wait_wakes_on_data() {
        let session = connected();

        let writer = Arc::clone(&session);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            writer.exchange(b"PING").unwrap();
        });

        let start = Instant::now();
        let outcome = session.wait(Duration::from_millis(500)).await.unwrap();
        assert_eq!(outcome, WaitOutcome::DataReceived(4));
        assert!(start.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_buffered() {
        let session = connected();
        session.exchange(b"ready").unwrap();

        let outcome = session.wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(outcome, WaitOutcome::DataReceived(5));
    }

    #[tokio::test]
    async fn test_wait_observes_close() {
        let session = connected();

        let closer = Arc::clone(&session);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            closer.close();
        });

        let outcome = session.wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(outcome, WaitOutcome::Closed);
        assert!(matches!(
            session.wait(Duration::from_millis(1)).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_drain_outbound_wakes_on_write() {
        let session = connected();

        let writer = Arc::clone(&session);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            writer.write(b"late").unwrap();
        });

        let drained = session.drain_outbound(Duration::from_secs(2)).await.unwrap();
        assert_eq!(&drained[..], b"late");
    }

    #[tokio::test]
    async fn test_drain_outbound_timeout_is_empty() {
        let session = connected();
        let drained = session
            .drain_outbound(Duration::from_millis(30))
            .await
            .unwrap();
        assert!(drained.is_empty());
    }
}
