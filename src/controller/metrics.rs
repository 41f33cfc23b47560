//! Controller metrics collection.
//!
//! Aggregate counters only. Nothing here identifies a session or carries
//! session data.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Controller metrics collector.
pub struct ControllerMetrics {
    /// Controller start time
    start_time: Instant,
    /// HTTP requests reaching the gate path
    requests: AtomicU64,
    /// Requests carrying nothing recognisable
    ignored_requests: AtomicU64,
    /// Completed handshakes
    handshakes: AtomicU64,
    /// Rejected handshakes (bad blob, refused session)
    handshake_failures: AtomicU64,
    /// Data polls routed to a live session
    polls: AtomicU64,
    /// Envelopes failing checksum or routing checks
    integrity_failures: AtomicU64,
    /// Sessions registered
    sessions_opened: AtomicU64,
    /// Sessions torn down
    sessions_closed: AtomicU64,
    /// Payload bytes delivered to sessions
    bytes_received: AtomicU64,
    /// Payload bytes sent to agents
    bytes_sent: AtomicU64,
}

impl ControllerMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            requests: AtomicU64::new(0),
            ignored_requests: AtomicU64::new(0),
            handshakes: AtomicU64::new(0),
            handshake_failures: AtomicU64::new(0),
            polls: AtomicU64::new(0),
            integrity_failures: AtomicU64::new(0),
            sessions_opened: AtomicU64::new(0),
            sessions_closed: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
        }
    }

    /// Increment request count.
    pub fn increment_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment ignored request count.
    pub fn increment_ignored(&self) {
        self.ignored_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment completed handshake count.
    pub fn increment_handshakes(&self) {
        self.handshakes.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment failed handshake count.
    pub fn increment_handshake_failures(&self) {
        self.handshake_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment routed poll count.
    pub fn increment_polls(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment integrity failure count.
    pub fn increment_integrity_failures(&self) {
        self.integrity_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment opened session count.
    pub fn increment_sessions_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment closed session count.
    pub fn increment_sessions_closed(&self) {
        self.sessions_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Add bytes to received counter.
    pub fn add_bytes_received(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Add bytes to sent counter.
    pub fn add_bytes_sent(&self, bytes: u64) {
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Get uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime_secs(),
            requests: self.requests.load(Ordering::Relaxed),
            ignored_requests: self.ignored_requests.load(Ordering::Relaxed),
            handshakes: self.handshakes.load(Ordering::Relaxed),
            handshake_failures: self.handshake_failures.load(Ordering::Relaxed),
            polls: self.polls.load(Ordering::Relaxed),
            integrity_failures: self.integrity_failures.load(Ordering::Relaxed),
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            sessions_closed: self.sessions_closed.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }

    /// Format metrics as a simple text report.
    pub fn format_report(&self) -> String {
        let snapshot = self.snapshot();

        format!(
            r#"Controller Metrics
==================
Uptime: {} seconds

Requests:
  Total:      {}
  Ignored:    {}
  Polls:      {}

Sessions:
  Handshakes: {}
  Opened:     {}
  Closed:     {}

Traffic:
  Sent:     {} bytes
  Received: {} bytes

Errors:
  Handshake Failures: {}
  Integrity Failures: {}
"#,
            snapshot.uptime_secs,
            snapshot.requests,
            snapshot.ignored_requests,
            snapshot.polls,
            snapshot.handshakes,
            snapshot.sessions_opened,
            snapshot.sessions_closed,
            snapshot.bytes_sent,
            snapshot.bytes_received,
            snapshot.handshake_failures,
            snapshot.integrity_failures,
        )
    }
}

impl Default for ControllerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of all metrics at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Seconds since the controller started
    pub uptime_secs: u64,
    /// Posts to the gate path
    pub requests: u64,
    /// Posts carrying no handshake and no live session id
    pub ignored_requests: u64,
    /// Completed handshakes
    pub handshakes: u64,
    /// Handshakes that failed or were refused
    pub handshake_failures: u64,
    /// Polls for a live session
    pub polls: u64,
    /// Envelopes that failed decryption or the checksum
    pub integrity_failures: u64,
    /// Sessions registered
    pub sessions_opened: u64,
    /// Sessions closed for any reason
    pub sessions_closed: u64,
    /// Application bytes received from agents
    pub bytes_received: u64,
    /// Application bytes sent to agents
    pub bytes_sent: u64,
}

impl MetricsSnapshot {
    /// Sessions currently open according to the counters.
    pub fn live_sessions(&self) -> u64 {
        self.sessions_opened.saturating_sub(self.sessions_closed)
    }

    /// Fraction of handshakes that failed.
    pub fn handshake_failure_rate(&self) -> f64 {
        let attempts = self.handshakes + self.handshake_failures;
        if attempts == 0 {
            0.0
        } else {
            self.handshake_failures as f64 / attempts as f64
        }
    }
}
