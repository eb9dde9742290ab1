//! Server metrics for observability
//!
//! Runtime counters for monitoring hub health: session churn, broadcast
//! volume, and the locally-recovered error paths.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Server-wide metrics
#[derive(Debug, Default)]
pub struct ServerMetrics {
    // Session metrics
    /// Currently connected sessions
    pub active_sessions: AtomicU64,
    /// Total sessions since server start
    pub total_sessions: AtomicU64,

    // Message metrics
    /// Frames received from clients
    pub frames_received: AtomicU64,
    /// Messages appended to history and fanned out
    pub messages_broadcast: AtomicU64,
    /// Messages replayed to joining sessions
    pub messages_replayed: AtomicU64,
    /// Per-recipient delivery failures during fan-out
    pub sends_failed: AtomicU64,

    // Transfer metrics
    /// Uploads persisted to the blob store
    pub files_stored: AtomicU64,
    /// Metadata frames that failed to parse
    pub malformed_metadata: AtomicU64,
    /// Binary frames dropped for lack of staged metadata
    pub orphan_binaries: AtomicU64,
    /// Blob store write failures
    pub storage_errors: AtomicU64,

    /// Server start time (for uptime calculation)
    start_time: Option<Instant>,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    // Session tracking
    pub fn session_opened(&self) {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
        self.total_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_closed(&self) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
    }

    // Message tracking
    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_broadcast(&self, failed_sends: u64) {
        self.messages_broadcast.fetch_add(1, Ordering::Relaxed);
        self.sends_failed.fetch_add(failed_sends, Ordering::Relaxed);
    }

    pub fn history_replayed(&self, count: u64) {
        self.messages_replayed.fetch_add(count, Ordering::Relaxed);
    }

    // Transfer tracking
    pub fn file_stored(&self) {
        self.files_stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn metadata_rejected(&self) {
        self.malformed_metadata.fetch_add(1, Ordering::Relaxed);
    }

    pub fn orphan_binary(&self) {
        self.orphan_binaries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn storage_error(&self) {
        self.storage_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }

    /// Create a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime_secs(),
            sessions: SessionMetrics {
                active: self.active_sessions.load(Ordering::Relaxed),
                total: self.total_sessions.load(Ordering::Relaxed),
            },
            messages: MessageMetrics {
                frames_received: self.frames_received.load(Ordering::Relaxed),
                broadcast: self.messages_broadcast.load(Ordering::Relaxed),
                replayed: self.messages_replayed.load(Ordering::Relaxed),
            },
            transfers: TransferMetrics {
                files_stored: self.files_stored.load(Ordering::Relaxed),
            },
            errors: ErrorMetrics {
                malformed_metadata: self.malformed_metadata.load(Ordering::Relaxed),
                orphan_binaries: self.orphan_binaries.load(Ordering::Relaxed),
                storage: self.storage_errors.load(Ordering::Relaxed),
                sends_failed: self.sends_failed.load(Ordering::Relaxed),
            },
        }
    }
}

/// Serializable snapshot of metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub sessions: SessionMetrics,
    pub messages: MessageMetrics,
    pub transfers: TransferMetrics,
    pub errors: ErrorMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub active: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetrics {
    pub frames_received: u64,
    pub broadcast: u64,
    pub replayed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferMetrics {
    pub files_stored: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMetrics {
    pub malformed_metadata: u64,
    pub orphan_binaries: u64,
    pub storage: u64,
    pub sends_failed: u64,
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub sessions: u64,
    pub history_len: u64,
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_tracking() {
        let metrics = ServerMetrics::new();

        metrics.session_opened();
        metrics.session_opened();
        assert_eq!(metrics.active_sessions.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.total_sessions.load(Ordering::Relaxed), 2);

        metrics.session_closed();
        assert_eq!(metrics.active_sessions.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.total_sessions.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_broadcast_tracking() {
        let metrics = ServerMetrics::new();

        metrics.message_broadcast(0);
        metrics.message_broadcast(2);
        metrics.history_replayed(5);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.messages.broadcast, 2);
        assert_eq!(snapshot.messages.replayed, 5);
        assert_eq!(snapshot.errors.sends_failed, 2);
    }

    #[test]
    fn test_error_tracking() {
        let metrics = ServerMetrics::new();

        metrics.metadata_rejected();
        metrics.orphan_binary();
        metrics.orphan_binary();
        metrics.storage_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.errors.malformed_metadata, 1);
        assert_eq!(snapshot.errors.orphan_binaries, 2);
        assert_eq!(snapshot.errors.storage, 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = ServerMetrics::new();
        metrics.session_opened();
        metrics.file_stored();

        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["sessions"]["active"], 1);
        assert_eq!(json["transfers"]["files_stored"], 1);
    }
}
