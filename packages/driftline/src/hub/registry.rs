//! Session Registry
//!
//! The set of currently connected sessions and their outbound channels.

use std::collections::HashMap;

use tokio::sync::mpsc;
use uuid::Uuid;

/// Opaque identity of one connected session.
pub type SessionId = Uuid;

/// Outbound handle for one session. Pre-serialized frames pushed here are
/// drained by the session's socket writer task. Unbounded: backpressure is
/// out of scope, matching the transport library's own buffering.
pub type Outbound = mpsc::UnboundedSender<String>;

/// The live session set.
///
/// Not synchronized itself; the owning [`Hub`](super::Hub) guards it together
/// with the history log so registration, fan-out, and replay serialize on one
/// lock. Iteration order is unspecified.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Outbound>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session's outbound channel. Replaces any stale entry left
    /// under the same id.
    pub fn register(&mut self, id: SessionId, outbound: Outbound) {
        self.sessions.insert(id, outbound);
    }

    /// Remove a session. Returns whether it was present.
    pub fn unregister(&mut self, id: &SessionId) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Send a pre-serialized frame to every open session. Sessions whose
    /// receiver is gone are skipped and reaped; returns how many sends
    /// failed. A failed recipient never aborts delivery to the rest.
    pub fn send_to_open(&mut self, frame: &str) -> usize {
        let mut failed = 0;
        self.sessions.retain(|_, outbound| {
            if outbound.send(frame.to_owned()).is_ok() {
                true
            } else {
                failed += 1;
                false
            }
        });
        failed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
