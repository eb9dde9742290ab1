//! Shared Hub State
//!
//! One `Hub` per process owns the session registry and the history log behind
//! a single lock, providing the atomic join-with-replay and append-with-fanout
//! primitives every session task uses.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::metrics::ServerMetrics;

use super::history::HistoryLog;
use super::protocol::Message;
use super::registry::{Outbound, SessionId, SessionRegistry};

struct HubState {
    registry: SessionRegistry,
    history: HistoryLog,
}

/// The broadcast hub.
///
/// Constructed once at startup and handed to every session task as an `Arc`.
/// Join (register + replay) and broadcast (append + fan-out) each run under a
/// single lock acquisition, so replay order, append order, and delivery order
/// are one total order: a session joining after K messages receives exactly
/// those K, in order, before any newer broadcast. Fan-out pushes into
/// unbounded per-session channels and never awaits while holding the lock.
pub struct Hub {
    state: Mutex<HubState>,
    metrics: Arc<ServerMetrics>,
}

impl Hub {
    pub fn new(metrics: Arc<ServerMetrics>) -> Self {
        Self {
            state: Mutex::new(HubState {
                registry: SessionRegistry::new(),
                history: HistoryLog::new(),
            }),
            metrics,
        }
    }

    /// Register a session and replay the full history into its outbound
    /// channel, in append order. Returns the number of replayed messages.
    pub async fn join(&self, id: SessionId, outbound: Outbound) -> usize {
        let mut state = self.state.lock().await;
        let mut replayed = 0;
        for message in state.history.iter() {
            match serde_json::to_string(message) {
                Ok(frame) => {
                    if outbound.send(frame).is_err() {
                        // Receiver already gone; registration below keeps the
                        // entry until the next fan-out reaps it.
                        break;
                    }
                    replayed += 1;
                }
                Err(e) => error!("failed to serialize history message: {e}"),
            }
        }
        state.registry.register(id, outbound);
        self.metrics.history_replayed(replayed as u64);
        debug!(session = %id, replayed, "session joined");
        replayed
    }

    /// Remove a session from the registry.
    pub async fn leave(&self, id: &SessionId) {
        let mut state = self.state.lock().await;
        state.registry.unregister(id);
        debug!(session = %id, "session left");
    }

    /// Append a message to the history and fan it out to every open session,
    /// the sender included. The message is serialized once and the identical
    /// frame is delivered to each recipient; per-recipient failures are
    /// skipped without aborting the fan-out.
    pub async fn broadcast(&self, message: Message) {
        let frame = match serde_json::to_string(&message) {
            Ok(frame) => frame,
            Err(e) => {
                error!("failed to serialize broadcast message: {e}");
                return;
            }
        };
        let mut state = self.state.lock().await;
        state.history.append(message);
        let failed = state.registry.send_to_open(&frame);
        self.metrics.message_broadcast(failed as u64);
        if failed > 0 {
            debug!(failed, "skipped closed sessions during fan-out");
        }
    }

    /// Number of currently registered sessions.
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.registry.len()
    }

    /// Number of messages in the history log.
    pub async fn history_len(&self) -> usize {
        self.state.lock().await.history.len()
    }
}
