//! Broadcast History
//!
//! Append-only record of every message broadcast since process start,
//! replayed in order to each newly joined session.

use super::protocol::Message;

/// The ordered history of all broadcasts.
///
/// Grows without bound: replay-on-join depends on the full history being
/// available, and no eviction or persistence exists. Not synchronized
/// itself: the owning [`Hub`](super::Hub) guards it together with the
/// session registry so appends and replays serialize on one lock.
#[derive(Debug, Default)]
pub struct HistoryLog {
    messages: Vec<Message>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the end. Never fails.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Iterate all stored messages in append order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
