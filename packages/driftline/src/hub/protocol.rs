//! Wire Protocol Types
//!
//! Frames on the hub channel are either text or binary, distinguished by the
//! WebSocket transport. A text frame starting with [`FILE_META_MARKER`]
//! carries file metadata ahead of a binary payload; every other text frame is
//! a literal chat message body. Outbound traffic is always a JSON-serialized
//! [`Message`].

use serde::{Deserialize, Serialize};

/// Prefix marking a text frame as file metadata rather than chat text.
pub const FILE_META_MARKER: &str = "__file__:";

/// A broadcast message, serialized verbatim onto the wire and into replay.
///
/// Immutable once created; the hub appends but never mutates or deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// Literal chat text. The `"user: body"` convention inside `text` is
    /// encoded by clients; the hub does not parse or enforce it.
    Text { text: String },
    /// A completed file transfer, referencing its stored location under
    /// `/uploads`.
    File {
        name: String,
        url: String,
        user: String,
        caption: String,
    },
}

/// File metadata staged ahead of its binary payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub filename: String,
    pub username: String,
    pub caption: String,
}

impl FileMeta {
    /// Parse the JSON payload of a `__file__:` frame (marker already
    /// stripped).
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}
