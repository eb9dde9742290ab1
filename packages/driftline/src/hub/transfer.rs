//! File Transfer Staging
//!
//! A file arrives as two frames on the same session: a metadata frame, then
//! the binary payload. The staging slot correlates them.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::blob_store::{BlobStore, StoreError};

use super::protocol::{FileMeta, Message};

/// Recoverable failures on the transfer path. None of these disconnect the
/// session or reach other sessions.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("malformed file metadata: {0}")]
    MalformedMetadata(#[from] serde_json::Error),
    #[error("transfer abandoned: {0}")]
    Storage(#[from] StoreError),
}

/// Per-session staging slot for a two-phase file transfer.
///
/// Holds at most one pending metadata record. Owned by the session receive
/// loop, so disconnecting drops any staged state with the session; a later
/// session under the same identity always starts with an empty slot.
#[derive(Debug)]
pub struct Transfer {
    store: Arc<BlobStore>,
    pending: Option<FileMeta>,
}

impl Transfer {
    pub fn new(store: Arc<BlobStore>) -> Self {
        Self {
            store,
            pending: None,
        }
    }

    /// Stage metadata from a `__file__:` frame payload (marker stripped).
    ///
    /// A previously staged record is overwritten: the newest metadata wins
    /// and the orphaned one is silently dropped.
    pub fn begin(&mut self, payload: &str) -> Result<(), TransferError> {
        let meta = FileMeta::parse(payload)?;
        if let Some(orphaned) = self.pending.replace(meta) {
            debug!(dropped = %orphaned.filename, "new metadata replaces unconsumed staging");
        }
        Ok(())
    }

    /// Consume the staged metadata with its binary payload.
    ///
    /// Returns the broadcast-ready message, or `None` for an out-of-protocol
    /// binary frame with nothing staged. On a storage failure the slot is
    /// already cleared: the transfer is abandoned with no partial state.
    pub async fn complete(&mut self, payload: &[u8]) -> Result<Option<Message>, TransferError> {
        let Some(meta) = self.pending.take() else {
            return Ok(None);
        };
        let stored = self.store.put(&meta.filename, payload).await?;
        Ok(Some(Message::File {
            name: stored.name,
            url: stored.url,
            user: meta.username,
            caption: meta.caption,
        }))
    }

    /// Whether a metadata record is awaiting its binary payload.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
