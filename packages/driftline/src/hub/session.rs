//! Per-Session Receive Loop
//!
//! One task per connected client: classifies inbound frames, drives the
//! session's transfer slot, and hands broadcast-worthy messages to the hub.
//! A paired writer task drains the session's outbound channel into the
//! socket.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::blob_store::BlobStore;
use crate::metrics::ServerMetrics;

use super::protocol::{FILE_META_MARKER, Message};
use super::state::Hub;
use super::transfer::{Transfer, TransferError};

/// Run one client session to completion.
///
/// Joins the hub (which replays the full history), then pumps frames until
/// the client closes, the transport faults, or the write side fails. All
/// three paths unregister the session and drop any staged transfer.
pub async fn run_session(
    socket: WebSocket,
    hub: Arc<Hub>,
    store: Arc<BlobStore>,
    metrics: Arc<ServerMetrics>,
) {
    let session_id = Uuid::new_v4();
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Outbound channel drained by the writer task. Unbounded: fan-out must
    // not block on a slow client, and backpressure is out of scope.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    metrics.session_opened();
    let replayed = hub.join(session_id, tx).await;
    info!(session = %session_id, replayed, "session connected");

    let writer = async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(WsMessage::Text(frame.into())).await.is_err() {
                break;
            }
        }
    };

    let reader = async {
        let mut transfer = Transfer::new(store);
        while let Some(frame) = ws_receiver.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => {
                    metrics.frame_received();
                    handle_text(&hub, &mut transfer, &metrics, text.as_str()).await;
                }
                Ok(WsMessage::Binary(payload)) => {
                    metrics.frame_received();
                    handle_binary(&hub, &mut transfer, &metrics, &payload).await;
                }
                Ok(WsMessage::Close(_)) => {
                    debug!(session = %session_id, "client closed connection");
                    break;
                }
                // Ping/pong are answered by the transport layer.
                Ok(_) => {}
                Err(e) => {
                    warn!(session = %session_id, "websocket error: {e}");
                    break;
                }
            }
        }
    };

    // Either side ending tears the session down; a disconnect mid-transfer
    // drops the staged metadata with the reader.
    tokio::select! {
        _ = writer => {}
        _ = reader => {}
    }

    hub.leave(&session_id).await;
    metrics.session_closed();
    info!(session = %session_id, "session disconnected");
}

/// Classify a text frame: file metadata behind the marker, or a literal
/// chat message broadcast verbatim.
async fn handle_text(hub: &Hub, transfer: &mut Transfer, metrics: &ServerMetrics, text: &str) {
    match text.strip_prefix(FILE_META_MARKER) {
        Some(payload) => {
            if let Err(e) = transfer.begin(payload) {
                metrics.metadata_rejected();
                warn!("dropped metadata frame: {e}");
            }
        }
        None => {
            hub.broadcast(Message::Text {
                text: text.to_owned(),
            })
            .await;
        }
    }
}

/// Feed a binary frame to the transfer slot; a completed transfer becomes a
/// file broadcast, an orphan frame is dropped, a storage failure abandons
/// the transfer without reaching other sessions.
async fn handle_binary(hub: &Hub, transfer: &mut Transfer, metrics: &ServerMetrics, payload: &[u8]) {
    match transfer.complete(payload).await {
        Ok(Some(message)) => {
            metrics.file_stored();
            hub.broadcast(message).await;
        }
        Ok(None) => {
            metrics.orphan_binary();
            debug!("dropped binary frame with no staged metadata");
        }
        Err(TransferError::Storage(e)) => {
            metrics.storage_error();
            error!("transfer abandoned: {e}");
        }
        Err(e) => error!("transfer failed: {e}"),
    }
}
