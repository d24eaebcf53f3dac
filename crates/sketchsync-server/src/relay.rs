//! WebSocket handling: one task per connection, fan-out via per-peer
//! channels.
//!
//! Inbound frames are JSON [`ClientMessage`]s. Outbound traffic for a
//! connection flows through its unbounded channel and is written to the
//! socket by the same task, so a slow or dead peer can only ever stall
//! itself. Socket writes retry transient failures up to the configured
//! bound; after exhaustion the connection is dropped and the peer falls
//! out of its room.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{Sink, SinkExt, StreamExt};
use kurbo::Point;
use sketchsync_core::protocol::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::room::{AppState, RelayConfig, RelayError};

/// Delay between outbound send retries.
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Serialize and send one message, retrying transient failures up to
/// the configured bound. `Err` means the bound is exhausted and the
/// connection must be dropped.
async fn send_with_retry<S>(
    sender: &mut S,
    message: &ServerMessage,
    config: &RelayConfig,
) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(error) => {
            warn!("dropping unserializable message: {error}");
            return Ok(());
        }
    };
    let attempts = config.retry_limit.max(1);
    for attempt in 1..=attempts {
        match sender.send(Message::Text(json.clone().into())).await {
            Ok(()) => return Ok(()),
            Err(error) if attempt < attempts => {
                warn!("socket send failed (attempt {attempt}/{attempts}): {error}");
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
            Err(error) => {
                warn!("socket send failed, giving up: {error}");
            }
        }
    }
    Err(())
}

/// Handle one WebSocket connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = Uuid::new_v4();
    info!("new connection: {peer_id}");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let mut current_room: Option<String> = None;

    loop {
        tokio::select! {
            // Inbound frames from the client.
            frame = ws_receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(message) => handle_client_message(
                                &state,
                                peer_id,
                                &tx,
                                &mut current_room,
                                message,
                            ),
                            Err(error) => {
                                warn!("invalid message from {peer_id}: {error}");
                                let _ = tx.send(ServerMessage::Error {
                                    message: format!("invalid message: {error}"),
                                });
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ignore binary and ping/pong.
                    Some(Err(error)) => {
                        warn!("socket error for {peer_id}: {error}");
                        break;
                    }
                }
            }

            // Outbound messages queued for this peer, in FIFO order.
            outbound = rx.recv() => {
                match outbound {
                    Some(message) => {
                        if send_with_retry(&mut ws_sender, &message, &state.config).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    // The peer is dropped from its room silently; it may rejoin and
    // resync.
    if let Some(room) = &current_room {
        state.leave_room(room, peer_id);
        state.broadcast_except(room, peer_id, ServerMessage::PeerLeft {
            peer_id: peer_id.to_string(),
        });
    }
    info!("connection closed: {peer_id}");
}

/// Apply a single client message to the relay state.
fn handle_client_message(
    state: &AppState,
    peer_id: Uuid,
    tx: &mpsc::UnboundedSender<ServerMessage>,
    current_room: &mut Option<String>,
    message: ClientMessage,
) {
    match message {
        ClientMessage::Join { room } => {
            if let Some(old_room) = current_room.take() {
                state.leave_room(&old_room, peer_id);
                state.broadcast_except(&old_room, peer_id, ServerMessage::PeerLeft {
                    peer_id: peer_id.to_string(),
                });
            }

            let (strokes, peer_count) = state.join_room(&room, peer_id, tx.clone());
            let _ = tx.send(ServerMessage::Joined {
                room: room.clone(),
                peer_count,
                strokes,
            });
            state.broadcast_except(&room, peer_id, ServerMessage::PeerJoined {
                peer_id: peer_id.to_string(),
            });
            info!("peer {peer_id} joined room {room} ({peer_count} peers)");
            *current_room = Some(room);
        }
        ClientMessage::Stroke { stroke } => {
            let room = match current_room {
                Some(room) => room.clone(),
                None => {
                    let _ = tx.send(ServerMessage::Error {
                        message: "not joined to any room".to_string(),
                    });
                    return;
                }
            };
            match state.submit_stroke(&room, peer_id, stroke) {
                Ok(committed) => {
                    state.broadcast_except(&room, peer_id, ServerMessage::Stroke {
                        stroke: committed,
                    });
                }
                Err(RelayError::Malformed(error)) => {
                    // Dropped and logged, never broadcast.
                    warn!("malformed stroke from {peer_id}: {error}");
                }
                Err(error @ RelayError::NotJoined(_)) => {
                    let _ = tx.send(ServerMessage::Error {
                        message: error.to_string(),
                    });
                }
            }
        }
        ClientMessage::Resync => {
            let room = match current_room {
                Some(room) => room.clone(),
                None => {
                    let _ = tx.send(ServerMessage::Error {
                        message: "not joined to any room".to_string(),
                    });
                    return;
                }
            };
            match state.resync(&room, peer_id) {
                Ok(strokes) => {
                    let _ = tx.send(ServerMessage::Resync { strokes });
                }
                Err(error) => {
                    let _ = tx.send(ServerMessage::Error {
                        message: error.to_string(),
                    });
                }
            }
        }
        ClientMessage::Leave => {
            if let Some(room) = current_room.take() {
                state.leave_room(&room, peer_id);
                state.broadcast_except(&room, peer_id, ServerMessage::PeerLeft {
                    peer_id: peer_id.to_string(),
                });
                info!("peer {peer_id} left room {room}");
            }
        }
        ClientMessage::Cursor { x, y } => {
            if let Some(room) = current_room {
                state.update_cursor(room, peer_id, Point::new(x, y));
                state.broadcast_except(room, peer_id, ServerMessage::Cursor {
                    from: peer_id.to_string(),
                    x,
                    y,
                });
            }
        }
    }
}
