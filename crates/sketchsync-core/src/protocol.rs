//! Wire protocol between clients and the relay server.
//!
//! Messages are JSON, externally tagged with a `type` field:
//! ```json
//! { "type": "join", "room": "room-id" }
//! { "type": "stroke", "stroke": { ... } }
//! { "type": "resync" }
//! { "type": "leave" }
//! ```

use serde::{Deserialize, Serialize};

use crate::stroke::Stroke;

/// Messages sent to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a room.
    Join { room: String },
    /// Submit a pending stroke (`seq` is ignored; the relay assigns it).
    Stroke { stroke: Stroke },
    /// Request a full replay of the room log.
    Resync,
    /// Leave the current room.
    Leave,
    /// Cursor moved (streamed to peers, never logged).
    Cursor { x: f64, y: f64 },
}

/// Messages received from the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirm room join; `strokes` is the full ordered log so late
    /// joiners see prior drawing.
    Joined {
        room: String,
        peer_count: usize,
        strokes: Vec<Stroke>,
    },
    /// A committed stroke from another participant.
    Stroke { stroke: Stroke },
    /// Full-log replay in commit order. Delivery is at-least-once:
    /// receivers deduplicate by `seq`.
    Resync { strokes: Vec<Stroke> },
    /// A peer joined the room.
    PeerJoined { peer_id: String },
    /// A peer left the room.
    PeerLeft { peer_id: String },
    /// Cursor update from another participant.
    Cursor { from: String, x: f64, y: f64 },
    /// A rejected operation, surfaced to the offending caller only.
    Error { message: String },
}
