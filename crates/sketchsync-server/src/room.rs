//! Room state and the Session Broadcast Core.
//!
//! Each room owns the committed stroke log and the sequence counter.
//! Mutation goes through [`AppState`], whose room map hands out
//! exclusive references, so `submit_stroke` calls for one room are
//! serialized: committed sequence numbers are strictly increasing with
//! no gaps or duplicates.

use std::collections::HashMap;

use dashmap::DashMap;
use kurbo::Point;
use sketchsync_core::protocol::ServerMessage;
use sketchsync_core::stroke::{MalformedStroke, Stroke};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Relay configuration.
#[derive(Debug, Clone, Copy)]
pub struct RelayConfig {
    /// Bounded retry count for outbound socket sends.
    pub retry_limit: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { retry_limit: 3 }
    }
}

/// Why the relay rejected an operation.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("not joined to room {0}")]
    NotJoined(String),
    #[error(transparent)]
    Malformed(#[from] MalformedStroke),
}

/// One collaborative session: ordered log, sequence counter and the
/// connected peers' outbound channels.
struct Room {
    /// Committed strokes in commit order.
    log: Vec<Stroke>,
    /// Next sequence number to assign; starts at 1.
    next_seq: u64,
    /// Per-peer outbound channels. Each channel is FIFO, which is what
    /// preserves per-recipient ordering through the fan-out.
    peers: HashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
    /// Last known cursor position per participant.
    cursors: HashMap<Uuid, Point>,
}

impl Room {
    fn new() -> Self {
        Self {
            log: Vec::new(),
            next_seq: 1,
            peers: HashMap::new(),
            cursors: HashMap::new(),
        }
    }
}

/// Shared relay state: the active rooms.
pub struct AppState {
    rooms: DashMap<String, Room>,
    pub config: RelayConfig,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            rooms: DashMap::new(),
            config,
        }
    }

    /// Add a peer to a room, creating the room on first join. Returns
    /// the log snapshot for the `Joined` reply and the new peer count.
    pub fn join_room(
        &self,
        room_id: &str,
        peer_id: Uuid,
        tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> (Vec<Stroke>, usize) {
        let mut room = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(Room::new);
        room.peers.insert(peer_id, tx);
        (room.log.clone(), room.peers.len())
    }

    /// Remove a peer from a room; empty rooms are dropped.
    pub fn leave_room(&self, room_id: &str, peer_id: Uuid) {
        if let Some(mut room) = self.rooms.get_mut(room_id) {
            room.peers.remove(&peer_id);
            room.cursors.remove(&peer_id);
            if room.peers.is_empty() {
                drop(room);
                self.rooms.remove(room_id);
                info!("room {room_id} is empty, dropped");
            }
        }
    }

    /// Current peer count of a room (0 if the room does not exist).
    pub fn peer_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, |room| room.peers.len())
    }

    /// Validate, sequence and append a stroke to the room log.
    ///
    /// The exclusive room reference serializes concurrent submissions,
    /// so no two strokes ever receive the same sequence number.
    pub fn submit_stroke(
        &self,
        room_id: &str,
        peer_id: Uuid,
        mut stroke: Stroke,
    ) -> Result<Stroke, RelayError> {
        stroke.validate()?;
        let mut room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RelayError::NotJoined(room_id.to_string()))?;
        if !room.peers.contains_key(&peer_id) {
            return Err(RelayError::NotJoined(room_id.to_string()));
        }
        stroke.seq = room.next_seq;
        room.next_seq += 1;
        room.log.push(stroke.clone());
        debug!("room {room_id}: committed stroke seq={}", stroke.seq);
        Ok(stroke)
    }

    /// Full ordered log for a (re)joining participant. Idempotent.
    pub fn resync(&self, room_id: &str, peer_id: Uuid) -> Result<Vec<Stroke>, RelayError> {
        let room = self
            .rooms
            .get(room_id)
            .ok_or_else(|| RelayError::NotJoined(room_id.to_string()))?;
        if !room.peers.contains_key(&peer_id) {
            return Err(RelayError::NotJoined(room_id.to_string()));
        }
        Ok(room.log.clone())
    }

    /// Record a participant's cursor position.
    pub fn update_cursor(&self, room_id: &str, peer_id: Uuid, position: Point) {
        if let Some(mut room) = self.rooms.get_mut(room_id) {
            if room.peers.contains_key(&peer_id) {
                room.cursors.insert(peer_id, position);
            }
        }
    }

    /// Fan a message out to every peer in the room except the sender.
    ///
    /// A peer whose channel is closed never blocks delivery to the
    /// others; it is swept from the room silently and may rejoin and
    /// resync later.
    pub fn broadcast_except(&self, room_id: &str, sender: Uuid, message: ServerMessage) {
        let mut stale = Vec::new();
        if let Some(room) = self.rooms.get(room_id) {
            for (id, tx) in room.peers.iter() {
                if *id == sender {
                    continue;
                }
                if tx.send(message.clone()).is_err() {
                    stale.push(*id);
                }
            }
        }
        for id in stale {
            debug!("room {room_id}: sweeping stale peer {id}");
            self.leave_room(room_id, id);
        }
    }
}
