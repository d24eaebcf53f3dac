//! Client-side session: connection state machine, outbound queue and
//! deduplicated delivery to the render adapter.
//!
//! Local input never talks to the network directly. A gesture is
//! normalized into a stroke, queued on the session, and drained by the
//! transport at its own cadence; incoming committed strokes pass
//! through a by-`seq` dedup before reaching the [`RenderSink`], so
//! at-least-once delivery from the relay is safe.

use std::collections::HashSet;

use kurbo::Point;
use uuid::Uuid;

use crate::geometry::{normalize, GeometryConfig};
use crate::input::Gesture;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::stroke::{MalformedStroke, Stroke};

/// Connection lifecycle. `Disconnected` is terminal: a client that
/// loses its transport builds a fresh session and resyncs on rejoin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Joined(String),
    Disconnected,
}

/// The render adapter contract: an ordered stream of committed strokes
/// plus cursor updates. The session guarantees each committed `seq` is
/// forwarded at most once, so implementations stay idempotent for free.
pub trait RenderSink {
    fn apply_stroke(&mut self, stroke: &Stroke);
    fn update_cursor(&mut self, from: &str, position: Point);
}

/// One participant's view of a collaborative drawing session.
pub struct Session {
    /// Connection id; doubles as the stroke author id.
    author: Uuid,
    state: ConnectionState,
    config: GeometryConfig,
    /// Sequence numbers already forwarded to the render sink.
    seen: HashSet<u64>,
    /// Queued messages for the transport to drain.
    outgoing: Vec<ClientMessage>,
}

impl Session {
    pub fn new(config: GeometryConfig) -> Self {
        Self {
            author: Uuid::new_v4(),
            state: ConnectionState::Connecting,
            config,
            seen: HashSet::new(),
            outgoing: Vec::new(),
        }
    }

    pub fn author(&self) -> Uuid {
        self.author
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_joined(&self) -> bool {
        matches!(self.state, ConnectionState::Joined(_))
    }

    /// Queue a join request. The state flips to `Joined` only when the
    /// server confirms.
    pub fn join(&mut self, room: &str) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.outgoing.push(ClientMessage::Join {
            room: room.to_string(),
        });
    }

    /// Queue a leave request and fall back to `Connecting`.
    pub fn leave(&mut self) {
        if self.is_joined() {
            self.outgoing.push(ClientMessage::Leave);
            self.state = ConnectionState::Connecting;
        }
    }

    /// Normalize a finished gesture and queue the resulting pending
    /// stroke. Malformed gestures are rejected before they reach the
    /// wire.
    pub fn submit_gesture(&mut self, gesture: &Gesture) -> Result<(), MalformedStroke> {
        let stroke = normalize(gesture, self.author, &self.config);
        stroke.validate()?;
        self.outgoing.push(ClientMessage::Stroke { stroke });
        Ok(())
    }

    /// Queue a full-log replay request.
    pub fn request_resync(&mut self) {
        self.outgoing.push(ClientMessage::Resync);
    }

    /// Queue a cursor update.
    pub fn move_cursor(&mut self, position: Point) {
        self.outgoing.push(ClientMessage::Cursor {
            x: position.x,
            y: position.y,
        });
    }

    /// Drain queued outbound messages for the transport.
    pub fn take_outgoing(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// The transport failed; the session is done.
    pub fn transport_failed(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.outgoing.clear();
    }

    /// Apply an incoming server message, forwarding committed strokes
    /// and cursor updates to the sink. Duplicate strokes (same `seq`)
    /// are dropped, which also makes resync batches idempotent.
    pub fn handle_message<S: RenderSink>(&mut self, message: ServerMessage, sink: &mut S) {
        match message {
            ServerMessage::Joined {
                room,
                peer_count,
                strokes,
            } => {
                log::info!("joined room {room} with {peer_count} peers");
                self.state = ConnectionState::Joined(room);
                for stroke in &strokes {
                    self.apply_committed(stroke, sink);
                }
            }
            ServerMessage::Stroke { stroke } => {
                self.apply_committed(&stroke, sink);
            }
            ServerMessage::Resync { strokes } => {
                for stroke in &strokes {
                    self.apply_committed(stroke, sink);
                }
            }
            ServerMessage::Cursor { from, x, y } => {
                sink.update_cursor(&from, Point::new(x, y));
            }
            ServerMessage::PeerJoined { peer_id } => {
                log::debug!("peer {peer_id} joined");
            }
            ServerMessage::PeerLeft { peer_id } => {
                log::debug!("peer {peer_id} left");
            }
            ServerMessage::Error { message } => {
                log::warn!("relay rejected operation: {message}");
            }
        }
    }

    fn apply_committed<S: RenderSink>(&mut self, stroke: &Stroke, sink: &mut S) {
        if !stroke.is_committed() {
            log::warn!("dropping uncommitted stroke from relay");
            return;
        }
        if self.seen.insert(stroke.seq) {
            sink.apply_stroke(stroke);
        }
    }
}
