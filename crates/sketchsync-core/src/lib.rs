//! SketchSync Core Library
//!
//! Platform-agnostic building blocks for the SketchSync collaborative
//! whiteboard: the stroke model, the geometry normalizer, per-session
//! input state and the client-side session that talks to the relay.

pub mod geometry;
pub mod input;
pub mod protocol;
pub mod session;
pub mod stroke;

pub use geometry::{GeometryConfig, classify, normalize, snap_to_grid, GRID_SIZE};
pub use input::{Gesture, InputState};
pub use protocol::{ClientMessage, ServerMessage};
pub use session::{ConnectionState, RenderSink, Session};
pub use stroke::{Color, MalformedStroke, Stroke, Tool};
