//! The stroke model: one committed drawing operation.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Drawing tool that produced a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Pencil,
    Eraser,
    Rectangle,
    Circle,
    Line,
}

impl Tool {
    /// Freehand tools keep the full sampled path; the others are
    /// described by their two endpoints.
    pub fn is_freehand(self) -> bool {
        matches!(self, Tool::Pencil | Tool::Eraser)
    }

    /// Shape tools go through the geometry normalizer's classifier.
    pub fn is_shape(self) -> bool {
        matches!(self, Tool::Rectangle | Tool::Circle)
    }
}

/// Stroke color (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// Sequence number reserved for strokes the relay has not committed yet.
pub const PENDING_SEQ: u64 = 0;

/// Upper bound on sampled points per stroke; longer paths are malformed.
pub const MAX_POINTS_PER_STROKE: usize = 5000;

/// One drawing operation: a freehand path or a primitive shape.
///
/// `seq` is the room-scoped sequence number. The relay owns assignment:
/// committed strokes carry a strictly increasing `seq` starting at 1,
/// while a client-side pending stroke carries [`PENDING_SEQ`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub seq: u64,
    /// Connection id of the participant who drew this stroke.
    pub author: Uuid,
    pub tool: Tool,
    pub color: Color,
    pub width: f64,
    /// Ordered sample points. Non-empty for every valid stroke; exactly
    /// two entries (start, end) for shape and line tools.
    pub points: Vec<Point>,
}

/// Why a stroke payload was rejected.
#[derive(Debug, Error, PartialEq)]
pub enum MalformedStroke {
    #[error("stroke has no points")]
    EmptyPath,
    #[error("stroke has {0} points (limit {MAX_POINTS_PER_STROKE})")]
    TooManyPoints(usize),
    #[error("stroke contains a non-finite coordinate")]
    NonFinitePoint,
    #[error("stroke width {0} is not a positive finite number")]
    BadWidth(f64),
}

impl Stroke {
    /// Create a pending (uncommitted) stroke.
    pub fn pending(author: Uuid, tool: Tool, color: Color, width: f64, points: Vec<Point>) -> Self {
        Self {
            seq: PENDING_SEQ,
            author,
            tool,
            color,
            width,
            points,
        }
    }

    /// Whether the relay has assigned this stroke its sequence number.
    pub fn is_committed(&self) -> bool {
        self.seq != PENDING_SEQ
    }

    /// Check the invariants every stroke on the wire must satisfy.
    pub fn validate(&self) -> Result<(), MalformedStroke> {
        if self.points.is_empty() {
            return Err(MalformedStroke::EmptyPath);
        }
        if self.points.len() > MAX_POINTS_PER_STROKE {
            return Err(MalformedStroke::TooManyPoints(self.points.len()));
        }
        if self
            .points
            .iter()
            .any(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(MalformedStroke::NonFinitePoint);
        }
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(MalformedStroke::BadWidth(self.width));
        }
        Ok(())
    }
}
