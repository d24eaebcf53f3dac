//! Geometry normalizer: shape classification and grid snapping.
//!
//! Classification is a bounding-box heuristic, not exact recognition:
//! a gesture whose width/height ratio falls inside an open interval
//! around 1.0 reads as a circle, anything else as a rectangle. The
//! bounds are tunable through [`GeometryConfig`].

use kurbo::Point;
use thiserror::Error;
use uuid::Uuid;

use crate::input::Gesture;
use crate::stroke::{Stroke, Tool};

/// Default grid size for snapping (matches the visual grid).
pub const GRID_SIZE: f64 = 20.0;

/// Default circle-classification ratio bounds (exclusive).
pub const CIRCLE_RATIO_BOUNDS: (f64, f64) = (0.9, 1.1);

/// Tunables for the normalizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryConfig {
    /// Coordinates snap to multiples of this when snapping is enabled.
    pub grid_size: f64,
    /// Open-interval ratio bounds for circle classification.
    pub circle_ratio: (f64, f64),
    /// Whether grid snapping applies to normalized strokes.
    pub snap_enabled: bool,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE,
            circle_ratio: CIRCLE_RATIO_BOUNDS,
            snap_enabled: false,
        }
    }
}

/// Invalid [`GeometryConfig`] values.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("grid size {0} must be a positive finite number")]
    BadGridSize(f64),
    #[error("ratio bounds ({0}, {1}) must satisfy 0 < lo < hi")]
    BadRatioBounds(f64, f64),
}

impl GeometryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.grid_size.is_finite() || self.grid_size <= 0.0 {
            return Err(ConfigError::BadGridSize(self.grid_size));
        }
        let (lo, hi) = self.circle_ratio;
        if !lo.is_finite() || !hi.is_finite() || lo <= 0.0 || lo >= hi {
            return Err(ConfigError::BadRatioBounds(lo, hi));
        }
        Ok(())
    }
}

/// Classify a gesture's bounding box as a circle or a rectangle.
///
/// The ratio bounds are exclusive: a ratio of exactly `lo` or `hi`
/// classifies as a rectangle. A degenerate box (zero height) is a
/// rectangle as well.
pub fn classify(start: Point, end: Point, config: &GeometryConfig) -> Tool {
    let width = (end.x - start.x).abs();
    let height = (end.y - start.y).abs();
    if height == 0.0 {
        return Tool::Rectangle;
    }
    let ratio = width / height;
    let (lo, hi) = config.circle_ratio;
    if ratio > lo && ratio < hi {
        Tool::Circle
    } else {
        Tool::Rectangle
    }
}

/// Snap a point to the nearest grid intersection. Idempotent.
pub fn snap_to_grid(point: Point, grid_size: f64) -> Point {
    Point::new(
        (point.x / grid_size).round() * grid_size,
        (point.y / grid_size).round() * grid_size,
    )
}

/// Produce a classified, optionally grid-snapped stroke from a gesture.
///
/// Always synchronous and total: there is no failure mode, only a
/// best-effort classification. The gesture itself is never mutated, so
/// callers keep the raw input.
///
/// - freehand tools keep the full sampled path
/// - line keeps its two endpoints
/// - shape tools collapse to `[start, end]` with the tool replaced by
///   the classifier's verdict
pub fn normalize(gesture: &Gesture, author: Uuid, config: &GeometryConfig) -> Stroke {
    let (tool, points) = if gesture.tool.is_shape() {
        (
            classify(gesture.start, gesture.end, config),
            vec![gesture.start, gesture.end],
        )
    } else if gesture.tool == Tool::Line {
        (Tool::Line, vec![gesture.start, gesture.end])
    } else if gesture.path.is_empty() {
        // A click without movement still produces a dot.
        (gesture.tool, vec![gesture.start])
    } else {
        (gesture.tool, gesture.path.clone())
    };

    let points = if config.snap_enabled {
        points
            .into_iter()
            .map(|p| snap_to_grid(p, config.grid_size))
            .collect()
    } else {
        points
    };

    Stroke::pending(author, tool, gesture.color, gesture.width, points)
}
