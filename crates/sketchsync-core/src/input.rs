//! Per-session input state.
//!
//! The host feeds pointer events in, and a completed [`Gesture`] falls
//! out on pointer-up, ready for the geometry normalizer.

use kurbo::Point;

use crate::stroke::{Color, Tool};

/// A finished drawing motion: tool settings at the time of the gesture
/// plus its raw geometry. Never mutated by the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    pub tool: Tool,
    pub color: Color,
    pub width: f64,
    pub start: Point,
    pub end: Point,
    /// Raw sampled path for freehand tools; empty for shape and line
    /// gestures, which only need their endpoints.
    pub path: Vec<Point>,
}

/// Tracks the drawing state of one local participant.
#[derive(Debug, Clone)]
pub struct InputState {
    /// Currently selected tool.
    pub tool: Tool,
    pub color: Color,
    pub width: f64,
    /// Latest pointer position, tracked even when not drawing so the
    /// session can stream cursor updates.
    pub cursor: Point,
    drawing: bool,
    start: Point,
    path: Vec<Point>,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            tool: Tool::Pencil,
            color: Color::black(),
            width: 2.0,
            cursor: Point::ZERO,
            drawing: false,
            start: Point::ZERO,
            path: Vec::new(),
        }
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a gesture is in progress.
    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn set_width(&mut self, width: f64) {
        self.width = width;
    }

    /// Begin a gesture at `position`.
    pub fn pointer_down(&mut self, position: Point) {
        self.cursor = position;
        self.drawing = true;
        self.start = position;
        self.path.clear();
        if self.tool.is_freehand() {
            self.path.push(position);
        }
    }

    /// Track pointer movement, sampling the path for freehand tools.
    pub fn pointer_move(&mut self, position: Point) {
        self.cursor = position;
        if self.drawing && self.tool.is_freehand() {
            self.path.push(position);
        }
    }

    /// Finish the gesture, if one was in progress.
    pub fn pointer_up(&mut self, position: Point) -> Option<Gesture> {
        self.cursor = position;
        if !self.drawing {
            return None;
        }
        self.drawing = false;
        if self.tool.is_freehand() {
            self.path.push(position);
        }
        Some(Gesture {
            tool: self.tool,
            color: self.color,
            width: self.width,
            start: self.start,
            end: position,
            path: std::mem::take(&mut self.path),
        })
    }

    /// Abort the current gesture without producing anything, e.g. when
    /// the pointer leaves the canvas.
    pub fn cancel(&mut self) {
        self.drawing = false;
        self.path.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_up_without_down_yields_nothing() {
        let mut input = InputState::new();
        assert!(input.pointer_up(Point::new(10.0, 10.0)).is_none());
    }

    #[test]
    fn test_freehand_gesture_samples_path() {
        let mut input = InputState::new();
        input.set_tool(Tool::Pencil);

        input.pointer_down(Point::new(0.0, 0.0));
        assert!(input.is_drawing());
        input.pointer_move(Point::new(5.0, 4.0));
        input.pointer_move(Point::new(9.0, 9.0));
        let gesture = input.pointer_up(Point::new(12.0, 12.0)).unwrap();

        assert_eq!(gesture.tool, Tool::Pencil);
        assert_eq!(gesture.start, Point::new(0.0, 0.0));
        assert_eq!(gesture.end, Point::new(12.0, 12.0));
        assert_eq!(
            gesture.path,
            vec![
                Point::new(0.0, 0.0),
                Point::new(5.0, 4.0),
                Point::new(9.0, 9.0),
                Point::new(12.0, 12.0),
            ]
        );
        assert!(!input.is_drawing());
    }

    #[test]
    fn test_shape_gesture_keeps_endpoints_only() {
        let mut input = InputState::new();
        input.set_tool(Tool::Rectangle);

        input.pointer_down(Point::new(10.0, 10.0));
        input.pointer_move(Point::new(50.0, 30.0));
        let gesture = input.pointer_up(Point::new(80.0, 60.0)).unwrap();

        assert_eq!(gesture.start, Point::new(10.0, 10.0));
        assert_eq!(gesture.end, Point::new(80.0, 60.0));
        assert!(gesture.path.is_empty());
    }

    #[test]
    fn test_gesture_captures_tool_settings() {
        let mut input = InputState::new();
        input.set_tool(Tool::Line);
        input.set_color(Color::new(255, 0, 0, 255));
        input.set_width(6.0);

        input.pointer_down(Point::new(0.0, 0.0));
        let gesture = input.pointer_up(Point::new(1.0, 1.0)).unwrap();
        assert_eq!(gesture.color, Color::new(255, 0, 0, 255));
        assert!((gesture.width - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cancel_discards_gesture() {
        let mut input = InputState::new();
        input.pointer_down(Point::new(0.0, 0.0));
        input.pointer_move(Point::new(5.0, 5.0));
        input.cancel();

        assert!(!input.is_drawing());
        assert!(input.pointer_up(Point::new(9.0, 9.0)).is_none());
    }

    #[test]
    fn test_cursor_tracked_while_idle() {
        let mut input = InputState::new();
        input.pointer_move(Point::new(42.0, 17.0));
        assert_eq!(input.cursor, Point::new(42.0, 17.0));
        assert!(!input.is_drawing());
    }
}
