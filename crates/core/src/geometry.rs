//! Pixel-space geometry primitives used by the layout engine.
//!
//! Widget coordinates are integer pixels. Pointer coordinates arrive as
//! floating point values and are converted through the grid snapping
//! helpers in [`crate::grid`].

use serde::{Deserialize, Serialize};

/// A continuous pointer location in dashboard coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Top-left corner of a widget, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset by whole pixels in both axes.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

impl From<Position> for Point {
    fn from(p: Position) -> Self {
        Point::new(f64::from(p.x), f64::from(p.y))
    }
}

/// Width and height of a widget, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned bounding box of a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub position: Position,
    pub size: Size,
}

impl Rect {
    pub fn new(position: Position, size: Size) -> Self {
        Self { position, size }
    }

    pub fn left(&self) -> i32 {
        self.position.x
    }

    pub fn top(&self) -> i32 {
        self.position.y
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.position.x.saturating_add(self.size.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.position.y.saturating_add(self.size.height)
    }
}
