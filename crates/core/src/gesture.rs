//! Pointer gestures that move or resize a single widget.
//!
//! A gesture holds the host's pointer capture for its whole lifetime:
//! capture is acquired in `begin` and released exactly once, on
//! `finish`, on `cancel`, or when the gesture is dropped.

use crate::collision::{clamp_to_bounds, resolve_placement};
use crate::geometry::{Point, Position, Size};
use crate::grid::{snap_size_to_grid, snap_to_grid, MIN_HEIGHT, MIN_WIDTH, MIN_Y};
use crate::widget::{Widget, WidgetId};

/// Host hook that routes all pointer input to the active gesture.
pub trait InputCapture {
    fn acquire(&mut self);
    fn release(&mut self);
}

/// How a drag maps pointer motion onto widget positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragMode {
    /// Follow the pointer pixel for pixel, kept below the header.
    Free,
    /// Snap to the grid and clamp into bounds; overlaps are allowed.
    Snapped,
    /// Snap, then move to the nearest cell free of other widgets.
    #[default]
    Resolved,
}

/// Release guard shared by both gesture kinds.
struct CaptureGuard<'a, C: InputCapture + ?Sized> {
    capture: &'a mut C,
    released: bool,
}

impl<'a, C: InputCapture + ?Sized> CaptureGuard<'a, C> {
    fn acquire(capture: &'a mut C) -> Self {
        capture.acquire();
        Self {
            capture,
            released: false,
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.capture.release();
        }
    }
}

impl<C: InputCapture + ?Sized> Drop for CaptureGuard<'_, C> {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// Drag
// ---------------------------------------------------------------------------

/// An in-progress widget move.
pub struct DragGesture<'a, C: InputCapture + ?Sized> {
    guard: CaptureGuard<'a, C>,
    widget_id: WidgetId,
    size: Size,
    start: Position,
    last: Position,
    grab_offset: Point,
    mode: DragMode,
}

impl<'a, C: InputCapture + ?Sized> DragGesture<'a, C> {
    /// Start dragging `widget` from the pointer location `pointer`.
    pub fn begin(capture: &'a mut C, widget: &Widget, pointer: Point, mode: DragMode) -> Self {
        let corner = Point::from(widget.position);
        Self {
            guard: CaptureGuard::acquire(capture),
            widget_id: widget.id.clone(),
            size: widget.size,
            start: widget.position,
            last: widget.position,
            grab_offset: Point::new(pointer.x - corner.x, pointer.y - corner.y),
            mode,
        }
    }

    pub fn widget_id(&self) -> &WidgetId {
        &self.widget_id
    }

    /// Compute the widget position for a new pointer location.
    ///
    /// `widgets` may include the dragged widget itself; it is excluded from
    /// collision checks.
    pub fn update(&mut self, pointer: Point, widgets: &[Widget]) -> Position {
        let raw = Point::new(pointer.x - self.grab_offset.x, pointer.y - self.grab_offset.y);

        self.last = match self.mode {
            DragMode::Resolved => resolve_placement(raw, self.size, widgets, Some(&self.widget_id)),
            DragMode::Snapped => clamp_to_bounds(Position::new(snap_to_grid(raw.x), snap_to_grid(raw.y))),
            DragMode::Free => Position::new(
                (raw.x.round() as i32).max(0),
                (raw.y.round() as i32).max(MIN_Y),
            ),
        };
        self.last
    }

    /// End the drag, keeping the last computed position.
    pub fn finish(mut self) -> Position {
        self.guard.release();
        self.last
    }

    /// Abort the drag; returns the position the widget started from.
    pub fn cancel(mut self) -> Position {
        self.guard.release();
        self.start
    }
}

// ---------------------------------------------------------------------------
// Resize
// ---------------------------------------------------------------------------

/// Which handle a resize was started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeEdge {
    /// Bottom-right corner: both dimensions follow the pointer.
    Corner,
    /// Right edge: width only.
    Right,
    /// Bottom edge: height only.
    Bottom,
}

/// An in-progress widget resize.
pub struct ResizeGesture<'a, C: InputCapture + ?Sized> {
    guard: CaptureGuard<'a, C>,
    edge: ResizeEdge,
    start_pointer: Point,
    start: Size,
    last: Size,
}

impl<'a, C: InputCapture + ?Sized> ResizeGesture<'a, C> {
    pub fn begin(capture: &'a mut C, widget: &Widget, pointer: Point, edge: ResizeEdge) -> Self {
        Self {
            guard: CaptureGuard::acquire(capture),
            edge,
            start_pointer: pointer,
            start: widget.size,
            last: widget.size,
        }
    }

    /// Compute the widget size for a new pointer location.
    pub fn update(&mut self, pointer: Point) -> Size {
        let start = self.start;
        let dx = pointer.x - self.start_pointer.x;
        let dy = pointer.y - self.start_pointer.y;

        let width = || snap_size_to_grid((f64::from(start.width) + dx).max(f64::from(MIN_WIDTH)));
        let height = || snap_size_to_grid((f64::from(start.height) + dy).max(f64::from(MIN_HEIGHT)));

        self.last = match self.edge {
            ResizeEdge::Corner => Size::new(width(), height()),
            ResizeEdge::Right => Size::new(width(), start.height),
            ResizeEdge::Bottom => Size::new(start.width, height()),
        };
        self.last
    }

    pub fn finish(mut self) -> Size {
        self.guard.release();
        self.last
    }

    pub fn cancel(mut self) -> Size {
        self.guard.release();
        self.start
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GRID_UNIT, MIN_X};
    use crate::widget::WidgetKind;

    #[derive(Default)]
    struct CountingCapture {
        acquired: u32,
        released: u32,
    }

    impl InputCapture for CountingCapture {
        fn acquire(&mut self) {
            self.acquired += 1;
        }

        fn release(&mut self) {
            self.released += 1;
        }
    }

    fn widget(id: &str, x: i32, y: i32) -> Widget {
        Widget::new(WidgetId::new(id), WidgetKind::Text, Position::new(x, y), Size::new(304, 209))
    }

    #[test]
    fn finish_releases_capture_once() {
        let mut capture = CountingCapture::default();
        let w = widget("a", 19, 114);
        let drag = DragGesture::begin(&mut capture, &w, Point::new(30.0, 120.0), DragMode::default());
        drag.finish();
        assert_eq!(capture.acquired, 1);
        assert_eq!(capture.released, 1);
    }

    #[test]
    fn dropping_a_gesture_releases_capture() {
        let mut capture = CountingCapture::default();
        let w = widget("a", 19, 114);
        {
            let _resize = ResizeGesture::begin(&mut capture, &w, Point::new(0.0, 0.0), ResizeEdge::Corner);
        }
        assert_eq!(capture.released, 1);
    }

    #[test]
    fn cancel_returns_start_position() {
        let mut capture = CountingCapture::default();
        let w = widget("a", 19, 114);
        let mut drag =
            DragGesture::begin(&mut capture, &w, Point::new(30.0, 120.0), DragMode::default());
        drag.update(Point::new(400.0, 500.0), &[w.clone()]);
        assert_eq!(drag.cancel(), Position::new(19, 114));
        assert_eq!(capture.released, 1);
    }

    #[test]
    fn drag_keeps_grab_offset_and_snaps() {
        let mut capture = CountingCapture::default();
        let w = widget("a", 190, 190);
        let mut drag =
            DragGesture::begin(&mut capture, &w, Point::new(200.0, 200.0), DragMode::default());
        let pos = drag.update(Point::new(240.0, 260.0), &[w.clone()]);
        // Corner follows pointer minus the 10px grab offset: (230, 250) snapped.
        assert_eq!(pos, Position::new(228, 247));
        assert_eq!(drag.finish(), pos);
    }

    #[test]
    fn drag_avoids_other_widgets() {
        let mut capture = CountingCapture::default();
        let tile = Size::new(38, 38);
        let moving = Widget::new(WidgetId::new("a"), WidgetKind::Todo, Position::new(19, 114), tile);
        let other = Widget::new(WidgetId::new("b"), WidgetKind::Todo, Position::new(399, 114), tile);
        let widgets = vec![moving.clone(), other.clone()];

        let mut drag =
            DragGesture::begin(&mut capture, &moving, Point::new(19.0, 114.0), DragMode::default());
        let pos = drag.update(Point::new(399.0, 114.0), &widgets);
        assert_eq!(pos, Position::new(361, 114));
        assert!(!crate::collision::collides_with_any(pos, moving.size, &widgets, Some(&moving.id)));
    }

    #[test]
    fn unsnapped_drag_only_clamps() {
        let mut capture = CountingCapture::default();
        let w = widget("a", 19, 114);
        let mut drag = DragGesture::begin(&mut capture, &w, Point::new(19.0, 114.0), DragMode::Free);
        assert_eq!(drag.update(Point::new(-50.0, 10.0), &[]), Position::new(0, MIN_Y));
        assert_eq!(drag.update(Point::new(203.0, 301.0), &[]), Position::new(203, 301));
    }

    #[test]
    fn snapped_drag_without_avoidance_clamps_to_bounds() {
        let mut capture = CountingCapture::default();
        let w = widget("a", 19, 114);
        let mut drag = DragGesture::begin(&mut capture, &w, Point::new(19.0, 114.0), DragMode::Snapped);
        assert_eq!(drag.update(Point::new(-50.0, 10.0), &[]), Position::new(MIN_X, MIN_Y));
    }

    #[test]
    fn snapped_drag_may_overlap_other_widgets() {
        let mut capture = CountingCapture::default();
        let moving = widget("a", 19, 114);
        let other = widget("b", 399, 114);
        let widgets = vec![moving.clone(), other.clone()];

        let mut drag = DragGesture::begin(&mut capture, &moving, Point::new(19.0, 114.0), DragMode::Snapped);
        assert_eq!(drag.update(Point::new(399.0, 114.0), &widgets), other.position);
    }

    #[test]
    fn resize_respects_minimum_footprint() {
        let mut capture = CountingCapture::default();
        let w = widget("a", 19, 114);
        let mut resize = ResizeGesture::begin(&mut capture, &w, Point::new(323.0, 323.0), ResizeEdge::Corner);
        let size = resize.update(Point::new(-1000.0, -1000.0));
        assert_eq!(size, Size::new(MIN_WIDTH, MIN_HEIGHT));
    }

    #[test]
    fn edge_resize_changes_one_axis() {
        let mut capture = CountingCapture::default();
        let w = widget("a", 19, 114);

        let mut right = ResizeGesture::begin(&mut capture, &w, Point::new(0.0, 0.0), ResizeEdge::Right);
        let size = right.update(Point::new(40.0, 500.0));
        assert_eq!(size, Size::new(342, 209));
        right.finish();

        let mut bottom = ResizeGesture::begin(&mut capture, &w, Point::new(0.0, 0.0), ResizeEdge::Bottom);
        let size = bottom.update(Point::new(500.0, GRID_UNIT as f64));
        assert_eq!(size, Size::new(304, 228));
        bottom.finish();

        assert_eq!(capture.acquired, 2);
        assert_eq!(capture.released, 2);
    }
}
