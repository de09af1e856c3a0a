//! Collision detection and nearest-free-cell placement.
//!
//! [`resolve_placement`] is called on every pointer move while a widget
//! is dragged, so the search is bounded: it inspects at most
//! [`SEARCH_RADIUS`] rings of grid cells and otherwise falls back to the
//! snapped (possibly overlapping) position.

use std::collections::HashSet;

use crate::geometry::{Point, Position, Rect, Size};
use crate::grid::{snap_to_grid, GRID_UNIT, MIN_X, MIN_Y};
use crate::widget::{Widget, WidgetId};

/// Number of grid-unit rings examined around the desired cell.
pub const SEARCH_RADIUS: i32 = 10;

/// `true` when the two rectangles share positive area.
///
/// Rectangles that only touch along an edge do not overlap.
pub fn rectangles_overlap(a: Rect, b: Rect) -> bool {
    !(a.right() <= b.left()
        || b.right() <= a.left()
        || a.bottom() <= b.top()
        || b.bottom() <= a.top())
}

/// `true` if a rectangle at `candidate` overlaps any widget other than
/// the one identified by `exclude`.
pub fn collides_with_any(
    candidate: Position,
    size: Size,
    widgets: &[Widget],
    exclude: Option<&WidgetId>,
) -> bool {
    let rect = Rect::new(candidate, size);
    widgets
        .iter()
        .filter(|w| Some(&w.id) != exclude)
        .any(|w| rectangles_overlap(rect, w.rect()))
}

/// Clamp a position into the placeable area below the header.
pub fn clamp_to_bounds(position: Position) -> Position {
    Position {
        x: position.x.max(MIN_X),
        y: position.y.max(MIN_Y),
    }
}

fn in_bounds(position: Position) -> bool {
    position.x >= MIN_X && position.y >= MIN_Y
}

/// Find a grid-aligned position near `desired` that overlaps nothing.
///
/// Cells on each ring are visited with `dx` in the outer loop and `dy` in
/// the inner loop, both ascending; the first free cell wins. When every
/// cell within [`SEARCH_RADIUS`] is occupied the snapped position is
/// returned even though it overlaps.
pub fn resolve_placement(
    desired: Point,
    size: Size,
    widgets: &[Widget],
    exclude: Option<&WidgetId>,
) -> Position {
    let origin = clamp_to_bounds(Position::new(
        snap_to_grid(desired.x),
        snap_to_grid(desired.y),
    ));

    if !collides_with_any(origin, size, widgets, exclude) {
        return origin;
    }

    for radius in 1..=SEARCH_RADIUS {
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                if dx.abs() != radius && dy.abs() != radius {
                    continue;
                }

                let candidate = origin.offset(dx * GRID_UNIT, dy * GRID_UNIT);
                if !in_bounds(candidate) {
                    continue;
                }

                if !collides_with_any(candidate, size, widgets, exclude) {
                    return candidate;
                }
            }
        }
    }

    tracing::debug!(
        x = origin.x,
        y = origin.y,
        radius = SEARCH_RADIUS,
        "No free cell within search radius, keeping overlapping position"
    );
    origin
}

/// Every grid cell (in grid units) covered by at least one widget.
pub fn occupied_cells(widgets: &[Widget]) -> HashSet<(i32, i32)> {
    let mut occupied = HashSet::new();

    for widget in widgets {
        let rect = widget.rect();
        let start_x = rect.left().div_euclid(GRID_UNIT);
        let start_y = rect.top().div_euclid(GRID_UNIT);
        let end_x = rect.right().div_euclid(GRID_UNIT);
        let end_y = rect.bottom().div_euclid(GRID_UNIT);

        for x in start_x..end_x {
            for y in start_y..end_y {
                occupied.insert((x, y));
            }
        }
    }

    occupied
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
