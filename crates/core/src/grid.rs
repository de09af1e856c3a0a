//! Grid constants and the layout engine.
//!
//! Every widget position and size is a whole multiple of [`GRID_UNIT`].
//! Pointer input is continuous; these helpers quantise it and pick default
//! geometry for newly created widgets.

use crate::geometry::{Position, Size};
use crate::widget::{Widget, WidgetKind};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Pixel quantum for all widget geometry (0.5 cm at 96 dpi).
pub const GRID_UNIT: i32 = 19;

/// Grid rows reserved for the fixed dashboard header.
pub const HEADER_ROWS: i32 = 5;

/// Vertical offset reserved for the header, in pixels.
pub const HEADER_OFFSET: i32 = HEADER_ROWS * GRID_UNIT;

/// Smallest x a resolved widget position may take.
pub const MIN_X: i32 = GRID_UNIT;

/// Smallest y a resolved widget position may take.
pub const MIN_Y: i32 = HEADER_OFFSET + GRID_UNIT;

/// Gap between auto-placed widgets.
pub const PLACEMENT_MARGIN: i32 = GRID_UNIT;

/// Minimum widget width, in grid units.
pub const MIN_WIDTH_UNITS: i32 = 6;

/// Minimum widget height, in grid units.
pub const MIN_HEIGHT_UNITS: i32 = 4;

/// Minimum widget width, in pixels.
pub const MIN_WIDTH: i32 = MIN_WIDTH_UNITS * GRID_UNIT;

/// Minimum widget height, in pixels.
pub const MIN_HEIGHT: i32 = MIN_HEIGHT_UNITS * GRID_UNIT;

/// Viewport width assumed when the host has not reported one.
pub const DEFAULT_VIEWPORT_WIDTH: i32 = 1200;

/// Largest coordinate or extent, in pixels, a stored widget may carry.
pub const MAX_EXTENT: i32 = 1 << 16;

// ---------------------------------------------------------------------------
// Snapping
// ---------------------------------------------------------------------------

/// Round half up, matching the browser's `Math.round`.
fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

/// Round a scalar to the nearest multiple of [`GRID_UNIT`].
pub fn snap_to_grid(value: f64) -> i32 {
    round_half_up(value / f64::from(GRID_UNIT)).saturating_mul(GRID_UNIT)
}

/// Like [`snap_to_grid`], but never smaller than one grid unit.
pub fn snap_size_to_grid(value: f64) -> i32 {
    snap_to_grid(value).max(GRID_UNIT)
}

/// Convert a length in grid units to pixels.
pub fn grid_to_pixels(units: i32) -> i32 {
    units * GRID_UNIT
}

/// Convert pixels to the nearest whole number of grid units.
pub fn pixels_to_grid(pixels: f64) -> i32 {
    round_half_up(pixels / f64::from(GRID_UNIT))
}

/// Enforce the minimum widget footprint and grid alignment on a size.
pub fn clamp_size(size: Size) -> Size {
    Size {
        width: snap_size_to_grid(f64::from(size.width.max(MIN_WIDTH))),
        height: snap_size_to_grid(f64::from(size.height.max(MIN_HEIGHT))),
    }
}

// ---------------------------------------------------------------------------
// Size presets
// ---------------------------------------------------------------------------

/// Named default widget footprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizePreset {
    Small,
    Medium,
    Large,
    Wide,
    Tall,
}

impl SizePreset {
    /// Width and height in grid units.
    pub fn units(self) -> (i32, i32) {
        match self {
            SizePreset::Small => (12, 8),
            SizePreset::Medium => (16, 11),
            SizePreset::Large => (20, 14),
            SizePreset::Wide => (24, 8),
            SizePreset::Tall => (12, 16),
        }
    }

    /// Footprint in pixels.
    pub fn size(self) -> Size {
        let (w, h) = self.units();
        Size::new(grid_to_pixels(w), grid_to_pixels(h))
    }
}

/// Preset used when a widget of `kind` is first created.
pub fn preset_for_type(kind: &WidgetKind) -> SizePreset {
    match kind {
        WidgetKind::Todo | WidgetKind::Text => SizePreset::Medium,
        WidgetKind::ClockWeather => SizePreset::Small,
        WidgetKind::YouTube => SizePreset::Large,
        WidgetKind::Unknown(_) => SizePreset::Medium,
    }
}

/// Default pixel size for a new widget of `kind`.
pub fn default_size_for_type(kind: &WidgetKind) -> Size {
    preset_for_type(kind).size()
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// Number of packing cells that fit across `viewport_width` (at least one).
pub fn widgets_per_row(viewport_width: i32) -> i32 {
    let cell = SizePreset::Medium.size();
    let available = viewport_width - PLACEMENT_MARGIN * 2;
    (available / (cell.width + PLACEMENT_MARGIN)).max(1)
}

/// Default position for the `index`-th widget on a dashboard.
///
/// Widgets are packed into fixed medium-sized cells, left to right and
/// top to bottom, starting just below the header.
pub fn placement_for_index(index: usize, viewport_width: i32) -> Position {
    let cell = SizePreset::Medium.size();
    let per_row = widgets_per_row(viewport_width) as usize;
    let row = (index / per_row) as i32;
    let col = (index % per_row) as i32;

    let x = PLACEMENT_MARGIN + col * (cell.width + PLACEMENT_MARGIN);
    let y = HEADER_OFFSET + PLACEMENT_MARGIN + row * (cell.height + PLACEMENT_MARGIN);

    Position {
        x: snap_to_grid(f64::from(x)),
        y: snap_to_grid(f64::from(y)).max(HEADER_OFFSET),
    }
}

/// Default position for a widget appended after `existing`.
pub fn next_placement(existing: &[Widget], viewport_width: i32) -> Position {
    placement_for_index(existing.len(), viewport_width)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
