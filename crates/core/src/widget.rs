//! Widget model: identity, type tag, geometry, and opaque content payload.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::geometry::{Position, Rect, Size};

/// Prefix carried by client-generated widget ids until the store assigns
/// a permanent one.
pub const TEMPORARY_ID_PREFIX: &str = "widget-";

/// Opaque, type-dependent widget content. Its shape is owned by the
/// content editor for the widget's [`WidgetKind`].
pub type WidgetData = serde_json::Map<String, serde_json::Value>;

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Build a `<prefix><unix-millis>-<seq>` identifier.
///
/// The sequence number keeps ids unique when several are minted within
/// the same millisecond.
pub(crate) fn timestamp_id(prefix: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}{millis}-{seq}")
}

// ---------------------------------------------------------------------------
// WidgetId
// ---------------------------------------------------------------------------

/// Widget identifier, unique within a dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(String);

impl WidgetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh temporary id for a widget that has not been persisted.
    pub fn temporary() -> Self {
        Self(timestamp_id(TEMPORARY_ID_PREFIX))
    }

    /// `true` until the widget has been replaced by its store-assigned id.
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMPORARY_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for WidgetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for WidgetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// WidgetKind
// ---------------------------------------------------------------------------

/// Widget type tags as stored in the `widgets` collection.
pub mod kind_tags {
    pub const TODO: &str = "todo";
    pub const TEXT: &str = "text";
    pub const CLOCK_WEATHER: &str = "clock-weather";
    pub const YOUTUBE: &str = "youtube";

    /// All recognised widget type tags.
    pub const ALL: &[&str] = &[TODO, TEXT, CLOCK_WEATHER, YOUTUBE];
}

/// The closed set of widget types.
///
/// `Unknown` keeps whatever tag a remote record carried so that it can be
/// written back untouched; it is never produced by local creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WidgetKind {
    Todo,
    Text,
    ClockWeather,
    YouTube,
    Unknown(String),
}

impl WidgetKind {
    /// The four types a user can add.
    pub const CREATABLE: [WidgetKind; 4] = [
        WidgetKind::Todo,
        WidgetKind::Text,
        WidgetKind::ClockWeather,
        WidgetKind::YouTube,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            WidgetKind::Todo => kind_tags::TODO,
            WidgetKind::Text => kind_tags::TEXT,
            WidgetKind::ClockWeather => kind_tags::CLOCK_WEATHER,
            WidgetKind::YouTube => kind_tags::YOUTUBE,
            WidgetKind::Unknown(tag) => tag,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, WidgetKind::Unknown(_))
    }
}

impl From<&str> for WidgetKind {
    fn from(tag: &str) -> Self {
        match tag {
            kind_tags::TODO => WidgetKind::Todo,
            kind_tags::TEXT => WidgetKind::Text,
            kind_tags::CLOCK_WEATHER => WidgetKind::ClockWeather,
            kind_tags::YOUTUBE => WidgetKind::YouTube,
            other => WidgetKind::Unknown(other.to_string()),
        }
    }
}

impl From<String> for WidgetKind {
    fn from(tag: String) -> Self {
        WidgetKind::from(tag.as_str())
    }
}

impl From<WidgetKind> for String {
    fn from(kind: WidgetKind) -> Self {
        match kind {
            WidgetKind::Unknown(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Widget
// ---------------------------------------------------------------------------

/// One placed item on a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: WidgetId,
    #[serde(rename = "type")]
    pub kind: WidgetKind,
    pub position: Position,
    pub size: Size,
    #[serde(default)]
    pub data: WidgetData,
    #[serde(default)]
    pub collapsed: bool,
}

impl Widget {
    /// A freshly created widget with an empty payload.
    pub fn new(id: WidgetId, kind: WidgetKind, position: Position, size: Size) -> Self {
        Self {
            id,
            kind,
            position,
            size,
            data: WidgetData::new(),
            collapsed: false,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.position, self.size)
    }

    /// Shallow-merge a partial change into this widget.
    ///
    /// A present `data` replaces the whole payload; editors are expected
    /// to hand over the complete merged payload.
    pub fn apply(&mut self, patch: &WidgetPatch) {
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(size) = patch.size {
            self.size = size;
        }
        if let Some(data) = &patch.data {
            self.data = data.clone();
        }
        if let Some(collapsed) = patch.collapsed {
            self.collapsed = collapsed;
        }
    }
}

/// Partial change applied through the dashboard controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetPatch {
    pub position: Option<Position>,
    pub size: Option<Size>,
    pub data: Option<WidgetData>,
    pub collapsed: Option<bool>,
}

impl WidgetPatch {
    pub fn position(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn size(size: Size) -> Self {
        Self {
            size: Some(size),
            ..Default::default()
        }
    }

    pub fn data(data: WidgetData) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn collapsed(collapsed: bool) -> Self {
        Self {
            collapsed: Some(collapsed),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none()
            && self.size.is_none()
            && self.data.is_none()
            && self.collapsed.is_none()
    }
}
