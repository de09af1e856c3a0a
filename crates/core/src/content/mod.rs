//! Per-type widget content editors.
//!
//! Each [`WidgetKind`] owns the shape of its widget's `data` payload. An
//! editor turns that payload into a renderable [`ContentView`] and applies
//! user [`ContentEdit`]s, always returning the complete merged payload so
//! unrelated keys survive.

mod clock_weather;
mod text;
mod todo;
mod youtube;

use serde::Serialize;

use crate::error::CoreError;
use crate::types::Timestamp;
use crate::widget::{Widget, WidgetData, WidgetKind, WidgetPatch};

pub use clock_weather::{ClockWeatherEditor, DEFAULT_LOCATION};
pub use text::TextEditor;
pub use todo::{TodoEditor, TodoItem};
pub use youtube::{embed_url, extract_video_id, YouTubeEditor, INVALID_URL_MESSAGE};

/// Title shown for widgets whose type is not recognised.
pub const UNKNOWN_TITLE: &str = "Widget";
pub const UNKNOWN_MESSAGE: &str = "Unknown widget type";

/// Inputs a view needs besides the payload itself.
#[derive(Debug, Clone, Copy)]
pub struct ViewContext {
    pub now: Timestamp,
}

impl ViewContext {
    pub fn now() -> Self {
        Self {
            now: chrono::Utc::now(),
        }
    }
}

/// Render-ready projection of a widget payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentView {
    Todo {
        items: Vec<TodoItem>,
        completed: usize,
        total: usize,
        placeholder: Option<&'static str>,
    },
    Text {
        text: Option<String>,
        image: Option<String>,
        placeholder: Option<&'static str>,
    },
    ClockWeather {
        location: String,
        time: String,
        date: String,
    },
    #[serde(rename = "youtube")]
    YouTube {
        video_id: Option<String>,
        embed_url: Option<String>,
    },
    Unknown {
        message: &'static str,
    },
}

/// A user edit against a widget payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentEdit {
    AddTodo(String),
    ToggleTodo(String),
    RemoveTodo(String),
    SetText(String),
    SetImage(Option<String>),
    SetLocation(String),
    SetVideoUrl(String),
    ClearVideo,
}

/// Uniform contract implemented by every content editor.
pub trait ContentEditor: Send + Sync {
    fn title(&self) -> &'static str;

    fn view(&self, data: &WidgetData, ctx: &ViewContext) -> ContentView;

    /// Apply `edit` and return the full new payload.
    fn apply(&self, data: &WidgetData, edit: ContentEdit) -> Result<WidgetData, CoreError>;
}

/// Editor for widgets with an unrecognised type tag. Read-only.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownEditor;

impl ContentEditor for UnknownEditor {
    fn title(&self) -> &'static str {
        UNKNOWN_TITLE
    }

    fn view(&self, _data: &WidgetData, _ctx: &ViewContext) -> ContentView {
        ContentView::Unknown {
            message: UNKNOWN_MESSAGE,
        }
    }

    fn apply(&self, _data: &WidgetData, edit: ContentEdit) -> Result<WidgetData, CoreError> {
        Err(unsupported(UNKNOWN_TITLE, &edit))
    }
}

/// Look up the editor for a widget type.
pub fn editor_for(kind: &WidgetKind) -> &'static dyn ContentEditor {
    match kind {
        WidgetKind::Todo => &TodoEditor,
        WidgetKind::Text => &TextEditor,
        WidgetKind::ClockWeather => &ClockWeatherEditor,
        WidgetKind::YouTube => &YouTubeEditor,
        WidgetKind::Unknown(_) => &UnknownEditor,
    }
}

/// Apply `edit` to `widget`'s payload and wrap the result as a patch.
pub fn edit_widget(widget: &Widget, edit: ContentEdit) -> Result<WidgetPatch, CoreError> {
    let data = editor_for(&widget.kind).apply(&widget.data, edit)?;
    Ok(WidgetPatch::data(data))
}

fn unsupported(title: &str, edit: &ContentEdit) -> CoreError {
    CoreError::Validation(format!("{title} does not support {edit:?}"))
}

/// Read an optional string field, treating blanks as absent.
fn non_empty_str<'a>(data: &'a WidgetData, key: &str) -> Option<&'a str> {
    data.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Position, Size};
    use crate::widget::WidgetId;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn titles_follow_kind() {
        assert_eq!(editor_for(&WidgetKind::Todo).title(), "TODO List");
        assert_eq!(editor_for(&WidgetKind::Text).title(), "Text & Photos");
        assert_eq!(editor_for(&WidgetKind::ClockWeather).title(), "Clock & Weather");
        assert_eq!(editor_for(&WidgetKind::YouTube).title(), "YouTube Player");
        assert_eq!(editor_for(&WidgetKind::Unknown("calendar".into())).title(), "Widget");
    }

    #[test]
    fn unknown_kind_renders_placeholder_and_rejects_edits() {
        let editor = editor_for(&WidgetKind::Unknown("calendar".into()));
        let data = WidgetData::new();
        assert_eq!(
            editor.view(&data, &ViewContext::now()),
            ContentView::Unknown {
                message: UNKNOWN_MESSAGE
            }
        );
        assert_matches!(
            editor.apply(&data, ContentEdit::SetText("x".into())),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn mismatched_edit_is_rejected() {
        let editor = editor_for(&WidgetKind::Todo);
        assert_matches!(
            editor.apply(&WidgetData::new(), ContentEdit::ClearVideo),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn edit_widget_produces_data_patch() {
        let mut widget = Widget::new(
            WidgetId::new("w1"),
            WidgetKind::Text,
            Position::new(19, 114),
            Size::new(304, 209),
        );
        widget.data.insert("keep".into(), json!(1));

        let patch = edit_widget(&widget, ContentEdit::SetText("hi".into())).unwrap();
        let data = patch.data.unwrap();
        assert_eq!(data["text"], "hi");
        assert_eq!(data["keep"], 1);
        assert!(patch.position.is_none());
    }

    #[test]
    fn views_serialize_with_kind_tag() {
        let view = editor_for(&WidgetKind::YouTube).view(&WidgetData::new(), &ViewContext::now());
        let json = serde_json::to_value(view).unwrap();
        assert_eq!(json["kind"], "youtube");
    }
}
