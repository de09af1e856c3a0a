use serde_json::Value;

use super::{non_empty_str, unsupported, ContentEdit, ContentEditor, ContentView, ViewContext};
use crate::error::CoreError;
use crate::widget::WidgetData;

const TITLE: &str = "Text & Photos";
const TEXT_KEY: &str = "text";
const IMAGE_KEY: &str = "image";
const EMPTY_PLACEHOLDER: &str = "Click to add text...";

/// Free text with an optional image URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextEditor;

impl ContentEditor for TextEditor {
    fn title(&self) -> &'static str {
        TITLE
    }

    fn view(&self, data: &WidgetData, _ctx: &ViewContext) -> ContentView {
        let text = non_empty_str(data, TEXT_KEY).map(str::to_string);
        let image = non_empty_str(data, IMAGE_KEY).map(str::to_string);
        let placeholder = text.is_none().then_some(EMPTY_PLACEHOLDER);
        ContentView::Text {
            text,
            image,
            placeholder,
        }
    }

    fn apply(&self, data: &WidgetData, edit: ContentEdit) -> Result<WidgetData, CoreError> {
        let mut next = data.clone();
        match edit {
            ContentEdit::SetText(text) => {
                next.insert(TEXT_KEY.to_string(), Value::String(text));
            }
            ContentEdit::SetImage(Some(url)) => {
                next.insert(IMAGE_KEY.to_string(), Value::String(url.trim().to_string()));
            }
            ContentEdit::SetImage(None) => {
                next.remove(IMAGE_KEY);
            }
            other => return Err(unsupported(TITLE, &other)),
        }
        Ok(next)
    }
}
