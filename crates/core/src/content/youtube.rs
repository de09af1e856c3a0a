use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::{non_empty_str, unsupported, ContentEdit, ContentEditor, ContentView, ViewContext};
use crate::error::CoreError;
use crate::widget::WidgetData;

const TITLE: &str = "YouTube Player";
const URL_KEY: &str = "youtubeUrl";
const EMBED_BASE: &str = "https://www.youtube.com/embed/";

pub const INVALID_URL_MESSAGE: &str = "Please enter a valid YouTube URL";

/// Matches `youtube.com/watch?v=<id>` and `youtu.be/<id>`.
const VIDEO_ID_PATTERN: &str = r"(?:youtube\.com/watch\?v=|youtu\.be/)([^&\n?#]+)";

static VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(VIDEO_ID_PATTERN).expect("valid regex"));

/// Extract the video id from a watch or short link.
pub fn extract_video_id(url: &str) -> Option<&str> {
    VIDEO_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn embed_url(video_id: &str) -> String {
    format!("{EMBED_BASE}{video_id}")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YouTubeEditor;

impl ContentEditor for YouTubeEditor {
    fn title(&self) -> &'static str {
        TITLE
    }

    fn view(&self, data: &WidgetData, _ctx: &ViewContext) -> ContentView {
        let video_id = non_empty_str(data, URL_KEY).and_then(extract_video_id);
        ContentView::YouTube {
            embed_url: video_id.map(embed_url),
            video_id: video_id.map(str::to_string),
        }
    }

    fn apply(&self, data: &WidgetData, edit: ContentEdit) -> Result<WidgetData, CoreError> {
        let url = match edit {
            ContentEdit::SetVideoUrl(url) => {
                let url = url.trim();
                if extract_video_id(url).is_none() {
                    return Err(CoreError::Validation(INVALID_URL_MESSAGE.into()));
                }
                url.to_string()
            }
            ContentEdit::ClearVideo => String::new(),
            other => return Err(unsupported(TITLE, &other)),
        };

        let mut next = data.clone();
        next.insert(URL_KEY.to_string(), Value::String(url));
        Ok(next)
    }
}
