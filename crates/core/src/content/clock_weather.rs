use serde_json::Value;

use super::{non_empty_str, unsupported, ContentEdit, ContentEditor, ContentView, ViewContext};
use crate::error::CoreError;
use crate::widget::WidgetData;

const TITLE: &str = "Clock & Weather";
const LOCATION_KEY: &str = "location";

/// Location shown until the user picks one.
pub const DEFAULT_LOCATION: &str = "Berlin";

/// 12-hour clock, e.g. `03:04:05 PM`.
const TIME_FORMAT: &str = "%I:%M:%S %p";
/// Long date, e.g. `Monday, October 19, 2026`.
const DATE_FORMAT: &str = "%A, %B %-d, %Y";

#[derive(Debug, Clone, Copy, Default)]
pub struct ClockWeatherEditor;

impl ContentEditor for ClockWeatherEditor {
    fn title(&self) -> &'static str {
        TITLE
    }

    fn view(&self, data: &WidgetData, ctx: &ViewContext) -> ContentView {
        ContentView::ClockWeather {
            location: non_empty_str(data, LOCATION_KEY)
                .unwrap_or(DEFAULT_LOCATION)
                .to_string(),
            time: ctx.now.format(TIME_FORMAT).to_string(),
            date: ctx.now.format(DATE_FORMAT).to_string(),
        }
    }

    fn apply(&self, data: &WidgetData, edit: ContentEdit) -> Result<WidgetData, CoreError> {
        match edit {
            ContentEdit::SetLocation(location) => {
                let location = location.trim();
                if location.is_empty() {
                    return Err(CoreError::Validation("Location must not be empty".into()));
                }
                let mut next = data.clone();
                next.insert(LOCATION_KEY.to_string(), Value::String(location.to_string()));
                Ok(next)
            }
            other => Err(unsupported(TITLE, &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> ViewContext {
        ViewContext {
            now: chrono::Utc.with_ymd_and_hms(2026, 10, 19, h, m, s).unwrap(),
        }
    }

    #[test]
    fn view_formats_time_and_date() {
        let view = ClockWeatherEditor.view(&WidgetData::new(), &at(15, 4, 5));
        assert_eq!(
            view,
            ContentView::ClockWeather {
                location: DEFAULT_LOCATION.into(),
                time: "03:04:05 PM".into(),
                date: "Monday, October 19, 2026".into(),
            }
        );
    }

    #[test]
    fn set_location_trims() {
        let data = ClockWeatherEditor
            .apply(&WidgetData::new(), ContentEdit::SetLocation("  Seoul ".into()))
            .unwrap();
        assert_matches!(
            ClockWeatherEditor.view(&data, &at(0, 0, 0)),
            ContentView::ClockWeather { location, .. } if location == "Seoul"
        );
    }

    #[test]
    fn blank_location_is_rejected() {
        assert_matches!(
            ClockWeatherEditor.apply(&WidgetData::new(), ContentEdit::SetLocation(" ".into())),
            Err(CoreError::Validation(_))
        );
    }
}
