//! Collection names and record shapes for dashboards and widgets.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use pinboard_core::dashboard::{Dashboard, DashboardChanges, NewDashboard};
use pinboard_core::geometry::{Position, Size};
use pinboard_core::grid::MAX_EXTENT;
use pinboard_core::widget::{Widget, WidgetData, WidgetId, WidgetKind};
use pinboard_events::Record;

use crate::error::StoreError;

pub const DASHBOARDS: &str = "dashboards";
pub const WIDGETS: &str = "widgets";

/// Field linking a widget record to its dashboard.
pub const DASHBOARD_FIELD: &str = "dashboard";
/// Field linking a dashboard record to its owner.
pub const OWNER_FIELD: &str = "user";

fn to_fields<T: Serialize>(value: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Decode(serde::de::Error::custom(format!(
            "expected an object, got {other}"
        )))),
    }
}

fn from_fields<T: for<'de> Deserialize<'de>>(record: &Record) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(record.fields.clone()))?)
}

// ---------------------------------------------------------------------------
// Widgets
// ---------------------------------------------------------------------------

/// Flat column layout of the `widgets` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetRecord {
    pub dashboard: String,
    #[serde(rename = "type")]
    pub kind: WidgetKind,
    #[serde(deserialize_with = "rounded_i32")]
    pub position_x: i32,
    #[serde(deserialize_with = "rounded_i32")]
    pub position_y: i32,
    #[serde(deserialize_with = "rounded_i32")]
    pub size_width: i32,
    #[serde(deserialize_with = "rounded_i32")]
    pub size_height: i32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: WidgetData,
    #[serde(default, deserialize_with = "null_as_false")]
    pub collapsed: bool,
}

impl WidgetRecord {
    pub fn from_widget(dashboard_id: &str, widget: &Widget) -> Self {
        Self {
            dashboard: dashboard_id.to_string(),
            kind: widget.kind.clone(),
            position_x: widget.position.x,
            position_y: widget.position.y,
            size_width: widget.size.width,
            size_height: widget.size.height,
            data: widget.data.clone(),
            collapsed: widget.collapsed,
        }
    }

    /// Decode the columns of `record`, rejecting geometry outside
    /// `-MAX_EXTENT..=MAX_EXTENT` and non-positive sizes.
    pub fn from_record(record: &Record) -> Result<Self, StoreError> {
        let row: Self = from_fields(record)?;
        row.check_geometry()?;
        Ok(row)
    }

    fn check_geometry(&self) -> Result<(), StoreError> {
        let columns = [
            ("position_x", self.position_x, -MAX_EXTENT),
            ("position_y", self.position_y, -MAX_EXTENT),
            ("size_width", self.size_width, 1),
            ("size_height", self.size_height, 1),
        ];
        for (column, value, min) in columns {
            if !(min..=MAX_EXTENT).contains(&value) {
                return Err(StoreError::Decode(serde::de::Error::custom(format!(
                    "{column} out of range: {value}"
                ))));
            }
        }
        Ok(())
    }

    pub fn into_widget(self, id: impl Into<WidgetId>) -> Widget {
        Widget {
            id: id.into(),
            kind: self.kind,
            position: Position::new(self.position_x, self.position_y),
            size: Size::new(self.size_width, self.size_height),
            data: self.data,
            collapsed: self.collapsed,
        }
    }

    pub fn to_fields(&self) -> Result<Map<String, Value>, StoreError> {
        to_fields(self)
    }
}

/// Decode a widget from a `widgets` record.
pub fn widget_from_record(record: &Record) -> Result<Widget, StoreError> {
    Ok(WidgetRecord::from_record(record)?.into_widget(record.id.as_str()))
}

/// Columns for creating or fully updating a widget.
pub fn widget_fields(dashboard_id: &str, widget: &Widget) -> Result<Map<String, Value>, StoreError> {
    WidgetRecord::from_widget(dashboard_id, widget).to_fields()
}

// ---------------------------------------------------------------------------
// Dashboards
// ---------------------------------------------------------------------------

/// Column layout of the `dashboards` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRecord {
    pub user: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty_string")]
    pub background: String,
}

impl DashboardRecord {
    pub fn from_record(record: &Record) -> Result<Self, StoreError> {
        from_fields(record)
    }
}

pub fn dashboard_from_record(record: &Record) -> Result<Dashboard, StoreError> {
    let row = DashboardRecord::from_record(record)?;
    Ok(Dashboard {
        id: record.id.clone(),
        owner: row.user,
        name: row.name,
        background: row.background,
        created: record.created,
        updated: record.updated,
    })
}

pub fn new_dashboard_fields(input: &NewDashboard) -> Result<Map<String, Value>, StoreError> {
    to_fields(&DashboardRecord {
        user: input.owner.clone(),
        name: input.name.clone(),
        background: input.background().to_string(),
    })
}

/// Only the columns present in `changes`.
pub fn dashboard_change_fields(changes: &DashboardChanges) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Some(name) = &changes.name {
        fields.insert("name".into(), Value::String(name.clone()));
    }
    if let Some(background) = &changes.background {
        fields.insert("background".into(), Value::String(background.clone()));
    }
    fields
}

// ---------------------------------------------------------------------------
// Lenient decoders
// ---------------------------------------------------------------------------

fn rounded_i32<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Number::deserialize(deserializer)?;
    if let Some(i) = value.as_i64() {
        return i32::try_from(i).map_err(serde::de::Error::custom);
    }
    value
        .as_f64()
        .map(|f| f.round() as i32)
        .ok_or_else(|| serde::de::Error::custom("number out of range"))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<WidgetData, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<WidgetData>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_empty_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
