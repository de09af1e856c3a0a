//! Generic store record and its change events.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use pinboard_core::types::{RecordId, Timestamp};

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A row of any collection: store-managed metadata plus free-form fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,

    #[serde(
        rename = "collectionName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub collection_name: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<Timestamp>,

    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated: Option<Timestamp>,

    /// Every other column, keyed by field name.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            collection_name: None,
            created: None,
            updated: None,
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// String field; `None` when absent or not a string.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Integer field, accepting floats (rounded) as well.
    pub fn i32_field(&self, name: &str) -> Option<i32> {
        let value = self.field(name)?;
        if let Some(i) = value.as_i64() {
            return i32::try_from(i).ok();
        }
        value.as_f64().map(|f| f.round() as i32)
    }

    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.field(name).and_then(Value::as_bool)
    }
}

/// Accept RFC 3339 with either `T` or a space separator; anything else
/// (including the empty string) is treated as missing.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse::<Timestamp>().ok()))
}

// ---------------------------------------------------------------------------
// RecordEvent
// ---------------------------------------------------------------------------

/// Kind of change a realtime event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordAction {
    Create,
    Update,
    Delete,
}

impl RecordAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordAction::Create => "create",
            RecordAction::Update => "update",
            RecordAction::Delete => "delete",
        }
    }

    /// Parse a wire action name; unknown names yield `None`.
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "create" => Some(RecordAction::Create),
            "update" => Some(RecordAction::Update),
            "delete" => Some(RecordAction::Delete),
            _ => None,
        }
    }
}

/// A single create, update or delete observed on a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEvent {
    pub action: RecordAction,
    pub record: Record,
}

impl RecordEvent {
    pub fn new(action: RecordAction, record: Record) -> Self {
        Self { action, record }
    }
}
