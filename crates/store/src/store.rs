//! The backend-agnostic record store contract.

use async_trait::async_trait;
use serde_json::{Map, Value};

use pinboard_events::Record;

use crate::error::StoreError;
use crate::subscription::Subscription;

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Conjunction of field-equality clauses.
///
/// Renders to the store's filter syntax (`dashboard = "abc"`) and can be
/// evaluated locally against records received over realtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<(String, String)>,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::default().and_eq(field, value)
    }

    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Filter expression for the `filter` query parameter.
    pub fn to_query(&self) -> String {
        self.clauses
            .iter()
            .map(|(field, value)| format!("{field} = \"{}\"", escape(value)))
            .collect::<Vec<_>>()
            .join(" && ")
    }

    /// `true` if `record` satisfies every clause.
    pub fn matches(&self, record: &Record) -> bool {
        self.clauses.iter().all(|(field, expected)| {
            if field == "id" {
                return &record.id == expected;
            }
            match record.field(field) {
                Some(Value::String(s)) => s == expected,
                Some(Value::Bool(b)) => b.to_string() == *expected,
                Some(Value::Number(n)) => n.to_string() == *expected,
                _ => false,
            }
        })
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// ListQuery
// ---------------------------------------------------------------------------

/// Parameters for listing a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub filter: Option<Filter>,
    /// Comma-separated sort keys, `-` prefix for descending (`-updated`).
    pub sort: Option<String>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }
}

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

/// Remote (or in-process) collection store with realtime change feeds.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_one(&self, collection: &str, id: &str) -> Result<Record, StoreError>;

    /// Every record matching `query`, across all pages.
    async fn fetch_all(&self, collection: &str, query: &ListQuery)
        -> Result<Vec<Record>, StoreError>;

    async fn create(&self, collection: &str, fields: Map<String, Value>)
        -> Result<Record, StoreError>;

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Record, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Open a change feed for `collection`, optionally narrowed by `filter`.
    ///
    /// Events flow until the returned [`Subscription`] is dropped or
    /// unsubscribed.
    async fn subscribe(
        &self,
        collection: &str,
        filter: Option<Filter>,
    ) -> Result<Subscription, StoreError>;
}
