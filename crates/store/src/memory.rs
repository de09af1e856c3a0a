//! In-process [`RecordStore`] for tests and offline use.
//!
//! Mirrors the remote store's contract: server-assigned ids, timestamps,
//! equality filters, sort keys, and change events delivered to
//! subscribers through an [`EventBus`].

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use serde_json::{Map, Value};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use pinboard_events::{EventBus, Record, RecordAction, RecordEvent, StoreEvent};

use crate::error::StoreError;
use crate::store::{Filter, ListQuery, RecordStore};
use crate::subscription::Subscription;

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_LEN: usize = 15;

/// Columns the store manages itself; ignored in client payloads.
const RESERVED_FIELDS: &[&str] = &["id", "created", "updated", "collectionName", "collectionId"];

fn new_record_id() -> String {
    let mut rng = rand::rng();
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

fn strip_reserved(mut fields: Map<String, Value>) -> Map<String, Value> {
    for key in RESERVED_FIELDS {
        fields.remove(*key);
    }
    fields
}

/// In-memory record store.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Record>>>,
    bus: Arc<EventBus>,
    failures: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` CRUD calls fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self, n: u32) {
        self.failures.store(n, AtomicOrdering::SeqCst);
    }

    /// Snapshot of a collection in insertion order.
    pub async fn records(&self, collection: &str) -> Vec<Record> {
        self.collections
            .lock()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    // ---- private helpers ----

    fn check_failure(&self, op: &str) -> Result<(), StoreError> {
        let injected = self
            .failures
            .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            tracing::debug!(op, "Injected store failure");
            return Err(StoreError::Unavailable(format!("injected failure on {op}")));
        }
        Ok(())
    }

    fn publish(&self, collection: &str, action: RecordAction, record: &Record) {
        self.bus.publish(StoreEvent::new(
            collection,
            RecordEvent::new(action, record.clone()),
        ));
    }

    fn not_found(collection: &str, id: &str) -> StoreError {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_one(&self, collection: &str, id: &str) -> Result<Record, StoreError> {
        self.check_failure("fetch_one")?;
        self.collections
            .lock()
            .await
            .get(collection)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned()
            .ok_or_else(|| Self::not_found(collection, id))
    }

    async fn fetch_all(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> Result<Vec<Record>, StoreError> {
        self.check_failure("fetch_all")?;
        let mut records: Vec<Record> = self
            .records(collection)
            .await
            .into_iter()
            .filter(|r| query.filter.as_ref().map_or(true, |f| f.matches(r)))
            .collect();

        if let Some(sort) = &query.sort {
            sort_records(&mut records, sort);
        }
        Ok(records)
    }

    async fn create(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<Record, StoreError> {
        self.check_failure("create")?;
        let now = chrono::Utc::now();
        let record = Record {
            id: new_record_id(),
            collection_name: Some(collection.to_string()),
            created: Some(now),
            updated: Some(now),
            fields: strip_reserved(fields),
        };

        self.collections
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());

        self.publish(collection, RecordAction::Create, &record);
        Ok(record)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Record, StoreError> {
        self.check_failure("update")?;
        let record = {
            let mut collections = self.collections.lock().await;
            let record = collections
                .get_mut(collection)
                .and_then(|records| records.iter_mut().find(|r| r.id == id))
                .ok_or_else(|| Self::not_found(collection, id))?;
            record.fields.extend(strip_reserved(fields));
            record.updated = Some(chrono::Utc::now());
            record.clone()
        };

        self.publish(collection, RecordAction::Update, &record);
        Ok(record)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check_failure("delete")?;
        let record = {
            let mut collections = self.collections.lock().await;
            let records = collections
                .get_mut(collection)
                .ok_or_else(|| Self::not_found(collection, id))?;
            let index = records
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| Self::not_found(collection, id))?;
            records.remove(index)
        };

        self.publish(collection, RecordAction::Delete, &record);
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &str,
        filter: Option<Filter>,
    ) -> Result<Subscription, StoreError> {
        let cancel = CancellationToken::new();
        let (tx, subscription) = Subscription::channel(cancel.clone());
        let mut rx = self.bus.subscribe();
        let collection = collection.to_string();

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = rx.recv() => received,
                };

                match received {
                    Ok(event) => {
                        if event.collection != collection {
                            continue;
                        }
                        if filter.as_ref().is_some_and(|f| !f.matches(&event.event.record)) {
                            continue;
                        }
                        if tx.send(event.event).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(collection = %collection, skipped, "Subscription lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!(collection = %collection, "Memory subscription closed");
        });

        Ok(subscription)
    }
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Sort by comma-separated keys; `-key` sorts descending. Stable, so ties
/// keep insertion order.
fn sort_records(records: &mut [Record], sort: &str) {
    let keys: Vec<(&str, bool)> = sort
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| match k.strip_prefix('-') {
            Some(name) => (name, true),
            None => (k.strip_prefix('+').unwrap_or(k), false),
        })
        .collect();

    records.sort_by(|a, b| {
        for (key, descending) in &keys {
            let ordering = compare_by_key(a, b, key);
            let ordering = if *descending { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn compare_by_key(a: &Record, b: &Record, key: &str) -> Ordering {
    match key {
        "id" => a.id.cmp(&b.id),
        "created" => a.created.cmp(&b.created),
        "updated" => a.updated.cmp(&b.updated),
        field => compare_values(a.field(field), b.field(field)),
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        map
    }

    #[test]
    fn ids_are_fifteen_lowercase_alphanumerics() {
        let id = new_record_id();
        assert_eq!(id.len(), ID_LEN);
        assert!(id.bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[tokio::test]
    async fn create_assigns_id_and_timestamps() {
        let store = MemoryStore::new();
        let record = store
            .create("widgets", fields(json!({"id": "client-id", "dashboard": "d1"})))
            .await
            .unwrap();
        assert_ne!(record.id, "client-id");
        assert!(record.created.is_some());
        assert_eq!(record.str_field("dashboard"), Some("d1"));
        assert!(record.field("id").is_none());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = MemoryStore::new();
        let created = store
            .create("widgets", fields(json!({"dashboard": "d1", "collapsed": false})))
            .await
            .unwrap();
        let updated = store
            .update("widgets", &created.id, fields(json!({"collapsed": true})))
            .await
            .unwrap();
        assert_eq!(updated.bool_field("collapsed"), Some(true));
        assert_eq!(updated.str_field("dashboard"), Some("d1"));
    }

    #[tokio::test]
    async fn missing_records_are_not_found() {
        let store = MemoryStore::new();
        assert_matches!(store.fetch_one("widgets", "nope").await, Err(StoreError::NotFound { .. }));
        assert_matches!(
            store.update("widgets", "nope", Map::new()).await,
            Err(StoreError::NotFound { .. })
        );
        assert_matches!(store.delete("widgets", "nope").await, Err(StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn fetch_all_filters_and_sorts() {
        let store = MemoryStore::new();
        for (dashboard, name) in [("d1", "b"), ("d2", "x"), ("d1", "a")] {
            store
                .create("widgets", fields(json!({"dashboard": dashboard, "name": name})))
                .await
                .unwrap();
        }

        let query = ListQuery::new().filter(Filter::eq("dashboard", "d1")).sort("name");
        let names: Vec<_> = store
            .fetch_all("widgets", &query)
            .await
            .unwrap()
            .iter()
            .map(|r| r.str_field("name").unwrap_or_default().to_string())
            .collect();
        assert_eq!(names, ["a", "b"]);

        let query = ListQuery::new().sort("-name");
        let first = store.fetch_all("widgets", &query).await.unwrap();
        assert_eq!(first[0].str_field("name"), Some("x"));
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let store = MemoryStore::new();
        store.fail_next(1);
        assert_matches!(
            store.create("widgets", Map::new()).await,
            Err(StoreError::Unavailable(_))
        );
        assert!(store.create("widgets", Map::new()).await.is_ok());
        assert_eq!(store.count("widgets").await, 1);
    }

    #[tokio::test]
    async fn subscription_receives_matching_changes_only() {
        let store = MemoryStore::new();
        let mut sub = store
            .subscribe("widgets", Some(Filter::eq("dashboard", "d1")))
            .await
            .unwrap();

        store.create("widgets", fields(json!({"dashboard": "d2"}))).await.unwrap();
        store.create("dashboards", fields(json!({"dashboard": "d1"}))).await.unwrap();
        let mine = store.create("widgets", fields(json!({"dashboard": "d1"}))).await.unwrap();
        store.delete("widgets", &mine.id).await.unwrap();

        let first = sub.next().await.unwrap();
        assert_eq!(first.action, RecordAction::Create);
        assert_eq!(first.record.id, mine.id);
        let second = sub.next().await.unwrap();
        assert_eq!(second.action, RecordAction::Delete);
        assert_eq!(second.record.id, mine.id);
    }

    #[tokio::test]
    async fn dropped_subscription_stops_delivery() {
        let store = MemoryStore::new();
        let sub = store.subscribe("widgets", None).await.unwrap();
        assert_eq!(store.bus.subscriber_count(), 1);
        drop(sub);

        for _ in 0..50 {
            if store.bus.subscriber_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(store.bus.subscriber_count(), 0);
    }
}
