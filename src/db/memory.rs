// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory document store for tests and offline mode.
//!
//! Mirrors Firestore semantics that the admin services rely on: deleting a
//! document leaves its sub-collections in place, `update` requires the
//! document to exist, and batches are atomic up to [`MAX_BATCH_OPS`].

use crate::db::store::{
    CollectionPath, Direction, Document, DocumentStore, Fields, FilterOp, Query, StoreError,
    StoreResult, WriteBatch, WriteOp, MAX_BATCH_OPS,
};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex;

type Collection = BTreeMap<String, Fields>;

/// Document store backed by process memory.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, Collection>,
    /// Document paths whose writes fail (test fault injection).
    failing_paths: Mutex<HashSet<String>>,
    commits: AtomicUsize,
    largest_commit: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write touching `doc_path` fail until [`clear_failures`](Self::clear_failures).
    pub fn fail_writes_to(&self, doc_path: impl Into<String>) {
        if let Ok(mut paths) = self.failing_paths.lock() {
            paths.insert(doc_path.into());
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut paths) = self.failing_paths.lock() {
            paths.clear();
        }
    }

    /// Number of batches committed so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(AtomicOrdering::SeqCst)
    }

    /// Operation count of the largest batch committed so far.
    pub fn largest_commit(&self) -> usize {
        self.largest_commit.load(AtomicOrdering::SeqCst)
    }

    /// Number of documents currently stored in a collection.
    pub fn count(&self, collection: &CollectionPath) -> usize {
        self.collections
            .get(&collection.to_string())
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    fn check_writable(&self, doc_path: &str) -> StoreResult<()> {
        let failing = self
            .failing_paths
            .lock()
            .map(|paths| paths.contains(doc_path))
            .unwrap_or(false);
        if failing {
            return Err(StoreError::Backend(format!(
                "Injected write failure for {}",
                doc_path
            )));
        }
        Ok(())
    }

    fn exists(&self, collection: &CollectionPath, id: &str) -> bool {
        self.collections
            .get(&collection.to_string())
            .map(|docs| docs.contains_key(id))
            .unwrap_or(false)
    }

    fn apply(&self, op: WriteOp) {
        match op {
            WriteOp::Set {
                collection,
                id,
                fields,
                merge,
            } => {
                let mut docs = self.collections.entry(collection.to_string()).or_default();
                let doc = docs.entry(id).or_default();
                if !merge {
                    doc.clear();
                }
                doc.extend(fields);
            }
            WriteOp::Update {
                collection,
                id,
                fields,
            } => {
                if let Some(mut docs) = self.collections.get_mut(&collection.to_string()) {
                    if let Some(doc) = docs.get_mut(&id) {
                        doc.extend(fields);
                    }
                }
            }
            WriteOp::Delete { collection, id } => {
                if let Some(mut docs) = self.collections.get_mut(&collection.to_string()) {
                    docs.remove(&id);
                }
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &CollectionPath, id: &str) -> StoreResult<Option<Document>> {
        Ok(self
            .collections
            .get(&collection.to_string())
            .and_then(|docs| docs.get(id).cloned())
            .map(|fields| Document {
                id: id.to_string(),
                fields,
            }))
    }

    async fn set(
        &self,
        collection: &CollectionPath,
        id: &str,
        fields: &Fields,
        merge: bool,
    ) -> StoreResult<()> {
        self.check_writable(&collection.doc_path(id))?;
        self.apply(WriteOp::Set {
            collection: collection.clone(),
            id: id.to_string(),
            fields: fields.clone(),
            merge,
        });
        Ok(())
    }

    async fn update(
        &self,
        collection: &CollectionPath,
        id: &str,
        fields: &Fields,
    ) -> StoreResult<()> {
        self.check_writable(&collection.doc_path(id))?;
        if !self.exists(collection, id) {
            return Err(StoreError::NotFound(collection.doc_path(id)));
        }
        self.apply(WriteOp::Update {
            collection: collection.clone(),
            id: id.to_string(),
            fields: fields.clone(),
        });
        Ok(())
    }

    async fn delete(&self, collection: &CollectionPath, id: &str) -> StoreResult<()> {
        self.check_writable(&collection.doc_path(id))?;
        self.apply(WriteOp::Delete {
            collection: collection.clone(),
            id: id.to_string(),
        });
        Ok(())
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        query: &Query,
    ) -> StoreResult<Vec<Document>> {
        let mut docs: Vec<Document> = self
            .collections
            .get(&collection.to_string())
            .map(|docs| {
                docs.iter()
                    .filter(|(_, fields)| matches_filters(fields, query))
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some((field, direction)) = &query.order_by {
            // Firestore drops documents lacking the order field.
            docs.retain(|doc| lookup(&doc.fields, field).is_some());
            docs.sort_by(|a, b| {
                let ordering = compare_values(
                    lookup(&a.fields, field).unwrap_or(&Value::Null),
                    lookup(&b.fields, field).unwrap_or(&Value::Null),
                )
                .unwrap_or(Ordering::Equal);
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            docs.truncate(limit as usize);
        }

        Ok(docs)
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.len() > MAX_BATCH_OPS {
            return Err(StoreError::BatchTooLarge {
                ops: batch.len(),
                max: MAX_BATCH_OPS,
            });
        }

        // Validate every op before applying any, so a failed commit writes nothing.
        for op in batch.ops() {
            self.check_writable(&op.doc_path())?;
            if let WriteOp::Update { collection, id, .. } = op {
                if !self.exists(collection, id) {
                    return Err(StoreError::NotFound(collection.doc_path(id)));
                }
            }
        }

        let ops = batch.len();
        for op in batch.into_ops() {
            self.apply(op);
        }

        self.commits.fetch_add(1, AtomicOrdering::SeqCst);
        self.largest_commit.fetch_max(ops, AtomicOrdering::SeqCst);
        Ok(())
    }
}

/// Resolve a dotted field path inside a document.
fn lookup<'a>(fields: &'a Fields, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = fields.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn matches_filters(fields: &Fields, query: &Query) -> bool {
    query.filters.iter().all(|filter| {
        let Some(value) = lookup(fields, &filter.field) else {
            return false;
        };
        let Some(ordering) = compare_values(value, &filter.value) else {
            return false;
        };
        match filter.op {
            FilterOp::Equal => ordering == Ordering::Equal,
            FilterOp::LessThan => ordering == Ordering::Less,
            FilterOp::LessThanOrEqual => ordering != Ordering::Greater,
            FilterOp::GreaterThan => ordering == Ordering::Greater,
            FilterOp::GreaterThanOrEqual => ordering != Ordering::Less,
        }
    })
}

/// Compare two scalar values of the same kind; mixed kinds are unordered.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_set_merge_and_update() {
        let store = MemoryStore::new();
        let users = CollectionPath::root("users");

        store
            .set(&users, "u1", &fields(json!({"name": "A", "role": "observer"})), false)
            .await
            .unwrap();
        store
            .set(&users, "u1", &fields(json!({"name": "B"})), true)
            .await
            .unwrap();

        let doc = store.get(&users, "u1").await.unwrap().unwrap();
        assert_eq!(doc.fields["name"], json!("B"));
        assert_eq!(doc.fields["role"], json!("observer"));

        let missing = store
            .update(&users, "nobody", &fields(json!({"name": "C"})))
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_query_filters_order_and_limit() {
        let store = MemoryStore::new();
        let events = CollectionPath::root("token_events");
        for (id, ts, user) in [
            ("e1", "2025-01-01T00:00:00Z", "a"),
            ("e2", "2025-01-03T00:00:00Z", "a"),
            ("e3", "2025-01-02T00:00:00Z", "b"),
        ] {
            store
                .set(&events, id, &fields(json!({"timestamp": ts, "userId": user})), false)
                .await
                .unwrap();
        }

        let query = Query::new()
            .filter("timestamp", FilterOp::GreaterThanOrEqual, "2025-01-02")
            .order_by("timestamp", Direction::Descending)
            .limit(5);
        let ids: Vec<String> = store
            .query(&events, &query)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["e2", "e3"]);

        let query = Query::new().filter("userId", FilterOp::Equal, "a").limit(1);
        assert_eq!(store.query(&events, &query).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_commit_writes_nothing() {
        let store = MemoryStore::new();
        let users = CollectionPath::root("users");
        store
            .set(&users, "u1", &fields(json!({"name": "A"})), false)
            .await
            .unwrap();
        store
            .set(&users, "u2", &fields(json!({"name": "B"})), false)
            .await
            .unwrap();
        store.fail_writes_to("users/u2");

        let mut batch = WriteBatch::new();
        batch.delete(&users, "u1");
        batch.delete(&users, "u2");
        assert!(store.commit(batch).await.is_err());
        assert_eq!(store.count(&users), 2);
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_commit_rejects_oversized_batch() {
        let store = MemoryStore::new();
        let col = CollectionPath::root("check_ins");
        let mut batch = WriteBatch::new();
        for i in 0..=MAX_BATCH_OPS {
            batch.delete(&col, &i.to_string());
        }

        let result = store.commit(batch).await;
        assert!(matches!(result, Err(StoreError::BatchTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_delete_keeps_subcollections() {
        let store = MemoryStore::new();
        let status = CollectionPath::root("responder_status");
        let check_ins = status.subcollection("r1", "check_ins");
        store
            .set(&status, "r1", &fields(json!({})), false)
            .await
            .unwrap();
        store
            .set(&check_ins, "c1", &fields(json!({"timestamp": "t"})), false)
            .await
            .unwrap();

        store.delete(&status, "r1").await.unwrap();

        assert_eq!(store.count(&status), 0);
        assert_eq!(store.count(&check_ins), 1);
    }
}
