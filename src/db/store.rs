// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Document store contract shared by Firestore and the in-memory store.
//!
//! Documents are JSON objects keyed by id inside named collections. A
//! collection may hang off a parent document (`responder_status/{id}/check_ins`).
//! Typed access goes through [`CollectionRef`], which converts documents to
//! and from serde models.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Firestore rejects transactional writes above 500 operations.
pub const MAX_BATCH_OPS: usize = 500;

/// Top-level fields of a document.
pub type Fields = serde_json::Map<String, Value>;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Failed to convert document: {0}")]
    Serialization(String),

    #[error("Batch of {ops} operations exceeds the limit of {max}")]
    BatchTooLarge { ops: usize, max: usize },

    #[error("{0}")]
    Backend(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Location of a collection, including any parent documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    parents: Vec<(String, String)>,
    name: String,
}

impl CollectionPath {
    /// A top-level collection.
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            parents: Vec::new(),
            name: name.into(),
        }
    }

    /// The collection `name` nested under document `doc_id` of this collection.
    pub fn subcollection(&self, doc_id: &str, name: &str) -> Self {
        let mut parents = self.parents.clone();
        parents.push((self.name.clone(), doc_id.to_string()));
        Self {
            parents,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `(collection, document id)` pairs from the root down to the direct parent.
    pub fn parents(&self) -> &[(String, String)] {
        &self.parents
    }

    /// Full slash-separated path of a document in this collection.
    pub fn doc_path(&self, id: &str) -> String {
        format!("{}/{}", self, id)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (collection, id) in &self.parents {
            write!(f, "{}/{}/", collection, id)?;
        }
        f.write_str(&self.name)
    }
}

/// A raw document: its id plus top-level fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// Deserialize into a model. The document id is exposed as an `id` field,
    /// replacing any stored field of that name.
    pub fn into_typed<T: DeserializeOwned>(self) -> StoreResult<T> {
        let mut fields = self.fields;
        fields.insert("id".to_string(), Value::String(self.id));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}

/// Serialize a model into top-level document fields.
pub fn to_fields<T: Serialize + ?Sized>(value: &T) -> StoreResult<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::Serialization(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

// ─── Queries ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equal,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Conjunctive filters, an optional single ordering and an optional limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

// ─── Batched Writes ──────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum WriteOp {
    Set {
        collection: CollectionPath,
        id: String,
        fields: Fields,
        merge: bool,
    },
    Update {
        collection: CollectionPath,
        id: String,
        fields: Fields,
    },
    Delete {
        collection: CollectionPath,
        id: String,
    },
}

impl WriteOp {
    /// Full path of the document this operation touches.
    pub fn doc_path(&self) -> String {
        match self {
            WriteOp::Set { collection, id, .. }
            | WriteOp::Update { collection, id, .. }
            | WriteOp::Delete { collection, id } => collection.doc_path(id),
        }
    }
}

/// Writes that are committed together, all or nothing.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, collection: &CollectionPath, id: &str, fields: Fields, merge: bool) {
        self.ops.push(WriteOp::Set {
            collection: collection.clone(),
            id: id.to_string(),
            fields,
            merge,
        });
    }

    pub fn update(&mut self, collection: &CollectionPath, id: &str, fields: Fields) {
        self.ops.push(WriteOp::Update {
            collection: collection.clone(),
            id: id.to_string(),
            fields,
        });
    }

    pub fn delete(&mut self, collection: &CollectionPath, id: &str) {
        self.ops.push(WriteOp::Delete {
            collection: collection.clone(),
            id: id.to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

// ─── Store Contract ──────────────────────────────────────────

/// Raw document store operations.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document, `None` if it does not exist.
    async fn get(&self, collection: &CollectionPath, id: &str) -> StoreResult<Option<Document>>;

    /// Write a document. With `merge`, only the given top-level fields are
    /// replaced; otherwise the document is overwritten.
    async fn set(
        &self,
        collection: &CollectionPath,
        id: &str,
        fields: &Fields,
        merge: bool,
    ) -> StoreResult<()>;

    /// Replace the given top-level fields of an existing document.
    /// Fails with [`StoreError::NotFound`] if the document is absent.
    async fn update(&self, collection: &CollectionPath, id: &str, fields: &Fields)
        -> StoreResult<()>;

    /// Delete a document. Deleting an absent document is not an error.
    /// Sub-collections are left untouched.
    async fn delete(&self, collection: &CollectionPath, id: &str) -> StoreResult<()>;

    async fn query(&self, collection: &CollectionPath, query: &Query)
        -> StoreResult<Vec<Document>>;

    /// Commit a batch atomically. Batches above [`MAX_BATCH_OPS`] are rejected.
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;

    async fn stream_all(&self, collection: &CollectionPath) -> StoreResult<Vec<Document>> {
        self.query(collection, &Query::default()).await
    }
}

impl<'s> dyn DocumentStore + 's {
    /// Typed handle for a top-level collection.
    pub fn collection(&self, name: &str) -> CollectionRef<'_> {
        CollectionRef {
            store: self,
            path: CollectionPath::root(name),
        }
    }

    /// Typed handle for any collection path.
    pub fn at(&self, path: CollectionPath) -> CollectionRef<'_> {
        CollectionRef { store: self, path }
    }
}

/// Typed view of one collection.
#[derive(Clone)]
pub struct CollectionRef<'a> {
    store: &'a dyn DocumentStore,
    path: CollectionPath,
}

impl<'a> CollectionRef<'a> {
    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    pub fn subcollection(&self, doc_id: &str, name: &str) -> CollectionRef<'a> {
        CollectionRef {
            store: self.store,
            path: self.path.subcollection(doc_id, name),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, id: &str) -> StoreResult<Option<T>> {
        self.store
            .get(&self.path, id)
            .await?
            .map(Document::into_typed)
            .transpose()
    }

    pub async fn exists(&self, id: &str) -> StoreResult<bool> {
        Ok(self.store.get(&self.path, id).await?.is_some())
    }

    pub async fn set<T: Serialize + ?Sized>(&self, id: &str, value: &T, merge: bool) -> StoreResult<()> {
        let mut fields = to_fields(value)?;
        fields.remove("id");
        self.store.set(&self.path, id, &fields, merge).await
    }

    pub async fn update(&self, id: &str, fields: &Fields) -> StoreResult<()> {
        self.store.update(&self.path, id, fields).await
    }

    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        self.store.delete(&self.path, id).await
    }

    pub async fn docs(&self, query: &Query) -> StoreResult<Vec<Document>> {
        self.store.query(&self.path, query).await
    }

    pub async fn query<T: DeserializeOwned>(&self, query: &Query) -> StoreResult<Vec<T>> {
        self.docs(query)
            .await?
            .into_iter()
            .map(Document::into_typed)
            .collect()
    }

    pub async fn stream<T: DeserializeOwned>(&self) -> StoreResult<Vec<T>> {
        self.query(&Query::default()).await
    }

    /// Every document that converts to `T`. Documents that don't are logged
    /// and skipped, so one bad record cannot hide the rest.
    pub async fn stream_valid<T: DeserializeOwned>(&self) -> StoreResult<Vec<T>> {
        let docs = self.store.stream_all(&self.path).await?;
        Ok(docs
            .into_iter()
            .filter_map(|doc| {
                let id = doc.id.clone();
                match doc.into_typed() {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!(
                            collection = %self.path,
                            id = %id,
                            error = %e,
                            "Skipping unreadable document"
                        );
                        None
                    }
                }
            })
            .collect())
    }

    /// Ids of every document in the collection.
    pub async fn ids(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .store
            .stream_all(&self.path)
            .await?
            .into_iter()
            .map(|doc| doc.id)
            .collect())
    }
}
