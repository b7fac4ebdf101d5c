// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore implementation of the document store.
//!
//! Documents are read raw and converted to JSON objects so the admin
//! services can preserve fields written by the mobile app that they do not
//! model. Batches are committed through a Firestore transaction.

use crate::db::store::{
    CollectionPath, Direction, Document, DocumentStore, Fields, FilterOp, Query, StoreError,
    StoreResult, WriteBatch, WriteOp, MAX_BATCH_OPS,
};
use crate::error::AppError;
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::FirestoreWritePrecondition;
use serde_json::Value;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    /// Build the parent path for a nested collection.
    fn parent_path(
        &self,
        collection: &CollectionPath,
    ) -> StoreResult<Option<firestore::ParentPathBuilder>> {
        let mut parents = collection.parents().iter();
        let Some((first_collection, first_id)) = parents.next() else {
            return Ok(None);
        };

        let mut builder = self
            .client
            .parent_path(first_collection, first_id.as_str())
            .map_err(backend)?;
        for (parent_collection, parent_id) in parents {
            builder = builder
                .at(parent_collection, parent_id.as_str())
                .map_err(backend)?;
        }
        Ok(Some(builder))
    }
}

fn backend(err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Convert a raw Firestore document into id + JSON fields.
fn into_document(doc: &firestore::FirestoreDocument) -> StoreResult<Document> {
    let id = doc
        .name
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();

    let value: Value = firestore::FirestoreDb::deserialize_doc_to(doc)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    let mut fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err(StoreError::Serialization(format!(
                "document {} is not an object: {}",
                id, other
            )))
        }
    };
    // Drop the metadata fields the deserializer adds to every document.
    fields.retain(|key, _| !key.starts_with("_firestore_"));

    Ok(Document { id, fields })
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    async fn get(&self, collection: &CollectionPath, id: &str) -> StoreResult<Option<Document>> {
        let parent = self.parent_path(collection)?;
        let select = self.client.fluent().select().by_id_in(collection.name());
        let select = match &parent {
            Some(parent) => select.parent(parent),
            None => select,
        };

        let doc = select.one(id).await.map_err(backend)?;
        doc.as_ref().map(into_document).transpose()
    }

    async fn set(
        &self,
        collection: &CollectionPath,
        id: &str,
        fields: &Fields,
        merge: bool,
    ) -> StoreResult<()> {
        let parent = self.parent_path(collection)?;
        let update = self.client.fluent().update();
        let update = if merge {
            update.fields(fields.keys())
        } else {
            update
        };
        let update = update.in_col(collection.name()).document_id(id);
        let update = match &parent {
            Some(parent) => update.parent(parent),
            None => update,
        };

        let _: () = update.object(fields).execute().await.map_err(backend)?;
        Ok(())
    }

    async fn update(
        &self,
        collection: &CollectionPath,
        id: &str,
        fields: &Fields,
    ) -> StoreResult<()> {
        let parent = self.parent_path(collection)?;
        let update = self
            .client
            .fluent()
            .update()
            .fields(fields.keys())
            .in_col(collection.name())
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(id);
        let update = match &parent {
            Some(parent) => update.parent(parent),
            None => update,
        };

        let result: Result<(), FirestoreError> = update.object(fields).execute().await;
        result.map_err(|e| match e {
            FirestoreError::DataNotFoundError(_) => StoreError::NotFound(collection.doc_path(id)),
            other => backend(other),
        })
    }

    async fn delete(&self, collection: &CollectionPath, id: &str) -> StoreResult<()> {
        let parent = self.parent_path(collection)?;
        let delete = self.client.fluent().delete().from(collection.name());
        let delete = match &parent {
            Some(parent) => delete.parent(parent),
            None => delete,
        };

        delete.document_id(id).execute().await.map_err(backend)?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        query: &Query,
    ) -> StoreResult<Vec<Document>> {
        let parent = self.parent_path(collection)?;
        let select = self.client.fluent().select().from(collection.name());
        let select = match &parent {
            Some(parent) => select.parent(parent),
            None => select,
        };

        let select = if query.filters.is_empty() {
            select
        } else {
            let filters = query.filters.clone();
            select.filter(move |q| {
                q.for_all(filters.iter().map(|filter| {
                    let field = q.field(filter.field.as_str());
                    let value = filter.value.clone();
                    match filter.op {
                        FilterOp::Equal => field.eq(value),
                        FilterOp::LessThan => field.less_than(value),
                        FilterOp::LessThanOrEqual => field.less_than_or_equal(value),
                        FilterOp::GreaterThan => field.greater_than(value),
                        FilterOp::GreaterThanOrEqual => field.greater_than_or_equal(value),
                    }
                }))
            })
        };

        let select = match &query.order_by {
            Some((field, direction)) => {
                let direction = match direction {
                    Direction::Ascending => firestore::FirestoreQueryDirection::Ascending,
                    Direction::Descending => firestore::FirestoreQueryDirection::Descending,
                };
                select.order_by([(field.as_str(), direction)])
            }
            None => select,
        };

        let select = match query.limit {
            Some(limit) => select.limit(limit),
            None => select,
        };

        let docs = select.query().await.map_err(backend)?;
        docs.iter().map(into_document).collect()
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.len() > MAX_BATCH_OPS {
            return Err(StoreError::BatchTooLarge {
                ops: batch.len(),
                max: MAX_BATCH_OPS,
            });
        }
        if batch.is_empty() {
            return Ok(());
        }

        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to begin transaction: {}", e)))?;

        for op in batch.into_ops() {
            let doc_path = op.doc_path();
            let added = match op {
                WriteOp::Set {
                    collection,
                    id,
                    fields,
                    merge,
                } => {
                    let parent = self.parent_path(&collection)?;
                    let update = self.client.fluent().update();
                    let update = if merge {
                        update.fields(fields.keys())
                    } else {
                        update
                    };
                    let update = update.in_col(collection.name()).document_id(&id);
                    let update = match &parent {
                        Some(parent) => update.parent(parent),
                        None => update,
                    };
                    update
                        .object(&fields)
                        .add_to_transaction(&mut transaction)
                        .map(|_| ())
                }
                WriteOp::Update {
                    collection,
                    id,
                    fields,
                } => {
                    let parent = self.parent_path(&collection)?;
                    // Without the precondition a masked update creates missing documents
                    let update = self
                        .client
                        .fluent()
                        .update()
                        .fields(fields.keys())
                        .in_col(collection.name())
                        .precondition(FirestoreWritePrecondition::Exists(true))
                        .document_id(&id);
                    let update = match &parent {
                        Some(parent) => update.parent(parent),
                        None => update,
                    };
                    update
                        .object(&fields)
                        .add_to_transaction(&mut transaction)
                        .map(|_| ())
                }
                WriteOp::Delete { collection, id } => {
                    let parent = self.parent_path(&collection)?;
                    let delete = self.client.fluent().delete().from(collection.name());
                    let delete = match &parent {
                        Some(parent) => delete.parent(parent),
                        None => delete,
                    };
                    delete
                        .document_id(&id)
                        .add_to_transaction(&mut transaction)
                        .map(|_| ())
                }
            };

            added.map_err(|e| {
                StoreError::Backend(format!(
                    "Failed to add {} to transaction: {}",
                    doc_path, e
                ))
            })?;
        }

        transaction.commit().await.map_err(|e| match e {
            FirestoreError::DataNotFoundError(err) => StoreError::NotFound(err.to_string()),
            other => StoreError::Backend(format!("Transaction commit failed: {}", other)),
        })?;

        Ok(())
    }
}
