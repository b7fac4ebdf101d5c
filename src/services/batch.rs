// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Chunked deletes for collections larger than one write batch.

use crate::db::{CollectionPath, DocumentStore, StoreResult, WriteBatch};

/// Ceiling on deletes per committed batch, below the store's hard limit.
pub const BATCH_SIZE: usize = 400;

/// Delete `ids` from `collection`, committing every [`BATCH_SIZE`] deletes
/// and then the final partial batch. Returns the number deleted.
///
/// Batches committed before a failure stay committed.
pub async fn delete_in_batches(
    db: &dyn DocumentStore,
    collection: &CollectionPath,
    ids: &[String],
) -> StoreResult<usize> {
    let mut deleted = 0;

    for chunk in ids.chunks(BATCH_SIZE) {
        let mut batch = WriteBatch::new();
        for id in chunk {
            batch.delete(collection, id);
        }
        db.commit(batch).await?;
        deleted += chunk.len();

        tracing::debug!(
            collection = %collection,
            deleted,
            total = ids.len(),
            "Committed delete batch"
        );
    }

    Ok(deleted)
}
