// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Responder status dashboards and purging.

use crate::db::{collections, CollectionRef, Direction, DocumentStore, Query, StoreResult};
use crate::error::{AppError, Result};
use crate::models::{CheckIn, PurgeReport, StatusSummary};
use crate::services::batch::delete_in_batches;
use crate::time_utils::format_timestamp;
use serde_json::Value;
use std::sync::Arc;

/// Check-ins shown per responder unless a limit is given.
pub const DEFAULT_CHECK_IN_LIMIT: u32 = 20;

const NEVER: &str = "Never";

pub struct StatusService {
    db: Arc<dyn DocumentStore>,
}

impl StatusService {
    pub fn new(db: Arc<dyn DocumentStore>) -> Self {
        Self { db }
    }

    fn statuses(&self) -> CollectionRef<'_> {
        self.db.collection(collections::RESPONDER_STATUS)
    }

    fn check_ins(&self, responder_id: &str) -> CollectionRef<'_> {
        self.statuses()
            .subcollection(responder_id, collections::CHECK_INS)
    }

    /// Delete a status aggregate and every check-in beneath it.
    ///
    /// Check-ins go first, in bounded batches; the aggregate is deleted only
    /// once they are all gone.
    pub async fn purge_responder_status(&self, responder_id: &str) -> Result<PurgeReport> {
        if !self.statuses().exists(responder_id).await? {
            return Err(AppError::NotFound(format!(
                "Responder status {}",
                responder_id
            )));
        }

        let check_ins = self.check_ins(responder_id);
        let ids = check_ins.ids().await?;

        tracing::info!(
            responder_id,
            check_ins = ids.len(),
            "Purging responder status"
        );

        let deleted = delete_in_batches(self.db.as_ref(), check_ins.path(), &ids)
            .await
            .map_err(|e| {
                AppError::Database(format!(
                    "Failed to delete check-ins for {}: {}",
                    responder_id, e
                ))
            })?;

        self.statuses().delete(responder_id).await.map_err(|e| {
            AppError::Database(format!(
                "Deleted {} check-ins but not status {}: {}",
                deleted, responder_id, e
            ))
        })?;

        Ok(PurgeReport {
            responder_id: responder_id.to_string(),
            check_ins_deleted: deleted,
        })
    }

    /// One summary row per status aggregate.
    ///
    /// A failure reading one aggregate's check-ins is reported in its row
    /// rather than failing the listing.
    pub async fn list_status_summaries(&self) -> Result<Vec<StatusSummary>> {
        let ids = self.statuses().ids().await?;
        let mut summaries = Vec::with_capacity(ids.len());

        for id in ids {
            let summary = match self.summarize(&id).await {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::warn!(responder_id = %id, error = %e, "Failed to summarize check-ins");
                    StatusSummary {
                        id,
                        check_ins: 0,
                        latest_check_in: format!("Error: {}", e),
                    }
                }
            };
            summaries.push(summary);
        }

        Ok(summaries)
    }

    async fn summarize(&self, responder_id: &str) -> StoreResult<StatusSummary> {
        let check_ins = self.check_ins(responder_id);
        let count = check_ins.ids().await?.len();

        let mut latest_check_in = NEVER.to_string();
        if count > 0 {
            let latest = check_ins
                .docs(
                    &Query::new()
                        .order_by("timestamp", Direction::Descending)
                        .limit(1),
                )
                .await?;
            if let Some(timestamp) = latest.first().and_then(|doc| doc.fields.get("timestamp")) {
                latest_check_in = match timestamp {
                    Value::String(raw) => raw.clone(),
                    other => format_timestamp(other),
                };
            }
        }

        Ok(StatusSummary {
            id: responder_id.to_string(),
            check_ins: count,
            latest_check_in,
        })
    }

    /// Newest check-ins first. Empty when the aggregate does not exist.
    pub async fn recent_check_ins(
        &self,
        responder_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<CheckIn>> {
        if !self.statuses().exists(responder_id).await? {
            return Ok(Vec::new());
        }

        let query = Query::new()
            .order_by("timestamp", Direction::Descending)
            .limit(limit.unwrap_or(DEFAULT_CHECK_IN_LIMIT));

        Ok(self.check_ins(responder_id).query(&query).await?)
    }
}
