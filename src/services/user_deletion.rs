// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User deletion with relationship and status cleanup.
//!
//! Deleting a user means:
//! 1. Pruning the user from every counterpart's link map
//! 2. Deleting the responder's check-ins and status aggregate
//! 3. Deleting the user document
//!
//! When all of that fits in one write batch it is committed atomically.
//! Larger deletions run step by step under a journal in `user_deletions`,
//! which stays behind on failure so the deletion can be resumed.

use crate::db::{
    collections, CollectionPath, DocumentStore, Fields, StoreError, WriteBatch, MAX_BATCH_OPS,
};
use crate::error::{AppError, OperationResult, Result};
use crate::models::{DeletionJournal, DeletionReport, DeletionStage, Role, User};
use crate::services::batch::delete_in_batches;
use crate::services::relationships::RelationshipGraph;
use crate::time_utils::format_utc_rfc3339;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Outcome for one user of a multi-user operation.
#[derive(Debug, Clone, Serialize)]
pub struct UserOutcome {
    pub user_id: String,
    #[serde(flatten)]
    pub result: OperationResult,
}

/// Everything a deletion will touch, gathered before the first write.
struct DeletionPlan {
    user: User,
    /// Counterparts whose link maps still reference the user
    counterparts: Vec<(String, Fields)>,
    check_in_ids: Vec<String>,
    has_status: bool,
    has_journal: bool,
}

impl DeletionPlan {
    fn op_count(&self) -> usize {
        self.counterparts.len()
            + self.check_in_ids.len()
            + usize::from(self.has_status)
            + 1
            + usize::from(self.has_journal)
    }
}

pub struct UserDeletionService {
    db: Arc<dyn DocumentStore>,
    users: CollectionPath,
    statuses: CollectionPath,
    journals: CollectionPath,
}

impl UserDeletionService {
    pub fn new(db: Arc<dyn DocumentStore>) -> Self {
        Self {
            db,
            users: CollectionPath::root(collections::USERS),
            statuses: CollectionPath::root(collections::RESPONDER_STATUS),
            journals: CollectionPath::root(collections::USER_DELETIONS),
        }
    }

    fn check_ins(&self, user_id: &str) -> CollectionPath {
        self.statuses.subcollection(user_id, collections::CHECK_INS)
    }

    /// Delete a user and everything that references it.
    pub async fn delete_user(&self, user_id: &str) -> Result<DeletionReport> {
        let user: User = self
            .db
            .at(self.users.clone())
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;

        tracing::info!(
            user_id,
            name = %user.name,
            role = user.role.as_str(),
            "Deleting user"
        );

        let plan = self.plan(user).await?;
        let ops = plan.op_count();

        if ops <= MAX_BATCH_OPS {
            self.delete_atomically(plan).await
        } else {
            tracing::info!(user_id, ops, "Deletion exceeds one batch, journaling");
            self.delete_with_journal(plan).await
        }
    }

    async fn plan(&self, user: User) -> Result<DeletionPlan> {
        let counterparts = match user.role.counterpart() {
            Some(role) => self.counterpart_patches(&user, role).await?,
            None => Vec::new(),
        };

        let (check_in_ids, has_status) = if user.role == Role::Responder {
            let has_status = self.db.at(self.statuses.clone()).exists(&user.id).await?;
            let check_in_ids = self.db.at(self.check_ins(&user.id)).ids().await?;
            (check_in_ids, has_status)
        } else {
            (Vec::new(), false)
        };

        let has_journal = self.db.at(self.journals.clone()).exists(&user.id).await?;

        Ok(DeletionPlan {
            user,
            counterparts,
            check_in_ids,
            has_status,
            has_journal,
        })
    }

    /// Link-map patches for every counterpart that still references `user`.
    ///
    /// Candidates are the user's own map plus one-sided links found in the
    /// graph. Each candidate is re-read and patched from its raw fields, so
    /// other link entries are kept exactly as stored.
    async fn counterpart_patches(&self, user: &User, role: Role) -> Result<Vec<(String, Fields)>> {
        let Some(field) = role.links_field() else {
            return Ok(Vec::new());
        };

        let graph = RelationshipGraph::load(self.db.as_ref()).await?;
        let mut candidates: BTreeSet<String> = user.links().keys().cloned().collect();
        candidates.extend(
            graph
                .back_references(&user.id)
                .into_iter()
                .map(|counterpart| counterpart.id.clone()),
        );

        let mut patches = Vec::new();
        for id in candidates {
            let Some(doc) = self.db.get(&self.users, &id).await? else {
                tracing::debug!(user_id = %user.id, counterpart = %id, "Linked user no longer exists");
                continue;
            };
            if doc.fields.get("role").and_then(Value::as_str) != Some(role.as_str()) {
                continue;
            }
            let Some(Value::Object(links)) = doc.fields.get(field) else {
                continue;
            };
            if !links.contains_key(&user.id) {
                continue;
            }

            let mut links = links.clone();
            links.remove(&user.id);
            let mut patch = Fields::new();
            patch.insert(field.to_string(), Value::Object(links));
            patches.push((id, patch));
        }
        Ok(patches)
    }

    async fn delete_atomically(&self, plan: DeletionPlan) -> Result<DeletionReport> {
        let user_id = plan.user.id.as_str();
        let check_ins = self.check_ins(user_id);

        let mut batch = WriteBatch::new();
        for (counterpart_id, patch) in &plan.counterparts {
            batch.update(&self.users, counterpart_id, patch.clone());
        }
        for id in &plan.check_in_ids {
            batch.delete(&check_ins, id);
        }
        if plan.has_status {
            batch.delete(&self.statuses, user_id);
        }
        batch.delete(&self.users, user_id);
        if plan.has_journal {
            batch.delete(&self.journals, user_id);
        }

        self.db.commit(batch).await.map_err(|e| match e {
            StoreError::NotFound(path) => AppError::Database(format!(
                "Counterpart {} disappeared during deletion of {}",
                path, user_id
            )),
            other => AppError::Database(format!("Failed to delete user {}: {}", user_id, other)),
        })?;

        let report = report_for(&plan, true);
        tracing::info!(user_id, report = %report, "User deleted");
        Ok(report)
    }

    async fn delete_with_journal(&self, plan: DeletionPlan) -> Result<DeletionReport> {
        let user_id = plan.user.id.clone();
        let journals = self.db.at(self.journals.clone());
        let users = self.db.at(self.users.clone());

        let mut journal = DeletionJournal {
            user_id: user_id.clone(),
            user_name: plan.user.name.clone(),
            role: plan.user.role,
            counterparts: plan.counterparts.iter().map(|(id, _)| id.clone()).collect(),
            check_ins_remaining: plan.check_in_ids.len(),
            started_at: format_utc_rfc3339(chrono::Utc::now()),
            stage: DeletionStage::Relationships,
        };
        journals.set(&user_id, &journal, false).await?;

        let partial = |stage: DeletionStage| {
            let user_id = user_id.clone();
            move |e: StoreError| {
                tracing::error!(user_id = %user_id, %stage, error = %e, "Deletion stopped");
                AppError::PartialCleanup {
                    user_id,
                    stage: stage.to_string(),
                    detail: e.to_string(),
                }
            }
        };

        for (counterpart_id, patch) in &plan.counterparts {
            users
                .update(counterpart_id, patch)
                .await
                .map_err(partial(DeletionStage::Relationships))?;
        }

        journal.counterparts.clear();
        journal.stage = DeletionStage::CheckIns;
        journals
            .set(&user_id, &journal, false)
            .await
            .map_err(partial(DeletionStage::CheckIns))?;

        delete_in_batches(
            self.db.as_ref(),
            &self.check_ins(&user_id),
            &plan.check_in_ids,
        )
        .await
        .map_err(partial(DeletionStage::CheckIns))?;

        journal.check_ins_remaining = 0;
        journal.stage = DeletionStage::User;
        journals
            .set(&user_id, &journal, false)
            .await
            .map_err(partial(DeletionStage::User))?;

        if plan.has_status {
            self.db
                .delete(&self.statuses, &user_id)
                .await
                .map_err(partial(DeletionStage::User))?;
        }
        users
            .delete(&user_id)
            .await
            .map_err(partial(DeletionStage::User))?;
        journals
            .delete(&user_id)
            .await
            .map_err(partial(DeletionStage::User))?;

        let report = report_for(&plan, false);
        tracing::info!(user_id = %user_id, report = %report, "User deleted");
        Ok(report)
    }

    /// Delete several users. A failure on one does not stop the rest.
    pub async fn delete_users(&self, user_ids: &[String]) -> Vec<UserOutcome> {
        let mut outcomes = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            let result = self.delete_user(user_id).await;
            if let Err(e) = &result {
                tracing::warn!(user_id = %user_id, error = %e, "User deletion failed");
            }
            outcomes.push(UserOutcome {
                user_id: user_id.clone(),
                result: result.into(),
            });
        }
        outcomes
    }

    /// Journals of deletions that did not complete.
    pub async fn list_pending_deletions(&self) -> Result<Vec<DeletionJournal>> {
        Ok(self.db.at(self.journals.clone()).stream_valid().await?)
    }

    /// Finish a journaled deletion.
    ///
    /// If the user document is still there the deletion is planned again from
    /// current state, so work already done is not repeated. Otherwise only the
    /// journal is left and it is removed.
    pub async fn resume_deletion(&self, user_id: &str) -> Result<DeletionReport> {
        let journals = self.db.at(self.journals.clone());
        let journal: DeletionJournal = journals
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Deletion journal {}", user_id)))?;

        tracing::info!(user_id, stage = %journal.stage, "Resuming user deletion");

        if self.db.at(self.users.clone()).exists(user_id).await? {
            return self.delete_user(user_id).await;
        }

        journals.delete(user_id).await?;
        Ok(DeletionReport {
            user_id: journal.user_id,
            user_name: journal.user_name,
            role: journal.role,
            counterparts_cleaned: 0,
            check_ins_deleted: 0,
            status_deleted: false,
            atomic: true,
        })
    }

    /// Resume every pending deletion, reporting each.
    pub async fn resume_pending_deletions(&self) -> Result<Vec<UserOutcome>> {
        let pending = self.list_pending_deletions().await?;
        let mut outcomes = Vec::with_capacity(pending.len());
        for journal in pending {
            let result = self.resume_deletion(&journal.user_id).await;
            outcomes.push(UserOutcome {
                user_id: journal.user_id,
                result: result.into(),
            });
        }
        Ok(outcomes)
    }
}

fn report_for(plan: &DeletionPlan, atomic: bool) -> DeletionReport {
    DeletionReport {
        user_id: plan.user.id.clone(),
        user_name: plan.user.name.clone(),
        role: plan.user.role,
        counterparts_cleaned: plan.counterparts.len(),
        check_ins_deleted: plan.check_in_ids.len(),
        status_deleted: plan.has_status,
        atomic,
    }
}
