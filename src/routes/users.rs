// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User administration routes.

use super::{split_list, validated, ActionResponse};
use crate::error::Result;
use crate::models::{DeletionJournal, DeletionReport};
use crate::services::users::{EngagementSummary, UserView};
use crate::services::{LinkIssue, TestCriterion, UserOutcome};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/test-accounts", get(test_accounts))
        .route("/api/users/relationships/audit", get(relationship_audit))
        .route("/api/users/delete", post(delete_users))
        .route("/api/users/deletions", get(pending_deletions))
        .route("/api/users/deletions/resume", post(resume_all_deletions))
        .route("/api/users/deletions/{id}/resume", post(resume_deletion))
        .route("/api/users/{id}", delete(delete_user))
        .route("/api/analytics/engagement", get(engagement_summary))
}

async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<UserView>>> {
    Ok(Json(state.users.list_users().await?))
}

#[derive(Deserialize)]
struct TestAccountsQuery {
    /// Comma-separated extra criteria: `low_engagement`, `no_activity`
    criteria: Option<String>,
}

#[derive(Serialize)]
struct TestAccountsResponse {
    user_ids: Vec<String>,
    count: usize,
}

async fn test_accounts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TestAccountsQuery>,
) -> Result<Json<TestAccountsResponse>> {
    let criteria = split_list(params.criteria.as_deref())
        .into_iter()
        .map(str::parse::<TestCriterion>)
        .collect::<Result<Vec<_>>>()?;

    let user_ids = state.users.identify_test_accounts(&criteria).await?;
    Ok(Json(TestAccountsResponse {
        count: user_ids.len(),
        user_ids,
    }))
}

async fn relationship_audit(State(state): State<Arc<AppState>>) -> Result<Json<Vec<LinkIssue>>> {
    Ok(Json(state.users.relationship_audit().await?))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<ActionResponse<DeletionReport>>> {
    Ok(Json(state.deletions.delete_user(&user_id).await?.into()))
}

#[derive(Deserialize, Validate)]
struct DeleteUsersRequest {
    #[validate(length(min = 1, max = 200))]
    user_ids: Vec<String>,
}

async fn delete_users(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeleteUsersRequest>,
) -> Result<Json<Vec<UserOutcome>>> {
    let request = validated(request)?;
    tracing::info!(count = request.user_ids.len(), "Batch user deletion");
    Ok(Json(state.deletions.delete_users(&request.user_ids).await))
}

async fn pending_deletions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DeletionJournal>>> {
    Ok(Json(state.deletions.list_pending_deletions().await?))
}

async fn resume_deletion(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<ActionResponse<DeletionReport>>> {
    Ok(Json(state.deletions.resume_deletion(&user_id).await?.into()))
}

async fn resume_all_deletions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserOutcome>>> {
    Ok(Json(state.deletions.resume_pending_deletions().await?))
}

async fn engagement_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EngagementSummary>> {
    Ok(Json(state.users.engagement_summary().await?))
}
