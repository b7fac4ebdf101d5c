// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Responder status routes.

use super::{validated, ActionResponse};
use crate::error::Result;
use crate::models::{CheckIn, PurgeReport, StatusSummary};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/status", get(list_statuses))
        .route("/api/status/{id}/check-ins", get(recent_check_ins))
        .route("/api/status/{id}", delete(purge_status))
}

async fn list_statuses(State(state): State<Arc<AppState>>) -> Result<Json<Vec<StatusSummary>>> {
    Ok(Json(state.status.list_status_summaries().await?))
}

#[derive(Deserialize, Validate)]
struct CheckInsQuery {
    #[validate(range(min = 1, max = 500))]
    limit: Option<u32>,
}

async fn recent_check_ins(
    State(state): State<Arc<AppState>>,
    Path(responder_id): Path<String>,
    Query(params): Query<CheckInsQuery>,
) -> Result<Json<Vec<CheckIn>>> {
    let params = validated(params)?;
    Ok(Json(
        state
            .status
            .recent_check_ins(&responder_id, params.limit)
            .await?,
    ))
}

async fn purge_status(
    State(state): State<Arc<AppState>>,
    Path(responder_id): Path<String>,
) -> Result<Json<ActionResponse<PurgeReport>>> {
    Ok(Json(
        state
            .status
            .purge_responder_status(&responder_id)
            .await?
            .into(),
    ))
}
