// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Question pack routes.

use super::validated;
use crate::error::Result;
use crate::models::{PackSummary, Question};
use crate::services::{MigrationCounts, MigrationTotals};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/packs", get(list_packs).post(create_pack))
        .route("/api/packs/migrate-images", post(migrate_all_packs))
        .route("/api/packs/cleanup", post(cleanup_legacy_fields))
        .route("/api/packs/{id}", delete(delete_pack))
        .route("/api/packs/{id}/questions", post(upload_questions))
        .route("/api/packs/{id}/migrate-images", post(migrate_pack))
}

async fn list_packs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<PackSummary>>> {
    Ok(Json(state.packs.list_packs().await?))
}

#[derive(Deserialize, Validate)]
struct CreatePackRequest {
    /// Pack id, e.g. `first_aid_basics`
    #[validate(length(min = 1, max = 100))]
    pack_name: String,
}

#[derive(Serialize)]
struct CreatePackResponse {
    success: bool,
    message: String,
    id: String,
    name: String,
    image_folder: String,
}

async fn create_pack(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreatePackRequest>,
) -> Result<Json<CreatePackResponse>> {
    let request = validated(request)?;
    let pack = state.packs.create_pack(&request.pack_name).await?;

    Ok(Json(CreatePackResponse {
        success: true,
        message: format!("Created pack '{}' with ID '{}'", pack.name, pack.id),
        id: pack.id,
        name: pack.name,
        image_folder: pack.image_folder,
    }))
}

#[derive(Deserialize, Validate)]
struct UploadQuestionsRequest {
    #[validate(length(min = 1, max = 1000))]
    questions: Vec<Question>,
}

#[derive(Serialize)]
struct UploadQuestionsResponse {
    success: bool,
    message: String,
    added: usize,
}

async fn upload_questions(
    State(state): State<Arc<AppState>>,
    Path(pack_id): Path<String>,
    Json(request): Json<UploadQuestionsRequest>,
) -> Result<Json<UploadQuestionsResponse>> {
    let request = validated(request)?;
    let added = state
        .packs
        .upload_questions(&pack_id, request.questions)
        .await?;

    Ok(Json(UploadQuestionsResponse {
        success: true,
        message: format!("Added {} questions to '{}'", added, pack_id),
        added,
    }))
}

#[derive(Serialize)]
struct DeletePackResponse {
    success: bool,
    message: String,
}

async fn delete_pack(
    State(state): State<Arc<AppState>>,
    Path(pack_id): Path<String>,
) -> Result<Json<DeletePackResponse>> {
    state.packs.delete_pack(&pack_id).await?;
    Ok(Json(DeletePackResponse {
        success: true,
        message: format!("Question pack '{}' deleted successfully", pack_id),
    }))
}

async fn migrate_pack(
    State(state): State<Arc<AppState>>,
    Path(pack_id): Path<String>,
) -> Result<Json<MigrationCounts>> {
    Ok(Json(
        state
            .images
            .migrate_pack(&pack_id, &state.config.assets_root)
            .await?,
    ))
}

async fn migrate_all_packs(State(state): State<Arc<AppState>>) -> Result<Json<MigrationTotals>> {
    Ok(Json(
        state
            .images
            .migrate_all_packs(&state.config.assets_root)
            .await?,
    ))
}

#[derive(Deserialize, Default)]
struct CleanupRequest {
    /// Limit the cleanup to one pack
    pack_id: Option<String>,
}

#[derive(Serialize)]
struct CleanupResponse {
    cleaned: usize,
}

async fn cleanup_legacy_fields(
    State(state): State<Arc<AppState>>,
    request: Option<Json<CleanupRequest>>,
) -> Result<Json<CleanupResponse>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let cleaned = state
        .images
        .cleanup_legacy_fields(request.pack_id.as_deref())
        .await?;
    Ok(Json(CleanupResponse { cleaned }))
}
