// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token health routes.

use super::{split_list, validated};
use crate::error::{AppError, Result};
use crate::models::{DailyMetric, TokenEvent, TokenEventType};
use crate::services::token_health::{
    ErrorPatterns, HealthTrends, SummaryStats, UserTokenIssues, UserTokenReport,
};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tokens/events", get(recent_events).delete(cleanup_events))
        .route("/api/tokens/errors", get(error_patterns))
        .route("/api/tokens/metrics", get(daily_metrics))
        .route("/api/tokens/trends", get(health_trends))
        .route("/api/tokens/issues", get(users_with_issues))
        .route("/api/tokens/summary", get(summary_stats))
        .route("/api/tokens/users/{id}", get(user_report))
        .route("/api/tokens/export", post(export_user_data))
}

#[derive(Deserialize, Validate)]
struct DaysQuery {
    #[validate(range(min = 1, max = 365))]
    days: Option<i64>,
}

impl DaysQuery {
    fn days_or(self, default: i64) -> Result<i64> {
        Ok(validated(self)?.days.unwrap_or(default))
    }
}

#[derive(Deserialize, Validate)]
struct EventsQuery {
    #[validate(range(min = 1, max = 365))]
    days: Option<i64>,
    /// Comma-separated event types: `error`, `strike`, `removal`
    types: Option<String>,
    #[validate(range(min = 1, max = 1000))]
    limit: Option<u32>,
}

fn parse_event_type(raw: &str) -> Result<TokenEventType> {
    match raw {
        "error" => Ok(TokenEventType::Error),
        "strike" => Ok(TokenEventType::Strike),
        "removal" => Ok(TokenEventType::Removal),
        other => Err(AppError::BadRequest(format!("Unknown event type: {}", other))),
    }
}

async fn recent_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> Result<Json<Vec<TokenEvent>>> {
    let params = validated(params)?;
    let types = split_list(params.types.as_deref())
        .into_iter()
        .map(parse_event_type)
        .collect::<Result<Vec<_>>>()?;

    let events = state
        .tokens
        .recent_events(
            params.days.unwrap_or(7),
            (!types.is_empty()).then_some(types.as_slice()),
            params.limit,
        )
        .await?;
    Ok(Json(events))
}

async fn error_patterns(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DaysQuery>,
) -> Result<Json<ErrorPatterns>> {
    let days = params.days_or(7)?;
    Ok(Json(state.tokens.error_patterns(days).await?))
}

async fn daily_metrics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DaysQuery>,
) -> Result<Json<Vec<DailyMetric>>> {
    let days = params.days_or(30)?;
    Ok(Json(state.tokens.daily_metrics(days).await?))
}

async fn health_trends(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DaysQuery>,
) -> Result<Json<HealthTrends>> {
    let days = params.days_or(30)?;
    Ok(Json(state.tokens.health_trends(days).await?))
}

async fn users_with_issues(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DaysQuery>,
) -> Result<Json<Vec<UserTokenIssues>>> {
    let days = params.days_or(7)?;
    Ok(Json(state.tokens.users_with_token_issues(days).await?))
}

async fn summary_stats(State(state): State<Arc<AppState>>) -> Result<Json<SummaryStats>> {
    Ok(Json(state.tokens.summary_stats().await?))
}

async fn user_report(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserTokenReport>> {
    Ok(Json(state.tokens.user_report(&user_id).await?))
}

#[derive(Deserialize, Validate)]
struct ExportRequest {
    /// Users to export; every user with recent events when absent
    #[validate(length(min = 1, max = 500))]
    user_ids: Option<Vec<String>>,
    #[validate(range(min = 1, max = 365))]
    days: Option<i64>,
}

async fn export_user_data(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExportRequest>,
) -> Result<Json<Vec<UserTokenReport>>> {
    let request = validated(request)?;
    Ok(Json(
        state
            .tokens
            .export_user_data(request.user_ids, request.days.unwrap_or(30))
            .await?,
    ))
}

#[derive(Deserialize, Validate)]
struct CleanupQuery {
    #[validate(range(min = 1, max = 3650))]
    days_to_keep: Option<i64>,
}

#[derive(Serialize)]
struct CleanupResponse {
    success: bool,
    message: String,
    deleted: usize,
}

async fn cleanup_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CleanupQuery>,
) -> Result<Json<CleanupResponse>> {
    let params = validated(params)?;
    let deleted = state
        .tokens
        .cleanup_old_events(params.days_to_keep.unwrap_or(30))
        .await?;

    Ok(Json(CleanupResponse {
        success: true,
        message: format!("Successfully deleted {} old token events", deleted),
        deleted,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_type() {
        assert_eq!(parse_event_type("strike").unwrap(), TokenEventType::Strike);
        assert!(parse_event_type("Strike").is_err());
    }

    #[test]
    fn test_days_query_range() {
        assert_eq!(DaysQuery { days: None }.days_or(7).unwrap(), 7);
        assert_eq!(DaysQuery { days: Some(14) }.days_or(7).unwrap(), 14);
        assert!(DaysQuery { days: Some(0) }.days_or(7).is_err());
        assert!(DaysQuery { days: Some(400) }.days_or(7).is_err());
    }
}
