// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin token authentication middleware.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Bearer token from an `Authorization` header value.
fn bearer_token(header: Option<&HeaderValue>) -> Option<&str> {
    header
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Compare tokens without leaking where they differ.
fn token_matches(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Middleware that requires the admin API token.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(token) = bearer_token(request.headers().get(header::AUTHORIZATION)) else {
        tracing::warn!(path = %request.uri().path(), "Admin request without bearer token");
        return Err(StatusCode::UNAUTHORIZED);
    };

    if !token_matches(token, &state.config.admin_api_token) {
        tracing::warn!(path = %request.uri().path(), "Admin request with invalid token");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
