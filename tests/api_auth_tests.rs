// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin API authentication, CORS and request handling tests.
//!
//! These tests verify that:
//! 1. Admin routes reject requests without the admin token
//! 2. Admin routes accept requests with the admin token
//! 3. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::{create_test_app, users};

const TOKEN: &str = "test_admin_token";

fn admin_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_admin_route_without_token() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/users")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Should return 401 Unauthorized without token
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_route_with_invalid_token() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/users/r1")
                .header(header::AUTHORIZATION, "Bearer not-the-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_route_with_valid_token() {
    let (app, backend) = create_test_app();
    backend.responder("r1", "Rita", &[]).await;
    backend.observer("o2", "Observer 2", &[]).await;

    let response = app
        .oneshot(admin_request("GET", "/api/users", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store"
    );
    let body = json_body(response).await;
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    let observer = listed.iter().find(|u| u["id"] == "o2").unwrap();
    assert_eq!(observer["is_likely_test"], json!(true));
}

#[tokio::test]
async fn test_delete_user_endpoint() {
    let (app, backend) = create_test_app();
    backend.responder("r1", "Rita", &[("o1", "Olive")]).await;
    backend.observer("o1", "Olive", &[("r1", "Rita")]).await;

    let response = app
        .clone()
        .oneshot(admin_request("DELETE", "/api/users/r1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["counterparts_cleaned"], json!(1));
    assert!(backend.fields(&users(), "r1").await.is_none());

    let response = app
        .oneshot(admin_request("DELETE", "/api/users/r1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"], json!("not_found"));
}

#[tokio::test]
async fn test_batch_delete_validates_request() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(admin_request(
            "POST",
            "/api/users/delete",
            Some(json!({"user_ids": []})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_delete_reports_each_user() {
    let (app, backend) = create_test_app();
    backend.responder("r1", "Rita", &[]).await;

    let response = app
        .oneshot(admin_request(
            "POST",
            "/api/users/delete",
            Some(json!({"user_ids": ["r1", "ghost"]})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body[0]["user_id"], json!("r1"));
    assert_eq!(body[0]["success"], json!(true));
    assert_eq!(body[1]["success"], json!(false));
}

#[tokio::test]
async fn test_unknown_criteria_is_bad_request() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(admin_request(
            "GET",
            "/api/users/test-accounts?criteria=bogus",
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pack_endpoints() {
    let (app, _) = create_test_app();

    let response = app
        .clone()
        .oneshot(admin_request(
            "POST",
            "/api/packs",
            Some(json!({"pack_name": "road_safety"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], json!("Road Safety"));

    let response = app
        .clone()
        .oneshot(admin_request(
            "POST",
            "/api/packs/road_safety/questions",
            Some(json!({"questions": [{"prompt": "Stop?", "correctAnswer": {"text": "Red"}}]})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Cleanup accepts an empty body
    let response = app
        .clone()
        .oneshot(admin_request("POST", "/api/packs/cleanup", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["cleaned"], json!(0));

    let response = app
        .oneshot(admin_request("GET", "/api/packs", None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body[0]["question_count"], json!(1));
}

#[tokio::test]
async fn test_token_query_validation() {
    let (app, _) = create_test_app();

    let response = app
        .clone()
        .oneshot(admin_request("GET", "/api/tokens/errors?days=0", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(admin_request("GET", "/api/tokens/events?types=bogus", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(admin_request("GET", "/api/tokens/summary", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/users")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // OPTIONS should return 200 (CORS preflight success)
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_public_route_no_auth_required() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Health should be accessible without auth
    assert_eq!(response.status(), StatusCode::OK);
}
