// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token health analytics over seeded events and daily metrics.

use chrono::{Duration, Utc};
use danoggin_admin::db::{collections, CollectionPath};
use danoggin_admin::models::token::daily_metric_id;
use danoggin_admin::models::TokenEventType;
use danoggin_admin::services::TokenHealthService;
use danoggin_admin::time_utils::format_utc_rfc3339;
use serde_json::json;

mod common;
use common::TestBackend;

fn events() -> CollectionPath {
    CollectionPath::root(collections::TOKEN_EVENTS)
}

fn metrics() -> CollectionPath {
    CollectionPath::root(collections::DAILY_METRICS)
}

fn hours_ago(hours: i64) -> String {
    format_utc_rfc3339(Utc::now() - Duration::hours(hours))
}

async fn seed_event(
    backend: &TestBackend,
    id: &str,
    user_id: &str,
    event_type: &str,
    reason: &str,
    hours: i64,
) {
    backend
        .put(
            &events(),
            id,
            json!({
                "userId": user_id,
                "eventType": event_type,
                "reason": reason,
                "context": "check_in_reminder",
                "timestamp": hours_ago(hours)
            }),
        )
        .await;
}

async fn seed_standard_events(backend: &TestBackend) {
    seed_event(backend, "e1", "u1", "error", "messaging/invalid-registration-token", 2).await;
    seed_event(backend, "e2", "u1", "strike", "messaging/invalid-registration-token", 3).await;
    seed_event(backend, "e3", "u2", "removal", "too_many_strikes", 30).await;
    seed_event(backend, "e4", "u2", "error", "messaging/internal-error", 24 * 10).await;
    seed_event(backend, "e5", "u3", "error", "old", 24 * 60).await;
}

#[tokio::test]
async fn test_recent_events_filters_by_age_and_type() {
    let backend = TestBackend::new();
    seed_standard_events(&backend).await;
    let service = TokenHealthService::new(backend.store());

    let week = service.recent_events(7, None, None).await.unwrap();
    let ids: Vec<_> = week.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["e1", "e2", "e3"], "newest first");

    let errors = service
        .recent_events(30, Some(&[TokenEventType::Error][..]), None)
        .await
        .unwrap();
    assert_eq!(errors.len(), 2);

    let limited = service.recent_events(30, None, Some(1)).await.unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn test_error_patterns() {
    let backend = TestBackend::new();
    seed_standard_events(&backend).await;
    let service = TokenHealthService::new(backend.store());

    let patterns = service.error_patterns(7).await.unwrap();
    assert_eq!(patterns.total_errors, 1);
    assert_eq!(patterns.total_strikes, 1);
    assert_eq!(patterns.affected_users, 1);
    assert_eq!(
        patterns.error_by_reason["messaging/invalid-registration-token"],
        2
    );
}

#[tokio::test]
async fn test_summary_stats_windows() {
    let backend = TestBackend::new();
    seed_standard_events(&backend).await;
    let service = TokenHealthService::new(backend.store());

    let stats = service.summary_stats().await.unwrap();
    assert_eq!(stats.recent_events.last_24h, 2);
    assert_eq!(stats.recent_events.last_7d, 3);
    assert_eq!(stats.recent_events.last_30d, 4);
    assert_eq!(stats.event_types.removals, 1);
    assert_eq!(stats.affected_users_7d, 2);
    assert!(stats.latest_daily_metric.is_none());
}

#[tokio::test]
async fn test_user_report_and_export() {
    let backend = TestBackend::new();
    seed_standard_events(&backend).await;
    let service = TokenHealthService::new(backend.store());

    let report = service.user_report("u1").await.unwrap();
    assert_eq!(report.total_events, 2);
    assert_eq!(report.event_counts.errors, 1);
    assert_eq!(report.event_counts.strikes, 1);
    assert!(!report.recommendations.is_empty());

    let exported = service.export_user_data(None, 7).await.unwrap();
    let users: Vec<_> = exported.iter().map(|r| r.user_id.as_str()).collect();
    assert_eq!(users, vec!["u1", "u2"]);

    let chosen = service
        .export_user_data(Some(vec!["u3".to_string()]), 7)
        .await
        .unwrap();
    assert_eq!(chosen.len(), 1);
    assert_eq!(chosen[0].total_events, 0);
}

#[tokio::test]
async fn test_daily_metrics_and_trends() {
    let backend = TestBackend::new();
    let today = Utc::now().date_naive();
    for (offset, health, removals) in [(0, 90.0, 2), (1, 80.0, 1), (45, 10.0, 9)] {
        let date = (today - Duration::days(offset)).format("%Y-%m-%d").to_string();
        backend
            .put(
                &metrics(),
                &daily_metric_id(&date),
                json!({
                    "date": date,
                    "systemSummary": {"tokenHealthPercentage": health},
                    "tokenRemovals": {
                        "totalRemovals": removals,
                        "userDetails": [{"userId": "u1", "userName": "Una", "reason": "too_many_strikes", "context": "daily"}]
                    },
                    "tokenErrors": {"totalErrors": 3, "totalStrikes": 1},
                    "userImpact": {"usersWithTokenIssues": 1}
                }),
            )
            .await;
    }
    let service = TokenHealthService::new(backend.store());

    let recent = service.daily_metrics(30).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent[0].date > recent[1].date);

    let trends = service.health_trends(30).await.unwrap();
    assert_eq!(trends.dates.len(), 2);
    assert_eq!(trends.summary.total_removals_period, 3);
    assert!((trends.summary.avg_health_percentage - 85.0).abs() < 1e-9);

    let issues = service.users_with_token_issues(7).await.unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].user_id, "u1");
    assert_eq!(issues[0].total_removals, 2);
}

#[tokio::test]
async fn test_cleanup_old_events() {
    let backend = TestBackend::new();
    seed_standard_events(&backend).await;
    let service = TokenHealthService::new(backend.store());

    let deleted = service.cleanup_old_events(30).await.unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(backend.db.count(&events()), 4);
    assert!(backend.fields(&events(), "e5").await.is_none());
}
