// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User listings, test account detection and engagement analytics.

use crate::db::{collections, DocumentStore};
use crate::error::{AppError, Result};
use crate::models::{Role, User};
use crate::services::relationships::{LinkIssue, RelationshipGraph};
use crate::time_utils::{format_timestamp, stored_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

/// Accounts younger than this are never flagged for inactivity.
const INACTIVE_AFTER_DAYS: i64 = 7;
const LOW_ENGAGEMENT_SCORE: f64 = 20.0;

/// A user row for the admin views.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    /// Counterpart id -> name, from this user's own map
    pub links: BTreeMap<String, String>,
    pub engagement_score: f64,
    pub token_failure_count: u64,
    pub successful_notification_count: u64,
    pub token_health: String,
    pub last_successful_notification: String,
    pub is_likely_test: bool,
}

impl UserView {
    fn from_user(user: User) -> Self {
        let metrics = &user.engagement_metrics;
        Self {
            created_at: user.created_at_display(),
            invite_code: match user.role {
                Role::Responder => user.invite_code.clone(),
                _ => None,
            },
            links: match user.role {
                Role::Unknown => BTreeMap::new(),
                _ => user.links().clone(),
            },
            engagement_score: metrics.engagement_score,
            token_failure_count: metrics.token_failure_count,
            successful_notification_count: metrics.successful_notification_count,
            token_health: metrics.token_health(),
            last_successful_notification: metrics
                .last_successful_notification
                .as_ref()
                .map(format_timestamp)
                .unwrap_or_else(|| "Never".to_string()),
            is_likely_test: is_likely_test_name(&user.name),
            role: user.role,
            id: user.id,
            name: user.name,
        }
    }
}

/// Test accounts are conventionally named with digits ("Observer 2").
pub fn is_likely_test_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_digit())
}

/// Extra rules for flagging test accounts, beyond the name rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestCriterion {
    /// Engagement score below 20
    LowEngagement,
    /// No successful notifications on an account older than a week
    NoActivity,
}

impl FromStr for TestCriterion {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "low_engagement" => Ok(TestCriterion::LowEngagement),
            "no_activity" => Ok(TestCriterion::NoActivity),
            other => Err(AppError::BadRequest(format!(
                "Unknown test account criterion: {}",
                other
            ))),
        }
    }
}

/// Engagement totals across all users.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct EngagementSummary {
    pub total_users: usize,
    pub healthy_users: usize,
    pub declining_users: usize,
    pub churned_users: usize,
    pub test_accounts: usize,
    /// Over users with at least one successful notification
    pub avg_notification_success_rate: f64,
    pub users_with_activity: usize,
}

pub struct UserService {
    db: Arc<dyn DocumentStore>,
}

impl UserService {
    pub fn new(db: Arc<dyn DocumentStore>) -> Self {
        Self { db }
    }

    async fn users(&self) -> Result<Vec<User>> {
        Ok(self.db.collection(collections::USERS).stream_valid().await?)
    }

    pub async fn list_users(&self) -> Result<Vec<UserView>> {
        Ok(self
            .users()
            .await?
            .into_iter()
            .map(UserView::from_user)
            .collect())
    }

    /// Ids of likely test accounts.
    pub async fn identify_test_accounts(&self, criteria: &[TestCriterion]) -> Result<Vec<String>> {
        let now = Utc::now();
        Ok(self
            .users()
            .await?
            .into_iter()
            .filter(|user| is_test_account(user, criteria, now))
            .map(|user| user.id)
            .collect())
    }

    pub async fn relationship_audit(&self) -> Result<Vec<LinkIssue>> {
        let graph = RelationshipGraph::load(self.db.as_ref()).await?;
        let issues = graph.audit();
        if !issues.is_empty() {
            tracing::warn!(issues = issues.len(), "Relationship drift detected");
        }
        Ok(issues)
    }

    pub async fn engagement_summary(&self) -> Result<EngagementSummary> {
        Ok(summarize_engagement(&self.users().await?))
    }
}

fn is_test_account(user: &User, criteria: &[TestCriterion], now: DateTime<Utc>) -> bool {
    if is_likely_test_name(&user.name) {
        return true;
    }

    let metrics = &user.engagement_metrics;
    criteria.iter().any(|criterion| match criterion {
        TestCriterion::LowEngagement => metrics.engagement_score < LOW_ENGAGEMENT_SCORE,
        TestCriterion::NoActivity => {
            metrics.successful_notification_count == 0
                && user
                    .created_at
                    .as_ref()
                    .and_then(stored_timestamp)
                    .is_some_and(|created| now - created > chrono::Duration::days(INACTIVE_AFTER_DAYS))
        }
    })
}

fn summarize_engagement(users: &[User]) -> EngagementSummary {
    let score = |u: &User| u.engagement_metrics.engagement_score;
    let active: Vec<&User> = users
        .iter()
        .filter(|u| u.engagement_metrics.successful_notification_count > 0)
        .collect();

    let successes: u64 = active
        .iter()
        .map(|u| u.engagement_metrics.successful_notification_count)
        .sum();
    let failures: u64 = active
        .iter()
        .map(|u| u.engagement_metrics.token_failure_count)
        .sum();
    let attempts = successes + failures;

    EngagementSummary {
        total_users: users.len(),
        healthy_users: users.iter().filter(|u| score(u) > 90.0).count(),
        declining_users: users
            .iter()
            .filter(|u| (50.0..=90.0).contains(&score(u)))
            .count(),
        churned_users: users.iter().filter(|u| score(u) < 50.0).count(),
        test_accounts: users.iter().filter(|u| is_likely_test_name(&u.name)).count(),
        avg_notification_success_rate: if attempts > 0 {
            successes as f64 / attempts as f64 * 100.0
        } else {
            0.0
        },
        users_with_activity: active.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EngagementMetrics;
    use chrono::TimeZone;
    use serde_json::json;

    fn user(name: &str, score: f64, successes: u64, failures: u64) -> User {
        User {
            id: name.to_lowercase(),
            name: name.to_string(),
            role: Role::Responder,
            engagement_metrics: EngagementMetrics {
                engagement_score: score,
                successful_notification_count: successes,
                token_failure_count: failures,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_is_likely_test_name() {
        assert!(is_likely_test_name("Observer 2"));
        assert!(!is_likely_test_name("Grandma"));
    }

    #[test]
    fn test_criteria() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

        let mut old_idle = user("Idle", 80.0, 0, 0);
        old_idle.created_at = Some(json!("2025-05-01T00:00:00Z"));
        let mut new_idle = user("Fresh", 80.0, 0, 0);
        new_idle.created_at = Some(json!("2025-05-30T00:00:00Z"));
        let low = user("Quiet", 10.0, 5, 0);

        assert!(!is_test_account(&old_idle, &[], now));
        assert!(is_test_account(&old_idle, &[TestCriterion::NoActivity], now));
        assert!(!is_test_account(&new_idle, &[TestCriterion::NoActivity], now));
        assert!(is_test_account(&low, &[TestCriterion::LowEngagement], now));
        assert!(!is_test_account(&low, &[TestCriterion::NoActivity], now));
    }

    #[test]
    fn test_criterion_parsing() {
        assert_eq!(
            "low_engagement".parse::<TestCriterion>().unwrap(),
            TestCriterion::LowEngagement
        );
        assert!("bogus".parse::<TestCriterion>().is_err());
    }

    #[test]
    fn test_engagement_summary_buckets() {
        let users = vec![
            user("Healthy", 95.0, 9, 1),
            user("Edge", 90.0, 0, 3),
            user("Declining", 50.0, 1, 1),
            user("Churned 1", 10.0, 0, 0),
        ];

        let summary = summarize_engagement(&users);

        assert_eq!(summary.total_users, 4);
        assert_eq!(summary.healthy_users, 1);
        assert_eq!(summary.declining_users, 2);
        assert_eq!(summary.churned_users, 1);
        assert_eq!(summary.test_accounts, 1);
        assert_eq!(summary.users_with_activity, 2);
        // 10 successes out of 12 attempts among active users
        assert!((summary.avg_notification_success_rate - 83.333).abs() < 0.01);
    }
}
