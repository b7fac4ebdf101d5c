// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Push notification token health analysis.
//!
//! Reads the `token_events` log and the `daily_metrics` rollups written by
//! the notification backend.

use crate::db::{collections, CollectionRef, Direction, DocumentStore, FilterOp, Query};
use crate::error::Result;
use crate::models::token::daily_metric_id;
use crate::models::{DailyMetric, TokenEvent, TokenEventType};
use crate::services::batch::{delete_in_batches, BATCH_SIZE};
use crate::time_utils::{cutoff, day_of};
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Events returned by a plain listing unless a limit is given.
pub const DEFAULT_EVENT_LIMIT: u32 = 100;
/// Upper bound on events read for an analysis.
const ANALYSIS_LIMIT: u32 = 10_000;

const INVALID_TOKEN_REASON: &str = "messaging/invalid-registration-token";

/// Event counts per type.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct EventCounts {
    pub errors: usize,
    pub strikes: usize,
    pub removals: usize,
}

impl EventCounts {
    fn record(&mut self, event_type: Option<TokenEventType>) {
        match event_type {
            Some(TokenEventType::Error) => self.errors += 1,
            Some(TokenEventType::Strike) => self.strikes += 1,
            Some(TokenEventType::Removal) => self.removals += 1,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ErrorPatterns {
    pub total_errors: usize,
    pub total_strikes: usize,
    pub error_by_reason: BTreeMap<String, usize>,
    pub error_by_context: BTreeMap<String, usize>,
    pub affected_users: usize,
    pub users_by_error_count: BTreeMap<String, usize>,
    /// Events per day (`YYYY-MM-DD`)
    pub temporal_distribution: BTreeMap<String, usize>,
}

/// Daily series in chronological order.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct HealthTrends {
    pub dates: Vec<String>,
    pub token_health_percentages: Vec<f64>,
    pub total_removals: Vec<u64>,
    /// Errors plus strikes
    pub total_errors: Vec<u64>,
    pub affected_users: Vec<u64>,
    pub summary: TrendSummary,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TrendSummary {
    pub avg_health_percentage: f64,
    pub total_removals_period: u64,
    pub total_errors_period: u64,
    pub unique_affected_users: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TokenIssue {
    pub date: String,
    pub reason: String,
    pub context: String,
}

/// A user with recent token removals or strikes.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserTokenIssues {
    pub user_id: String,
    pub user_name: String,
    pub removals: Vec<TokenIssue>,
    pub total_removals: usize,
    /// Highest strike count reported on any day
    pub total_strikes: u64,
    pub contexts: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserTokenReport {
    pub user_id: String,
    pub recent_events: Vec<TokenEvent>,
    pub total_events: usize,
    pub event_counts: EventCounts,
    pub error_patterns: BTreeMap<String, usize>,
    pub contexts: BTreeMap<String, usize>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RecentEventCounts {
    pub last_24h: usize,
    pub last_7d: usize,
    pub last_30d: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryStats {
    pub recent_events: RecentEventCounts,
    /// Over the last 7 days
    pub event_types: EventCounts,
    pub top_error_reasons: BTreeMap<String, usize>,
    pub affected_users_7d: usize,
    pub latest_daily_metric: Option<DailyMetric>,
}

pub struct TokenHealthService {
    db: Arc<dyn DocumentStore>,
}

impl TokenHealthService {
    pub fn new(db: Arc<dyn DocumentStore>) -> Self {
        Self { db }
    }

    fn events(&self) -> CollectionRef<'_> {
        self.db.collection(collections::TOKEN_EVENTS)
    }

    /// Events from the last `days` days, newest first, optionally restricted
    /// to some event types.
    pub async fn recent_events(
        &self,
        days: i64,
        event_types: Option<&[TokenEventType]>,
        limit: Option<u32>,
    ) -> Result<Vec<TokenEvent>> {
        let query = Query::new()
            .filter("timestamp", FilterOp::GreaterThanOrEqual, cutoff(Utc::now(), days))
            .order_by("timestamp", Direction::Descending)
            .limit(limit.unwrap_or(DEFAULT_EVENT_LIMIT));

        let events: Vec<TokenEvent> = self.events().query(&query).await?;
        Ok(match event_types {
            Some(types) => events
                .into_iter()
                .filter(|e| e.event_type.is_some_and(|t| types.contains(&t)))
                .collect(),
            None => events,
        })
    }

    pub async fn events_for_user(&self, user_id: &str, days: i64) -> Result<Vec<TokenEvent>> {
        let query = Query::new()
            .filter("userId", FilterOp::Equal, user_id)
            .filter("timestamp", FilterOp::GreaterThanOrEqual, cutoff(Utc::now(), days))
            .order_by("timestamp", Direction::Descending);
        Ok(self.events().query(&query).await?)
    }

    pub async fn error_patterns(&self, days: i64) -> Result<ErrorPatterns> {
        let events = self
            .recent_events(
                days,
                Some(&[TokenEventType::Error, TokenEventType::Strike][..]),
                Some(ANALYSIS_LIMIT),
            )
            .await?;
        Ok(analyze_errors(&events))
    }

    /// Stored daily metrics for the last `days` days, newest first.
    pub async fn daily_metrics(&self, days: i64) -> Result<Vec<DailyMetric>> {
        let metrics_col = self.db.collection(collections::DAILY_METRICS);
        let today = Utc::now().date_naive();

        let mut metrics = Vec::new();
        for offset in (0..=days).rev() {
            let date = today - chrono::Duration::days(offset);
            let id = daily_metric_id(&date.format("%Y-%m-%d").to_string());
            if let Some(metric) = metrics_col.get::<DailyMetric>(&id).await? {
                metrics.push(metric);
            }
        }

        metrics.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(metrics)
    }

    pub async fn health_trends(&self, days: i64) -> Result<HealthTrends> {
        Ok(build_trends(&self.daily_metrics(days).await?))
    }

    pub async fn users_with_token_issues(&self, days: i64) -> Result<Vec<UserTokenIssues>> {
        Ok(collect_user_issues(&self.daily_metrics(days).await?))
    }

    /// Last 30 days of events for one user, with recommendations.
    pub async fn user_report(&self, user_id: &str) -> Result<UserTokenReport> {
        let events = self.events_for_user(user_id, 30).await?;
        Ok(build_user_report(user_id, events))
    }

    pub async fn summary_stats(&self) -> Result<SummaryStats> {
        let last_24h = self.recent_events(1, None, Some(ANALYSIS_LIMIT)).await?;
        let last_7d = self.recent_events(7, None, Some(ANALYSIS_LIMIT)).await?;
        let last_30d = self.recent_events(30, None, Some(ANALYSIS_LIMIT)).await?;

        let mut event_types = EventCounts::default();
        let mut top_error_reasons = BTreeMap::new();
        let mut affected = BTreeSet::new();
        for event in &last_7d {
            event_types.record(event.event_type);
            if let Some(reason) = event.reason.as_deref().filter(|r| !r.is_empty()) {
                *top_error_reasons.entry(reason.to_string()).or_insert(0) += 1;
            }
            if let Some(user_id) = event.user_id.as_deref().filter(|u| !u.is_empty()) {
                affected.insert(user_id.to_string());
            }
        }

        Ok(SummaryStats {
            recent_events: RecentEventCounts {
                last_24h: last_24h.len(),
                last_7d: last_7d.len(),
                last_30d: last_30d.len(),
            },
            event_types,
            top_error_reasons,
            affected_users_7d: affected.len(),
            latest_daily_metric: self.daily_metrics(1).await?.into_iter().next(),
        })
    }

    /// Reports for several users. With `None`, every user with an event in
    /// the last `days` days.
    pub async fn export_user_data(
        &self,
        user_ids: Option<Vec<String>>,
        days: i64,
    ) -> Result<Vec<UserTokenReport>> {
        let user_ids = match user_ids {
            Some(ids) => ids,
            None => self
                .recent_events(days, None, Some(ANALYSIS_LIMIT))
                .await?
                .into_iter()
                .filter_map(|e| e.user_id)
                .filter(|id| !id.is_empty())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        };

        let mut reports = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            reports.push(self.user_report(&user_id).await?);
        }
        Ok(reports)
    }

    /// Delete events older than `days_to_keep` days. Returns the number deleted.
    pub async fn cleanup_old_events(&self, days_to_keep: i64) -> Result<usize> {
        let before = cutoff(Utc::now(), days_to_keep);
        tracing::info!(cutoff = %before, "Cleaning up old token events");

        let query = Query::new()
            .filter("timestamp", FilterOp::LessThan, before.as_str())
            .limit(BATCH_SIZE as u32);

        let mut total = 0;
        loop {
            let ids: Vec<String> = self
                .events()
                .docs(&query)
                .await?
                .into_iter()
                .map(|doc| doc.id)
                .collect();
            if ids.is_empty() {
                break;
            }

            total += delete_in_batches(self.db.as_ref(), self.events().path(), &ids).await?;
            tracing::debug!(deleted = ids.len(), total, "Deleted old token events");

            if ids.len() < BATCH_SIZE {
                break;
            }
        }

        tracing::info!(total, "Token event cleanup complete");
        Ok(total)
    }
}

fn analyze_errors(events: &[TokenEvent]) -> ErrorPatterns {
    let mut patterns = ErrorPatterns::default();
    let mut affected = BTreeSet::new();

    for event in events {
        match event.event_type {
            Some(TokenEventType::Error) => patterns.total_errors += 1,
            Some(TokenEventType::Strike) => patterns.total_strikes += 1,
            _ => {}
        }

        let reason = event.reason.clone().unwrap_or_else(|| "unknown".to_string());
        *patterns.error_by_reason.entry(reason).or_insert(0) += 1;
        let context = event.context.clone().unwrap_or_else(|| "unknown".to_string());
        *patterns.error_by_context.entry(context).or_insert(0) += 1;

        if let Some(user_id) = event.user_id.as_deref().filter(|u| !u.is_empty()) {
            affected.insert(user_id.to_string());
            *patterns
                .users_by_error_count
                .entry(user_id.to_string())
                .or_insert(0) += 1;
        }

        if let Some(day) = day_of(&event.timestamp) {
            *patterns
                .temporal_distribution
                .entry(day.format("%Y-%m-%d").to_string())
                .or_insert(0) += 1;
        }
    }

    patterns.affected_users = affected.len();
    patterns
}

/// `metrics` newest first, as returned by `daily_metrics`.
fn build_trends(metrics: &[DailyMetric]) -> HealthTrends {
    let mut trends = HealthTrends::default();
    let mut unique_users = BTreeSet::new();

    for metric in metrics.iter().rev() {
        let errors = metric.token_errors.total_errors + metric.token_errors.total_strikes;

        trends.dates.push(metric.date.clone());
        trends
            .token_health_percentages
            .push(metric.system_summary.token_health_percentage);
        trends.total_removals.push(metric.token_removals.total_removals);
        trends.total_errors.push(errors);
        trends
            .affected_users
            .push(metric.user_impact.users_with_token_issues);

        trends.summary.total_removals_period += metric.token_removals.total_removals;
        trends.summary.total_errors_period += errors;
        unique_users.extend(
            metric
                .user_impact
                .user_details
                .iter()
                .map(|d| d.user_id.clone())
                .filter(|id| !id.is_empty()),
        );
    }

    if !trends.token_health_percentages.is_empty() {
        trends.summary.avg_health_percentage = trends.token_health_percentages.iter().sum::<f64>()
            / trends.token_health_percentages.len() as f64;
    }
    trends.summary.unique_affected_users = unique_users.len();
    trends
}

fn issues_entry<'a>(
    users: &'a mut BTreeMap<String, UserTokenIssues>,
    user_id: &str,
    user_name: Option<&str>,
) -> &'a mut UserTokenIssues {
    users
        .entry(user_id.to_string())
        .or_insert_with(|| UserTokenIssues {
            user_id: user_id.to_string(),
            user_name: user_name.unwrap_or("Unknown").to_string(),
            removals: Vec::new(),
            total_removals: 0,
            total_strikes: 0,
            contexts: BTreeSet::new(),
        })
}

fn collect_user_issues(metrics: &[DailyMetric]) -> Vec<UserTokenIssues> {
    let mut users: BTreeMap<String, UserTokenIssues> = BTreeMap::new();

    for metric in metrics {
        for detail in &metric.token_removals.user_details {
            if detail.user_id.is_empty() {
                continue;
            }
            let user = issues_entry(&mut users, &detail.user_id, detail.user_name.as_deref());
            let context = detail.context.clone().unwrap_or_default();
            user.removals.push(TokenIssue {
                date: metric.date.clone(),
                reason: detail.reason.clone().unwrap_or_default(),
                context: context.clone(),
            });
            user.total_removals += 1;
            user.contexts.insert(context);
        }

        for detail in &metric.user_impact.user_details {
            if detail.user_id.is_empty() {
                continue;
            }
            let user = issues_entry(&mut users, &detail.user_id, detail.user_name.as_deref());
            user.total_strikes = user.total_strikes.max(detail.total_strikes);
        }
    }

    users.into_values().collect()
}

fn build_user_report(user_id: &str, events: Vec<TokenEvent>) -> UserTokenReport {
    let mut event_counts = EventCounts::default();
    let mut error_patterns = BTreeMap::new();
    let mut contexts = BTreeMap::new();

    for event in &events {
        event_counts.record(event.event_type);
        if let Some(reason) = event.reason.as_deref().filter(|r| !r.is_empty()) {
            *error_patterns.entry(reason.to_string()).or_insert(0) += 1;
        }
        if let Some(context) = event.context.as_deref().filter(|c| !c.is_empty()) {
            *contexts.entry(context.to_string()).or_insert(0) += 1;
        }
    }

    let mut recommendations = Vec::new();
    if event_counts.removals > 0 {
        recommendations.push("User has had tokens removed - check device connectivity".to_string());
    }
    if event_counts.strikes >= 2 {
        recommendations.push("User has multiple strikes - monitor for chronic issues".to_string());
    }
    if error_patterns.contains_key(INVALID_TOKEN_REASON) {
        recommendations
            .push("Invalid token errors detected - user may need to reinstall app".to_string());
    }
    if events.is_empty() {
        recommendations.push("No recent token events - user appears healthy".to_string());
    }

    UserTokenReport {
        user_id: user_id.to_string(),
        total_events: events.len(),
        recent_events: events,
        event_counts,
        error_patterns,
        contexts,
        recommendations,
    }
}
