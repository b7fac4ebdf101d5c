//! Push notification token health records written by the backend functions.

use serde::{Deserialize, Serialize};

/// Kind of token event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenEventType {
    Error,
    Strike,
    Removal,
    #[serde(other)]
    Other,
}

/// A token event (`token_events/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub event_type: Option<TokenEventType>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    /// ISO 8601 timestamp
    #[serde(default)]
    pub timestamp: String,
}

/// Daily token metrics (`daily_metrics/token_metrics_{YYYY-MM-DD}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMetric {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub system_summary: SystemSummary,
    #[serde(default)]
    pub token_removals: TokenRemovals,
    #[serde(default)]
    pub token_errors: TokenErrors,
    #[serde(default)]
    pub user_impact: UserImpact,
}

/// Document id of the metrics for `date` (`YYYY-MM-DD`).
pub fn daily_metric_id(date: &str) -> String {
    format!("token_metrics_{}", date)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSummary {
    #[serde(default)]
    pub token_health_percentage: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRemovals {
    #[serde(default)]
    pub total_removals: u64,
    #[serde(default)]
    pub user_details: Vec<UserDetail>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenErrors {
    #[serde(default)]
    pub total_errors: u64,
    #[serde(default)]
    pub total_strikes: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserImpact {
    #[serde(default)]
    pub users_with_token_issues: u64,
    #[serde(default)]
    pub user_details: Vec<UserDetail>,
}

/// Per-user entry inside a daily metric.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub total_strikes: u64,
}
