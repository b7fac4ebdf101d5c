//! User model for storage and API.

use crate::time_utils::format_timestamp;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Role of an app user. Unrecognized stored roles map to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Responder,
    Observer,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Field on this role's documents that holds its half of each link.
    pub fn links_field(self) -> Option<&'static str> {
        match self {
            Role::Responder => Some(LINKED_OBSERVERS),
            Role::Observer => Some(OBSERVING),
            Role::Unknown => None,
        }
    }

    /// Role on the other end of this role's links.
    pub fn counterpart(self) -> Option<Role> {
        match self {
            Role::Responder => Some(Role::Observer),
            Role::Observer => Some(Role::Responder),
            Role::Unknown => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Responder => "responder",
            Role::Observer => "observer",
            Role::Unknown => "unknown",
        }
    }
}

/// Responder field: observer id -> observer name.
pub const LINKED_OBSERVERS: &str = "linkedObservers";
/// Observer field: responder id -> responder name.
pub const OBSERVING: &str = "observing";

fn unnamed() -> String {
    "Unnamed".to_string()
}

/// Older app versions wrote explicit nulls; read them as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_unnamed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unnamed))
}

/// User profile stored in Firestore (`users/{id}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Document id
    #[serde(default, skip_serializing)]
    pub id: String,
    #[serde(default = "unnamed", deserialize_with = "null_as_unnamed")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
    /// Creation time as written by the app (timestamp or string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    /// Invite code (responders only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub linked_observers: BTreeMap<String, String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub observing: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub engagement_metrics: EngagementMetrics,
}

impl User {
    /// This user's half of its links: counterpart id -> counterpart name.
    pub fn links(&self) -> &BTreeMap<String, String> {
        match self.role {
            Role::Observer => &self.observing,
            _ => &self.linked_observers,
        }
    }

    pub fn created_at_display(&self) -> Option<String> {
        self.created_at.as_ref().map(format_timestamp)
    }
}

/// Push notification engagement counters maintained by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementMetrics {
    #[serde(default, deserialize_with = "null_as_default")]
    pub engagement_score: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub token_failure_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub successful_notification_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_successful_notification: Option<Value>,
}

impl EngagementMetrics {
    /// `"{successes}/{total} ({pct}%)"`, or `"No data"` without notifications.
    pub fn token_health(&self) -> String {
        let total = self.token_failure_count + self.successful_notification_count;
        if total == 0 {
            return "No data".to_string();
        }
        let rate = self.successful_notification_count as f64 / total as f64 * 100.0;
        format!(
            "{}/{} ({:.1}%)",
            self.successful_notification_count, total, rate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_parsing_falls_back_to_unknown() {
        let user: User = serde_json::from_value(json!({"name": "X", "role": "admin"})).unwrap();
        assert_eq!(user.role, Role::Unknown);

        let user: User = serde_json::from_value(json!({"role": "observer"})).unwrap();
        assert_eq!(user.role, Role::Observer);
        assert_eq!(user.name, "Unnamed");
    }

    #[test]
    fn test_explicit_nulls_read_as_defaults() {
        let user: User = serde_json::from_value(json!({
            "name": null,
            "role": "observer",
            "observing": null,
            "engagementMetrics": null
        }))
        .unwrap();
        assert_eq!(user.name, "Unnamed");
        assert!(user.observing.is_empty());
        assert_eq!(user.engagement_metrics.token_health(), "No data");

        let user: User = serde_json::from_value(json!({
            "name": "Zed",
            "role": null,
            "engagementMetrics": {"tokenFailureCount": null}
        }))
        .unwrap();
        assert_eq!(user.role, Role::Unknown);
        assert_eq!(user.engagement_metrics.token_failure_count, 0);
    }

    #[test]
    fn test_links_follow_role() {
        let user: User = serde_json::from_value(json!({
            "role": "responder",
            "linkedObservers": {"o1": "Olive"},
            "observing": {"stale": "ignored"}
        }))
        .unwrap();

        assert_eq!(user.links().len(), 1);
        assert!(user.links().contains_key("o1"));
        assert_eq!(Role::Responder.links_field(), Some(LINKED_OBSERVERS));
        assert_eq!(Role::Responder.counterpart(), Some(Role::Observer));
    }

    #[test]
    fn test_token_health() {
        let metrics = EngagementMetrics {
            successful_notification_count: 9,
            token_failure_count: 1,
            ..Default::default()
        };
        assert_eq!(metrics.token_health(), "9/10 (90.0%)");
        assert_eq!(EngagementMetrics::default().token_health(), "No data");
    }
}
