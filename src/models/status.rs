//! Responder status aggregates and their check-ins.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A check-in record (`responder_status/{id}/check_ins/{check_in_id}`).
///
/// Only the fields the admin views need are modeled; the rest is kept opaque.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckIn {
    #[serde(default)]
    pub id: String,
    /// Sortable timestamp (string or store timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Per-responder summary for the status dashboard.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusSummary {
    pub id: String,
    pub check_ins: usize,
    /// Latest check-in timestamp, `"Never"` without check-ins
    pub latest_check_in: String,
}
