// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Deletion journal and cleanup reports.

use super::user::Role;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Step a journaled user deletion had reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStage {
    Relationships,
    CheckIns,
    User,
}

impl fmt::Display for DeletionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeletionStage::Relationships => "relationships",
            DeletionStage::CheckIns => "check_ins",
            DeletionStage::User => "user",
        })
    }
}

/// Record of a user deletion too large for one atomic batch
/// (`user_deletions/{userId}`). Removed once the deletion completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionJournal {
    pub user_id: String,
    pub user_name: String,
    pub role: Role,
    /// Counterpart ids whose back-references have not been pruned yet
    #[serde(default)]
    pub counterparts: Vec<String>,
    #[serde(default)]
    pub check_ins_remaining: usize,
    pub started_at: String,
    pub stage: DeletionStage,
}

/// Result of deleting one user.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeletionReport {
    pub user_id: String,
    pub user_name: String,
    pub role: Role,
    pub counterparts_cleaned: usize,
    pub check_ins_deleted: usize,
    pub status_deleted: bool,
    /// Whether everything was committed in a single batch
    pub atomic: bool,
}

impl fmt::Display for DeletionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Deleted {} {} ({}): cleaned {} relationship(s), deleted {} check-in(s)",
            self.role.as_str(),
            self.user_name,
            self.user_id,
            self.counterparts_cleaned,
            self.check_ins_deleted
        )?;
        if self.status_deleted {
            f.write_str(" and the status document")?;
        }
        Ok(())
    }
}

/// Result of purging one responder status aggregate.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PurgeReport {
    pub responder_id: String,
    pub check_ins_deleted: usize,
}

impl fmt::Display for PurgeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Deleted status for {} and {} check-in(s)",
            self.responder_id, self.check_ins_deleted
        )
    }
}
