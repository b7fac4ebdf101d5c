// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod batch;
pub mod image_migration;
pub mod question_packs;
pub mod relationships;
pub mod status;
pub mod token_health;
pub mod user_deletion;
pub mod users;

pub use image_migration::{ImageMigrationService, MigrationCounts, MigrationRun, MigrationTotals};
pub use question_packs::QuestionPackService;
pub use relationships::{LinkIssue, RelationshipGraph};
pub use status::StatusService;
pub use token_health::TokenHealthService;
pub use user_deletion::{UserDeletionService, UserOutcome};
pub use users::{TestCriterion, UserService};
