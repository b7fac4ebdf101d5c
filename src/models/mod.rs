// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the admin toolkit.

pub mod deletion;
pub mod question_pack;
pub mod status;
pub mod token;
pub mod user;

pub use deletion::{DeletionJournal, DeletionReport, DeletionStage, PurgeReport};
pub use question_pack::{AnswerOption, PackSummary, Question, QuestionPack};
pub use status::{CheckIn, StatusSummary};
pub use token::{DailyMetric, TokenEvent, TokenEventType};
pub use user::{EngagementMetrics, Role, User};
