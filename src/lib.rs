// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Danoggin admin: maintenance toolkit for the Danoggin check-in app.
//!
//! This crate provides the admin API for cleaning up users and their
//! relationships, purging responder status history, managing question packs
//! and migrating their images to cloud storage.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;
pub mod time_utils;

use config::Config;
use db::DocumentStore;
use services::{
    ImageMigrationService, QuestionPackService, StatusService, TokenHealthService,
    UserDeletionService, UserService,
};
use std::sync::Arc;
use storage::BlobStore;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub users: UserService,
    pub deletions: UserDeletionService,
    pub status: StatusService,
    pub packs: QuestionPackService,
    pub images: ImageMigrationService,
    pub tokens: TokenHealthService,
}

impl AppState {
    pub fn new(config: Config, db: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            users: UserService::new(db.clone()),
            deletions: UserDeletionService::new(db.clone()),
            status: StatusService::new(db.clone()),
            packs: QuestionPackService::new(db.clone()),
            images: ImageMigrationService::new(db.clone(), blobs.clone()),
            tokens: TokenHealthService::new(db.clone()),
            config,
            db,
            blobs,
        }
    }
}
