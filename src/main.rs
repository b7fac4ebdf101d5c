// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Danoggin Admin API Server
//!
//! Maintenance endpoints for the Danoggin check-in app: user and status
//! cleanup, question packs and image migration, notification token health.

use danoggin_admin::{
    config::Config, db::FirestoreDb, storage::CloudStorage, AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Danoggin admin API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id).await?;

    // Initialize Cloud Storage
    let blobs = CloudStorage::new(&config.storage_bucket).await?;
    tracing::info!(bucket = %config.storage_bucket, "Cloud Storage initialized");

    if !config.assets_root.is_dir() {
        tracing::warn!(
            path = %config.assets_root.display(),
            "Assets folder not found; image migration will report missing files"
        );
    }

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), Arc::new(db), Arc::new(blobs)));

    // Build router
    let app = danoggin_admin::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("danoggin_admin=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
