// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use danoggin_admin::config::Config;
use danoggin_admin::db::{collections, CollectionPath, DocumentStore, FirestoreDb, MemoryStore};
use danoggin_admin::routes::create_router;
use danoggin_admin::storage::MemoryBlobStore;
use danoggin_admin::AppState;
use serde_json::{json, Value};
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// In-memory stores shared by a test and the services under test.
#[allow(dead_code)]
pub struct TestBackend {
    pub db: Arc<MemoryStore>,
    pub blobs: Arc<MemoryBlobStore>,
}

#[allow(dead_code)]
impl TestBackend {
    pub fn new() -> Self {
        Self {
            db: Arc::new(MemoryStore::new()),
            blobs: Arc::new(MemoryBlobStore::new(&Config::default().storage_bucket)),
        }
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.db.clone()
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::new(AppState::new(
            Config::default(),
            self.db.clone(),
            self.blobs.clone(),
        ))
    }

    /// Write a raw document.
    pub async fn put(&self, collection: &CollectionPath, id: &str, value: Value) {
        let Value::Object(fields) = value else {
            panic!("document must be a JSON object");
        };
        self.db.set(collection, id, &fields, false).await.unwrap();
    }

    pub async fn fields(&self, collection: &CollectionPath, id: &str) -> Option<Value> {
        self.db
            .get(collection, id)
            .await
            .unwrap()
            .map(|doc| Value::Object(doc.fields))
    }

    pub async fn responder(&self, id: &str, name: &str, observers: &[(&str, &str)]) {
        let links: serde_json::Map<String, Value> = observers
            .iter()
            .map(|(id, name)| (id.to_string(), json!(name)))
            .collect();
        self.put(
            &users(),
            id,
            json!({"name": name, "role": "responder", "linkedObservers": links}),
        )
        .await;
    }

    pub async fn observer(&self, id: &str, name: &str, responders: &[(&str, &str)]) {
        let links: serde_json::Map<String, Value> = responders
            .iter()
            .map(|(id, name)| (id.to_string(), json!(name)))
            .collect();
        self.put(
            &users(),
            id,
            json!({"name": name, "role": "observer", "observing": links}),
        )
        .await;
    }

    /// Status aggregate plus `count` check-ins for a responder.
    pub async fn status_with_check_ins(&self, responder_id: &str, count: usize) {
        self.put(
            &statuses(),
            responder_id,
            json!({"lastUpdated": "2026-01-01T00:00:00Z"}),
        )
        .await;
        let check_ins = check_ins(responder_id);
        for i in 0..count {
            self.put(
                &check_ins,
                &format!("c{:04}", i),
                json!({"timestamp": format!("2026-01-01T{:02}:{:02}:00Z", i / 60 % 24, i % 60), "result": "correct"}),
            )
            .await;
        }
    }
}

#[allow(dead_code)]
pub fn users() -> CollectionPath {
    CollectionPath::root(collections::USERS)
}

#[allow(dead_code)]
pub fn statuses() -> CollectionPath {
    CollectionPath::root(collections::RESPONDER_STATUS)
}

#[allow(dead_code)]
pub fn check_ins(responder_id: &str) -> CollectionPath {
    statuses().subcollection(responder_id, collections::CHECK_INS)
}

#[allow(dead_code)]
pub fn packs() -> CollectionPath {
    CollectionPath::root(collections::QUESTION_PACKS)
}

#[allow(dead_code)]
pub fn journals() -> CollectionPath {
    CollectionPath::root(collections::USER_DELETIONS)
}

/// Create a test app over in-memory stores.
/// Returns the router and the backend.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, TestBackend) {
    let backend = TestBackend::new();
    (create_router(backend.state()), backend)
}
