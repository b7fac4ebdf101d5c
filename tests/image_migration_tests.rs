// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Question pack image migration tests.
//!
//! Local assets live in a temporary directory; uploads go to the in-memory
//! blob store.

use danoggin_admin::error::AppError;
use danoggin_admin::models::QuestionPack;
use danoggin_admin::services::ImageMigrationService;
use danoggin_admin::storage::public_url;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

mod common;
use common::{packs, TestBackend};

const BUCKET: &str = "test-project.appspot.com";

fn assets_with(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, data) in files {
        let full = dir.path().join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, data).unwrap();
    }
    dir
}

fn option(image_path: &str) -> Value {
    json!({"text": image_path, "imagePath": image_path})
}

fn question(correct: Value, decoys: Vec<Value>) -> Value {
    json!({"prompt": "Which one?", "correctAnswer": correct, "decoyAnswers": decoys})
}

async fn load_pack(backend: &TestBackend, id: &str) -> QuestionPack {
    backend
        .store()
        .collection("question_packs")
        .get::<QuestionPack>(id)
        .await
        .unwrap()
        .unwrap()
}

fn service(backend: &TestBackend) -> ImageMigrationService {
    ImageMigrationService::new(backend.store(), backend.blobs.clone())
}

#[tokio::test]
async fn test_migrate_pack_counts_uploads_and_missing_files() {
    let backend = TestBackend::new();
    let assets = assets_with(&[("images/cat.png", "cat")]);
    backend
        .put(
            &packs(),
            "animals",
            json!({
                "name": "Animals",
                "questions": [question(option("assets/images/cat.png"), vec![option("assets/images/dog.png")])]
            }),
        )
        .await;

    let counts = service(&backend)
        .migrate_pack("animals", assets.path())
        .await
        .unwrap();

    assert_eq!(counts.success, 1);
    assert_eq!(counts.failed, 1);

    let dest = "question_packs/animals/images/cat.png";
    assert_eq!(backend.blobs.object(dest).unwrap(), b"cat".to_vec());
    assert!(backend.blobs.is_public(dest));

    let pack = load_pack(&backend, "animals").await;
    assert_eq!(pack.image_folder, "question_packs/animals/images");
    let q = &pack.questions[0];
    assert_eq!(
        q.correct_answer.image_url.as_deref(),
        Some(public_url(BUCKET, dest).as_str())
    );
    assert!(q.decoy_answers[0].image_url.is_none());
    // Unmodeled fields survive the rewrite
    assert_eq!(q.extra["prompt"], json!("Which one?"));
    assert_eq!(q.correct_answer.extra["text"], json!("assets/images/cat.png"));
}

#[tokio::test]
async fn test_second_run_uploads_nothing() {
    let backend = TestBackend::new();
    let assets = assets_with(&[("images/cat.png", "cat")]);
    backend
        .put(
            &packs(),
            "animals",
            json!({"questions": [question(option("assets/images/cat.png"), vec![])]}),
        )
        .await;

    let migration = service(&backend);
    let first = migration.migrate_pack("animals", assets.path()).await.unwrap();
    let second = migration.migrate_pack("animals", assets.path()).await.unwrap();

    assert_eq!(first.success, 1);
    assert_eq!(second.success, 0);
    assert_eq!(second.failed, 0);
    assert_eq!(backend.blobs.upload_count(), 1);
}

#[tokio::test]
async fn test_same_image_uploaded_once_per_pack() {
    let backend = TestBackend::new();
    let assets = assets_with(&[("images/cat.png", "cat")]);
    backend
        .put(
            &packs(),
            "animals",
            json!({"questions": [
                question(option("assets/images/cat.png"), vec![]),
                question(option("assets/images/cat.png"), vec![option("assets/images/cat.png")]),
            ]}),
        )
        .await;

    let counts = service(&backend)
        .migrate_pack("animals", assets.path())
        .await
        .unwrap();

    assert_eq!(counts.success, 1);
    assert_eq!(backend.blobs.upload_count(), 1);

    let pack = load_pack(&backend, "animals").await;
    let urls: Vec<_> = pack
        .options()
        .map(|o| o.image_url.clone().unwrap())
        .collect();
    assert_eq!(urls.len(), 3);
    assert!(urls.iter().all(|u| u == &urls[0]));
}

#[tokio::test]
async fn test_shared_image_with_one_missing_file() {
    let backend = TestBackend::new();
    let assets = assets_with(&[("images/shared.png", "shared")]);
    let shared = || option("assets/images/shared.png");
    backend
        .put(
            &packs(),
            "demo",
            json!({"questions": [
                question(shared(), vec![shared(), shared()]),
                question(shared(), vec![shared(), option("assets/images/gone.png")]),
            ]}),
        )
        .await;

    let counts = service(&backend)
        .migrate_pack("demo", assets.path())
        .await
        .unwrap();

    assert_eq!(counts.success, 1);
    assert_eq!(counts.failed, 1);
    assert_eq!(backend.blobs.upload_count(), 1);

    let pack = load_pack(&backend, "demo").await;
    let urls: Vec<_> = pack.options().map(|o| o.image_url.clone()).collect();
    assert_eq!(urls.len(), 6);
    let migrated: Vec<_> = urls.iter().flatten().collect();
    assert_eq!(migrated.len(), 5);
    assert!(migrated.iter().all(|u| *u == migrated[0]));
    assert!(urls[5].is_none());
}

#[tokio::test]
async fn test_existing_object_is_reused_not_counted() {
    let backend = TestBackend::new();
    let assets = assets_with(&[("images/cat.png", "cat")]);
    backend
        .blobs
        .insert("question_packs/animals/images/cat.png", b"cat".to_vec());
    backend
        .put(
            &packs(),
            "animals",
            json!({"questions": [question(option("assets/images/cat.png"), vec![])]}),
        )
        .await;

    let counts = service(&backend)
        .migrate_pack("animals", assets.path())
        .await
        .unwrap();

    assert_eq!(counts.success, 0);
    assert_eq!(counts.failed, 0);
    assert_eq!(backend.blobs.upload_count(), 0);
    let pack = load_pack(&backend, "animals").await;
    assert!(pack.questions[0].correct_answer.has_image_url());
}

#[tokio::test]
async fn test_file_name_collision_gets_hashed_name() {
    let backend = TestBackend::new();
    let assets = assets_with(&[
        ("images/cat.png", "house cat"),
        ("wild/cat.png", "wild cat"),
    ]);
    backend
        .put(
            &packs(),
            "animals",
            json!({"questions": [question(
                option("assets/images/cat.png"),
                vec![option("assets/wild/cat.png")]
            )]}),
        )
        .await;

    let counts = service(&backend)
        .migrate_pack("animals", assets.path())
        .await
        .unwrap();
    assert_eq!(counts.success, 2);

    let paths = backend.blobs.paths();
    assert_eq!(paths.len(), 2);
    assert!(paths.contains(&"question_packs/animals/images/cat.png".to_string()));
    let hashed = paths
        .iter()
        .find(|p| p.as_str() != "question_packs/animals/images/cat.png")
        .unwrap();
    assert!(hashed.starts_with("question_packs/animals/images/cat-"));
    assert!(hashed.ends_with(".png"));
    assert_eq!(backend.blobs.object(hashed).unwrap(), b"wild cat".to_vec());
}

#[tokio::test]
async fn test_upload_failure_leaves_option_pending() {
    let backend = TestBackend::new();
    let assets = assets_with(&[("images/cat.png", "cat"), ("images/owl.png", "owl")]);
    backend
        .blobs
        .fail_uploads_to("question_packs/animals/images/owl.png");
    backend
        .put(
            &packs(),
            "animals",
            json!({"questions": [question(
                option("assets/images/cat.png"),
                vec![option("assets/images/owl.png")]
            )]}),
        )
        .await;

    let counts = service(&backend)
        .migrate_pack("animals", assets.path())
        .await
        .unwrap();

    assert_eq!(counts.success, 1);
    assert_eq!(counts.failed, 1);
    let pack = load_pack(&backend, "animals").await;
    assert!(pack.questions[0].decoy_answers[0].is_pending_migration());
}

#[tokio::test]
async fn test_missing_pack_yields_zero_counts() {
    let backend = TestBackend::new();
    let counts = service(&backend)
        .migrate_pack("nothing", Path::new("/nonexistent"))
        .await
        .unwrap();
    assert_eq!(counts.success, 0);
    assert_eq!(counts.failed, 0);
    assert!(backend.fields(&packs(), "nothing").await.is_none());
}

#[tokio::test]
async fn test_migrate_all_packs_sums_counts() {
    let backend = TestBackend::new();
    let assets = assets_with(&[("images/cat.png", "cat"), ("images/fir.png", "fir")]);
    backend
        .put(
            &packs(),
            "animals",
            json!({"questions": [question(option("assets/images/cat.png"), vec![])]}),
        )
        .await;
    backend
        .put(
            &packs(),
            "trees",
            json!({"questions": [question(
                option("assets/images/fir.png"),
                vec![option("assets/images/oak.png")]
            )]}),
        )
        .await;

    let totals = service(&backend)
        .migrate_all_packs(assets.path())
        .await
        .unwrap();

    assert_eq!(totals.packs, 2);
    assert_eq!(totals.success, 2);
    assert_eq!(totals.failed, 1);
}

#[tokio::test]
async fn test_legacy_flags_removed() {
    let backend = TestBackend::new();
    let migrated = json!({
        "imagePath": "assets/images/cat.png",
        "imageUrl": public_url(BUCKET, "question_packs/animals/images/cat.png"),
        "newly_uploaded": true
    });
    backend
        .put(
            &packs(),
            "animals",
            json!({"questions": [question(migrated.clone(), vec![migrated])]}),
        )
        .await;

    let migration = service(&backend);
    assert_eq!(migration.cleanup_legacy_fields(None).await.unwrap(), 2);
    assert_eq!(
        migration.cleanup_legacy_fields(Some("animals")).await.unwrap(),
        0
    );

    let stored = backend.fields(&packs(), "animals").await.unwrap();
    assert!(stored["questions"][0]["correctAnswer"]
        .get("newly_uploaded")
        .is_none());

    let err = migration
        .cleanup_legacy_fields(Some("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
