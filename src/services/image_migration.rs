// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Migration of question pack images from app assets to cloud storage.
//!
//! Every answer option with a local `imagePath` and no `imageUrl` gets its
//! image uploaded to `question_packs/{packId}/images/` and the public URL
//! written back. An option that already has an `imageUrl` is never uploaded
//! again.

use crate::db::{collections, DocumentStore};
use crate::error::{AppError, Result};
use crate::models::question_pack::{image_folder, ASSET_PREFIX};
use crate::models::{AnswerOption, Question, QuestionPack};
use crate::storage::{path_from_public_url, public_url, BlobStore};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Per-pack migration result.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct MigrationCounts {
    /// Images newly uploaded
    pub success: usize,
    /// Options with an image path still lacking a URL afterwards
    pub failed: usize,
}

/// Result of migrating every pack.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct MigrationTotals {
    pub packs: usize,
    pub success: usize,
    pub failed: usize,
}

/// What happened to one option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionOutcome {
    /// No image, or already migrated
    Unchanged,
    /// URL taken from this run's cache or an object already in storage
    Reused,
    Uploaded,
}

/// Bookkeeping for one pack's migration. Never persisted.
#[derive(Debug)]
pub struct MigrationRun {
    pack_id: String,
    /// Source image path -> public URL
    urls: HashMap<String, String>,
    /// Destination object path -> source image path that claimed it
    destinations: HashMap<String, String>,
}

impl MigrationRun {
    pub fn new(pack_id: &str) -> Self {
        Self {
            pack_id: pack_id.to_string(),
            urls: HashMap::new(),
            destinations: HashMap::new(),
        }
    }

    /// Start from a pack's already migrated options, so files uploaded by
    /// earlier runs are reused and their object names stay claimed.
    pub fn seeded(pack: &QuestionPack, bucket: &str) -> Self {
        let mut run = Self::new(&pack.id);
        for option in pack.options() {
            let (Some(image_path), Some(url)) = (option.image_path(), option.image_url.as_deref())
            else {
                continue;
            };
            if url.is_empty() {
                continue;
            }
            run.urls
                .entry(image_path.to_string())
                .or_insert_with(|| url.to_string());
            if let Some(dest) = path_from_public_url(bucket, url) {
                run.destinations
                    .entry(dest.to_string())
                    .or_insert_with(|| image_path.to_string());
            }
        }
        run
    }

    pub fn cached_url(&self, image_path: &str) -> Option<&str> {
        self.urls.get(image_path).map(String::as_str)
    }

    fn remember(&mut self, image_path: &str, dest: &str, url: &str) {
        self.urls.insert(image_path.to_string(), url.to_string());
        self.destinations
            .insert(dest.to_string(), image_path.to_string());
    }

    /// Object path for `image_path`. Keeps the file name unless another
    /// source in this pack already claimed it, in which case a short content
    /// hash is appended to the stem.
    async fn destination_for(&self, image_path: &str, local: &Path) -> Result<String> {
        let folder = image_folder(&self.pack_id);
        let file_name = Path::new(image_path)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::BadRequest(format!("Invalid image path: {}", image_path)))?;

        let dest = format!("{}/{}", folder, file_name);
        match self.destinations.get(&dest) {
            Some(claimed_by) if claimed_by != image_path => {
                let bytes = tokio::fs::read(local)
                    .await
                    .map_err(|e| AppError::LocalFileMissing(format!("{}: {}", local.display(), e)))?;
                Ok(format!("{}/{}", folder, hashed_name(file_name, &bytes)))
            }
            _ => Ok(dest),
        }
    }
}

/// `cat.png` -> `cat-1a2b3c4d.png`, using the first 8 hex digits of the
/// SHA-256 of the content.
fn hashed_name(file_name: &str, content: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(content));
    let hash = &digest[..8];
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}-{}.{}", stem, hash, ext),
        None => format!("{}-{}", stem, hash),
    }
}

/// Local file for an app asset reference: `assets/images/cat.png` ->
/// `{assets_root}/images/cat.png`.
pub fn resolve_local_path(assets_root: &Path, image_path: &str) -> PathBuf {
    assets_root.join(image_path.strip_prefix(ASSET_PREFIX).unwrap_or(image_path))
}

/// Fields rewritten on a pack after migration.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MigratedPack<'a> {
    image_folder: String,
    questions: &'a [Question],
}

pub struct ImageMigrationService {
    db: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
}

impl ImageMigrationService {
    pub fn new(db: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { db, blobs }
    }

    /// Migrate one option in place.
    pub async fn migrate_option(
        &self,
        option: &mut AnswerOption,
        assets_root: &Path,
        run: &mut MigrationRun,
    ) -> Result<OptionOutcome> {
        let Some(image_path) = option.image_path().map(str::to_string) else {
            return Ok(OptionOutcome::Unchanged);
        };
        if option.has_image_url() {
            return Ok(OptionOutcome::Unchanged);
        }

        if let Some(url) = run.cached_url(&image_path) {
            option.image_url = Some(url.to_string());
            return Ok(OptionOutcome::Reused);
        }

        let local = resolve_local_path(assets_root, &image_path);
        if !tokio::fs::try_exists(&local).await.unwrap_or(false) {
            return Err(AppError::LocalFileMissing(local.display().to_string()));
        }

        let dest = run.destination_for(&image_path, &local).await?;

        let (url, outcome) = if self.blobs.exists(&dest).await? {
            (public_url(self.blobs.bucket(), &dest), OptionOutcome::Reused)
        } else {
            let handle = self.blobs.upload(&local, &dest).await?;
            self.blobs.make_public(&handle).await?;
            tracing::debug!(image_path = %image_path, dest = %dest, size = handle.size, "Uploaded image");
            (self.blobs.public_url(&handle), OptionOutcome::Uploaded)
        };

        run.remember(&image_path, &dest, &url);
        option.image_url = Some(url);
        Ok(outcome)
    }

    /// Migrate every option of one pack and save it. An absent pack yields
    /// zero counts.
    pub async fn migrate_pack(&self, pack_id: &str, assets_root: &Path) -> Result<MigrationCounts> {
        let packs = self.db.collection(collections::QUESTION_PACKS);
        let Some(mut pack) = packs.get::<QuestionPack>(pack_id).await? else {
            tracing::warn!(pack_id, "Pack not found, nothing to migrate");
            return Ok(MigrationCounts::default());
        };

        let mut run = MigrationRun::seeded(&pack, self.blobs.bucket());
        let stripped = pack.strip_legacy_flags();
        if stripped > 0 {
            tracing::debug!(pack_id, stripped, "Removed legacy migration flags");
        }

        let mut success = 0;
        for question in pack.questions.iter_mut() {
            for option in question.options_mut() {
                match self.migrate_option(option, assets_root, &mut run).await {
                    Ok(OptionOutcome::Uploaded) => success += 1,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(
                            pack_id,
                            image_path = option.image_path().unwrap_or_default(),
                            error = %e,
                            "Image migration failed"
                        );
                    }
                }
            }
        }

        let failed = pack
            .options()
            .filter(|option| option.is_pending_migration())
            .count();

        packs
            .set(
                pack_id,
                &MigratedPack {
                    image_folder: image_folder(pack_id),
                    questions: &pack.questions,
                },
                true,
            )
            .await?;

        tracing::info!(pack_id, success, failed, "Migrated pack images");
        Ok(MigrationCounts { success, failed })
    }

    /// Migrate every pack, each with its own run.
    pub async fn migrate_all_packs(&self, assets_root: &Path) -> Result<MigrationTotals> {
        let pack_ids = self.db.collection(collections::QUESTION_PACKS).ids().await?;
        let mut totals = MigrationTotals::default();

        for pack_id in pack_ids {
            match self.migrate_pack(&pack_id, assets_root).await {
                Ok(counts) => {
                    totals.packs += 1;
                    totals.success += counts.success;
                    totals.failed += counts.failed;
                }
                Err(e) => {
                    tracing::error!(pack_id = %pack_id, error = %e, "Pack migration failed");
                }
            }
        }

        tracing::info!(
            packs = totals.packs,
            success = totals.success,
            failed = totals.failed,
            "Migrated all packs"
        );
        Ok(totals)
    }

    /// Strip legacy migration flags from one pack, or every pack with `None`.
    /// Returns the number of options cleaned.
    pub async fn cleanup_legacy_fields(&self, pack_id: Option<&str>) -> Result<usize> {
        let packs = self.db.collection(collections::QUESTION_PACKS);
        let pack_ids = match pack_id {
            Some(id) => vec![id.to_string()],
            None => packs.ids().await?,
        };

        let mut cleaned = 0;
        for id in pack_ids {
            let Some(mut pack) = packs.get::<QuestionPack>(&id).await? else {
                return Err(AppError::NotFound(format!("Question pack {}", id)));
            };

            let stripped = pack.strip_legacy_flags();
            if stripped == 0 {
                continue;
            }

            let mut fields = crate::db::Fields::new();
            fields.insert(
                "questions".to_string(),
                serde_json::to_value(&pack.questions)
                    .map_err(|e| AppError::Internal(e.into()))?,
            );
            packs.update(&id, &fields).await?;

            tracing::info!(pack_id = %id, stripped, "Cleaned legacy fields");
            cleaned += stripped;
        }

        Ok(cleaned)
    }
}
