// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Question pack management.

use crate::db::{collections, CollectionRef, DocumentStore, Fields};
use crate::error::{AppError, Result};
use crate::models::{PackSummary, Question, QuestionPack};
use std::sync::Arc;

pub struct QuestionPackService {
    db: Arc<dyn DocumentStore>,
}

impl QuestionPackService {
    pub fn new(db: Arc<dyn DocumentStore>) -> Self {
        Self { db }
    }

    fn packs(&self) -> CollectionRef<'_> {
        self.db.collection(collections::QUESTION_PACKS)
    }

    /// Create an empty pack with id `pack_name`.
    pub async fn create_pack(&self, pack_name: &str) -> Result<QuestionPack> {
        let pack_name = pack_name.trim();
        if pack_name.is_empty() {
            return Err(AppError::BadRequest("Pack name must not be empty".to_string()));
        }
        if pack_name.contains('/') {
            return Err(AppError::BadRequest(format!(
                "Pack name must not contain '/': {}",
                pack_name
            )));
        }
        if self.packs().exists(pack_name).await? {
            return Err(AppError::BadRequest(format!(
                "Question pack {} already exists",
                pack_name
            )));
        }

        let pack = QuestionPack::new(pack_name);
        self.packs().set(pack_name, &pack, false).await?;

        tracing::info!(pack_id = pack_name, name = %pack.name, "Created question pack");
        Ok(pack)
    }

    pub async fn list_packs(&self) -> Result<Vec<PackSummary>> {
        let packs: Vec<QuestionPack> = self.packs().stream().await?;
        Ok(packs
            .into_iter()
            .map(|pack| PackSummary {
                question_count: pack.questions.len(),
                id: pack.id,
                name: pack.name,
            })
            .collect())
    }

    pub async fn get_pack(&self, pack_id: &str) -> Result<QuestionPack> {
        self.packs()
            .get(pack_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question pack {}", pack_id)))
    }

    /// Append questions to an existing pack. Returns the number added.
    pub async fn upload_questions(&self, pack_id: &str, questions: Vec<Question>) -> Result<usize> {
        let mut pack = self.get_pack(pack_id).await?;
        let added = questions.len();
        pack.questions.extend(questions);

        let mut fields = Fields::new();
        fields.insert(
            "questions".to_string(),
            serde_json::to_value(&pack.questions).map_err(|e| AppError::Internal(e.into()))?,
        );
        self.packs().update(pack_id, &fields).await?;

        tracing::info!(pack_id, added, total = pack.questions.len(), "Uploaded questions");
        Ok(added)
    }

    pub async fn delete_pack(&self, pack_id: &str) -> Result<()> {
        if !self.packs().exists(pack_id).await? {
            return Err(AppError::NotFound(format!("Question pack {}", pack_id)));
        }
        self.packs().delete(pack_id).await?;
        tracing::info!(pack_id, "Deleted question pack");
        Ok(())
    }
}
