//! Question packs, their questions and answer options.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bookkeeping flag older migration tooling left on answer options.
pub const LEGACY_MIGRATION_FLAG: &str = "newly_uploaded";

/// Prefix of app asset references in `imagePath`.
pub const ASSET_PREFIX: &str = "assets/";

fn unnamed() -> String {
    "Unnamed".to_string()
}

/// Storage folder holding a pack's images.
pub fn image_folder(pack_id: &str) -> String {
    format!("question_packs/{}/images", pack_id)
}

/// Display name for a pack id: `first_aid_basics` -> `First Aid Basics`.
pub fn display_name(pack_id: &str) -> String {
    pack_id
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One answer option. Fields the admin tool does not model are kept in `extra`
/// and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    /// Local app asset reference (`assets/...`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    /// Public cloud URL; presence means the image has been migrated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl AnswerOption {
    /// Non-empty image path, if any.
    pub fn image_path(&self) -> Option<&str> {
        self.image_path.as_deref().filter(|p| !p.is_empty())
    }

    pub fn has_image_url(&self) -> bool {
        self.image_url.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// Has a local image but no cloud URL yet.
    pub fn is_pending_migration(&self) -> bool {
        self.image_path().is_some() && !self.has_image_url()
    }

    /// Drop the legacy migration flag. Returns whether it was present.
    pub fn strip_legacy_flag(&mut self) -> bool {
        self.extra.remove(LEGACY_MIGRATION_FLAG).is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default)]
    pub correct_answer: AnswerOption,
    #[serde(default)]
    pub decoy_answers: Vec<AnswerOption>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Question {
    /// Correct answer first, then decoys in order.
    pub fn options_mut(&mut self) -> impl Iterator<Item = &mut AnswerOption> {
        std::iter::once(&mut self.correct_answer).chain(self.decoy_answers.iter_mut())
    }

    pub fn options(&self) -> impl Iterator<Item = &AnswerOption> {
        std::iter::once(&self.correct_answer).chain(self.decoy_answers.iter())
    }
}

/// Question pack document (`question_packs/{id}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPack {
    #[serde(default, skip_serializing)]
    pub id: String,
    #[serde(default = "unnamed")]
    pub name: String,
    #[serde(default)]
    pub image_folder: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl QuestionPack {
    /// A new, empty pack with the conventional name and image folder.
    pub fn new(pack_id: &str) -> Self {
        Self {
            id: pack_id.to_string(),
            name: display_name(pack_id),
            image_folder: image_folder(pack_id),
            questions: Vec::new(),
            extra: Default::default(),
        }
    }

    pub fn options(&self) -> impl Iterator<Item = &AnswerOption> {
        self.questions.iter().flat_map(Question::options)
    }

    /// Strip the legacy migration flag from every option. Returns how many
    /// options carried it.
    pub fn strip_legacy_flags(&mut self) -> usize {
        self.questions
            .iter_mut()
            .flat_map(Question::options_mut)
            .map(|option| option.strip_legacy_flag())
            .filter(|stripped| *stripped)
            .count()
    }
}

/// Pack listing entry.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PackSummary {
    pub id: String,
    pub name: String,
    pub question_count: usize,
}
