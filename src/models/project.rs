//! Submitted prompts (projects) and submission requests.

use super::{GenreId, KeywordId, ProjectId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A submitted prompt.
///
/// The rating is fixed at creation; keyword averages already include it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique identifier.
    pub id: ProjectId,
    /// Submitting user.
    pub owner: UserId,
    /// Genre the prompt was written for.
    pub genre: GenreId,
    /// Optional display title.
    pub title: Option<String>,
    /// Prompt text as stored (trimmed, trailing comma removed).
    pub prompt: String,
    /// Rating given by the submitter.
    pub rating: f64,
    /// Whether the project is visible to other users.
    pub is_public: bool,
    /// Keyword nodes derived from the prompt.
    pub keywords: BTreeSet<KeywordId>,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
}

impl Project {
    /// Creates a project with no keyword links yet.
    #[must_use]
    pub fn new(owner: UserId, genre: GenreId, prompt: impl Into<String>, rating: f64) -> Self {
        Self {
            id: ProjectId::generate(),
            owner,
            genre,
            title: None,
            prompt: prompt.into(),
            rating,
            is_public: true,
            keywords: BTreeSet::new(),
            created_at: crate::current_timestamp(),
        }
    }
}

/// Request to submit a new prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    /// Target genre.
    pub genre: GenreId,
    /// Raw prompt text.
    pub prompt: String,
    /// Rating of the generated music.
    pub rating: f64,
    /// Submitting user.
    pub user_id: UserId,
    /// Optional display title.
    #[serde(default)]
    pub title: Option<String>,
    /// Visibility flag.
    #[serde(default = "default_public")]
    pub is_public: bool,
}

const fn default_public() -> bool {
    true
}

impl SubmissionRequest {
    /// Creates a public, untitled submission.
    #[must_use]
    pub fn new(genre: GenreId, prompt: impl Into<String>, rating: f64, user_id: UserId) -> Self {
        Self {
            genre,
            prompt: prompt.into(),
            rating,
            user_id,
            title: None,
            is_public: true,
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the visibility.
    #[must_use]
    pub const fn with_public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }
}
