//! Suggestion request and response types.

use super::{GenreId, Scope, UserId};
use serde::{Deserialize, Serialize};

/// Request for next-keyword suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    /// Genre to suggest within.
    pub genre: GenreId,
    /// What the user has typed so far; may be empty.
    #[serde(default)]
    pub partial_prompt: String,
    /// Whether other users' keywords are considered.
    #[serde(default)]
    pub community_included: bool,
    /// Requesting user.
    pub user_id: UserId,
}

impl SuggestionRequest {
    /// Creates a personal-scope request.
    #[must_use]
    pub fn new(genre: GenreId, partial_prompt: impl Into<String>, user_id: UserId) -> Self {
        Self {
            genre,
            partial_prompt: partial_prompt.into(),
            community_included: false,
            user_id,
        }
    }

    /// Sets whether community keywords are included.
    #[must_use]
    pub const fn with_community(mut self, community_included: bool) -> Self {
        self.community_included = community_included;
        self
    }

    /// Returns the scope this request resolves to.
    #[must_use]
    pub fn scope(&self) -> Scope {
        Scope::for_request(self.user_id.clone(), self.community_included)
    }
}

/// A single suggested keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Keyword name.
    pub name: String,
    /// Accumulated score; 0 for cold-start listings.
    pub score: f64,
}

/// Ranked suggestions plus the total used for percentage rendering.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResponse {
    /// Sum of the returned scores.
    pub total_score: f64,
    /// Suggestions in display order.
    pub suggestions_list: Vec<Suggestion>,
}

impl SuggestionResponse {
    /// An empty, successful answer.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if there is nothing to suggest.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suggestions_list.is_empty()
    }

    /// Returns each suggestion's share of the total, in percent.
    ///
    /// All shares are 0 when the total is 0 (cold-start listings).
    #[must_use]
    pub fn percentages(&self) -> Vec<(String, f64)> {
        self.suggestions_list
            .iter()
            .map(|s| {
                let share = if self.total_score > 0.0 {
                    s.score / self.total_score * 100.0
                } else {
                    0.0
                };
                (s.name.clone(), share)
            })
            .collect()
    }
}
