//! Keyword graph nodes.

use super::{GenreId, KeywordId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A keyword node of the co-occurrence graph.
///
/// Nodes are unique per `(owner, genre, name)`; two users typing the same
/// word in the same genre own two distinct nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyword {
    /// Unique identifier.
    pub id: KeywordId,
    /// Normalized text (first letter upper-cased, rest lower-cased).
    pub name: String,
    /// User that owns this node.
    pub owner: UserId,
    /// Genre the node is scoped to.
    pub genre: GenreId,
    /// Number of prompts this keyword appeared in.
    pub iterations: u32,
    /// Mean rating of those prompts.
    pub average_rating: f64,
    /// Nodes that co-occurred with this one, same owner and genre.
    pub related_keywords: BTreeSet<KeywordId>,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
}

impl Keyword {
    /// Creates a fresh node for its first appearance in a prompt.
    #[must_use]
    pub fn new(
        owner: UserId,
        genre: GenreId,
        name: impl Into<String>,
        initial_rating: f64,
    ) -> Self {
        Self {
            id: KeywordId::generate(),
            name: name.into(),
            owner,
            genre,
            iterations: 1,
            average_rating: initial_rating,
            related_keywords: BTreeSet::new(),
            created_at: crate::current_timestamp(),
        }
    }

    /// Returns the case-folded lookup key for this node's name.
    #[must_use]
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }

    /// Statistics after one more prompt with `rating` includes this keyword.
    #[must_use]
    pub fn stats_with_rating(&self, rating: f64) -> KeywordStats {
        KeywordStats::from_keyword(self).with_rating(rating)
    }
}

/// Case-folds a keyword name for case-insensitive comparisons.
#[must_use]
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}

/// Usage statistics of a keyword node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordStats {
    /// Number of contributing prompts.
    pub iterations: u32,
    /// Mean rating of the contributing prompts.
    pub average_rating: f64,
}

impl KeywordStats {
    /// Reads the statistics of a node.
    #[must_use]
    pub const fn from_keyword(keyword: &Keyword) -> Self {
        Self {
            iterations: keyword.iterations,
            average_rating: keyword.average_rating,
        }
    }

    /// Adds one rating: `(avg * n + rating) / (n + 1)`.
    #[must_use]
    pub fn with_rating(self, rating: f64) -> Self {
        let n = f64::from(self.iterations);
        let iterations = self.iterations.saturating_add(1);
        Self {
            iterations,
            average_rating: self.average_rating.mul_add(n, rating) / f64::from(iterations),
        }
    }

    /// Removes one rating: `(avg * n - rating) / (n - 1)`.
    ///
    /// Returns `None` when no contributing prompt would remain.
    #[must_use]
    pub fn without_rating(self, rating: f64) -> Option<Self> {
        if self.iterations <= 1 {
            return None;
        }
        let n = f64::from(self.iterations);
        let iterations = self.iterations - 1;
        Some(Self {
            iterations,
            average_rating: self.average_rating.mul_add(n, -rating) / f64::from(iterations),
        })
    }
}

/// Whose keywords a query considers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Only the given user's own keyword nodes.
    Personal(UserId),
    /// Every user's keyword nodes in the genre.
    Community,
}

impl Scope {
    /// Builds the scope for a requesting user.
    #[must_use]
    pub fn for_request(user: UserId, community_included: bool) -> Self {
        if community_included {
            Self::Community
        } else {
            Self::Personal(user)
        }
    }

    /// Returns the owner filter, if any.
    #[must_use]
    pub const fn owner(&self) -> Option<&UserId> {
        match self {
            Self::Personal(user) => Some(user),
            Self::Community => None,
        }
    }

    /// Returns true if the keyword falls inside this scope.
    #[must_use]
    pub fn includes(&self, keyword: &Keyword) -> bool {
        self.owner().is_none_or(|owner| &keyword.owner == owner)
    }

    /// Returns a label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Personal(_) => "personal",
            Self::Community => "community",
        }
    }
}
