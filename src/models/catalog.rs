//! Users and genres.

use super::{GenreId, UserId};
use serde::{Deserialize, Serialize};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Unique username.
    pub username: String,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
}

impl User {
    /// Creates a new user record.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: UserId::generate(),
            username: username.into(),
            created_at: crate::current_timestamp(),
        }
    }
}

/// A music genre that scopes keyword nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    /// Unique identifier.
    pub id: GenreId,
    /// Display name, unique case-insensitively.
    pub name: String,
    /// User that created the genre, if any.
    pub owner: Option<UserId>,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
}

impl Genre {
    /// Creates a new genre record.
    #[must_use]
    pub fn new(name: impl Into<String>, owner: Option<UserId>) -> Self {
        Self {
            id: GenreId::generate(),
            name: name.into(),
            owner,
            created_at: crate::current_timestamp(),
        }
    }
}
