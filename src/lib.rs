//! # Promptgraph
//!
//! Keyword co-occurrence graph and next-keyword suggestions for AI music prompts.
//!
//! Every submitted prompt is split into normalized keywords. Each keyword is a
//! node scoped to its owner and genre, carrying a usage count and the running
//! mean of the ratings of the prompts it appeared in. Keywords that appear in
//! the same prompt are linked to each other. Given a partially typed prompt,
//! the suggestion ranker walks those links and scores candidate next keywords.
//!
//! ## Features
//!
//! - Incremental, exact running averages per keyword node
//! - Symmetric co-occurrence links with set semantics
//! - Personal or community-wide suggestion scope
//! - Pluggable storage (`SQLite` or in-memory) behind small traits
//! - Per-scope serialization of graph updates
//!
//! ## Example
//!
//! ```rust,ignore
//! use promptgraph::services::ServiceContainer;
//! use promptgraph::models::{SubmissionRequest, SuggestionRequest};
//!
//! let services = ServiceContainer::in_memory();
//! let user = services.catalog().register_user("ada")?;
//! let genre = services.catalog().register_genre("Jazz", None)?;
//!
//! services.submissions().submit(SubmissionRequest::new(
//!     genre.id.clone(), "Piano, soft, brushed drums", 8.0, user.id.clone(),
//! ))?;
//!
//! let response = services
//!     .suggestions()
//!     .suggest(&SuggestionRequest::new(genre.id, "piano", user.id))?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::{PromptGraphConfig, RankingConfig};
pub use models::{
    Genre, GenreId, Keyword, KeywordId, Project, ProjectId, Scope, SubmissionRequest, Suggestion,
    SuggestionRequest, SuggestionResponse, User, UserId,
};
pub use services::{
    CatalogService, CooccurrenceGraphUpdater, ServiceContainer, SubmissionService,
    SuggestionRanker, SuggestionService, extract_keywords,
};
pub use storage::{CatalogStore, KeywordStore, ProjectStore};

/// Error type for promptgraph operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Missing or empty fields, non-finite or negative ratings |
/// | `NotFound` | Referenced user, genre, project or keyword does not exist |
/// | `Conflict` | A uniqueness constraint in storage was violated |
/// | `OperationFailed` | Database queries, I/O, or observability setup fail |
/// | `PartialUpdate` | A best-effort keyword batch applied only some mutations |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A prompt, genre, user or name field is empty
    /// - A rating is negative, NaN or infinite
    /// - Ranking configuration has invalid weights
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of record (`user`, `genre`, `project`, `keyword`).
        kind: &'static str,
        /// Identifier or name that was looked up.
        id: String,
    },

    /// A record with the same unique key already exists.
    ///
    /// Raised when:
    /// - A keyword `(owner, genre, name)` is created twice
    /// - A username or genre name is registered twice
    #[error("conflict: {0}")]
    Conflict(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` database operations fail
    /// - Filesystem I/O errors occur
    /// - Logging or metrics cannot be initialized
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Only part of a keyword batch was applied.
    ///
    /// Each failed mutation was logged; the applied ones remain valid
    /// because every node update is independently consistent.
    #[error("partial update: {failed} of {attempted} keyword mutations failed")]
    PartialUpdate {
        /// Number of mutations that failed.
        failed: usize,
        /// Number of mutations attempted.
        attempted: usize,
    },
}

impl Error {
    /// Builds a [`Error::NotFound`] for the given record kind.
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Builds a [`Error::OperationFailed`] from any displayable cause.
    #[must_use]
    pub fn operation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Returns true if this error is a uniqueness conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Result type alias for promptgraph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
///
/// # Examples
///
/// ```rust
/// use promptgraph::current_timestamp;
///
/// let ts = current_timestamp();
/// assert!(ts > 0);
/// ```
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
