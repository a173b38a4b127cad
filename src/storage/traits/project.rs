//! Project store trait.

use crate::Result;
use crate::models::{GenreId, KeywordId, Project, ProjectId, UserId};
use std::collections::BTreeSet;

/// Trait for submitted project storage.
///
/// Projects are immutable once created apart from their keyword links.
pub trait ProjectStore: Send + Sync {
    /// Persists a new project.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    fn create_project(&self, project: &Project) -> Result<()>;

    /// Replaces the keyword links of a project.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the project does not exist.
    fn attach_keywords(&self, id: &ProjectId, keywords: &BTreeSet<KeywordId>) -> Result<()>;

    /// Retrieves a project by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn get_project(&self, id: &ProjectId) -> Result<Option<Project>>;

    /// Lists projects, optionally filtered by owner and genre, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn list_projects(&self, owner: Option<&UserId>, genre: Option<&GenreId>)
    -> Result<Vec<Project>>;

    /// Deletes a project. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    fn delete_project(&self, id: &ProjectId) -> Result<bool>;

    /// Deletes every project matching the filters, returning the count.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    fn delete_projects(&self, owner: Option<&UserId>, genre: Option<&GenreId>) -> Result<usize>;
}
