//! Prompt submission.
//!
//! A submission is saved as a [`Project`] and then folded into the keyword
//! graph:
//!
//! ```text
//! validate ─► check user/genre ─► create project ─► graph update ─► attach keyword ids
//! ```
//!
//! The project is persisted before the graph is touched. A graph update
//! that applies only partially is logged and the saved project is still
//! returned.
//!
//! Creation, graph update and linking run under the `(owner, genre)` scope
//! lock, as does deletion, so a project's rating enters and leaves the
//! graph exactly once.

use super::extractor::{clean_prompt, extract_keywords};
use super::graph_updater::CooccurrenceGraphUpdater;
use crate::models::{GenreId, KeywordId, Project, ProjectId, SubmissionRequest, UserId};
use crate::storage::traits::{CatalogStore, ProjectStore};
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Accepts prompt submissions and removes projects.
pub struct SubmissionService {
    projects: Arc<dyn ProjectStore>,
    catalog: Arc<dyn CatalogStore>,
    updater: Arc<CooccurrenceGraphUpdater>,
}

impl SubmissionService {
    /// Creates a new submission service.
    #[must_use]
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        catalog: Arc<dyn CatalogStore>,
        updater: Arc<CooccurrenceGraphUpdater>,
    ) -> Self {
        Self {
            projects,
            catalog,
            updater,
        }
    }

    /// Saves a prompt and applies its keywords to the graph.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] for an empty prompt or an invalid rating
    /// - [`Error::NotFound`] if the user or genre does not exist
    /// - storage errors from creating the project
    ///
    /// Graph update failures after the project is saved are logged, not
    /// returned.
    #[instrument(skip(self, request), fields(owner = %request.user_id, genre = %request.genre))]
    pub fn submit(&self, request: SubmissionRequest) -> Result<Project> {
        let start = Instant::now();
        validate(&request)?;

        if self.catalog.get_user(&request.user_id)?.is_none() {
            return Err(Error::not_found("user", request.user_id.as_str()));
        }
        if self.catalog.get_genre(&request.genre)?.is_none() {
            return Err(Error::not_found("genre", request.genre.as_str()));
        }

        let prompt = clean_prompt(&request.prompt);
        let tokens = extract_keywords(&prompt);

        let mut project = Project::new(request.user_id, request.genre, prompt, request.rating);
        project.title = request
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        project.is_public = request.is_public;

        let (owner, genre) = (project.owner.clone(), project.genre.clone());
        self.updater.with_scope(&owner, &genre, || -> Result<()> {
            self.projects.create_project(&project)?;
            self.fold_into_graph(&mut project, &tokens);
            Ok(())
        })?;

        metrics::counter!("submissions_total").increment(1);
        tracing::info!(
            project_id = %project.id,
            keywords = project.keywords.len(),
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Prompt submitted"
        );
        Ok(project)
    }

    /// Deletes a project owned by `owner` and retracts its keywords.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the project does not exist or belongs to
    ///   another user
    /// - storage errors from the retraction or deletion
    ///
    /// The project row is removed before its keywords are retracted; a
    /// failed retraction is not retried by deleting again.
    #[instrument(skip(self), fields(owner = %owner, project_id = %id))]
    pub fn delete_project(&self, owner: &UserId, id: &ProjectId) -> Result<Project> {
        let genre = self.owned_project(owner, id)?.genre;

        let (project, retraction) = self.updater.with_scope(owner, &genre, || -> Result<_> {
            let project = self.owned_project(owner, id)?;
            if !self.projects.delete_project(id)? {
                return Err(Error::not_found("project", id.as_str()));
            }
            let retraction = self.updater.retract_in_scope(&project)?;
            Ok((project, retraction))
        })?;

        tracing::info!(
            updated = retraction.updated,
            deleted_keywords = retraction.deleted.len(),
            "Project deleted"
        );
        Ok(project)
    }

    /// Retrieves a project by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the project does not exist.
    pub fn get_project(&self, id: &ProjectId) -> Result<Project> {
        self.projects
            .get_project(id)?
            .ok_or_else(|| Error::not_found("project", id.as_str()))
    }

    /// Lists a user's projects, optionally in one genre, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_projects(&self, owner: &UserId, genre: Option<&GenreId>) -> Result<Vec<Project>> {
        self.projects.list_projects(Some(owner), genre)
    }

    fn owned_project(&self, owner: &UserId, id: &ProjectId) -> Result<Project> {
        self.projects
            .get_project(id)?
            .filter(|p| &p.owner == owner)
            .ok_or_else(|| Error::not_found("project", id.as_str()))
    }

    /// Applies a saved project's keywords to the graph. Caller holds the
    /// project's scope lock.
    fn fold_into_graph(&self, project: &mut Project, tokens: &[String]) {
        match self
            .updater
            .apply_in_scope(&project.owner, &project.genre, tokens, project.rating)
        {
            Ok(update) => {
                if let Some(error) = update.partial_error() {
                    tracing::warn!(
                        project_id = %project.id,
                        error = %error,
                        "Keyword graph partially updated"
                    );
                }
                if !update.touched.is_empty() {
                    self.link_keywords(project, update.touched);
                }
            },
            Err(error) => {
                metrics::counter!("keyword_batch_failures_total").increment(1);
                tracing::warn!(
                    project_id = %project.id,
                    error = %error,
                    "Keyword graph update failed, project kept"
                );
            },
        }
    }

    fn link_keywords(&self, project: &mut Project, keywords: BTreeSet<KeywordId>) {
        match self.projects.attach_keywords(&project.id, &keywords) {
            Ok(()) => project.keywords = keywords,
            Err(error) => tracing::warn!(
                project_id = %project.id,
                error = %error,
                "Failed to link keywords to project"
            ),
        }
    }
}

fn validate(request: &SubmissionRequest) -> Result<()> {
    if request.user_id.as_str().trim().is_empty() {
        return Err(Error::InvalidInput("user id is required".to_string()));
    }
    if request.genre.as_str().trim().is_empty() {
        return Err(Error::InvalidInput("genre is required".to_string()));
    }
    if extract_keywords(&request.prompt).is_empty() {
        return Err(Error::InvalidInput("prompt has no keywords".to_string()));
    }
    if !request.rating.is_finite() || request.rating < 0.0 {
        return Err(Error::InvalidInput(format!(
            "rating must be a finite, non-negative number (got {})",
            request.rating
        )));
    }
    Ok(())
}
