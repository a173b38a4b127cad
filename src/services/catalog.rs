//! User and genre management.
//!
//! Removing a user or genre cascades: the affected projects are deleted and
//! the keyword nodes of every affected `(owner, genre)` scope are purged,
//! with references to them stripped from surviving related sets.

use super::graph_updater::CooccurrenceGraphUpdater;
use crate::models::{Genre, GenreId, Scope, User, UserId};
use crate::storage::traits::{CatalogStore, KeywordStore, ProjectStore};
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;

/// Outcome of a cascading removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeSummary {
    /// Projects deleted.
    pub projects: usize,
    /// Keyword nodes deleted.
    pub keywords: usize,
}

/// Registers and removes users and genres.
pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
    projects: Arc<dyn ProjectStore>,
    keywords: Arc<dyn KeywordStore>,
    updater: Arc<CooccurrenceGraphUpdater>,
}

impl CatalogService {
    /// Creates a new catalog service.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        projects: Arc<dyn ProjectStore>,
        keywords: Arc<dyn KeywordStore>,
        updater: Arc<CooccurrenceGraphUpdater>,
    ) -> Self {
        Self {
            catalog,
            projects,
            keywords,
            updater,
        }
    }

    /// Registers a new user.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if the username is blank
    /// - [`Error::Conflict`] if the username is taken
    #[instrument(skip(self))]
    pub fn register_user(&self, username: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::InvalidInput("username is required".to_string()));
        }
        let user = User::new(username);
        self.catalog.create_user(&user)?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Registers a new genre, optionally owned by a user.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if the name is blank
    /// - [`Error::NotFound`] if the owner does not exist
    /// - [`Error::Conflict`] if the name is taken
    #[instrument(skip(self))]
    pub fn register_genre(&self, name: &str, owner: Option<UserId>) -> Result<Genre> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("genre name is required".to_string()));
        }
        if let Some(owner) = &owner
            && self.catalog.get_user(owner)?.is_none()
        {
            return Err(Error::not_found("user", owner.as_str()));
        }
        let genre = Genre::new(name, owner);
        self.catalog.create_genre(&genre)?;
        tracing::info!(genre_id = %genre.id, "Genre registered");
        Ok(genre)
    }

    /// Finds a user by username, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such user exists.
    pub fn find_user(&self, username: &str) -> Result<User> {
        self.catalog
            .find_user_by_name(username.trim())?
            .ok_or_else(|| Error::not_found("user", username))
    }

    /// Finds a genre by name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such genre exists.
    pub fn find_genre(&self, name: &str) -> Result<Genre> {
        self.catalog
            .find_genre_by_name(name.trim())?
            .ok_or_else(|| Error::not_found("genre", name))
    }

    /// Lists all genres ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_genres(&self) -> Result<Vec<Genre>> {
        self.catalog.list_genres()
    }

    /// Removes a user's work from a genre: their projects in it and their
    /// keyword nodes for it. The genre itself stays.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage operation fails.
    #[instrument(skip(self), fields(user = %user, genre = %genre))]
    pub fn remove_genre_for_user(&self, user: &UserId, genre: &GenreId) -> Result<CascadeSummary> {
        let projects = self.projects.delete_projects(Some(user), Some(genre))?;
        let keywords = self.updater.purge_scope(user, genre)?;
        let summary = CascadeSummary { projects, keywords };
        tracing::info!(
            projects = summary.projects,
            keywords = summary.keywords,
            "Removed user's genre data"
        );
        Ok(summary)
    }

    /// Deletes a genre with all of its projects and keyword nodes.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the genre does not exist
    /// - storage errors from the cascade
    #[instrument(skip(self), fields(genre = %genre))]
    pub fn delete_genre(&self, genre: &GenreId) -> Result<CascadeSummary> {
        if self.catalog.get_genre(genre)?.is_none() {
            return Err(Error::not_found("genre", genre.as_str()));
        }

        let projects = self.projects.delete_projects(None, Some(genre))?;
        let owners: BTreeSet<UserId> = self
            .keywords
            .list_keywords(&Scope::Community, genre)?
            .into_iter()
            .map(|k| k.owner)
            .collect();
        let mut keywords = 0;
        for owner in &owners {
            keywords += self.updater.purge_scope(owner, genre)?;
        }
        self.catalog.delete_genre(genre)?;

        let summary = CascadeSummary { projects, keywords };
        tracing::info!(
            projects = summary.projects,
            keywords = summary.keywords,
            "Genre deleted"
        );
        Ok(summary)
    }

    /// Deletes a user with all of their projects and keyword nodes.
    ///
    /// Genres the user owns are kept.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the user does not exist
    /// - storage errors from the cascade
    #[instrument(skip(self), fields(user = %user))]
    pub fn delete_user(&self, user: &UserId) -> Result<CascadeSummary> {
        if self.catalog.get_user(user)?.is_none() {
            return Err(Error::not_found("user", user.as_str()));
        }

        let projects = self.projects.delete_projects(Some(user), None)?;
        let mut keywords = 0;
        for genre in self.catalog.list_genres()? {
            keywords += self.updater.purge_scope(user, &genre.id)?;
        }
        self.catalog.delete_user(user)?;

        let summary = CascadeSummary { projects, keywords };
        tracing::info!(
            projects = summary.projects,
            keywords = summary.keywords,
            "User deleted"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryCatalogStore, InMemoryKeywordStore, InMemoryProjectStore};
    use test_case::test_case;

    struct Fixture {
        service: CatalogService,
        keywords: Arc<InMemoryKeywordStore>,
        updater: Arc<CooccurrenceGraphUpdater>,
    }

    fn create_service() -> Fixture {
        let keywords = Arc::new(InMemoryKeywordStore::new());
        let updater = Arc::new(CooccurrenceGraphUpdater::new(keywords.clone()));
        Fixture {
            service: CatalogService::new(
                Arc::new(InMemoryCatalogStore::new()),
                Arc::new(InMemoryProjectStore::new()),
                keywords.clone(),
                updater.clone(),
            ),
            keywords,
            updater,
        }
    }

    fn tokens(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_register_and_find_ignore_case() {
        let f = create_service();
        let user = f.service.register_user("  Ada ").unwrap();
        assert_eq!(user.username, "Ada");
        assert_eq!(f.service.find_user("ADA").unwrap().id, user.id);

        let genre = f.service.register_genre("Lo-Fi", Some(user.id)).unwrap();
        assert_eq!(f.service.find_genre("lo-fi").unwrap().id, genre.id);
        assert!(f.service.register_user("ada").unwrap_err().is_conflict());
    }

    #[test_case(""; "empty")]
    #[test_case("   "; "blank")]
    fn test_register_rejects_blank_names(name: &str) {
        let f = create_service();
        assert!(matches!(
            f.service.register_user(name),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            f.service.register_genre(name, None),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_register_genre_unknown_owner() {
        let f = create_service();
        assert!(matches!(
            f.service.register_genre("Jazz", Some(UserId::new("ghost"))),
            Err(Error::NotFound { kind: "user", .. })
        ));
    }

    #[test]
    fn test_delete_genre_purges_every_owner() {
        let f = create_service();
        let ada = f.service.register_user("ada").unwrap();
        let bob = f.service.register_user("bob").unwrap();
        let jazz = f.service.register_genre("Jazz", None).unwrap();
        let rock = f.service.register_genre("Rock", None).unwrap();

        f.updater
            .apply(&ada.id, &jazz.id, &tokens(&["Piano", "Drums"]), 5.0)
            .unwrap();
        f.updater
            .apply(&bob.id, &jazz.id, &tokens(&["Sax"]), 5.0)
            .unwrap();
        f.updater
            .apply(&ada.id, &rock.id, &tokens(&["Guitar"]), 5.0)
            .unwrap();

        let summary = f.service.delete_genre(&jazz.id).unwrap();
        assert_eq!(summary.keywords, 3);
        assert_eq!(f.keywords.len(), 1);
        assert!(matches!(
            f.service.find_genre("jazz"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_remove_genre_for_user_keeps_others() {
        let f = create_service();
        let ada = f.service.register_user("ada").unwrap();
        let bob = f.service.register_user("bob").unwrap();
        let jazz = f.service.register_genre("Jazz", None).unwrap();

        f.updater
            .apply(&ada.id, &jazz.id, &tokens(&["Piano"]), 5.0)
            .unwrap();
        f.updater
            .apply(&bob.id, &jazz.id, &tokens(&["Piano"]), 5.0)
            .unwrap();

        let summary = f.service.remove_genre_for_user(&ada.id, &jazz.id).unwrap();
        assert_eq!(summary.keywords, 1);
        assert_eq!(f.keywords.len(), 1);
        assert!(f.service.find_genre("Jazz").is_ok());
    }

    #[test]
    fn test_delete_user_cascades() {
        let f = create_service();
        let ada = f.service.register_user("ada").unwrap();
        let jazz = f.service.register_genre("Jazz", Some(ada.id.clone())).unwrap();
        f.updater
            .apply(&ada.id, &jazz.id, &tokens(&["Piano", "Drums"]), 5.0)
            .unwrap();

        let summary = f.service.delete_user(&ada.id).unwrap();
        assert_eq!(summary.keywords, 2);
        assert!(f.keywords.is_empty());
        assert!(f.service.find_user("ada").is_err());
        assert!(f.service.find_genre("Jazz").is_ok());
    }
}
