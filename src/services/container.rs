//! Service container.
//!
//! Builds the storage backends once and hands out services that share
//! them:
//!
//! ```text
//! ServiceContainer
//!   ├── catalog:  Arc<dyn CatalogStore>
//!   ├── projects: Arc<dyn ProjectStore>
//!   ├── keywords: Arc<dyn KeywordStore>
//!   ├── updater:  Arc<CooccurrenceGraphUpdater>   (shares one ScopeLocks)
//!   └── ranker:   Arc<SuggestionRanker>
//! ```
//!
//! The `SQLite` stores live in one database file, each with its own
//! connection and migration track.

use super::catalog::CatalogService;
use super::graph_updater::CooccurrenceGraphUpdater;
use super::ranker::SuggestionRanker;
use super::scope_lock::ScopeLocks;
use super::submission::SubmissionService;
use super::suggestion::SuggestionService;
use crate::Result;
use crate::config::{PromptGraphConfig, RankingConfig};
use crate::storage::traits::{CatalogStore, KeywordStore, ProjectStore};
use crate::storage::{
    InMemoryCatalogStore, InMemoryKeywordStore, InMemoryProjectStore, SqliteCatalogStore,
    SqliteKeywordStore, SqliteProjectStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Storage backends and the services built on them.
pub struct ServiceContainer {
    catalog: Arc<dyn CatalogStore>,
    projects: Arc<dyn ProjectStore>,
    keywords: Arc<dyn KeywordStore>,
    updater: Arc<CooccurrenceGraphUpdater>,
    ranker: Arc<SuggestionRanker>,
    database_path: Option<PathBuf>,
}

impl ServiceContainer {
    /// Opens the `SQLite` stores at the configured database path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a store cannot
    /// be opened or migrated.
    pub fn from_config(config: &PromptGraphConfig) -> Result<Self> {
        config.validate()?;
        let path = config.database_path();
        let mut container = Self::open(&path, config.ranking)?;
        container.database_path = Some(path);
        Ok(container)
    }

    /// Opens the `SQLite` stores at `path` with the given ranking weights.
    ///
    /// # Errors
    ///
    /// Returns an error if a store cannot be opened or migrated.
    pub fn open(path: &Path, ranking: RankingConfig) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Opening SQLite stores");
        let mut container = Self::from_stores(
            Arc::new(SqliteCatalogStore::new(path)?),
            Arc::new(SqliteProjectStore::new(path)?),
            Arc::new(SqliteKeywordStore::new(path)?),
            ranking,
        );
        container.database_path = Some(path.to_path_buf());
        Ok(container)
    }

    /// Creates a container backed by in-memory stores.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_stores(
            Arc::new(InMemoryCatalogStore::new()),
            Arc::new(InMemoryProjectStore::new()),
            Arc::new(InMemoryKeywordStore::new()),
            RankingConfig::default(),
        )
    }

    /// Creates a container from existing stores.
    #[must_use]
    pub fn from_stores(
        catalog: Arc<dyn CatalogStore>,
        projects: Arc<dyn ProjectStore>,
        keywords: Arc<dyn KeywordStore>,
        ranking: RankingConfig,
    ) -> Self {
        let locks = Arc::new(ScopeLocks::new());
        let updater = Arc::new(CooccurrenceGraphUpdater::with_locks(
            keywords.clone(),
            locks,
        ));
        let ranker = Arc::new(SuggestionRanker::with_config(keywords.clone(), ranking));
        Self {
            catalog,
            projects,
            keywords,
            updater,
            ranker,
            database_path: None,
        }
    }

    /// Returns the catalog service.
    #[must_use]
    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(
            self.catalog.clone(),
            self.projects.clone(),
            self.keywords.clone(),
            self.updater.clone(),
        )
    }

    /// Returns the submission service.
    #[must_use]
    pub fn submissions(&self) -> SubmissionService {
        SubmissionService::new(
            self.projects.clone(),
            self.catalog.clone(),
            self.updater.clone(),
        )
    }

    /// Returns the suggestion service.
    #[must_use]
    pub fn suggestions(&self) -> SuggestionService {
        SuggestionService::new(
            self.catalog.clone(),
            self.keywords.clone(),
            self.ranker.clone(),
        )
    }

    /// Returns the shared graph updater.
    #[must_use]
    pub fn updater(&self) -> Arc<CooccurrenceGraphUpdater> {
        self.updater.clone()
    }

    /// Returns the shared ranker.
    #[must_use]
    pub fn ranker(&self) -> Arc<SuggestionRanker> {
        self.ranker.clone()
    }

    /// Returns the keyword store.
    #[must_use]
    pub fn keywords(&self) -> Arc<dyn KeywordStore> {
        self.keywords.clone()
    }

    /// Returns the database path, or `None` for in-memory stores.
    #[must_use]
    pub fn database_path(&self) -> Option<&Path> {
        self.database_path.as_deref()
    }
}
