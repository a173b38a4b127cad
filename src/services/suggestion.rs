//! Suggestion requests.

use super::extractor::{clean_prompt, extract_keywords};
use super::ranker::SuggestionRanker;
use crate::models::{GenreId, Keyword, Scope, SuggestionRequest, SuggestionResponse};
use crate::storage::traits::{CatalogStore, KeywordStore};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Answers suggestion requests for known users and genres.
pub struct SuggestionService {
    catalog: Arc<dyn CatalogStore>,
    keywords: Arc<dyn KeywordStore>,
    ranker: Arc<SuggestionRanker>,
}

impl SuggestionService {
    /// Creates a new suggestion service.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        keywords: Arc<dyn KeywordStore>,
        ranker: Arc<SuggestionRanker>,
    ) -> Self {
        Self {
            catalog,
            keywords,
            ranker,
        }
    }

    /// Suggests next keywords for a partial prompt.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if the user or genre id is blank
    /// - [`Error::NotFound`] if the user or genre does not exist
    /// - storage errors from the ranking queries
    #[instrument(
        skip(self, request),
        fields(user = %request.user_id, genre = %request.genre, community = request.community_included)
    )]
    pub fn suggest(&self, request: &SuggestionRequest) -> Result<SuggestionResponse> {
        let start = Instant::now();
        self.check_known(request)?;

        let mode = if extract_keywords(&clean_prompt(&request.partial_prompt)).is_empty() {
            "cold_start"
        } else {
            "ranked"
        };
        let response =
            self.ranker
                .suggest(&request.scope(), &request.genre, &request.partial_prompt)?;

        let elapsed = start.elapsed();
        metrics::counter!("suggestions_total", "mode" => mode).increment(1);
        metrics::histogram!("suggestion_duration_ms").record(elapsed.as_secs_f64() * 1000.0);
        tracing::debug!(
            mode,
            returned = response.suggestions_list.len(),
            total_score = response.total_score,
            "Suggestions computed"
        );
        Ok(response)
    }

    /// Lists the keyword nodes visible in a scope.
    ///
    /// Community listings are ordered by ascending iterations, personal
    /// listings by creation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the genre does not exist.
    pub fn list_keywords(&self, scope: &Scope, genre: &GenreId) -> Result<Vec<Keyword>> {
        if self.catalog.get_genre(genre)?.is_none() {
            return Err(Error::not_found("genre", genre.as_str()));
        }
        let mut nodes = self.keywords.list_keywords(scope, genre)?;
        if matches!(scope, Scope::Community) {
            nodes.sort_by_key(|k| k.iterations);
        }
        Ok(nodes)
    }

    fn check_known(&self, request: &SuggestionRequest) -> Result<()> {
        if request.user_id.as_str().trim().is_empty() {
            return Err(Error::InvalidInput("user id is required".to_string()));
        }
        if request.genre.as_str().trim().is_empty() {
            return Err(Error::InvalidInput("genre is required".to_string()));
        }
        if self.catalog.get_user(&request.user_id)?.is_none() {
            return Err(Error::not_found("user", request.user_id.as_str()));
        }
        if self.catalog.get_genre(&request.genre)?.is_none() {
            return Err(Error::not_found("genre", request.genre.as_str()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Genre, User, UserId};
    use crate::services::CooccurrenceGraphUpdater;
    use crate::storage::{InMemoryCatalogStore, InMemoryKeywordStore};

    struct Fixture {
        service: SuggestionService,
        updater: CooccurrenceGraphUpdater,
        user: User,
        genre: Genre,
    }

    fn create_service() -> Fixture {
        let keywords: Arc<dyn KeywordStore> = Arc::new(InMemoryKeywordStore::new());
        let catalog = Arc::new(InMemoryCatalogStore::new());
        let user = User::new("ada");
        let genre = Genre::new("Jazz", None);
        catalog.create_user(&user).unwrap();
        catalog.create_genre(&genre).unwrap();

        let ranker = Arc::new(SuggestionRanker::new(keywords.clone()));
        Fixture {
            service: SuggestionService::new(catalog, keywords.clone(), ranker),
            updater: CooccurrenceGraphUpdater::new(keywords),
            user,
            genre,
        }
    }

    fn tokens(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_suggest_ranks_related_keywords() {
        let f = create_service();
        f.updater
            .apply(&f.user.id, &f.genre.id, &tokens(&["Piano", "Drums"]), 8.0)
            .unwrap();
        f.updater
            .apply(&f.user.id, &f.genre.id, &tokens(&["Piano", "Bass"]), 2.0)
            .unwrap();

        let request = SuggestionRequest::new(f.genre.id.clone(), "piano", f.user.id.clone());
        let response = f.service.suggest(&request).unwrap();
        let names: Vec<&str> = response
            .suggestions_list
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["Drums", "Bass"]);
        assert!(response.total_score > 0.0);
    }

    #[test]
    fn test_suggest_cold_start_lists_personal_nodes() {
        let f = create_service();
        f.updater
            .apply(&f.user.id, &f.genre.id, &tokens(&["Piano", "Drums"]), 5.0)
            .unwrap();

        let request = SuggestionRequest::new(f.genre.id.clone(), " , ", f.user.id.clone());
        let response = f.service.suggest(&request).unwrap();
        assert_eq!(response.suggestions_list.len(), 2);
        assert!(response.total_score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_suggest_unknown_user_is_not_found() {
        let f = create_service();
        let request =
            SuggestionRequest::new(f.genre.id.clone(), "piano", UserId::new("ghost"));
        assert!(matches!(
            f.service.suggest(&request),
            Err(Error::NotFound { kind: "user", .. })
        ));
    }

    #[test]
    fn test_list_keywords_community_orders_by_iterations() {
        let f = create_service();
        let other = UserId::new("other");
        f.updater
            .apply(&f.user.id, &f.genre.id, &tokens(&["Piano"]), 5.0)
            .unwrap();
        f.updater
            .apply(&f.user.id, &f.genre.id, &tokens(&["Piano"]), 5.0)
            .unwrap();
        f.updater
            .apply(&other, &f.genre.id, &tokens(&["Strings"]), 5.0)
            .unwrap();

        let nodes = f
            .service
            .list_keywords(&Scope::Community, &f.genre.id)
            .unwrap();
        let names: Vec<&str> = nodes.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["Strings", "Piano"]);
    }
}
