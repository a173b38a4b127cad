//! Keyword store with injectable failures, for exercising best-effort
//! batches and the callers that tolerate them.

use super::InMemoryKeywordStore;
use crate::models::{GenreId, Keyword, KeywordId, Scope, UserId, name_key};
use crate::storage::traits::KeywordStore;
use crate::{Error, Result};
use std::collections::BTreeSet;

/// Wraps an [`InMemoryKeywordStore`] and fails selected mutations.
///
/// Keeps the provided best-effort `apply_batch`.
#[derive(Default)]
pub struct FaultyKeywordStore {
    inner: InMemoryKeywordStore,
    failing_creates: BTreeSet<String>,
    failing_updates: BTreeSet<String>,
    failing_lookups: bool,
}

impl FaultyKeywordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creating a node with this name fails.
    pub fn failing_create(mut self, name: &str) -> Self {
        self.failing_creates.insert(name_key(name));
        self
    }

    /// Updating the statistics of the node with this name fails.
    pub fn failing_update(mut self, name: &str) -> Self {
        self.failing_updates.insert(name_key(name));
        self
    }

    /// Every name lookup fails.
    pub const fn failing_lookups(mut self) -> Self {
        self.failing_lookups = true;
        self
    }

    pub const fn inner(&self) -> &InMemoryKeywordStore {
        &self.inner
    }
}

impl KeywordStore for FaultyKeywordStore {
    fn find_keyword(
        &self,
        owner: &UserId,
        genre: &GenreId,
        name: &str,
    ) -> Result<Option<Keyword>> {
        if self.failing_lookups {
            return Err(Error::operation("find_keyword", "injected failure"));
        }
        self.inner.find_keyword(owner, genre, name)
    }

    fn create_keyword(&self, keyword: &Keyword) -> Result<()> {
        if self.failing_creates.contains(&keyword.name_key()) {
            return Err(Error::operation("create_keyword", "injected failure"));
        }
        self.inner.create_keyword(keyword)
    }

    fn update_keyword_stats(
        &self,
        id: &KeywordId,
        iterations: u32,
        average_rating: f64,
    ) -> Result<()> {
        let target = self.inner.find_keywords_by_ids(&BTreeSet::from([id.clone()]))?;
        if target
            .iter()
            .any(|k| self.failing_updates.contains(&k.name_key()))
        {
            return Err(Error::operation("update_keyword_stats", "injected failure"));
        }
        self.inner.update_keyword_stats(id, iterations, average_rating)
    }

    fn add_related_keywords(&self, id: &KeywordId, others: &BTreeSet<KeywordId>) -> Result<()> {
        self.inner.add_related_keywords(id, others)
    }

    fn find_keywords_by_ids(&self, ids: &BTreeSet<KeywordId>) -> Result<Vec<Keyword>> {
        self.inner.find_keywords_by_ids(ids)
    }

    fn find_keywords_by_exact_names(
        &self,
        scope: &Scope,
        genre: &GenreId,
        names: &BTreeSet<String>,
    ) -> Result<Vec<Keyword>> {
        self.inner.find_keywords_by_exact_names(scope, genre, names)
    }

    fn list_keywords(&self, scope: &Scope, genre: &GenreId) -> Result<Vec<Keyword>> {
        self.inner.list_keywords(scope, genre)
    }

    fn delete_keywords(&self, ids: &BTreeSet<KeywordId>) -> Result<usize> {
        self.inner.delete_keywords(ids)
    }

    fn remove_related_references(
        &self,
        genre: &GenreId,
        ids: &BTreeSet<KeywordId>,
    ) -> Result<usize> {
        self.inner.remove_related_references(genre, ids)
    }
}
