//! In-memory keyword store for testing.

use crate::models::{GenreId, Keyword, KeywordId, Scope, UserId, name_key};
use crate::storage::traits::KeywordStore;
use crate::{Error, Result};
use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type NodeKey = (UserId, GenreId, String);

#[derive(Debug, Default)]
struct State {
    nodes: HashMap<KeywordId, Keyword>,
    /// Creation order.
    order: Vec<KeywordId>,
    by_key: HashMap<NodeKey, KeywordId>,
}

impl State {
    fn ordered(&self) -> impl Iterator<Item = &Keyword> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }
}

/// In-memory keyword store.
///
/// Uses `RwLock` for thread-safe access with reader-writer semantics.
/// Data is not persisted between runs.
#[derive(Debug, Default)]
pub struct InMemoryKeywordStore {
    state: RwLock<State>,
}

impl InMemoryKeywordStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.nodes.len()).unwrap_or(0)
    }

    /// Returns true if no nodes are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self, operation: &str) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| Error::operation(operation, "Lock poisoned"))
    }

    fn write(&self, operation: &str) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| Error::operation(operation, "Lock poisoned"))
    }
}

impl KeywordStore for InMemoryKeywordStore {
    fn find_keyword(
        &self,
        owner: &UserId,
        genre: &GenreId,
        name: &str,
    ) -> Result<Option<Keyword>> {
        let state = self.read("find_keyword")?;
        let key = (owner.clone(), genre.clone(), name_key(name));
        Ok(state
            .by_key
            .get(&key)
            .and_then(|id| state.nodes.get(id))
            .cloned())
    }

    fn create_keyword(&self, keyword: &Keyword) -> Result<()> {
        let mut state = self.write("create_keyword")?;
        let key = (
            keyword.owner.clone(),
            keyword.genre.clone(),
            keyword.name_key(),
        );
        if state.by_key.contains_key(&key) || state.nodes.contains_key(&keyword.id) {
            return Err(Error::Conflict(format!(
                "keyword '{}' already exists for this owner and genre",
                keyword.name
            )));
        }

        let mut node = keyword.clone();
        node.related_keywords.remove(&node.id);
        state.by_key.insert(key, node.id.clone());
        state.order.push(node.id.clone());
        state.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    fn update_keyword_stats(
        &self,
        id: &KeywordId,
        iterations: u32,
        average_rating: f64,
    ) -> Result<()> {
        let mut state = self.write("update_keyword_stats")?;
        let node = state
            .nodes
            .get_mut(id)
            .ok_or_else(|| Error::not_found("keyword", id.as_str()))?;
        node.iterations = iterations;
        node.average_rating = average_rating;
        Ok(())
    }

    fn add_related_keywords(&self, id: &KeywordId, others: &BTreeSet<KeywordId>) -> Result<()> {
        let mut state = self.write("add_related_keywords")?;
        let node = state
            .nodes
            .get_mut(id)
            .ok_or_else(|| Error::not_found("keyword", id.as_str()))?;
        node.related_keywords
            .extend(others.iter().filter(|other| *other != id).cloned());
        Ok(())
    }

    fn find_keywords_by_ids(&self, ids: &BTreeSet<KeywordId>) -> Result<Vec<Keyword>> {
        let state = self.read("find_keywords_by_ids")?;
        Ok(state
            .ordered()
            .filter(|k| ids.contains(&k.id))
            .cloned()
            .collect())
    }

    fn find_keywords_by_exact_names(
        &self,
        scope: &Scope,
        genre: &GenreId,
        names: &BTreeSet<String>,
    ) -> Result<Vec<Keyword>> {
        let state = self.read("find_keywords_by_exact_names")?;
        let keys: BTreeSet<String> = names.iter().map(|n| name_key(n)).collect();
        Ok(state
            .ordered()
            .filter(|k| &k.genre == genre && scope.includes(k) && keys.contains(&k.name_key()))
            .cloned()
            .collect())
    }

    fn list_keywords(&self, scope: &Scope, genre: &GenreId) -> Result<Vec<Keyword>> {
        let state = self.read("list_keywords")?;
        Ok(state
            .ordered()
            .filter(|k| &k.genre == genre && scope.includes(k))
            .cloned()
            .collect())
    }

    fn delete_keywords(&self, ids: &BTreeSet<KeywordId>) -> Result<usize> {
        let mut state = self.write("delete_keywords")?;
        let mut deleted = 0;
        for id in ids {
            if let Some(node) = state.nodes.remove(id) {
                state
                    .by_key
                    .remove(&(node.owner.clone(), node.genre.clone(), node.name_key()));
                deleted += 1;
            }
        }
        state.order.retain(|id| !ids.contains(id));
        Ok(deleted)
    }

    fn remove_related_references(
        &self,
        genre: &GenreId,
        ids: &BTreeSet<KeywordId>,
    ) -> Result<usize> {
        let mut state = self.write("remove_related_references")?;
        let mut changed = 0;
        for node in state.nodes.values_mut().filter(|k| &k.genre == genre) {
            let before = node.related_keywords.len();
            node.related_keywords.retain(|id| !ids.contains(id));
            if node.related_keywords.len() != before {
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyword(owner: &str, name: &str) -> Keyword {
        Keyword::new(UserId::new(owner), GenreId::new("g1"), name, 5.0)
    }

    #[test]
    fn test_create_and_find_case_insensitive() {
        let store = InMemoryKeywordStore::new();
        let kw = keyword("u1", "Piano");
        store.create_keyword(&kw).unwrap();

        let found = store
            .find_keyword(&UserId::new("u1"), &GenreId::new("g1"), "PIANO")
            .unwrap();
        assert_eq!(found.map(|k| k.id), Some(kw.id));
    }

    #[test]
    fn test_create_duplicate_conflicts() {
        let store = InMemoryKeywordStore::new();
        store.create_keyword(&keyword("u1", "Piano")).unwrap();
        let err = store.create_keyword(&keyword("u1", "piano")).unwrap_err();
        assert!(err.is_conflict());

        // Same text for a different owner is a different node.
        store.create_keyword(&keyword("u2", "Piano")).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_add_related_is_set_union_without_self() {
        let store = InMemoryKeywordStore::new();
        let a = keyword("u1", "A");
        let b = keyword("u1", "B");
        store.create_keyword(&a).unwrap();
        store.create_keyword(&b).unwrap();

        let others: BTreeSet<KeywordId> = [a.id.clone(), b.id.clone()].into();
        store.add_related_keywords(&a.id, &others).unwrap();
        store.add_related_keywords(&a.id, &others).unwrap();

        let stored = store.find_keywords_by_ids(&[a.id.clone()].into()).unwrap();
        assert_eq!(stored[0].related_keywords, [b.id].into());
    }

    #[test]
    fn test_update_missing_keyword_is_not_found() {
        let store = InMemoryKeywordStore::new();
        let err = store
            .update_keyword_stats(&KeywordId::new("missing"), 2, 3.0)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "keyword", .. }));
    }

    #[test]
    fn test_list_respects_scope_and_order() {
        let store = InMemoryKeywordStore::new();
        let first = keyword("u1", "First");
        let second = keyword("u2", "Second");
        let third = keyword("u1", "Third");
        for kw in [&first, &second, &third] {
            store.create_keyword(kw).unwrap();
        }

        let genre = GenreId::new("g1");
        let mine = store
            .list_keywords(&Scope::Personal(UserId::new("u1")), &genre)
            .unwrap();
        assert_eq!(
            mine.iter().map(|k| k.name.as_str()).collect::<Vec<_>>(),
            vec!["First", "Third"]
        );
        let all = store.list_keywords(&Scope::Community, &genre).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_delete_and_strip_references() {
        let store = InMemoryKeywordStore::new();
        let a = keyword("u1", "A");
        let b = keyword("u1", "B");
        store.create_keyword(&a).unwrap();
        store.create_keyword(&b).unwrap();
        store
            .add_related_keywords(&a.id, &[b.id.clone()].into())
            .unwrap();

        let doomed: BTreeSet<KeywordId> = [b.id.clone()].into();
        assert_eq!(store.delete_keywords(&doomed).unwrap(), 1);
        assert_eq!(
            store
                .remove_related_references(&GenreId::new("g1"), &doomed)
                .unwrap(),
            1
        );
        let remaining = store.find_keywords_by_ids(&[a.id].into()).unwrap();
        assert!(remaining[0].related_keywords.is_empty());
        assert!(
            store
                .find_keyword(&UserId::new("u1"), &GenreId::new("g1"), "B")
                .unwrap()
                .is_none()
        );
    }
}
