//! Keyword store trait.
//!
//! The keyword store holds the nodes of the co-occurrence graph. Nodes are
//! unique per `(owner, genre, name)`, compared case-insensitively on the
//! name. Uniqueness is enforced by the store itself: a second
//! [`KeywordStore::create_keyword`] for the same key returns
//! [`Error::Conflict`](crate::Error::Conflict) instead of creating a twin.
//!
//! # Batches
//!
//! A submission touches several nodes. The updater plans all of them as a
//! [`KeywordBatch`] and hands it to [`KeywordStore::apply_batch`]. The
//! provided implementation applies each mutation independently and keeps
//! going after a failure. Stores that support transactions override it to
//! apply the batch atomically.

use crate::models::{GenreId, Keyword, KeywordId, Scope, UserId};
use crate::{Error, Result};
use std::collections::{BTreeSet, HashSet};

/// A single planned change to the keyword graph.
#[derive(Debug, Clone, PartialEq)]
pub enum KeywordMutation {
    /// Insert a brand new node.
    Create(Keyword),
    /// Overwrite the statistics of an existing node.
    UpdateStats {
        /// Node to update.
        id: KeywordId,
        /// New usage count.
        iterations: u32,
        /// New mean rating.
        average_rating: f64,
    },
    /// Union ids into a node's related set.
    AddRelated {
        /// Node to update.
        id: KeywordId,
        /// Ids to add.
        others: BTreeSet<KeywordId>,
    },
}

impl KeywordMutation {
    /// Returns the id of the node this mutation targets.
    #[must_use]
    pub const fn target(&self) -> &KeywordId {
        match self {
            Self::Create(keyword) => &keyword.id,
            Self::UpdateStats { id, .. } | Self::AddRelated { id, .. } => id,
        }
    }

    /// Returns a label for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::UpdateStats { .. } => "update_stats",
            Self::AddRelated { .. } => "add_related",
        }
    }
}

/// Ordered set of mutations produced for one submission.
///
/// Creations come first, then statistics updates, then relation updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordBatch {
    /// Mutations in application order.
    pub mutations: Vec<KeywordMutation>,
}

impl KeywordBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a mutation.
    pub fn push(&mut self, mutation: KeywordMutation) {
        self.mutations.push(mutation);
    }

    /// Number of mutations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// Returns true if there is nothing to apply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

/// A mutation that could not be applied.
#[derive(Debug)]
pub struct MutationFailure {
    /// Node the mutation targeted.
    pub keyword: KeywordId,
    /// Mutation kind label.
    pub kind: &'static str,
    /// Why it failed.
    pub error: Error,
}

/// Outcome of [`KeywordStore::apply_batch`].
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Mutations applied successfully.
    pub applied: usize,
    /// Mutations skipped because they depended on a failed creation.
    pub skipped: usize,
    /// Mutations that failed.
    pub failures: Vec<MutationFailure>,
}

impl BatchReport {
    /// Returns true if every mutation was applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.skipped == 0
    }

    /// Converts an incomplete report into [`Error::PartialUpdate`].
    #[must_use]
    pub fn partial_error(&self) -> Option<Error> {
        if self.is_complete() {
            return None;
        }
        Some(Error::PartialUpdate {
            failed: self.failures.len() + self.skipped,
            attempted: self.applied + self.failures.len() + self.skipped,
        })
    }
}

/// Trait for keyword graph storage.
///
/// # Implementor Notes
///
/// - Methods use `&self` to enable sharing via `Arc<dyn KeywordStore>`
/// - Name lookups compare case-insensitively
/// - List methods return nodes in creation order
/// - `add_related_keywords` has set semantics and never stores the node's own id
pub trait KeywordStore: Send + Sync {
    /// Finds the node for `(owner, genre, name)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn find_keyword(&self, owner: &UserId, genre: &GenreId, name: &str)
    -> Result<Option<Keyword>>;

    /// Inserts a new node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if a node with the same
    /// `(owner, genre, name)` already exists, or another error if the
    /// insert fails.
    fn create_keyword(&self, keyword: &Keyword) -> Result<()>;

    /// Overwrites a node's usage statistics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the node does not exist.
    fn update_keyword_stats(&self, id: &KeywordId, iterations: u32, average_rating: f64)
    -> Result<()>;

    /// Unions `others` into a node's related set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the node does not exist.
    fn add_related_keywords(&self, id: &KeywordId, others: &BTreeSet<KeywordId>) -> Result<()>;

    /// Fetches nodes by id. Unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn find_keywords_by_ids(&self, ids: &BTreeSet<KeywordId>) -> Result<Vec<Keyword>>;

    /// Fetches nodes in a genre whose name equals one of `names`,
    /// ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn find_keywords_by_exact_names(
        &self,
        scope: &Scope,
        genre: &GenreId,
        names: &BTreeSet<String>,
    ) -> Result<Vec<Keyword>>;

    /// Lists every node of a genre within the scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn list_keywords(&self, scope: &Scope, genre: &GenreId) -> Result<Vec<Keyword>>;

    /// Deletes nodes by id, returning how many existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    fn delete_keywords(&self, ids: &BTreeSet<KeywordId>) -> Result<usize>;

    /// Removes `ids` from the related sets of every node in the genre,
    /// returning how many nodes changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    fn remove_related_references(&self, genre: &GenreId, ids: &BTreeSet<KeywordId>)
    -> Result<usize>;

    /// Applies a planned batch.
    ///
    /// The provided implementation is best-effort: every mutation is
    /// attempted on its own, and relation updates that would reference a
    /// node whose creation failed are dropped. Failures are collected in
    /// the report rather than returned.
    ///
    /// # Errors
    ///
    /// The provided implementation never returns `Err`. Transactional
    /// overrides return the error that aborted the transaction.
    fn apply_batch(&self, batch: &KeywordBatch) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        let mut failed_creates: HashSet<KeywordId> = HashSet::new();

        for mutation in &batch.mutations {
            let target = mutation.target();
            if failed_creates.contains(target) {
                report.skipped += 1;
                continue;
            }

            let outcome = match mutation {
                KeywordMutation::Create(keyword) => self.create_keyword(keyword),
                KeywordMutation::UpdateStats {
                    id,
                    iterations,
                    average_rating,
                } => self.update_keyword_stats(id, *iterations, *average_rating),
                KeywordMutation::AddRelated { id, others } => {
                    let others: BTreeSet<KeywordId> = others
                        .iter()
                        .filter(|other| !failed_creates.contains(*other))
                        .cloned()
                        .collect();
                    if others.is_empty() {
                        Ok(())
                    } else {
                        self.add_related_keywords(id, &others)
                    }
                },
            };

            match outcome {
                Ok(()) => report.applied += 1,
                Err(error) => {
                    tracing::warn!(
                        keyword_id = %target,
                        mutation = mutation.kind(),
                        error = %error,
                        "Keyword mutation failed, continuing with the rest of the batch"
                    );
                    metrics::counter!("keyword_batch_failures_total").increment(1);
                    if matches!(mutation, KeywordMutation::Create(_)) {
                        failed_creates.insert(target.clone());
                    }
                    report.failures.push(MutationFailure {
                        keyword: target.clone(),
                        kind: mutation.kind(),
                        error,
                    });
                },
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::keyword::faulty::FaultyKeywordStore;

    fn scope() -> (UserId, GenreId) {
        (UserId::new("u1"), GenreId::new("g1"))
    }

    fn related(store: &FaultyKeywordStore, id: &KeywordId) -> BTreeSet<KeywordId> {
        store
            .find_keywords_by_ids(&BTreeSet::from([id.clone()]))
            .unwrap()
            .pop()
            .map(|k| k.related_keywords)
            .unwrap_or_default()
    }

    #[test]
    fn test_best_effort_batch_continues_past_failures() {
        let (owner, genre) = scope();
        let store = FaultyKeywordStore::new()
            .failing_create("B")
            .failing_update("C");
        let c = Keyword::new(owner.clone(), genre.clone(), "C", 5.0);
        store.create_keyword(&c).unwrap();

        let a = Keyword::new(owner.clone(), genre.clone(), "A", 7.0);
        let b = Keyword::new(owner, genre, "B", 7.0);
        let ids = BTreeSet::from([a.id.clone(), b.id.clone(), c.id.clone()]);
        let others_of = |id: &KeywordId| {
            let mut others = ids.clone();
            others.remove(id);
            others
        };

        let mut batch = KeywordBatch::new();
        batch.push(KeywordMutation::Create(a.clone()));
        batch.push(KeywordMutation::Create(b.clone()));
        batch.push(KeywordMutation::UpdateStats {
            id: c.id.clone(),
            iterations: 2,
            average_rating: 6.0,
        });
        for id in [&a.id, &b.id, &c.id] {
            batch.push(KeywordMutation::AddRelated {
                id: id.clone(),
                others: others_of(id),
            });
        }

        let report = store.apply_batch(&batch).unwrap();

        assert_eq!(report.applied, 3);
        assert_eq!(report.skipped, 1);
        let kinds: Vec<_> = report.failures.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, ["create", "update_stats"]);
        assert!(!report.is_complete());

        assert_eq!(related(&store, &a.id), BTreeSet::from([c.id.clone()]));
        assert_eq!(related(&store, &c.id), BTreeSet::from([a.id.clone()]));
        assert!(related(&store, &b.id).is_empty());
        assert_eq!(store.inner().len(), 2);
    }

    #[test]
    fn test_partial_error_counts_failures_and_skips() {
        let report = BatchReport {
            applied: 3,
            skipped: 1,
            failures: vec![MutationFailure {
                keyword: KeywordId::new("k"),
                kind: "create",
                error: Error::operation("create_keyword", "boom"),
            }],
        };
        assert!(matches!(
            report.partial_error(),
            Some(Error::PartialUpdate {
                failed: 2,
                attempted: 5
            })
        ));
        assert!(BatchReport::default().partial_error().is_none());
    }
}
