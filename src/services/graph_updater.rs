//! Co-occurrence graph maintenance.
//!
//! Each submission touches the distinct keywords of one prompt within one
//! `(owner, genre)` scope:
//!
//! ```text
//! tokens ──► lookup ──► Create (new) / UpdateStats (existing)
//!                 └───► AddRelated: every touched id ↔ every other touched id
//! ```
//!
//! All mutations are planned first as a [`KeywordBatch`] and then handed to
//! [`KeywordStore::apply_batch`], under the scope's lock from [`ScopeLocks`].

use super::extractor::distinct_keywords;
use super::scope_lock::ScopeLocks;
use crate::models::{GenreId, Keyword, KeywordId, KeywordStats, Project, Scope, UserId};
use crate::storage::traits::{BatchReport, KeywordBatch, KeywordMutation, KeywordStore};
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;

/// Outcome of applying one prompt to the graph.
#[derive(Debug, Default)]
pub struct GraphUpdate {
    /// Nodes created by this submission, in prompt order.
    pub created: Vec<KeywordId>,
    /// Pre-existing nodes whose statistics were updated, in prompt order.
    pub existing: Vec<KeywordId>,
    /// Every node that exists after the update and belongs to the prompt.
    pub touched: BTreeSet<KeywordId>,
    /// What the store reported.
    pub report: BatchReport,
}

impl GraphUpdate {
    /// Returns true if every planned mutation was applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.report.is_complete()
    }

    /// Returns [`Error::PartialUpdate`] if the update was incomplete.
    #[must_use]
    pub fn partial_error(&self) -> Option<Error> {
        self.report.partial_error()
    }
}

/// Outcome of removing one project's contribution from the graph.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Retraction {
    /// Nodes whose statistics were rolled back.
    pub updated: usize,
    /// Nodes deleted because no prompt references them any more.
    pub deleted: BTreeSet<KeywordId>,
}

/// Planned mutations plus the bookkeeping needed to report on them.
struct Plan {
    batch: KeywordBatch,
    created: Vec<KeywordId>,
    existing: Vec<KeywordId>,
}

/// Applies submissions to the keyword co-occurrence graph.
///
/// # Concurrency
///
/// Updates to the same `(owner, genre)` scope are serialized through
/// [`ScopeLocks`]; other scopes never wait. A second process writing the
/// same database can still race on node creation. The store reports that
/// as [`Error::Conflict`] and the update is planned once more against the
/// fresh state.
pub struct CooccurrenceGraphUpdater {
    keywords: Arc<dyn KeywordStore>,
    locks: Arc<ScopeLocks>,
}

impl CooccurrenceGraphUpdater {
    /// Creates an updater with its own lock registry.
    #[must_use]
    pub fn new(keywords: Arc<dyn KeywordStore>) -> Self {
        Self::with_locks(keywords, Arc::new(ScopeLocks::new()))
    }

    /// Creates an updater sharing an existing lock registry.
    #[must_use]
    pub const fn with_locks(keywords: Arc<dyn KeywordStore>, locks: Arc<ScopeLocks>) -> Self {
        Self { keywords, locks }
    }

    /// Applies one prompt's tokens to the graph.
    ///
    /// Tokens repeated within the prompt count once. For each distinct
    /// token the `(owner, genre, name)` node is created (`iterations = 1`,
    /// `average_rating = rating`) or its statistics are advanced by one
    /// rating. Every touched node is then related to every other touched
    /// node.
    ///
    /// A best-effort store may apply only part of the batch; the returned
    /// [`GraphUpdate::report`] says what failed.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookups fail, or if a transactional store
    /// rejects the batch.
    #[instrument(skip(self, tokens), fields(owner = %owner, genre = %genre, tokens = tokens.len()))]
    pub fn apply(
        &self,
        owner: &UserId,
        genre: &GenreId,
        tokens: &[String],
        rating: f64,
    ) -> Result<GraphUpdate> {
        self.with_scope(owner, genre, || self.apply_in_scope(owner, genre, tokens, rating))
    }

    /// Runs `f` while holding the lock for `(owner, genre)`.
    ///
    /// Inside `f`, use [`Self::apply_in_scope`] and [`Self::retract_in_scope`];
    /// the locking variants would wait on the lock already held.
    pub(crate) fn with_scope<T>(
        &self,
        owner: &UserId,
        genre: &GenreId,
        f: impl FnOnce() -> T,
    ) -> T {
        self.locks.with_scope(owner, genre, f)
    }

    /// [`Self::apply`] for a caller already holding the scope lock.
    pub(crate) fn apply_in_scope(
        &self,
        owner: &UserId,
        genre: &GenreId,
        tokens: &[String],
        rating: f64,
    ) -> Result<GraphUpdate> {
        let distinct = distinct_keywords(tokens);
        if distinct.is_empty() {
            return Ok(GraphUpdate::default());
        }

        let mut plan = self.plan(owner, genre, &distinct, rating)?;
        let report = match self.keywords.apply_batch(&plan.batch) {
            Ok(report) => report,
            Err(error) if error.is_conflict() => {
                tracing::warn!(error = %error, "Keyword batch conflicted, replanning");
                plan = self.plan(owner, genre, &distinct, rating)?;
                self.keywords.apply_batch(&plan.batch)?
            },
            Err(error) => return Err(error),
        };
        Ok(Self::summarize(plan, report))
    }

    /// Removes a project's contribution from its keyword nodes.
    ///
    /// Each linked node loses one iteration and the project's rating from
    /// its mean. Nodes left with no contributing prompt are deleted and
    /// stripped from every related set in the genre. Co-occurrence edges
    /// between surviving nodes are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage operation fails.
    #[instrument(skip(self, project), fields(project_id = %project.id, owner = %project.owner, genre = %project.genre))]
    pub fn retract(&self, project: &Project) -> Result<Retraction> {
        self.with_scope(&project.owner, &project.genre, || self.retract_in_scope(project))
    }

    /// [`Self::retract`] for a caller already holding the scope lock.
    pub(crate) fn retract_in_scope(&self, project: &Project) -> Result<Retraction> {
        if project.keywords.is_empty() {
            return Ok(Retraction::default());
        }

        let nodes = self.keywords.find_keywords_by_ids(&project.keywords)?;
        let mut retraction = Retraction::default();

        for node in nodes
            .iter()
            .filter(|k| k.owner == project.owner && k.genre == project.genre)
        {
            match KeywordStats::from_keyword(node).without_rating(project.rating) {
                Some(stats) => {
                    self.keywords.update_keyword_stats(
                        &node.id,
                        stats.iterations,
                        stats.average_rating,
                    )?;
                    retraction.updated += 1;
                },
                None => {
                    retraction.deleted.insert(node.id.clone());
                },
            }
        }

        self.delete_nodes(&project.genre, &retraction.deleted)?;
        tracing::info!(
            updated = retraction.updated,
            deleted = retraction.deleted.len(),
            "Retracted project from keyword graph"
        );
        Ok(retraction)
    }

    /// Deletes every node of one `(owner, genre)` scope, returning how many
    /// were removed. The scope's lock is released from the registry
    /// afterwards unless another caller still holds it.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage operation fails.
    #[instrument(skip(self), fields(owner = %owner, genre = %genre))]
    pub fn purge_scope(&self, owner: &UserId, genre: &GenreId) -> Result<usize> {
        let deleted = self.with_scope(owner, genre, || {
            let ids: BTreeSet<KeywordId> = self
                .keywords
                .list_keywords(&Scope::Personal(owner.clone()), genre)?
                .into_iter()
                .map(|k| k.id)
                .collect();
            self.delete_nodes(genre, &ids)
        })?;
        self.locks.evict(owner, genre);
        Ok(deleted)
    }

    fn delete_nodes(&self, genre: &GenreId, ids: &BTreeSet<KeywordId>) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let deleted = self.keywords.delete_keywords(ids)?;
        let stripped = self.keywords.remove_related_references(genre, ids)?;
        tracing::debug!(deleted, stripped, "Deleted keyword nodes");
        Ok(deleted)
    }

    /// Reads the current state of every token's node and plans the batch.
    fn plan(
        &self,
        owner: &UserId,
        genre: &GenreId,
        tokens: &[String],
        rating: f64,
    ) -> Result<Plan> {
        let mut creates = Vec::new();
        let mut updates = Vec::new();
        let mut created = Vec::new();
        let mut existing = Vec::new();

        for token in tokens {
            match self.keywords.find_keyword(owner, genre, token)? {
                Some(node) => {
                    let stats = node.stats_with_rating(rating);
                    updates.push(KeywordMutation::UpdateStats {
                        id: node.id.clone(),
                        iterations: stats.iterations,
                        average_rating: stats.average_rating,
                    });
                    existing.push(node.id);
                },
                None => {
                    let node = Keyword::new(owner.clone(), genre.clone(), token.clone(), rating);
                    created.push(node.id.clone());
                    creates.push(KeywordMutation::Create(node));
                },
            }
        }

        let touched: BTreeSet<KeywordId> = created.iter().chain(&existing).cloned().collect();
        let mut batch = KeywordBatch::new();
        for mutation in creates.into_iter().chain(updates) {
            batch.push(mutation);
        }
        if touched.len() > 1 {
            for id in created.iter().chain(&existing) {
                let mut others = touched.clone();
                others.remove(id);
                batch.push(KeywordMutation::AddRelated {
                    id: id.clone(),
                    others,
                });
            }
        }

        Ok(Plan {
            batch,
            created,
            existing,
        })
    }

    fn summarize(plan: Plan, report: BatchReport) -> GraphUpdate {
        let failed_creates: BTreeSet<&KeywordId> = report
            .failures
            .iter()
            .filter(|f| f.kind == "create")
            .map(|f| &f.keyword)
            .collect();
        let failed = |kind: &str| report.failures.iter().filter(|f| f.kind == kind).count();

        let created: Vec<KeywordId> = plan
            .created
            .into_iter()
            .filter(|id| !failed_creates.contains(id))
            .collect();
        let touched: BTreeSet<KeywordId> = created.iter().chain(&plan.existing).cloned().collect();

        let updated = plan.existing.len().saturating_sub(failed("update_stats"));
        let related = plan
            .batch
            .mutations
            .iter()
            .filter(|m| matches!(m, KeywordMutation::AddRelated { .. }))
            .count()
            .saturating_sub(failed("add_related"));

        metrics::counter!("keywords_created_total").increment(created.len() as u64);
        metrics::counter!("keywords_updated_total").increment(updated as u64);
        metrics::counter!("keyword_relations_added_total").increment(related as u64);

        tracing::info!(
            created = created.len(),
            updated,
            related,
            failed = report.failures.len(),
            skipped = report.skipped,
            "Applied prompt to keyword graph"
        );

        GraphUpdate {
            created,
            existing: plan.existing,
            touched,
            report,
        }
    }
}
