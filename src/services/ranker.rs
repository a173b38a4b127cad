//! Next-keyword suggestion ranking.
//!
//! # Scoring
//!
//! For a non-empty partial prompt, the typed keywords are matched to graph
//! nodes and their related nodes become candidates. Each edge
//! `typed node → related node` scores:
//!
//! ```text
//! score = rating_weight * related.average_rating
//!       + iterations_weight * log10(related.iterations)
//! ```
//!
//! with the logarithmic term taken as 0 when `iterations == 0`. Scores of
//! edges reaching the same related node are summed. Related nodes whose
//! name was already typed are dropped, the rest are sorted by score
//! (descending, ties in discovery order) and cut to
//! [`RankingConfig::max_suggestions`].
//!
//! # Cold start
//!
//! An empty partial prompt lists the scope's nodes with score 0. Personal
//! scope keeps creation order; community scope sorts ascending by
//! `iterations`, putting rarely used keywords first.

use super::extractor::{clean_prompt, extract_keywords};
use crate::config::RankingConfig;
use crate::models::{GenreId, Keyword, KeywordId, Scope, Suggestion, SuggestionResponse, name_key};
use crate::storage::traits::KeywordStore;
use crate::Result;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;

/// Scores one edge towards `related`.
///
/// A node with zero iterations contributes only its rating term.
#[must_use]
pub fn edge_score(config: &RankingConfig, related: &Keyword) -> f64 {
    let frequency = if related.iterations == 0 {
        metrics::counter!("ranker_zero_iteration_skips_total").increment(1);
        0.0
    } else {
        f64::from(related.iterations).log10()
    };
    config
        .rating_weight
        .mul_add(related.average_rating, config.iterations_weight * frequency)
}

/// Ranks the related nodes of `candidates`.
///
/// `related` holds the fetched related nodes by id; ids missing from it are
/// ignored. `typed` holds the case-folded names already in the prompt.
#[must_use]
pub fn rank_related(
    config: &RankingConfig,
    candidates: &[Keyword],
    related: &HashMap<KeywordId, Keyword>,
    typed: &HashSet<String>,
) -> SuggestionResponse {
    // Discovery order is kept so equal scores stay in first-seen order.
    let mut order: Vec<&Keyword> = Vec::new();
    let mut totals: HashMap<&KeywordId, f64> = HashMap::new();

    let edges = candidates
        .iter()
        .flat_map(|candidate| candidate.related_keywords.iter())
        .filter_map(|id| related.get(id));
    for node in edges {
        let score = edge_score(config, node);
        totals
            .entry(&node.id)
            .and_modify(|total| *total += score)
            .or_insert_with(|| {
                order.push(node);
                score
            });
    }

    let mut ranked: Vec<Suggestion> = order
        .into_iter()
        .filter(|node| !typed.contains(&node.name_key()))
        .map(|node| Suggestion {
            name: node.name.clone(),
            score: totals.get(&node.id).copied().unwrap_or_default(),
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(config.max_suggestions);

    SuggestionResponse {
        total_score: ranked.iter().map(|s| s.score).sum(),
        suggestions_list: ranked,
    }
}

/// Lists a scope's nodes for an empty prompt.
#[must_use]
pub fn cold_start(scope: &Scope, mut nodes: Vec<Keyword>) -> SuggestionResponse {
    if matches!(scope, Scope::Community) {
        nodes.sort_by_key(|k| k.iterations);
    }
    SuggestionResponse {
        total_score: 0.0,
        suggestions_list: nodes
            .into_iter()
            .map(|k| Suggestion {
                name: k.name,
                score: 0.0,
            })
            .collect(),
    }
}

/// Computes suggestions from the keyword graph.
pub struct SuggestionRanker {
    keywords: Arc<dyn KeywordStore>,
    config: RankingConfig,
}

impl SuggestionRanker {
    /// Creates a ranker with the default weights.
    #[must_use]
    pub fn new(keywords: Arc<dyn KeywordStore>) -> Self {
        Self::with_config(keywords, RankingConfig::default())
    }

    /// Creates a ranker with explicit weights.
    #[must_use]
    pub const fn with_config(keywords: Arc<dyn KeywordStore>, config: RankingConfig) -> Self {
        Self { keywords, config }
    }

    /// Returns the ranking configuration.
    #[must_use]
    pub const fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Suggests next keywords for a partial prompt.
    ///
    /// A prompt with no keywords (empty, blank or only commas) gets the
    /// cold-start listing. No match is a valid, empty answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    #[instrument(skip(self, partial_prompt), fields(scope = scope.as_str(), genre = %genre))]
    pub fn suggest(
        &self,
        scope: &Scope,
        genre: &GenreId,
        partial_prompt: &str,
    ) -> Result<SuggestionResponse> {
        let tokens = extract_keywords(&clean_prompt(partial_prompt));
        if tokens.is_empty() {
            let nodes = self.keywords.list_keywords(scope, genre)?;
            tracing::debug!(nodes = nodes.len(), "Cold-start suggestions");
            return Ok(cold_start(scope, nodes));
        }

        let names: BTreeSet<String> = tokens.iter().cloned().collect();
        let candidates = self
            .keywords
            .find_keywords_by_exact_names(scope, genre, &names)?;
        let related_ids: BTreeSet<KeywordId> = candidates
            .iter()
            .flat_map(|k| k.related_keywords.iter().cloned())
            .collect();
        if related_ids.is_empty() {
            tracing::debug!(candidates = candidates.len(), "No related keywords");
            return Ok(SuggestionResponse::empty());
        }

        let related: HashMap<KeywordId, Keyword> = self
            .keywords
            .find_keywords_by_ids(&related_ids)?
            .into_iter()
            .map(|k| (k.id.clone(), k))
            .collect();
        let typed: HashSet<String> = tokens.iter().map(|t| name_key(t)).collect();

        let response = rank_related(&self.config, &candidates, &related, &typed);
        tracing::debug!(
            candidates = candidates.len(),
            related = related.len(),
            returned = response.suggestions_list.len(),
            total_score = response.total_score,
            "Ranked suggestions"
        );
        Ok(response)
    }
}
