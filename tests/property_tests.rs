//! Property-based tests for the keyword graph.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Extraction is idempotent when its output is joined back into a prompt
//! - Running averages match the arithmetic mean of every rating
//! - Removing a rating undoes adding it
//! - Co-occurrence relations are symmetric and never self-referential
//! - Deleting every project empties the graph

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use promptgraph::models::KeywordStats;
use promptgraph::services::{ServiceContainer, distinct_keywords};
use promptgraph::{KeywordStore, Scope, SubmissionRequest, extract_keywords};
use std::collections::HashMap;

const VOCABULARY: &[&str] = &[
    "Piano", "Drums", "Bass", "Strings", "Lo-fi", "Vinyl", "Rain", "Sax",
];

fn prompt_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(VOCABULARY), 1..6).prop_map(|words| words.join(", "))
}

fn rating_strategy() -> impl Strategy<Value = f64> {
    (0u32..=100).prop_map(|r| f64::from(r) / 10.0)
}

proptest! {
    /// Property: re-joining extracted keywords extracts the same keywords.
    #[test]
    fn prop_extraction_idempotent(prompt in "[a-zA-Z ,]{0,80}") {
        let first = extract_keywords(&prompt);
        let second = extract_keywords(&first.join(", "));
        prop_assert_eq!(first, second);
    }

    /// Property: extracted keywords are never empty or padded.
    #[test]
    fn prop_extraction_trims_segments(prompt in "[a-zA-Z ,]{0,80}") {
        for keyword in extract_keywords(&prompt) {
            prop_assert!(!keyword.is_empty());
            prop_assert_eq!(keyword.trim(), keyword.as_str());
        }
    }

    /// Property: distinct keywords keep first occurrences and drop case-folded repeats.
    #[test]
    fn prop_distinct_keywords_unique(prompt in "[a-cA-C ,]{0,40}") {
        let tokens = extract_keywords(&prompt);
        let distinct = distinct_keywords(&tokens);
        let mut keys: Vec<String> = distinct.iter().map(|t| t.to_lowercase()).collect();
        keys.sort();
        keys.dedup();
        prop_assert_eq!(keys.len(), distinct.len());
        prop_assert!(distinct.iter().all(|d| tokens.contains(d)));
    }

    /// Property: the running average equals the arithmetic mean.
    #[test]
    fn prop_running_average_is_mean(ratings in prop::collection::vec(rating_strategy(), 1..40)) {
        let stats = ratings[1..].iter().fold(
            KeywordStats { iterations: 1, average_rating: ratings[0] },
            |stats, &rating| stats.with_rating(rating),
        );
        #[allow(clippy::cast_precision_loss)]
        let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;

        prop_assert_eq!(stats.iterations as usize, ratings.len());
        prop_assert!((stats.average_rating - mean).abs() < 1e-9);
    }

    /// Property: removing the last rating restores the previous statistics.
    #[test]
    fn prop_without_rating_undoes_with_rating(
        ratings in prop::collection::vec(rating_strategy(), 1..20),
        extra in rating_strategy(),
    ) {
        let before = ratings[1..].iter().fold(
            KeywordStats { iterations: 1, average_rating: ratings[0] },
            |stats, &rating| stats.with_rating(rating),
        );
        let after = before.with_rating(extra).without_rating(extra).unwrap();

        prop_assert_eq!(after.iterations, before.iterations);
        prop_assert!((after.average_rating - before.average_rating).abs() < 1e-9);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: relations are symmetric, self-free and within the scope.
    #[test]
    fn prop_relations_symmetric(
        prompts in prop::collection::vec((prompt_strategy(), rating_strategy()), 1..12),
    ) {
        let services = ServiceContainer::in_memory();
        let user = services.catalog().register_user("ada").unwrap();
        let genre = services.catalog().register_genre("Jazz", None).unwrap();
        for (prompt, rating) in &prompts {
            services
                .submissions()
                .submit(SubmissionRequest::new(genre.id.clone(), prompt.as_str(), *rating, user.id.clone()))
                .unwrap();
        }

        let nodes: HashMap<_, _> = services
            .keywords()
            .list_keywords(&Scope::Community, &genre.id)
            .unwrap()
            .into_iter()
            .map(|k| (k.id.clone(), k))
            .collect();
        for node in nodes.values() {
            prop_assert!(!node.related_keywords.contains(&node.id));
            for related in &node.related_keywords {
                let other = nodes.get(related);
                prop_assert!(other.is_some());
                prop_assert!(other.unwrap().related_keywords.contains(&node.id));
            }
        }
    }

    /// Property: deleting every project leaves no keyword nodes behind.
    #[test]
    fn prop_deleting_all_projects_empties_graph(
        prompts in prop::collection::vec((prompt_strategy(), rating_strategy()), 1..10),
    ) {
        let services = ServiceContainer::in_memory();
        let user = services.catalog().register_user("ada").unwrap();
        let genre = services.catalog().register_genre("Jazz", None).unwrap();
        let submissions = services.submissions();

        let projects: Vec<_> = prompts
            .iter()
            .map(|(prompt, rating)| {
                submissions
                    .submit(SubmissionRequest::new(genre.id.clone(), prompt.as_str(), *rating, user.id.clone()))
                    .unwrap()
            })
            .collect();
        for project in projects.iter().rev() {
            submissions.delete_project(&user.id, &project.id).unwrap();
        }

        let remaining = services
            .keywords()
            .list_keywords(&Scope::Personal(user.id.clone()), &genre.id)
            .unwrap();
        prop_assert!(remaining.is_empty());
    }
}
