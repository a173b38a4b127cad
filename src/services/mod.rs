//! Business logic services.
//!
//! Services orchestrate storage backends and provide high-level operations.
//!
//! | Service | Role |
//! |---------|------|
//! | [`CatalogService`] | Users, genres and cascading removals |
//! | [`SubmissionService`] | Saves prompts and folds them into the graph |
//! | [`SuggestionService`] | Validates and answers suggestion requests |
//! | [`CooccurrenceGraphUpdater`] | Applies and retracts prompts on keyword nodes |
//! | [`SuggestionRanker`] | Scores next keywords from the graph |

mod catalog;
mod container;
mod extractor;
mod graph_updater;
mod ranker;
mod scope_lock;
mod submission;
mod suggestion;

pub use catalog::{CascadeSummary, CatalogService};
pub use container::ServiceContainer;
pub use extractor::{clean_prompt, distinct_keywords, extract_keywords, normalize_keyword};
pub use graph_updater::{CooccurrenceGraphUpdater, GraphUpdate, Retraction};
pub use ranker::{SuggestionRanker, cold_start, edge_score, rank_related};
pub use scope_lock::ScopeLocks;
pub use submission::SubmissionService;
pub use suggestion::SuggestionService;
