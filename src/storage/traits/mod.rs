//! Storage traits.

mod catalog;
mod keyword;
mod project;

pub use catalog::CatalogStore;
pub use keyword::{BatchReport, KeywordBatch, KeywordMutation, KeywordStore, MutationFailure};
pub use project::ProjectStore;
