//! Storage layer abstraction.
//!
//! Three stores back the service layer:
//! - **Keywords**: the co-occurrence graph ([`KeywordStore`])
//! - **Projects**: submitted prompts and their keyword links ([`ProjectStore`])
//! - **Catalog**: users and genres ([`CatalogStore`])
//!
//! Each store has a `SQLite` backend and an in-memory backend. The `SQLite`
//! backends may share one database file.

// Allow significant_drop_tightening - dropping database connections slightly early
// provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]

pub mod catalog;
pub mod keyword;
pub mod project;
pub mod sqlite;
pub mod traits;

pub use catalog::{InMemoryCatalogStore, SqliteCatalogStore};
pub use keyword::{InMemoryKeywordStore, SqliteKeywordStore};
pub use project::{InMemoryProjectStore, SqliteProjectStore};
pub use traits::{
    BatchReport, CatalogStore, KeywordBatch, KeywordMutation, KeywordStore, MutationFailure,
    ProjectStore,
};
