//! Keyword graph storage backends.
//!
//! Nodes are keyed by `(owner, genre, case-folded name)`; edges are
//! undirected co-occurrence links kept as a related set on each node.
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`SqliteKeywordStore`] | Persistent, transactional batches |
//! | [`InMemoryKeywordStore`] | Tests and ephemeral runs |

#[cfg(test)]
pub(crate) mod faulty;
mod memory;
mod sqlite;

pub use memory::InMemoryKeywordStore;
pub use sqlite::SqliteKeywordStore;
