//! User and genre storage backends.

mod memory;
mod sqlite;

pub use memory::InMemoryCatalogStore;
pub use sqlite::SqliteCatalogStore;
