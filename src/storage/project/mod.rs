//! Project storage backends.

mod memory;
mod sqlite;

pub use memory::InMemoryProjectStore;
pub use sqlite::SqliteProjectStore;
