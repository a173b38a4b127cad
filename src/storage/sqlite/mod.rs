//! Shared `SQLite` infrastructure for storage backends.
//!
//! - [`connection`]: lock acquisition with poison recovery, pragmas, opening
//! - [`migrations`]: versioned schema migrations applied in transactions
//!
//! Each store keeps its own connection; WAL mode lets them share a file.

mod connection;
mod migrations;

pub use connection::{
    acquire_lock, configure_connection, map_sqlite_error, open_connection, open_in_memory,
};
pub use migrations::{Migration, MigrationRunner, max_version};

/// Converts a `u64` timestamp to an `SQLite` integer.
pub(crate) fn to_sql_timestamp(ts: u64) -> i64 {
    i64::try_from(ts).unwrap_or(i64::MAX)
}

/// Converts an `SQLite` integer to a `u64` timestamp.
pub(crate) fn from_sql_timestamp(ts: i64) -> u64 {
    u64::try_from(ts).unwrap_or(0)
}
