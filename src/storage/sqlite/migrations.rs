//! Versioned schema migrations for `SQLite` stores.
//!
//! Each store declares an ordered list of [`Migration`]s. Pending
//! migrations are applied at open time, each inside its own transaction
//! together with the version record, so a failed statement never leaves a
//! half-applied schema behind.
//!
//! ```rust,ignore
//! const MIGRATIONS: &[Migration] = &[Migration {
//!     version: 1,
//!     description: "keywords table",
//!     sql: "CREATE TABLE IF NOT EXISTS keywords (id TEXT PRIMARY KEY);",
//! }];
//!
//! MigrationRunner::new("keywords").run(&mut conn, MIGRATIONS)?;
//! ```

use crate::{Error, Result};
use rusqlite::{Connection, params};

/// A single migration with version and SQL.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Migration version (sequential, starting at 1).
    pub version: i64,
    /// Human-readable description.
    pub description: &'static str,
    /// SQL to apply; may contain several statements.
    pub sql: &'static str,
}

/// Applies migrations for one logical store.
#[derive(Debug, Clone)]
pub struct MigrationRunner {
    store: &'static str,
}

impl MigrationRunner {
    /// Creates a runner whose versions are tracked under `store`.
    #[must_use]
    pub const fn new(store: &'static str) -> Self {
        Self { store }
    }

    /// Applies every migration newer than the recorded version.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails; that migration is rolled back.
    pub fn run(&self, conn: &mut Connection, migrations: &[Migration]) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                store TEXT NOT NULL,
                version INTEGER NOT NULL,
                description TEXT NOT NULL,
                applied_at INTEGER NOT NULL,
                PRIMARY KEY (store, version)
            )",
            [],
        )
        .map_err(|e| Error::operation("create_migrations_table", e))?;

        let current = self.current_version(conn)?;
        for migration in migrations.iter().filter(|m| m.version > current) {
            self.apply(conn, migration)?;
        }
        tracing::debug!(
            store = self.store,
            version = max_version(migrations).max(current),
            "Schema up to date"
        );
        Ok(())
    }

    /// Returns the highest applied version, or 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracking table cannot be read.
    pub fn current_version(&self, conn: &Connection) -> Result<i64> {
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations WHERE store = ?1",
            params![self.store],
            |row| row.get(0),
        )
        .map_err(|e| Error::operation("read_schema_version", e))
    }

    fn apply(&self, conn: &mut Connection, migration: &Migration) -> Result<()> {
        let operation = format!("{}_migration_v{}", self.store, migration.version);
        let tx = conn
            .transaction()
            .map_err(|e| Error::operation(&operation, e))?;

        tx.execute_batch(migration.sql)
            .map_err(|e| Error::operation(&operation, e))?;
        tx.execute(
            "INSERT INTO schema_migrations (store, version, description, applied_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                self.store,
                migration.version,
                migration.description,
                i64::try_from(crate::current_timestamp()).unwrap_or(i64::MAX)
            ],
        )
        .map_err(|e| Error::operation(&operation, e))?;
        tx.commit().map_err(|e| Error::operation(&operation, e))?;

        tracing::info!(
            store = self.store,
            version = migration.version,
            description = migration.description,
            "Applied migration"
        );
        Ok(())
    }
}

/// Maximum version across a set of migrations.
#[must_use]
pub const fn max_version(migrations: &[Migration]) -> i64 {
    let mut max = 0;
    let mut i = 0;
    while i < migrations.len() {
        if migrations[i].version > max {
            max = migrations[i].version;
        }
        i += 1;
    }
    max
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sqlite::open_in_memory;

    const MIGRATIONS: &[Migration] = &[
        Migration {
            version: 1,
            description: "create t",
            sql: "CREATE TABLE t (x INTEGER);",
        },
        Migration {
            version: 2,
            description: "add y",
            sql: "ALTER TABLE t ADD COLUMN y TEXT;",
        },
    ];

    #[test]
    fn test_run_is_idempotent() {
        let mut conn = open_in_memory().unwrap();
        let runner = MigrationRunner::new("test");
        runner.run(&mut conn, MIGRATIONS).unwrap();
        runner.run(&mut conn, MIGRATIONS).unwrap();
        assert_eq!(runner.current_version(&conn).unwrap(), 2);
        assert_eq!(max_version(MIGRATIONS), 2);
    }

    #[test]
    fn test_failed_migration_rolls_back() {
        let mut conn = open_in_memory().unwrap();
        let runner = MigrationRunner::new("test");
        let broken = &[
            MIGRATIONS[0],
            Migration {
                version: 2,
                description: "broken",
                sql: "CREATE TABLE u (x INTEGER); THIS IS NOT SQL;",
            },
        ];
        assert!(runner.run(&mut conn, broken).is_err());
        assert_eq!(runner.current_version(&conn).unwrap(), 1);
        let u_exists: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'u'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(u_exists, 0);
    }

    #[test]
    fn test_versions_are_tracked_per_store() {
        let mut conn = open_in_memory().unwrap();
        MigrationRunner::new("a").run(&mut conn, &MIGRATIONS[..1]).unwrap();
        assert_eq!(MigrationRunner::new("b").current_version(&conn).unwrap(), 0);
    }
}
