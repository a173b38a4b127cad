//! `SQLite` catalog store.

use crate::models::{Genre, GenreId, User, UserId, name_key};
use crate::storage::sqlite::{
    Migration, MigrationRunner, acquire_lock, from_sql_timestamp, map_sqlite_error,
    open_connection, open_in_memory, to_sql_timestamp,
};
use crate::storage::traits::CatalogStore;
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::instrument;

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "users and genres",
    sql: "
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            username_key TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS genres (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL UNIQUE,
            owner_id TEXT,
            created_at INTEGER NOT NULL
        );
    ",
}];

/// `SQLite`-based user and genre store.
pub struct SqliteCatalogStore {
    conn: Mutex<Connection>,
}

impl SqliteCatalogStore {
    /// Opens (or creates) a catalog store at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        Self::initialize(open_connection(&db_path.into())?)
    }

    /// Creates an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        Self::initialize(open_in_memory()?)
    }

    fn initialize(mut conn: Connection) -> Result<Self> {
        MigrationRunner::new("catalog").run(&mut conn, MIGRATIONS)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn parse_user(row: &Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: UserId::new(row.get::<_, String>("id")?),
            username: row.get("username")?,
            created_at: from_sql_timestamp(row.get("created_at")?),
        })
    }

    fn parse_genre(row: &Row<'_>) -> rusqlite::Result<Genre> {
        Ok(Genre {
            id: GenreId::new(row.get::<_, String>("id")?),
            name: row.get("name")?,
            owner: row.get::<_, Option<String>>("owner_id")?.map(UserId::new),
            created_at: from_sql_timestamp(row.get("created_at")?),
        })
    }

    fn query_user(&self, operation: &str, column: &str, value: &str) -> Result<Option<User>> {
        let conn = acquire_lock(&self.conn);
        conn.query_row(
            &format!("SELECT id, username, created_at FROM users WHERE {column} = ?1"),
            params![value],
            Self::parse_user,
        )
        .optional()
        .map_err(|e| Error::operation(operation, e))
    }

    fn query_genre(&self, operation: &str, column: &str, value: &str) -> Result<Option<Genre>> {
        let conn = acquire_lock(&self.conn);
        conn.query_row(
            &format!("SELECT id, name, owner_id, created_at FROM genres WHERE {column} = ?1"),
            params![value],
            Self::parse_genre,
        )
        .optional()
        .map_err(|e| Error::operation(operation, e))
    }
}

impl CatalogStore for SqliteCatalogStore {
    #[instrument(skip(self, user), fields(username = %user.username))]
    fn create_user(&self, user: &User) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "INSERT INTO users (id, username, username_key, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id.as_str(),
                user.username,
                name_key(&user.username),
                to_sql_timestamp(user.created_at),
            ],
        )
        .map_err(|e| map_sqlite_error("create_user", e))?;
        Ok(())
    }

    fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        self.query_user("get_user", "id", id.as_str())
    }

    fn find_user_by_name(&self, username: &str) -> Result<Option<User>> {
        self.query_user("find_user_by_name", "username_key", &name_key(username))
    }

    fn delete_user(&self, id: &UserId) -> Result<bool> {
        let conn = acquire_lock(&self.conn);
        let deleted = conn
            .execute("DELETE FROM users WHERE id = ?1", params![id.as_str()])
            .map_err(|e| Error::operation("delete_user", e))?;
        Ok(deleted > 0)
    }

    #[instrument(skip(self, genre), fields(genre = %genre.name))]
    fn create_genre(&self, genre: &Genre) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "INSERT INTO genres (id, name, name_key, owner_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                genre.id.as_str(),
                genre.name,
                name_key(&genre.name),
                genre.owner.as_ref().map(UserId::as_str),
                to_sql_timestamp(genre.created_at),
            ],
        )
        .map_err(|e| map_sqlite_error("create_genre", e))?;
        Ok(())
    }

    fn get_genre(&self, id: &GenreId) -> Result<Option<Genre>> {
        self.query_genre("get_genre", "id", id.as_str())
    }

    fn find_genre_by_name(&self, name: &str) -> Result<Option<Genre>> {
        self.query_genre("find_genre_by_name", "name_key", &name_key(name))
    }

    fn list_genres(&self) -> Result<Vec<Genre>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, name, owner_id, created_at FROM genres ORDER BY name_key, name",
            )
            .map_err(|e| Error::operation("list_genres", e))?;
        stmt.query_map([], Self::parse_genre)
            .map_err(|e| Error::operation("list_genres", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::operation("list_genres", e))
    }

    fn delete_genre(&self, id: &GenreId) -> Result<bool> {
        let conn = acquire_lock(&self.conn);
        let deleted = conn
            .execute("DELETE FROM genres WHERE id = ?1", params![id.as_str()])
            .map_err(|e| Error::operation("delete_genre", e))?;
        Ok(deleted > 0)
    }
}
