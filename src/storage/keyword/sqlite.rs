//! `SQLite` keyword store.
//!
//! # Schema
//!
//! - `keywords`: one row per node, `UNIQUE (owner_id, genre_id, name_key)`
//!   where `name_key` is the case-folded name
//! - `keyword_relations`: one row per directed co-occurrence edge
//!
//! `seq` is an autoincrement column used to return nodes in creation order.

// SQLite hands back i64; counts and sequence numbers are never negative.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::models::{GenreId, Keyword, KeywordId, Scope, UserId, name_key};
use crate::storage::sqlite::{
    Migration, MigrationRunner, acquire_lock, from_sql_timestamp, map_sqlite_error,
    open_connection, open_in_memory, to_sql_timestamp,
};
use crate::storage::traits::{BatchReport, KeywordBatch, KeywordMutation, KeywordStore};
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params, params_from_iter};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::instrument;

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "keyword nodes and co-occurrence edges",
    sql: "
        CREATE TABLE IF NOT EXISTS keywords (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            owner_id TEXT NOT NULL,
            genre_id TEXT NOT NULL,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL,
            iterations INTEGER NOT NULL DEFAULT 1,
            average_rating REAL NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE (owner_id, genre_id, name_key)
        );
        CREATE TABLE IF NOT EXISTS keyword_relations (
            keyword_id TEXT NOT NULL,
            related_id TEXT NOT NULL,
            PRIMARY KEY (keyword_id, related_id),
            FOREIGN KEY (keyword_id) REFERENCES keywords(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_keywords_genre ON keywords(genre_id, name_key);
        CREATE INDEX IF NOT EXISTS idx_keyword_relations_related ON keyword_relations(related_id);
    ",
}];

const KEYWORD_COLUMNS: &str =
    "id, owner_id, genre_id, name, iterations, average_rating, created_at";

/// `SQLite`-based keyword store.
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` for thread-safe access. WAL mode and
/// `busy_timeout` handle access from other connections to the same file.
/// [`KeywordStore::apply_batch`] runs in a single transaction.
pub struct SqliteKeywordStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteKeywordStore {
    /// Opens (or creates) a keyword store at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = open_connection(&db_path)?;
        Self::initialize(conn, Some(db_path))
    }

    /// Creates an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        Self::initialize(open_in_memory()?, None)
    }

    /// Returns the database path.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn initialize(mut conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        MigrationRunner::new("keywords").run(&mut conn, MIGRATIONS)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    fn parse_row(row: &Row<'_>) -> rusqlite::Result<Keyword> {
        let iterations: i64 = row.get("iterations")?;
        let created_at: i64 = row.get("created_at")?;
        Ok(Keyword {
            id: KeywordId::new(row.get::<_, String>("id")?),
            owner: UserId::new(row.get::<_, String>("owner_id")?),
            genre: GenreId::new(row.get::<_, String>("genre_id")?),
            name: row.get("name")?,
            iterations: iterations.clamp(0, i64::from(u32::MAX)) as u32,
            average_rating: row.get("average_rating")?,
            related_keywords: BTreeSet::new(),
            created_at: from_sql_timestamp(created_at),
        })
    }

    /// Runs a keyword query and fills in each node's related set.
    fn query_keywords(
        conn: &Connection,
        operation: &str,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<Keyword>> {
        let mut stmt = conn
            .prepare_cached(sql)
            .map_err(|e| Error::operation(operation, e))?;
        let mut keywords = stmt
            .query_map(params, Self::parse_row)
            .map_err(|e| Error::operation(operation, e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::operation(operation, e))?;

        let mut related = conn
            .prepare_cached(
                "SELECT related_id FROM keyword_relations WHERE keyword_id = ?1 ORDER BY related_id",
            )
            .map_err(|e| Error::operation(operation, e))?;
        for keyword in &mut keywords {
            keyword.related_keywords = related
                .query_map(params![keyword.id.as_str()], |row| {
                    row.get::<_, String>(0).map(KeywordId::new)
                })
                .map_err(|e| Error::operation(operation, e))?
                .collect::<rusqlite::Result<BTreeSet<_>>>()
                .map_err(|e| Error::operation(operation, e))?;
        }
        Ok(keywords)
    }

    fn insert_keyword(conn: &Connection, keyword: &Keyword) -> Result<()> {
        conn.execute(
            "INSERT INTO keywords (
                id, owner_id, genre_id, name, name_key, iterations, average_rating, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                keyword.id.as_str(),
                keyword.owner.as_str(),
                keyword.genre.as_str(),
                keyword.name,
                keyword.name_key(),
                i64::from(keyword.iterations),
                keyword.average_rating,
                to_sql_timestamp(keyword.created_at),
            ],
        )
        .map_err(|e| map_sqlite_error("create_keyword", e))?;
        Self::insert_relations(conn, &keyword.id, &keyword.related_keywords)
    }

    fn update_stats(
        conn: &Connection,
        id: &KeywordId,
        iterations: u32,
        average_rating: f64,
    ) -> Result<()> {
        let changed = conn
            .execute(
                "UPDATE keywords SET iterations = ?2, average_rating = ?3 WHERE id = ?1",
                params![id.as_str(), i64::from(iterations), average_rating],
            )
            .map_err(|e| Error::operation("update_keyword_stats", e))?;
        if changed == 0 {
            return Err(Error::not_found("keyword", id.as_str()));
        }
        Ok(())
    }

    fn ensure_exists(conn: &Connection, id: &KeywordId) -> Result<()> {
        let exists = conn
            .query_row(
                "SELECT 1 FROM keywords WHERE id = ?1",
                params![id.as_str()],
                |_| Ok(()),
            )
            .optional()
            .map_err(|e| Error::operation("add_related_keywords", e))?;
        exists.ok_or_else(|| Error::not_found("keyword", id.as_str()))
    }

    fn insert_relations(
        conn: &Connection,
        id: &KeywordId,
        others: &BTreeSet<KeywordId>,
    ) -> Result<()> {
        let mut stmt = conn
            .prepare_cached(
                "INSERT OR IGNORE INTO keyword_relations (keyword_id, related_id) VALUES (?1, ?2)",
            )
            .map_err(|e| Error::operation("add_related_keywords", e))?;
        for other in others.iter().filter(|other| *other != id) {
            stmt.execute(params![id.as_str(), other.as_str()])
                .map_err(|e| Error::operation("add_related_keywords", e))?;
        }
        Ok(())
    }

    fn apply_mutation(conn: &Connection, mutation: &KeywordMutation) -> Result<()> {
        match mutation {
            KeywordMutation::Create(keyword) => Self::insert_keyword(conn, keyword),
            KeywordMutation::UpdateStats {
                id,
                iterations,
                average_rating,
            } => Self::update_stats(conn, id, *iterations, *average_rating),
            KeywordMutation::AddRelated { id, others } => {
                Self::ensure_exists(conn, id)?;
                Self::insert_relations(conn, id, others)
            },
        }
    }
}

/// Builds `?N, ?N+1, ...` placeholders starting at `first`.
fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl KeywordStore for SqliteKeywordStore {
    #[instrument(skip(self), fields(owner = %owner, genre = %genre))]
    fn find_keyword(
        &self,
        owner: &UserId,
        genre: &GenreId,
        name: &str,
    ) -> Result<Option<Keyword>> {
        let conn = acquire_lock(&self.conn);
        let sql = format!(
            "SELECT {KEYWORD_COLUMNS} FROM keywords
             WHERE owner_id = ?1 AND genre_id = ?2 AND name_key = ?3"
        );
        let key = name_key(name);
        let found = Self::query_keywords(
            &conn,
            "find_keyword",
            &sql,
            &[&owner.as_str(), &genre.as_str(), &key],
        )?;
        Ok(found.into_iter().next())
    }

    #[instrument(skip(self, keyword), fields(keyword_id = %keyword.id))]
    fn create_keyword(&self, keyword: &Keyword) -> Result<()> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn
            .transaction()
            .map_err(|e| Error::operation("create_keyword", e))?;
        Self::insert_keyword(&tx, keyword)?;
        tx.commit()
            .map_err(|e| Error::operation("create_keyword", e))
    }

    fn update_keyword_stats(
        &self,
        id: &KeywordId,
        iterations: u32,
        average_rating: f64,
    ) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        Self::update_stats(&conn, id, iterations, average_rating)
    }

    fn add_related_keywords(&self, id: &KeywordId, others: &BTreeSet<KeywordId>) -> Result<()> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn
            .transaction()
            .map_err(|e| Error::operation("add_related_keywords", e))?;
        Self::ensure_exists(&tx, id)?;
        Self::insert_relations(&tx, id, others)?;
        tx.commit()
            .map_err(|e| Error::operation("add_related_keywords", e))
    }

    fn find_keywords_by_ids(&self, ids: &BTreeSet<KeywordId>) -> Result<Vec<Keyword>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = acquire_lock(&self.conn);
        let sql = format!(
            "SELECT {KEYWORD_COLUMNS} FROM keywords WHERE id IN ({}) ORDER BY seq",
            placeholders(1, ids.len())
        );
        let values: Vec<&str> = ids.iter().map(KeywordId::as_str).collect();
        let params: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
        Self::query_keywords(&conn, "find_keywords_by_ids", &sql, &params)
    }

    #[instrument(skip(self, names), fields(scope = scope.as_str(), genre = %genre, names = names.len()))]
    fn find_keywords_by_exact_names(
        &self,
        scope: &Scope,
        genre: &GenreId,
        names: &BTreeSet<String>,
    ) -> Result<Vec<Keyword>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let conn = acquire_lock(&self.conn);
        let keys: Vec<String> = names
            .iter()
            .map(|n| name_key(n))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut values: Vec<&str> = vec![genre.as_str()];
        let owner_clause = scope.owner().map_or(String::new(), |owner| {
            values.push(owner.as_str());
            "AND owner_id = ?2".to_string()
        });
        let first_key = values.len() + 1;
        values.extend(keys.iter().map(String::as_str));

        let sql = format!(
            "SELECT {KEYWORD_COLUMNS} FROM keywords
             WHERE genre_id = ?1 {owner_clause} AND name_key IN ({})
             ORDER BY seq",
            placeholders(first_key, keys.len())
        );
        let params: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
        Self::query_keywords(&conn, "find_keywords_by_exact_names", &sql, &params)
    }

    fn list_keywords(&self, scope: &Scope, genre: &GenreId) -> Result<Vec<Keyword>> {
        let conn = acquire_lock(&self.conn);
        match scope.owner() {
            Some(owner) => {
                let sql = format!(
                    "SELECT {KEYWORD_COLUMNS} FROM keywords
                     WHERE genre_id = ?1 AND owner_id = ?2 ORDER BY seq"
                );
                Self::query_keywords(
                    &conn,
                    "list_keywords",
                    &sql,
                    &[&genre.as_str(), &owner.as_str()],
                )
            },
            None => {
                let sql = format!(
                    "SELECT {KEYWORD_COLUMNS} FROM keywords WHERE genre_id = ?1 ORDER BY seq"
                );
                Self::query_keywords(&conn, "list_keywords", &sql, &[&genre.as_str()])
            },
        }
    }

    fn delete_keywords(&self, ids: &BTreeSet<KeywordId>) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let conn = acquire_lock(&self.conn);
        let sql = format!(
            "DELETE FROM keywords WHERE id IN ({})",
            placeholders(1, ids.len())
        );
        conn.execute(&sql, params_from_iter(ids.iter().map(KeywordId::as_str)))
            .map_err(|e| Error::operation("delete_keywords", e))
    }

    fn remove_related_references(
        &self,
        genre: &GenreId,
        ids: &BTreeSet<KeywordId>,
    ) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let conn = acquire_lock(&self.conn);
        let list = placeholders(2, ids.len());
        let mut values: Vec<&str> = vec![genre.as_str()];
        values.extend(ids.iter().map(KeywordId::as_str));

        let affected: i64 = conn
            .query_row(
                &format!(
                    "SELECT COUNT(DISTINCT keyword_id) FROM keyword_relations
                     WHERE related_id IN ({list})
                       AND keyword_id IN (SELECT id FROM keywords WHERE genre_id = ?1)"
                ),
                params_from_iter(values.iter()),
                |row| row.get(0),
            )
            .map_err(|e| Error::operation("remove_related_references", e))?;

        conn.execute(
            &format!(
                "DELETE FROM keyword_relations
                 WHERE related_id IN ({list})
                   AND keyword_id IN (SELECT id FROM keywords WHERE genre_id = ?1)"
            ),
            params_from_iter(values.iter()),
        )
        .map_err(|e| Error::operation("remove_related_references", e))?;

        Ok(affected as usize)
    }

    /// Applies the whole batch in one transaction.
    ///
    /// Any failing mutation rolls back every other mutation of the batch
    /// and its error is returned.
    #[instrument(skip(self, batch), fields(mutations = batch.len()))]
    fn apply_batch(&self, batch: &KeywordBatch) -> Result<BatchReport> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn
            .transaction()
            .map_err(|e| Error::operation("apply_keyword_batch", e))?;

        for mutation in &batch.mutations {
            if let Err(error) = Self::apply_mutation(&tx, mutation) {
                tracing::warn!(
                    keyword_id = %mutation.target(),
                    mutation = mutation.kind(),
                    error = %error,
                    "Keyword batch rolled back"
                );
                metrics::counter!("keyword_batch_failures_total").increment(1);
                return Err(error);
            }
        }

        tx.commit()
            .map_err(|e| Error::operation("apply_keyword_batch", e))?;
        Ok(BatchReport {
            applied: batch.len(),
            ..BatchReport::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyword(owner: &str, name: &str, rating: f64) -> Keyword {
        Keyword::new(UserId::new(owner), GenreId::new("g1"), name, rating)
    }

    #[test]
    fn test_create_and_find_roundtrip() {
        let store = SqliteKeywordStore::in_memory().unwrap();
        let kw = keyword("u1", "Piano", 6.5);
        store.create_keyword(&kw).unwrap();

        let found = store
            .find_keyword(&UserId::new("u1"), &GenreId::new("g1"), "piano")
            .unwrap()
            .unwrap();
        assert_eq!(found, kw);
    }

    #[test]
    fn test_unique_key_is_enforced_by_storage() {
        let store = SqliteKeywordStore::in_memory().unwrap();
        store.create_keyword(&keyword("u1", "Piano", 5.0)).unwrap();
        let err = store
            .create_keyword(&keyword("u1", "PIANO", 5.0))
            .unwrap_err();
        assert!(err.is_conflict());
        store.create_keyword(&keyword("u2", "Piano", 5.0)).unwrap();
    }

    #[test]
    fn test_related_roundtrip_and_set_semantics() {
        let store = SqliteKeywordStore::in_memory().unwrap();
        let a = keyword("u1", "A", 5.0);
        let b = keyword("u1", "B", 5.0);
        store.create_keyword(&a).unwrap();
        store.create_keyword(&b).unwrap();

        let both: BTreeSet<KeywordId> = [a.id.clone(), b.id.clone()].into();
        store.add_related_keywords(&a.id, &both).unwrap();
        store.add_related_keywords(&a.id, &both).unwrap();

        let loaded = store.find_keywords_by_ids(&[a.id.clone()].into()).unwrap();
        assert_eq!(loaded[0].related_keywords, [b.id].into());
    }

    #[test]
    fn test_find_by_exact_names_scoped() {
        let store = SqliteKeywordStore::in_memory().unwrap();
        store.create_keyword(&keyword("u1", "Piano", 5.0)).unwrap();
        store.create_keyword(&keyword("u2", "Piano", 5.0)).unwrap();
        store.create_keyword(&keyword("u1", "Pianos", 5.0)).unwrap();

        let names: BTreeSet<String> = ["PIANO".to_string()].into();
        let genre = GenreId::new("g1");
        let personal = store
            .find_keywords_by_exact_names(&Scope::Personal(UserId::new("u1")), &genre, &names)
            .unwrap();
        assert_eq!(personal.len(), 1);
        assert_eq!(personal[0].owner, UserId::new("u1"));

        let community = store
            .find_keywords_by_exact_names(&Scope::Community, &genre, &names)
            .unwrap();
        assert_eq!(community.len(), 2);
    }

    #[test]
    fn test_batch_is_atomic() {
        let store = SqliteKeywordStore::in_memory().unwrap();
        let a = keyword("u1", "A", 5.0);
        let mut batch = KeywordBatch::new();
        batch.push(KeywordMutation::Create(a.clone()));
        batch.push(KeywordMutation::UpdateStats {
            id: KeywordId::new("missing"),
            iterations: 2,
            average_rating: 1.0,
        });

        assert!(store.apply_batch(&batch).is_err());
        assert!(
            store
                .find_keyword(&a.owner, &a.genre, "A")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_delete_cascades_outgoing_edges_and_strips_incoming() {
        let store = SqliteKeywordStore::in_memory().unwrap();
        let a = keyword("u1", "A", 5.0);
        let b = keyword("u1", "B", 5.0);
        store.create_keyword(&a).unwrap();
        store.create_keyword(&b).unwrap();
        store
            .add_related_keywords(&a.id, &[b.id.clone()].into())
            .unwrap();
        store
            .add_related_keywords(&b.id, &[a.id.clone()].into())
            .unwrap();

        let doomed: BTreeSet<KeywordId> = [b.id.clone()].into();
        assert_eq!(store.delete_keywords(&doomed).unwrap(), 1);
        assert_eq!(
            store
                .remove_related_references(&GenreId::new("g1"), &doomed)
                .unwrap(),
            1
        );
        let a_loaded = store.find_keywords_by_ids(&[a.id].into()).unwrap();
        assert!(a_loaded[0].related_keywords.is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("keywords.db");
        let kw = keyword("u1", "Piano", 5.0);
        {
            let store = SqliteKeywordStore::new(&path).unwrap();
            store.create_keyword(&kw).unwrap();
        }
        let store = SqliteKeywordStore::new(&path).unwrap();
        assert_eq!(store.db_path(), Some(path.as_path()));
        let all = store
            .list_keywords(&Scope::Community, &GenreId::new("g1"))
            .unwrap();
        assert_eq!(all, vec![kw]);
    }
}
