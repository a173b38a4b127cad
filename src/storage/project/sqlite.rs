//! `SQLite` project store.

use crate::models::{GenreId, KeywordId, Project, ProjectId, UserId};
use crate::storage::sqlite::{
    Migration, MigrationRunner, acquire_lock, from_sql_timestamp, map_sqlite_error,
    open_connection, open_in_memory, to_sql_timestamp,
};
use crate::storage::traits::ProjectStore;
use crate::{Error, Result};
use rusqlite::{Connection, Row, ToSql, params};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::instrument;

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "projects and keyword links",
    sql: "
        CREATE TABLE IF NOT EXISTS projects (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            owner_id TEXT NOT NULL,
            genre_id TEXT NOT NULL,
            title TEXT,
            prompt TEXT NOT NULL,
            rating REAL NOT NULL,
            is_public INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS project_keywords (
            project_id TEXT NOT NULL,
            keyword_id TEXT NOT NULL,
            PRIMARY KEY (project_id, keyword_id),
            FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_projects_owner_genre ON projects(owner_id, genre_id);
        CREATE INDEX IF NOT EXISTS idx_projects_genre ON projects(genre_id);
    ",
}];

const PROJECT_COLUMNS: &str =
    "id, owner_id, genre_id, title, prompt, rating, is_public, created_at";

/// `SQLite`-based project store.
pub struct SqliteProjectStore {
    conn: Mutex<Connection>,
}

impl SqliteProjectStore {
    /// Opens (or creates) a project store at `db_path`.
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
        MigrationRunner::new("projects").run(&mut conn, MIGRATIONS)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn parse_row(row: &Row<'_>) -> rusqlite::Result<Project> {
        let created_at: i64 = row.get("created_at")?;
        Ok(Project {
            id: ProjectId::new(row.get::<_, String>("id")?),
            owner: UserId::new(row.get::<_, String>("owner_id")?),
            genre: GenreId::new(row.get::<_, String>("genre_id")?),
            title: row.get("title")?,
            prompt: row.get("prompt")?,
            rating: row.get("rating")?,
            is_public: row.get("is_public")?,
            keywords: BTreeSet::new(),
            created_at: from_sql_timestamp(created_at),
        })
    }

    fn load_links(conn: &Connection, project: &mut Project) -> Result<()> {
        let mut stmt = conn
            .prepare_cached("SELECT keyword_id FROM project_keywords WHERE project_id = ?1")
            .map_err(|e| Error::operation("load_project_keywords", e))?;
        project.keywords = stmt
            .query_map(params![project.id.as_str()], |row| {
                row.get::<_, String>(0).map(KeywordId::new)
            })
            .map_err(|e| Error::operation("load_project_keywords", e))?
            .collect::<rusqlite::Result<BTreeSet<_>>>()
            .map_err(|e| Error::operation("load_project_keywords", e))?;
        Ok(())
    }

    /// Builds the `WHERE` clause and parameters for optional filters.
    fn filter_clause<'a>(
        owner: Option<&'a UserId>,
        genre: Option<&'a GenreId>,
    ) -> (String, Vec<&'a str>) {
        let mut conditions = Vec::new();
        let mut values = Vec::new();
        if let Some(owner) = owner {
            values.push(owner.as_str());
            conditions.push(format!("owner_id = ?{}", values.len()));
        }
        if let Some(genre) = genre {
            values.push(genre.as_str());
            conditions.push(format!("genre_id = ?{}", values.len()));
        }
        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        (clause, values)
    }
}

impl ProjectStore for SqliteProjectStore {
    #[instrument(skip(self, project), fields(project_id = %project.id))]
    fn create_project(&self, project: &Project) -> Result<()> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn
            .transaction()
            .map_err(|e| Error::operation("create_project", e))?;
        tx.execute(
            "INSERT INTO projects (
                id, owner_id, genre_id, title, prompt, rating, is_public, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                project.id.as_str(),
                project.owner.as_str(),
                project.genre.as_str(),
                project.title,
                project.prompt,
                project.rating,
                project.is_public,
                to_sql_timestamp(project.created_at),
            ],
        )
        .map_err(|e| map_sqlite_error("create_project", e))?;
        for keyword in &project.keywords {
            tx.execute(
                "INSERT OR IGNORE INTO project_keywords (project_id, keyword_id) VALUES (?1, ?2)",
                params![project.id.as_str(), keyword.as_str()],
            )
            .map_err(|e| Error::operation("create_project", e))?;
        }
        tx.commit()
            .map_err(|e| Error::operation("create_project", e))
    }

    #[instrument(skip(self, keywords), fields(project_id = %id, keywords = keywords.len()))]
    fn attach_keywords(&self, id: &ProjectId, keywords: &BTreeSet<KeywordId>) -> Result<()> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn
            .transaction()
            .map_err(|e| Error::operation("attach_keywords", e))?;

        let exists: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM projects WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| Error::operation("attach_keywords", e))?;
        if exists == 0 {
            return Err(Error::not_found("project", id.as_str()));
        }

        tx.execute(
            "DELETE FROM project_keywords WHERE project_id = ?1",
            params![id.as_str()],
        )
        .map_err(|e| Error::operation("attach_keywords", e))?;
        for keyword in keywords {
            tx.execute(
                "INSERT INTO project_keywords (project_id, keyword_id) VALUES (?1, ?2)",
                params![id.as_str(), keyword.as_str()],
            )
            .map_err(|e| Error::operation("attach_keywords", e))?;
        }
        tx.commit()
            .map_err(|e| Error::operation("attach_keywords", e))
    }

    fn get_project(&self, id: &ProjectId) -> Result<Option<Project>> {
        let conn = acquire_lock(&self.conn);
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1");
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| Error::operation("get_project", e))?;
        let mut rows = stmt
            .query_map(params![id.as_str()], Self::parse_row)
            .map_err(|e| Error::operation("get_project", e))?;

        match rows.next() {
            Some(row) => {
                let mut project = row.map_err(|e| Error::operation("get_project", e))?;
                Self::load_links(&conn, &mut project)?;
                Ok(Some(project))
            },
            None => Ok(None),
        }
    }

    fn list_projects(
        &self,
        owner: Option<&UserId>,
        genre: Option<&GenreId>,
    ) -> Result<Vec<Project>> {
        let conn = acquire_lock(&self.conn);
        let (clause, values) = Self::filter_clause(owner, genre);
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects {clause} ORDER BY seq");
        let params: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| Error::operation("list_projects", e))?;
        let mut projects = stmt
            .query_map(params.as_slice(), Self::parse_row)
            .map_err(|e| Error::operation("list_projects", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::operation("list_projects", e))?;
        for project in &mut projects {
            Self::load_links(&conn, project)?;
        }
        Ok(projects)
    }

    #[instrument(skip(self), fields(project_id = %id))]
    fn delete_project(&self, id: &ProjectId) -> Result<bool> {
        let conn = acquire_lock(&self.conn);
        let deleted = conn
            .execute("DELETE FROM projects WHERE id = ?1", params![id.as_str()])
            .map_err(|e| Error::operation("delete_project", e))?;
        Ok(deleted > 0)
    }

    fn delete_projects(&self, owner: Option<&UserId>, genre: Option<&GenreId>) -> Result<usize> {
        let conn = acquire_lock(&self.conn);
        let (clause, values) = Self::filter_clause(owner, genre);
        let params: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
        conn.execute(&format!("DELETE FROM projects {clause}"), params.as_slice())
            .map_err(|e| Error::operation("delete_projects", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(owner: &str, genre: &str) -> Project {
        let mut p = Project::new(UserId::new(owner), GenreId::new(genre), "Piano, Drums", 7.5);
        p.title = Some("Night drive".to_string());
        p
    }

    #[test]
    fn test_create_get_roundtrip_with_links() {
        let store = SqliteProjectStore::in_memory().unwrap();
        let mut p = project("u1", "g1");
        store.create_project(&p).unwrap();

        let links: BTreeSet<KeywordId> = [KeywordId::new("k1"), KeywordId::new("k2")].into();
        store.attach_keywords(&p.id, &links).unwrap();
        p.keywords = links;

        assert_eq!(store.get_project(&p.id).unwrap(), Some(p));
    }

    #[test]
    fn test_duplicate_id_conflicts() {
        let store = SqliteProjectStore::in_memory().unwrap();
        let p = project("u1", "g1");
        store.create_project(&p).unwrap();
        assert!(store.create_project(&p).unwrap_err().is_conflict());
    }

    #[test]
    fn test_filters_and_cascade() {
        let store = SqliteProjectStore::in_memory().unwrap();
        let kept = project("u2", "g1");
        store.create_project(&project("u1", "g1")).unwrap();
        store.create_project(&project("u1", "g2")).unwrap();
        store.create_project(&kept).unwrap();

        let u1 = UserId::new("u1");
        assert_eq!(store.list_projects(Some(&u1), None).unwrap().len(), 2);
        assert_eq!(store.delete_projects(Some(&u1), None).unwrap(), 2);

        let remaining = store.list_projects(None, None).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, kept.id);
        assert!(store.delete_project(&kept.id).unwrap());
        assert!(!store.delete_project(&kept.id).unwrap());
    }
}
