//! Shared connection handling for `SQLite` stores.
//!
//! Each store owns its own `Mutex<Connection>`. WAL mode lets several
//! stores (and several processes) share one database file.

use crate::{Error, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Acquires a mutex lock, recovering from poison.
///
/// A poisoned mutex means an earlier critical section panicked. The
/// connection itself is still usable, so the guard is recovered and a
/// warning is logged.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Applies the pragmas every store relies on.
///
/// - **WAL mode**: concurrent readers with a single writer
/// - **NORMAL synchronous**: durability/performance balance
/// - **`busy_timeout`**: wait up to 5 seconds on lock contention
/// - **`foreign_keys`**: enforce declared references
pub fn configure_connection(conn: &Connection) -> Result<()> {
    // journal_mode returns a row, so pragma_update results are ignored
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    conn.pragma_update(None, "busy_timeout", "5000")
        .map_err(|e| Error::operation("configure_sqlite", e))?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| Error::operation("configure_sqlite", e))?;
    Ok(())
}

/// Opens and configures a database file, creating parent directories.
pub fn open_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
            operation: "create_database_dir".to_string(),
            cause: format!("{}: {e}", parent.display()),
        })?;
    }
    let conn = Connection::open(path).map_err(|e| Error::OperationFailed {
        operation: "open_sqlite".to_string(),
        cause: format!("{}: {e}", path.display()),
    })?;
    configure_connection(&conn)?;
    Ok(conn)
}

/// Opens a private in-memory database.
pub fn open_in_memory() -> Result<Connection> {
    let conn =
        Connection::open_in_memory().map_err(|e| Error::operation("open_sqlite_memory", e))?;
    configure_connection(&conn)?;
    Ok(conn)
}

/// Maps a `rusqlite` error, turning unique-constraint violations into
/// [`Error::Conflict`].
pub fn map_sqlite_error(operation: &str, err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(code, _) = &err
        && code.code == rusqlite::ErrorCode::ConstraintViolation
        && (code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            || code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    {
        return Error::Conflict(format!("{operation}: {err}"));
    }
    Error::operation(operation, err)
}
