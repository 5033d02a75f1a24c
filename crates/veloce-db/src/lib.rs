mod migrations;
pub mod queries;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;
use thiserror::Error;
use tracing::debug;

pub use migrations::SCHEMA_VERSION;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("subtask not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("database lock poisoned")]
    LockPoisoned,
}

/// Shared handle to the subtask database. Cloning shares the connection;
/// queries serialize on its lock.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    /// Open (or create) a database file, creating missing parent directories.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        // WAL lets a reader (e.g. a second CLI invocation) proceed during a write.
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(path = %path.display(), journal_mode = %mode, "opened subtask database");
        Self::prepare(conn)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::prepare(Connection::open_in_memory()?)
    }

    pub fn open_default() -> Result<Self, DbError> {
        Self::open(&default_db_path())
    }

    fn prepare(mut conn: Connection) -> Result<Self, DbError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migrations::run(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Number of schema steps applied to this database.
    pub fn schema_version(&self) -> Result<u32, DbError> {
        self.with_conn(migrations::version)
    }

    pub(crate) fn with_conn<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Connection) -> Result<T, DbError>,
    {
        let conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        f(&conn)
    }
}

/// `$XDG_DATA_HOME/veloce/veloce.db`, falling back to `~/.local/share`.
pub fn default_db_path() -> PathBuf {
    let data_home = std::env::var_os("XDG_DATA_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    data_home.join("veloce").join("veloce.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_database_is_at_current_version() {
        let db = Db::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
        db.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT count(*) FROM sqlite_master WHERE name = 'subtasks'",
                [],
                |row| row.get(0),
            )?;
            assert_eq!(count, 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn open_creates_file_and_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("veloce.db");
        assert!(!db_path.exists());

        let db = Db::open(&db_path).unwrap();
        assert!(db_path.exists());
        let mode: String = db
            .with_conn(|conn| Ok(conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[test]
    fn reopen_keeps_rows_and_version() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("veloce.db");
        {
            let db = Db::open(&db_path).unwrap();
            db.upsert_subtask(&veloce_core::SubTask::new("t", "kept", 1))
                .unwrap();
        }
        let db = Db::open(&db_path).unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
        assert_eq!(db.list_subtasks("t").unwrap().len(), 1);
    }

    #[test]
    fn newer_schema_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("veloce.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
                .unwrap();
        }
        let err = Db::open(&db_path).err().unwrap();
        assert!(matches!(
            err,
            DbError::SchemaTooNew { found, supported }
                if found == SCHEMA_VERSION + 1 && supported == SCHEMA_VERSION
        ));
    }
}
