// Journal store
// SQLite connection plus a revision counter that changes on every write

mod entries_repo;
mod schema;
mod settings_repo;
mod topics_repo;

use crate::error::StoreError;
use crate::journal::Mood;
use rusqlite::Connection;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::watch;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Owns the SQLite connection
///
/// Subscribers to [`JournalDb::subscribe`] are notified after every
/// successful write, which is how observers re-query "all entries" and
/// "all topics" reactively.
pub struct JournalDb {
    conn: Mutex<Connection>,
    revision: watch::Sender<u64>,
}

impl JournalDb {
    /// Open (creating if needed) the database at `db_path`
    pub fn open(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)?;
        let db = Self::with_conn(conn)?;
        tracing::info!("Journal database opened at {:?}", db_path);
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_conn(Connection::open_in_memory()?)
    }

    fn with_conn(conn: Connection) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        schema::create_tables(&conn)?;

        let (revision, _) = watch::channel(0);
        Ok(Self {
            conn: Mutex::new(conn),
            revision,
        })
    }

    /// Receiver that changes whenever entries, topics or settings change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Execute a read with access to the database connection
    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&conn)
    }

    /// Execute a write and notify subscribers if it succeeds
    fn write<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let result = {
            let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut conn)?
        };
        self.revision.send_modify(|r| *r += 1);
        Ok(result)
    }
}

impl ToSql for Mood {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Mood {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}
