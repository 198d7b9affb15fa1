//! Database module for the Memo Service
//!
//! Provides SQLite storage for customers, managers, and customer memos.

pub mod schema;

use crate::error::Result;
use rusqlite::{Connection, Transaction};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// Database manager owning the single SQLite connection
pub struct Database {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) the database file and initialize the schema
    pub fn new(db_path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)?;
        schema::init_db(&conn)?;

        tracing::debug!("Opened database at {}", db_path.display());

        Ok(Database {
            conn: Mutex::new(conn),
            path: Some(db_path),
        })
    }

    /// Open a private in-memory database (tests and ephemeral runs)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_db(&conn)?;

        Ok(Database {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Lock the connection.
    ///
    /// A panic while holding the lock cannot leave a half-applied write behind
    /// (open transactions roll back on drop), so a poisoned lock is recovered.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get the database file path (None for in-memory databases)
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Run a closure against the connection on the blocking thread pool
    pub async fn with_conn<F, T>(self: &Arc<Self>, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let mut conn = db.conn();
            f(&mut conn)
        })
        .await?
    }

    /// Run a closure inside a single transaction.
    ///
    /// The transaction commits only when the closure returns `Ok`; any error
    /// rolls back every statement it issued.
    pub async fn with_tx<F, T>(self: &Arc<Self>, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
        .await
    }
}

/// Current UTC time in the fixed-width form stored in `created_at` columns
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Serialize a timestamp in the same fixed-width form it is stored in
pub fn serialize_timestamp<S>(
    dt: &chrono::DateTime<chrono::Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&dt.to_rfc3339_opts(chrono::SecondsFormat::Micros, true))
}

/// Parse a stored timestamp column
pub fn parse_timestamp(
    idx: usize,
    value: &str,
) -> rusqlite::Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
