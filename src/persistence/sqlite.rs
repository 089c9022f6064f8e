/*!
 * Local record store backed by SQLite.
 *
 * The connection sits behind `Arc<Mutex<_>>`; async callers go through
 * `execute_async`, which runs the closure on the blocking pool so the
 * runtime is never stalled by disk I/O.
 */

use async_trait::async_trait;
use chrono::Local;
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::errors::PersistenceError;
use super::models::{NewRecord, PageQuery, Record, RecordId, RecordPage};
use super::schema;
use super::RecordStore;

/// Default database filename
const DEFAULT_DB_FILENAME: &str = "history.db";

/// Default directory name under the user's data directory
const DEFAULT_DB_DIRNAME: &str = "resumeflow";

const RECORD_COLUMNS: &str = "id, original_content, modified_content, modification_description, \
     user_id, status, resume_classification, modified_resume_classification, created_time, updated_time";

/// SQLite implementation of `RecordStore`
#[derive(Clone)]
pub struct SqliteRecordStore {
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Open (or create) the database at `db_path`
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, PersistenceError> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PersistenceError::Storage(format!(
                    "Failed to create database directory {:?}: {}",
                    parent, e
                ))
            })?;
        }

        info!("Opening record database at: {:?}", db_path);
        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        schema::initialize_schema(&conn)?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open the database at the default location
    pub fn open_default() -> Result<Self, PersistenceError> {
        Self::open(Self::default_database_path()?)
    }

    /// In-memory database
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        debug!("Creating in-memory record database");
        let conn = Connection::open_in_memory()?;
        schema::initialize_schema(&conn)?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Default database path under the user's data directory
    pub fn default_database_path() -> Result<PathBuf, PersistenceError> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| PersistenceError::Storage("Could not determine data directory".to_string()))?;

        Ok(base_dir.join(DEFAULT_DB_DIRNAME).join(DEFAULT_DB_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Run `f` with the connection on the blocking pool
    async fn execute_async<F, T>(&self, f: F) -> Result<T, PersistenceError>
    where
        F: FnOnce(&Connection) -> Result<T, PersistenceError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                PersistenceError::Storage(format!("Failed to acquire database lock: {}", e))
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| PersistenceError::Storage(format!("Database task panicked: {}", e)))?
    }

    fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
        Ok(Record {
            id: row.get(0)?,
            original_content: row.get(1)?,
            modified_content: row.get(2)?,
            modification_description: row.get(3)?,
            user_id: row.get(4)?,
            status: row.get(5)?,
            resume_classification: row.get(6)?,
            modified_resume_classification: row.get(7)?,
            created_time: row.get(8)?,
            updated_time: row.get(9)?,
        })
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn create(&self, record: NewRecord) -> Result<RecordId, PersistenceError> {
        self.execute_async(move |conn| {
            // Microseconds keep newest-first ordering stable for quick successive saves
            let now = Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
            conn.execute(
                r#"
                INSERT INTO resume_result (
                    original_content, modified_content, modification_description, user_id, status,
                    resume_classification, modified_resume_classification, created_time, updated_time
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    record.original_content,
                    record.modified_content,
                    record.modification_description,
                    record.user_id,
                    record.status,
                    record.resume_classification,
                    record.modified_resume_classification,
                    now,
                    now,
                ],
            )?;
            let id = conn.last_insert_rowid();
            debug!("Saved record {}", id);
            Ok(id)
        })
        .await
    }

    async fn list(&self, query: PageQuery) -> Result<RecordPage, PersistenceError> {
        let query = query.normalized();

        self.execute_async(move |conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM resume_result WHERE (?1 IS NULL OR user_id = ?1)",
                params![query.user_id],
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT {} FROM resume_result WHERE (?1 IS NULL OR user_id = ?1) \
                 ORDER BY created_time DESC, id DESC LIMIT ?2 OFFSET ?3",
                RECORD_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let records = stmt
                .query_map(
                    params![
                        query.user_id,
                        query.size as i64,
                        i64::try_from(query.offset()).unwrap_or(i64::MAX)
                    ],
                    Self::record_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(RecordPage::new(records, total.max(0) as u64, &query))
        })
        .await
    }

    async fn get(&self, id: RecordId) -> Result<Option<Record>, PersistenceError> {
        self.execute_async(move |conn| {
            let sql = format!("SELECT {} FROM resume_result WHERE id = ?1", RECORD_COLUMNS);
            let record = conn
                .query_row(&sql, [id], Self::record_from_row)
                .optional()?;
            Ok(record)
        })
        .await
    }

    async fn delete(&self, id: RecordId) -> Result<bool, PersistenceError> {
        self.execute_async(move |conn| {
            let deleted = conn.execute("DELETE FROM resume_result WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
        .await
    }
}
