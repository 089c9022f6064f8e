/*!
 * Schema of the local record database.
 */

use log::{debug, info};
use rusqlite::Connection;

use crate::errors::PersistenceError;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Create the schema, refusing databases written by a newer release
pub fn initialize_schema(conn: &Connection) -> Result<(), PersistenceError> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Initializing record database schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(PersistenceError::Storage(format!(
            "Database schema v{} is newer than supported v{}",
            current_version, SCHEMA_VERSION
        )));
    } else {
        debug!("Record database schema is up to date (v{})", current_version);
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32, PersistenceError> {
    let table_exists: bool = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), PersistenceError> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

fn create_all_tables(conn: &Connection) -> Result<(), PersistenceError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS resume_result (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            original_content TEXT NOT NULL,
            modified_content TEXT NOT NULL,
            modification_description TEXT,
            user_id TEXT,
            status INTEGER DEFAULT 1,
            resume_classification TEXT,
            modified_resume_classification TEXT,
            created_time TEXT NOT NULL,
            updated_time TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_resume_result_user ON resume_result(user_id);
        CREATE INDEX IF NOT EXISTS idx_resume_result_created ON resume_result(created_time);
        "#,
    )?;
    Ok(())
}
