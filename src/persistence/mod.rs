/*!
 * Record store for finished transformations.
 *
 * The session core only hands a finished result to `RecordStore::create`;
 * the history commands use the rest of the contract.
 * - `http`: the remote record service
 * - `sqlite`: a local database with the same contract
 */

use async_trait::async_trait;

use crate::errors::PersistenceError;

pub mod http;
pub mod models;
pub mod schema;
pub mod sqlite;

pub use http::HttpRecordStore;
pub use models::{NewRecord, PageQuery, Record, RecordId, RecordPage};
pub use sqlite::SqliteRecordStore;

/// Storage of saved transformation records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Save a record and return its id
    async fn create(&self, record: NewRecord) -> Result<RecordId, PersistenceError>;

    /// One page of records, newest first
    async fn list(&self, query: PageQuery) -> Result<RecordPage, PersistenceError>;

    /// A record by id, `None` when it does not exist
    async fn get(&self, id: RecordId) -> Result<Option<Record>, PersistenceError>;

    /// Delete a record; `false` when it did not exist
    async fn delete(&self, id: RecordId) -> Result<bool, PersistenceError>;
}
