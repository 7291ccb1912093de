//! Thirdeye Storage Layer
//!
//! Implements the domain store traits on SQLite.
//!
//! # Architecture
//!
//! - One `Connection` per [`SqliteStore`]; share it behind `Arc<Mutex<_>>`
//! - Analysis ids are UUIDv7 values stored as 16-byte big-endian BLOBs
//! - List-valued columns (strengths, characteristics, ...) are JSON text
//! - Source credibility updates run in `BEGIN IMMEDIATE` transactions, so
//!   several connections to one database file never lose an update
//!
//! # Examples
//!
//! ```no_run
//! use thirdeye_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for pipeline operations
//! ```

#![warn(missing_docs)]

mod abuse;
mod analysis;
mod reference;
mod sources;

pub use abuse::StoreReportSink;

use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use thirdeye_domain::AnalysisId;
use thiserror::Error;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Watermark code already bound, or result already stamped
    #[error("Duplicate watermark: {0}")]
    DuplicateWatermark(String),
}

/// SQLite-based implementation of the Thirdeye stores
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own
/// SqliteStore instance, or share one behind a mutex.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database at the given path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use thirdeye_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("thirdeye.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Convert AnalysisId to bytes for storage
    fn analysis_id_to_bytes(id: AnalysisId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    /// Convert bytes to AnalysisId
    fn bytes_to_analysis_id(bytes: &[u8]) -> Result<AnalysisId, StoreError> {
        if bytes.len() != 16 {
            return Err(StoreError::InvalidData(format!(
                "Expected 16 bytes for AnalysisId, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(bytes);
        Ok(AnalysisId::from_value(u128::from_be_bytes(arr)))
    }
}

/// Wrap a decoding failure so it can be returned from a row mapper
fn conversion_error(
    column: usize,
    ty: rusqlite::types::Type,
    e: StoreError,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, ty, Box::new(e))
}

/// Decode a JSON text column inside a row mapper
fn json_column<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row<'_>,
    column: usize,
) -> Result<T, rusqlite::Error> {
    let text: String = row.get(column)?;
    serde_json::from_str(&text).map_err(|e| {
        conversion_error(column, rusqlite::types::Type::Text, StoreError::Serialization(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_id_bytes_round_trip() {
        let id = AnalysisId::new();
        let bytes = SqliteStore::analysis_id_to_bytes(id);
        assert_eq!(bytes.len(), 16);
        assert_eq!(SqliteStore::bytes_to_analysis_id(&bytes).unwrap(), id);
    }

    #[test]
    fn test_bytes_to_analysis_id_rejects_wrong_length() {
        let result = SqliteStore::bytes_to_analysis_id(&[1, 2, 3]);
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
    }

    #[test]
    fn test_schema_is_idempotent() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        assert!(store.initialize_schema().is_ok());
    }
}
