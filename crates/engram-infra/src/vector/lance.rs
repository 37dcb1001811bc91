//! LanceDB connection and table lifecycle management.
//!
//! Provides `LanceVectorStore`, a wrapper around a `lancedb::Connection`
//! with helpers for table lifecycle (create, open, drop) using Arrow
//! schemas. One `embeddings` table holds every record; scoping is a
//! query-time concern, not a table-layout concern.

use std::path::PathBuf;
use std::sync::Arc;

use arrow_schema::Schema;

use engram_types::error::MemoryStoreError;

/// Name of the single embeddings table.
pub const EMBEDDINGS_TABLE: &str = "embeddings";

/// LanceDB vector store wrapper for connection and table management.
pub struct LanceVectorStore {
    db: lancedb::Connection,
    base_path: PathBuf,
}

impl LanceVectorStore {
    /// Open or create a LanceDB vector store at the given path.
    ///
    /// Creates the directory if it does not exist.
    pub async fn new(base_path: PathBuf) -> Result<Self, MemoryStoreError> {
        std::fs::create_dir_all(&base_path).map_err(|e| {
            MemoryStoreError::StorageUnavailable(format!(
                "cannot create {}: {e}",
                base_path.display()
            ))
        })?;

        let uri = base_path.to_str().ok_or_else(|| {
            MemoryStoreError::StorageUnavailable(format!(
                "path contains invalid UTF-8: {}",
                base_path.display()
            ))
        })?;

        let db = lancedb::connect(uri)
            .execute()
            .await
            .map_err(|e| MemoryStoreError::StorageUnavailable(e.to_string()))?;

        Ok(Self { db, base_path })
    }

    /// Open or create a LanceDB vector store at the default path,
    /// `~/.engram/vector_store`.
    pub async fn open_default() -> Result<Self, MemoryStoreError> {
        let base_path = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".engram")
            .join("vector_store");

        Self::new(base_path).await
    }

    /// Ensure a table exists with the given schema.
    ///
    /// If the table already exists, opens it. If not, creates an empty
    /// table with the provided schema.
    pub async fn ensure_table(
        &self,
        table_name: &str,
        schema: Arc<Schema>,
    ) -> Result<lancedb::Table, lancedb::Error> {
        match self.db.open_table(table_name).execute().await {
            Ok(table) => Ok(table),
            Err(lancedb::Error::TableNotFound { .. }) => {
                self.db
                    .create_empty_table(table_name, schema)
                    .execute()
                    .await
            }
            Err(e) => Err(e),
        }
    }

    /// Check if a table exists in the database.
    pub async fn table_exists(&self, table_name: &str) -> bool {
        self.db.open_table(table_name).execute().await.is_ok()
    }

    /// Drop a table from the database.
    ///
    /// Returns Ok(()) even if the table does not exist (idempotent).
    pub async fn drop_table(&self, table_name: &str) -> Result<(), lancedb::Error> {
        match self.db.drop_table(table_name, &[]).await {
            Ok(()) => Ok(()),
            Err(lancedb::Error::TableNotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// List all table names in the database.
    pub async fn table_names(&self) -> Result<Vec<String>, lancedb::Error> {
        self.db.table_names().execute().await
    }

    /// Get a reference to the underlying LanceDB connection.
    pub fn connection(&self) -> &lancedb::Connection {
        &self.db
    }

    /// Get the base path of the vector store.
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }
}
