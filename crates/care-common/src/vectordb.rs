/// LanceDB vector database wrapper.
///
/// Provides a typed interface over LanceDB for storing and searching passage embeddings.
/// The table schema is:
/// - id: Utf8 (not null)
/// - text: Utf8 (not null) — the passage text that was embedded
/// - embedding: FixedSizeList<Float32, 384> (not null)
use std::sync::Arc;

use arrow_array::{RecordBatch, RecordBatchIterator};
use arrow_schema::Schema;
use lancedb::query::{ExecutableQuery, QueryBase};
use tracing::info;

use crate::error::CommonError;

pub struct VectorDb {
    db: lancedb::Connection,
}

impl VectorDb {
    /// Connect to a LanceDB database at the given filesystem path.
    pub async fn connect(path: &str) -> Result<Self, CommonError> {
        let db = lancedb::connect(path)
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("connection failed: {e}")))?;
        Ok(Self { db })
    }

    /// Returns `true` if a table with the given name exists in the database.
    pub async fn table_exists(&self, table_name: &str) -> Result<bool, CommonError> {
        let names = self
            .db
            .table_names()
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("listing tables failed: {e}")))?;
        Ok(names.iter().any(|n| n == table_name))
    }

    /// Create or replace a table with the given schema and data.
    ///
    /// This drops the existing table (if any) and creates a fresh one.
    /// Acceptable for a corpus of a few thousand passages where re-indexing is cheap.
    pub async fn create_or_replace_table(
        &self,
        table_name: &str,
        schema: Arc<Schema>,
        batches: Vec<RecordBatch>,
    ) -> Result<(), CommonError> {
        // Drop existing table if present (ignore errors — table may not exist)
        let _ = self.db.drop_table(table_name).await;

        let batch_iter = RecordBatchIterator::new(batches.into_iter().map(Ok), schema);
        self.db
            .create_table(table_name, Box::new(batch_iter))
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("create table failed: {e}")))?;

        info!(table = table_name, "vector table created");
        Ok(())
    }

    /// Search for the nearest vectors to the given query embedding.
    ///
    /// Returns up to `limit` results as RecordBatches, including a `_distance` column
    /// added by LanceDB.
    pub async fn search(
        &self,
        table_name: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RecordBatch>, CommonError> {
        let table = self
            .db
            .open_table(table_name)
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("open table failed: {e}")))?;

        let results = table
            .vector_search(query_embedding)
            .map_err(|e| CommonError::VectorDb(format!("vector search setup failed: {e}")))?
            .limit(limit)
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("vector search failed: {e}")))?;

        futures::TryStreamExt::try_collect(results)
            .await
            .map_err(|e| CommonError::VectorDb(format!("collecting search results failed: {e}")))
    }
}
