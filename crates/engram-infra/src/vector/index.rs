//! LanceDB-backed implementation of the `VectorIndex` port.
//!
//! Stores every record in one `embeddings` table and delegates the
//! approximate top-N search to LanceDB's cosine vector search. LanceDB
//! reports cosine distance in `[0, 2]`; this adapter maps it to a
//! similarity score via `1.0 - distance`, giving `[-1, 1]` with higher
//! meaning closer, which is what the query executor ranks by.
//!
//! Attribute filtering happens upstream in the executor; the only
//! predicates pushed down to the engine are the id and expiry filters
//! for deletes, where the fixed-width timestamp encoding makes string
//! comparison chronological.

use std::sync::Arc;

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field};
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use tracing::debug;
use uuid::Uuid;

use engram_core::memory::index::VectorIndex;
use engram_types::embedding::{EmbeddingRecord, ScoredEmbedding};
use engram_types::error::MemoryStoreError;

use super::lance::{EMBEDDINGS_TABLE, LanceVectorStore};
use super::schema::{embeddings_schema, format_instant, parse_instant};

/// LanceDB adapter for the `VectorIndex` port.
pub struct LanceVectorIndex {
    store: LanceVectorStore,
    dimension: usize,
}

fn storage_err(op: &str, e: impl std::fmt::Display) -> MemoryStoreError {
    MemoryStoreError::Storage(format!("{op}: {e}"))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> &'a StringArray {
    batch
        .column_by_name(name)
        .unwrap_or_else(|| panic!("{name} column should be present"))
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap_or_else(|| panic!("{name} column should be StringArray"))
}

impl LanceVectorIndex {
    /// Create an index over the given store with the deployment dimension.
    pub fn new(store: LanceVectorStore, dimension: usize) -> Self {
        Self { store, dimension }
    }

    /// Ensure the embeddings table exists, creating it if needed.
    async fn table(&self) -> Result<lancedb::Table, MemoryStoreError> {
        let schema = Arc::new(embeddings_schema(self.dimension as i32));
        self.store
            .ensure_table(EMBEDDINGS_TABLE, schema)
            .await
            .map_err(|e| storage_err("failed to open embeddings table", e))
    }

    /// Build one Arrow RecordBatch holding every record of a write.
    fn build_record_batch(
        &self,
        records: &[EmbeddingRecord],
    ) -> Result<RecordBatch, MemoryStoreError> {
        let schema = Arc::new(embeddings_schema(self.dimension as i32));

        let id_array =
            StringArray::from(records.iter().map(|r| r.id.to_string()).collect::<Vec<_>>());
        let content_array =
            StringArray::from(records.iter().map(|r| r.content.clone()).collect::<Vec<_>>());
        let tenant_array =
            StringArray::from(records.iter().map(|r| r.tenant_id.clone()).collect::<Vec<_>>());
        let agent_array =
            StringArray::from(records.iter().map(|r| r.agent_id.clone()).collect::<Vec<_>>());
        let session_array = StringArray::from(
            records.iter().map(|r| r.session_id.clone()).collect::<Vec<_>>(),
        );
        let app_array =
            StringArray::from(records.iter().map(|r| r.app_id.clone()).collect::<Vec<_>>());

        let mut metadata_values = Vec::with_capacity(records.len());
        let mut categories_values = Vec::with_capacity(records.len());
        for record in records {
            metadata_values.push(
                serde_json::to_string(&record.metadata)
                    .map_err(|e| storage_err("failed to encode metadata", e))?,
            );
            categories_values.push(
                serde_json::to_string(&record.categories)
                    .map_err(|e| storage_err("failed to encode categories", e))?,
            );
        }
        let metadata_array = StringArray::from(metadata_values);
        let categories_array = StringArray::from(categories_values);

        let expires_array = StringArray::from(
            records
                .iter()
                .map(|r| r.expires_at.map(format_instant))
                .collect::<Vec<_>>(),
        );
        let created_array = StringArray::from(
            records
                .iter()
                .map(|r| format_instant(r.created_at))
                .collect::<Vec<_>>(),
        );
        let updated_array = StringArray::from(
            records
                .iter()
                .map(|r| format_instant(r.updated_at))
                .collect::<Vec<_>>(),
        );

        let flat: Vec<f32> = records.iter().flat_map(|r| r.vector.iter().copied()).collect();
        let values = Float32Array::from(flat);
        let item_field = Arc::new(Field::new("item", DataType::Float32, true));
        let vector_array =
            FixedSizeListArray::new(item_field, self.dimension as i32, Arc::new(values), None);

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(id_array),
                Arc::new(content_array),
                Arc::new(tenant_array),
                Arc::new(agent_array),
                Arc::new(session_array),
                Arc::new(app_array),
                Arc::new(metadata_array),
                Arc::new(categories_array),
                Arc::new(expires_array),
                Arc::new(created_array),
                Arc::new(updated_array),
                Arc::new(vector_array),
            ],
        )
        .map_err(|e| storage_err("failed to build record batch", e))
    }

    /// Parse Arrow RecordBatch rows back into domain records.
    ///
    /// Columns are looked up by name so the same parser works for plain
    /// scans and for search result batches, which carry an extra
    /// `_distance` column.
    fn record_batch_to_records(batch: &RecordBatch) -> Vec<EmbeddingRecord> {
        let num_rows = batch.num_rows();
        if num_rows == 0 {
            return vec![];
        }

        let id_col = string_column(batch, "id");
        let content_col = string_column(batch, "content");
        let tenant_col = string_column(batch, "tenant_id");
        let agent_col = string_column(batch, "agent_id");
        let session_col = string_column(batch, "session_id");
        let app_col = string_column(batch, "app_id");
        let metadata_col = string_column(batch, "metadata");
        let categories_col = string_column(batch, "categories");
        let expires_col = string_column(batch, "expires_at");
        let created_col = string_column(batch, "created_at");
        let updated_col = string_column(batch, "updated_at");
        let vector_col = batch
            .column_by_name("vector")
            .expect("vector column should be present")
            .as_any()
            .downcast_ref::<FixedSizeListArray>()
            .expect("vector column should be FixedSizeListArray");

        fn opt(col: &StringArray, i: usize) -> Option<String> {
            if col.is_null(i) {
                None
            } else {
                Some(col.value(i).to_string())
            }
        }

        let mut records = Vec::with_capacity(num_rows);
        for i in 0..num_rows {
            let id = Uuid::parse_str(id_col.value(i)).unwrap_or_else(|_| Uuid::nil());
            let metadata: serde_json::Map<String, serde_json::Value> =
                serde_json::from_str(metadata_col.value(i)).unwrap_or_default();
            let categories: Vec<String> =
                serde_json::from_str(categories_col.value(i)).unwrap_or_default();
            let expires_at: Option<DateTime<Utc>> = if expires_col.is_null(i) {
                None
            } else {
                parse_instant(expires_col.value(i))
            };
            let created_at = parse_instant(created_col.value(i)).unwrap_or_else(Utc::now);
            let updated_at = parse_instant(updated_col.value(i)).unwrap_or(created_at);
            let vector = vector_col
                .value(i)
                .as_any()
                .downcast_ref::<Float32Array>()
                .expect("vector items should be Float32Array")
                .values()
                .to_vec();

            records.push(EmbeddingRecord {
                id,
                content: content_col.value(i).to_string(),
                vector,
                tenant_id: opt(tenant_col, i),
                agent_id: opt(agent_col, i),
                session_id: opt(session_col, i),
                app_id: opt(app_col, i),
                metadata,
                categories,
                expires_at,
                created_at,
                updated_at,
            });
        }

        records
    }
}

impl VectorIndex for LanceVectorIndex {
    async fn insert(&self, records: &[EmbeddingRecord]) -> Result<(), MemoryStoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let table = self.table().await?;
        let batch = self.build_record_batch(records)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);

        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| storage_err("failed to add records", e))?;

        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        pool: usize,
        num_candidates: usize,
    ) -> Result<Vec<ScoredEmbedding>, MemoryStoreError> {
        let table = self.table().await?;

        // The engine examines up to the larger of the two knobs; the
        // executor truncates to k after filtering either way.
        let limit = pool.max(num_candidates);
        let results = table
            .vector_search(query)
            .map_err(|e| storage_err("vector search setup failed", e))?
            .distance_type(lancedb::DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| storage_err("vector search failed", e))?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| storage_err("failed to collect search results", e))?;

        let mut hits = Vec::new();
        for batch in &batches {
            if batch.num_rows() == 0 {
                continue;
            }

            // The _distance column is added by LanceDB vector search
            let distance_col = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

            let records = Self::record_batch_to_records(batch);
            for (i, record) in records.into_iter().enumerate() {
                let distance = distance_col.map_or(0.0, |d| d.value(i));
                hits.push(ScoredEmbedding {
                    record,
                    similarity: 1.0 - distance,
                });
            }
        }

        debug!(limit, returned = hits.len(), "vector search candidates");
        Ok(hits)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, MemoryStoreError> {
        let table = self.table().await?;
        let predicate = format!("id = '{id}'");

        let existing = table
            .count_rows(Some(predicate.clone()))
            .await
            .map_err(|e| storage_err("failed to look up record", e))?;
        if existing == 0 {
            return Ok(false);
        }

        table
            .delete(&predicate)
            .await
            .map_err(|e| storage_err("failed to delete record", e))?;
        Ok(true)
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, MemoryStoreError> {
        let table = self.table().await?;
        let predicate = format!(
            "expires_at IS NOT NULL AND expires_at <= '{}'",
            format_instant(cutoff)
        );

        // Counted before the delete; concurrent writes may shift the
        // number slightly, which is fine for a maintenance total.
        let expired = table
            .count_rows(Some(predicate.clone()))
            .await
            .map_err(|e| storage_err("failed to count expired records", e))?;
        if expired == 0 {
            return Ok(0);
        }

        table
            .delete(&predicate)
            .await
            .map_err(|e| storage_err("failed to delete expired records", e))?;

        Ok(expired as u64)
    }

    async fn count(&self) -> Result<u64, MemoryStoreError> {
        let table = self.table().await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| storage_err("failed to count records", e))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use engram_core::memory::store::MemoryStore;
    use engram_types::config::StoreConfig;
    use engram_types::embedding::{NewEmbedding, SearchFilter};
    use serde_json::json;

    const DIM: usize = 8;

    /// Generate a simple deterministic unit-length vector for testing.
    fn make_vector(seed: f32) -> Vec<f32> {
        let mut vec = vec![0.0_f32; DIM];
        for (i, val) in vec.iter_mut().enumerate() {
            *val = ((i as f32 + seed) * 0.7).sin();
        }
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        for val in vec.iter_mut() {
            *val /= norm;
        }
        vec
    }

    fn draft(content: &str, vector: Vec<f32>) -> NewEmbedding {
        NewEmbedding {
            content: content.to_string(),
            vector,
            ..Default::default()
        }
    }

    async fn setup_store() -> (MemoryStore<LanceVectorIndex>, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let lance_store = LanceVectorStore::new(temp_dir.path().to_path_buf())
            .await
            .expect("Failed to create LanceVectorStore");
        let index = LanceVectorIndex::new(lance_store, DIM);
        let config = StoreConfig {
            dimension: DIM,
            ..Default::default()
        };
        (MemoryStore::new(index, config), temp_dir)
    }

    #[tokio::test]
    async fn test_ingest_and_count() {
        let (store, _tmp) = setup_store().await;

        assert_eq!(store.count().await.unwrap(), 0);

        store
            .ingest(draft("first memory", make_vector(1.0)), None)
            .await
            .unwrap();
        store
            .ingest(draft("second memory", make_vector(2.0)), None)
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_round_trip_own_vector_ranks_first() {
        let (store, _tmp) = setup_store().await;

        for i in 0..5 {
            store
                .ingest(draft(&format!("memory {i}"), make_vector(i as f32)), None)
                .await
                .unwrap();
        }
        let target = store
            .ingest(draft("target", make_vector(42.0)), None)
            .await
            .unwrap();

        let hits = store
            .search(&make_vector(42.0), &SearchFilter::default(), 3, None)
            .await
            .unwrap();

        assert!(!hits.is_empty());
        assert!(hits.len() <= 3);
        assert_eq!(hits[0].record.id, target);
        assert!(
            hits[0].similarity > 0.99,
            "self-query similarity should be near max, got {}",
            hits[0].similarity
        );

        for window in hits.windows(2) {
            assert!(window[0].similarity >= window[1].similarity - f32::EPSILON);
        }
    }

    #[tokio::test]
    async fn test_search_empty_store() {
        let (store, _tmp) = setup_store().await;

        let hits = store
            .search(&make_vector(0.0), &SearchFilter::default(), 10, None)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_tenant_isolation() {
        let (store, _tmp) = setup_store().await;

        let mut a = draft("tenant a memory", make_vector(1.0));
        a.tenant_id = Some("tenant-a".to_string());
        store.ingest(a, None).await.unwrap();

        let mut b = draft("tenant b memory", make_vector(1.0));
        b.tenant_id = Some("tenant-b".to_string());
        store.ingest(b, None).await.unwrap();

        let filter = SearchFilter {
            tenant_id: Some("tenant-a".to_string()),
            ..Default::default()
        };
        let hits = store
            .search(&make_vector(1.0), &filter, 10, None)
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.tenant_id.as_deref(), Some("tenant-a"));
    }

    #[tokio::test]
    async fn test_category_and_metadata_filters() {
        let (store, _tmp) = setup_store().await;

        let mut tagged = draft("tagged", make_vector(1.0));
        tagged.categories = vec!["notes".to_string()];
        tagged.metadata.insert("source".to_string(), json!("chat"));
        let tagged_id = store.ingest(tagged, None).await.unwrap();

        let mut other = draft("other", make_vector(1.0));
        other.categories = vec!["misc".to_string()];
        store.ingest(other, None).await.unwrap();

        let mut wanted = serde_json::Map::new();
        wanted.insert("source".to_string(), json!("chat"));
        let filter = SearchFilter {
            categories: Some(vec!["notes".to_string()]),
            metadata: Some(wanted),
            ..Default::default()
        };
        let hits = store
            .search(&make_vector(1.0), &filter, 10, None)
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id, tagged_id);
        assert_eq!(hits[0].record.categories, vec!["notes".to_string()]);
    }

    #[tokio::test]
    async fn test_expired_record_excluded_then_swept() {
        let (store, _tmp) = setup_store().await;

        let mut doomed = draft("doomed", make_vector(1.0));
        doomed.expires_at = Some((Utc::now() - Duration::minutes(5)).to_rfc3339());
        store.ingest(doomed, None).await.unwrap();
        store
            .ingest(draft("keeper", make_vector(2.0)), None)
            .await
            .unwrap();

        // logically dead before the sweep has run
        let hits = store
            .search(&make_vector(1.0), &SearchFilter::default(), 10, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.content, "keeper");

        let removed = store.sweep().await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count().await.unwrap(), 1);

        // identical behavior after physical reclamation
        let hits = store
            .search(&make_vector(1.0), &SearchFilter::default(), 10, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.content, "keeper");
    }

    #[tokio::test]
    async fn test_sweep_on_empty_store() {
        let (store, _tmp) = setup_store().await;
        assert_eq!(store.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_and_not_found() {
        let (store, _tmp) = setup_store().await;

        let id = store
            .ingest(draft("to delete", make_vector(1.0)), None)
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        store.delete(&id, None).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);

        let err = store.delete(&id, None).await.unwrap_err();
        assert!(matches!(err, MemoryStoreError::NotFound));
    }

    #[tokio::test]
    async fn test_batch_atomicity_against_engine() {
        let (store, _tmp) = setup_store().await;

        let mut drafts: Vec<NewEmbedding> = (0..5)
            .map(|i| draft(&format!("valid {i}"), make_vector(i as f32)))
            .collect();
        drafts.push(draft("wrong dimension", vec![1.0, 2.0]));

        let err = store.ingest_batch(drafts, None).await.unwrap_err();
        assert!(matches!(err, MemoryStoreError::DimensionMismatch { .. }));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_batch_lands_as_one_write() {
        let (store, _tmp) = setup_store().await;

        let drafts: Vec<NewEmbedding> = (0..4)
            .map(|i| draft(&format!("batched {i}"), make_vector(i as f32)))
            .collect();
        let ids = store.ingest_batch(drafts, None).await.unwrap();

        assert_eq!(ids.len(), 4);
        assert_eq!(store.count().await.unwrap(), 4);

        let hits = store
            .search(&make_vector(2.0), &SearchFilter::default(), 1, None)
            .await
            .unwrap();
        assert_eq!(hits[0].record.id, ids[2]);
    }

    #[tokio::test]
    async fn test_record_batch_roundtrip() {
        let now = Utc::now();
        let mut metadata = serde_json::Map::new();
        metadata.insert("source".to_string(), json!("import"));
        metadata.insert("turn".to_string(), json!(3));

        let record = EmbeddingRecord {
            id: Uuid::now_v7(),
            content: "roundtrip content".to_string(),
            vector: make_vector(7.0),
            tenant_id: Some("tenant-a".to_string()),
            agent_id: None,
            session_id: Some("sess-1".to_string()),
            app_id: None,
            metadata,
            categories: vec!["notes".to_string(), "work".to_string()],
            expires_at: Some(now + Duration::hours(1)),
            created_at: now,
            updated_at: now,
        };

        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let lance_store = LanceVectorStore::new(temp_dir.path().to_path_buf())
            .await
            .expect("Failed to create LanceVectorStore");
        let index = LanceVectorIndex::new(lance_store, DIM);

        let batch = index
            .build_record_batch(std::slice::from_ref(&record))
            .unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), 12);

        let records = LanceVectorIndex::record_batch_to_records(&batch);
        assert_eq!(records.len(), 1);

        let recovered = &records[0];
        assert_eq!(recovered.id, record.id);
        assert_eq!(recovered.content, record.content);
        assert_eq!(recovered.vector, record.vector);
        assert_eq!(recovered.tenant_id, record.tenant_id);
        assert_eq!(recovered.agent_id, None);
        assert_eq!(recovered.session_id, record.session_id);
        assert_eq!(recovered.metadata, record.metadata);
        assert_eq!(recovered.categories, record.categories);
        assert!(recovered.expires_at.is_some());
    }
}
