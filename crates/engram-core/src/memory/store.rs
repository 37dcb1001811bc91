//! Memory store orchestration: ingestion, filtered search, delete, sweep.
//!
//! `MemoryStore` is generic over a `VectorIndex` backend and implements
//! the store's contracts on top of it:
//!
//! - Ingestion pre-validates everything before any write. A batch with
//!   one invalid record fails whole with zero records persisted.
//! - Search oversamples candidates from the index, applies the compiled
//!   attribute filter, and truncates to the requested size. Results are
//!   "at most k", never "exactly k" -- under highly selective filters
//!   fewer matches than requested is a legitimate outcome.
//! - Sweep physically removes expired records; it is space reclamation
//!   only, because the filter excludes expired records at every query.

use std::cmp::Ordering;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use engram_types::config::StoreConfig;
use engram_types::embedding::{EmbeddingRecord, NewEmbedding, ScoredEmbedding, SearchFilter};
use engram_types::error::MemoryStoreError;

use super::filter::RecordFilter;
use super::index::VectorIndex;

/// Default candidate pool multiplier for oversample-then-filter.
pub const OVERSAMPLE_FACTOR: usize = 10;

/// Default floor for the candidate pool size.
pub const MIN_CANDIDATES: usize = 100;

/// Scoped vector memory store.
///
/// Concurrent ingestion and queries are safe to interleave; no operation
/// assumes exclusive access, and nothing holds an exclusive lock across
/// an await into the backend.
pub struct MemoryStore<I> {
    index: I,
    config: StoreConfig,
}

/// Run `fut` under an optional caller-supplied deadline.
async fn bounded<T>(
    deadline: Option<Duration>,
    fut: impl Future<Output = Result<T, MemoryStoreError>>,
) -> Result<T, MemoryStoreError> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| MemoryStoreError::Timeout)?,
        None => fut.await,
    }
}

impl<I: VectorIndex> MemoryStore<I> {
    /// Create a store over the given index backend.
    pub fn new(index: I, config: StoreConfig) -> Self {
        Self { index, config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Validate one draft, returning its parsed expiration instant.
    fn validate(&self, draft: &NewEmbedding) -> Result<Option<DateTime<Utc>>, MemoryStoreError> {
        if draft.content.is_empty() {
            return Err(MemoryStoreError::Validation(
                "content must not be empty".to_string(),
            ));
        }
        if draft.vector.len() != self.config.dimension {
            return Err(MemoryStoreError::DimensionMismatch {
                expected: self.config.dimension,
                actual: draft.vector.len(),
            });
        }
        match &draft.expires_at {
            None => Ok(None),
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|e| {
                    MemoryStoreError::Validation(format!(
                        "invalid expiration timestamp '{raw}': {e}"
                    ))
                }),
        }
    }

    fn build_record(
        draft: NewEmbedding,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> EmbeddingRecord {
        EmbeddingRecord {
            id: Uuid::now_v7(),
            content: draft.content,
            vector: draft.vector,
            tenant_id: draft.tenant_id,
            agent_id: draft.agent_id,
            session_id: draft.session_id,
            app_id: draft.app_id,
            metadata: draft.metadata,
            categories: draft.categories,
            expires_at,
            // Create-only path: updated_at mirrors created_at.
            created_at: now,
            updated_at: now,
        }
    }

    /// Ingest a single record. Returns the assigned id.
    ///
    /// The record is visible to queries only once the backend write is
    /// acknowledged; a deadline expiry before that leaves no partial write.
    pub async fn ingest(
        &self,
        draft: NewEmbedding,
        deadline: Option<Duration>,
    ) -> Result<Uuid, MemoryStoreError> {
        let ids = self.ingest_batch(vec![draft], deadline).await?;
        // ingest_batch returns exactly one id per input
        Ok(ids[0])
    }

    /// Ingest an ordered batch. Returns one assigned id per input, in
    /// input order.
    ///
    /// The whole batch is validated before any write is issued; if any
    /// record fails validation, nothing is persisted. All records land
    /// through a single index insert.
    pub async fn ingest_batch(
        &self,
        drafts: Vec<NewEmbedding>,
        deadline: Option<Duration>,
    ) -> Result<Vec<Uuid>, MemoryStoreError> {
        if drafts.is_empty() {
            return Err(MemoryStoreError::Validation(
                "batch must not be empty".to_string(),
            ));
        }

        let mut parsed_expiries = Vec::with_capacity(drafts.len());
        for draft in &drafts {
            parsed_expiries.push(self.validate(draft)?);
        }

        let now = Utc::now();
        let records: Vec<EmbeddingRecord> = drafts
            .into_iter()
            .zip(parsed_expiries)
            .map(|(draft, expires_at)| Self::build_record(draft, expires_at, now))
            .collect();
        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();

        bounded(deadline, self.index.insert(&records)).await?;

        debug!(count = ids.len(), "ingested records");
        Ok(ids)
    }

    /// Search for the `k` records most similar to `query` that satisfy
    /// the filter descriptor.
    ///
    /// Returns at most `k` hits ranked by similarity descending, ties
    /// broken by `created_at` descending then `id` ascending. `k == 0`
    /// and an empty index both yield an empty result, not an error.
    pub async fn search(
        &self,
        query: &[f32],
        filter: &SearchFilter,
        k: usize,
        deadline: Option<Duration>,
    ) -> Result<Vec<ScoredEmbedding>, MemoryStoreError> {
        if query.len() != self.config.dimension {
            return Err(MemoryStoreError::DimensionMismatch {
                expected: self.config.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(vec![]);
        }

        let pool = (k * self.config.oversample_factor).max(self.config.min_candidates);
        let num_candidates = self.config.num_candidates.max(pool);
        let predicate = RecordFilter::compile(filter);

        let candidates = bounded(deadline, self.index.search(query, pool, num_candidates)).await?;
        let examined = candidates.len();

        // Liveness is checked against the instant each candidate is
        // examined, so records expiring mid-query are still excluded.
        let mut hits: Vec<ScoredEmbedding> = candidates
            .into_iter()
            .filter(|hit| predicate.matches(&hit.record, Utc::now()))
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.record.created_at.cmp(&a.record.created_at))
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        hits.truncate(k);

        debug!(
            requested = k,
            pool,
            examined,
            matched = hits.len(),
            "search complete"
        );
        Ok(hits)
    }

    /// Delete a record by id. Returns `NotFound` if no such record exists.
    pub async fn delete(
        &self,
        id: &Uuid,
        deadline: Option<Duration>,
    ) -> Result<(), MemoryStoreError> {
        let deleted = bounded(deadline, self.index.delete(id)).await?;
        if deleted {
            Ok(())
        } else {
            Err(MemoryStoreError::NotFound)
        }
    }

    /// Physically remove all records whose TTL has elapsed.
    ///
    /// Returns the number removed. Query correctness never depends on
    /// this having run.
    pub async fn sweep(&self) -> Result<u64, MemoryStoreError> {
        self.index.delete_expired(Utc::now()).await
    }

    /// Count physically stored records, expired ones included.
    pub async fn count(&self) -> Result<u64, MemoryStoreError> {
        self.index.count().await
    }
}
