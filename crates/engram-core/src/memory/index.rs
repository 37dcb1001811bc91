//! Vector index trait.
//!
//! Defines the interface for approximate-nearest-neighbor storage.
//! Implementations (e.g., LanceDB) live in engram-infra. Any ANN backend
//! satisfies the contract; similarity scores only need to be monotonic
//! with cosine similarity, higher meaning closer.

use chrono::{DateTime, Utc};
use engram_types::embedding::{EmbeddingRecord, ScoredEmbedding};
use engram_types::error::MemoryStoreError;
use uuid::Uuid;

/// Trait for vector-indexed record storage with approximate search.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in engram-infra.
pub trait VectorIndex: Send + Sync {
    /// Insert a slice of records as one write.
    ///
    /// All records land through a single engine add so a batch is never
    /// observed half-written by concurrent queries.
    fn insert(
        &self,
        records: &[EmbeddingRecord],
    ) -> impl std::future::Future<Output = Result<(), MemoryStoreError>> + Send;

    /// Return up to `pool` candidates nearest to `query` by the index's
    /// native similarity, unfiltered.
    ///
    /// `num_candidates` bounds how many vectors the approximate index
    /// itself examines; implementations treat it as a lower bound on
    /// search breadth and must examine at least `pool` vectors.
    fn search(
        &self,
        query: &[f32],
        pool: usize,
        num_candidates: usize,
    ) -> impl std::future::Future<Output = Result<Vec<ScoredEmbedding>, MemoryStoreError>> + Send;

    /// Delete a record by id. Returns `false` if no such record existed.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, MemoryStoreError>> + Send;

    /// Physically remove every record with `expires_at <= cutoff`.
    /// Returns the number of records removed.
    fn delete_expired(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, MemoryStoreError>> + Send;

    /// Count all physically stored records, expired ones included.
    fn count(&self) -> impl std::future::Future<Output = Result<u64, MemoryStoreError>> + Send;
}
