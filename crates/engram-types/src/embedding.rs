//! Embedding record model and search descriptor types.
//!
//! These types model the unit of storage for the vector memory store:
//! a text payload with its embedding vector, optional multi-tenant scope
//! keys, open metadata, category tags, and TTL expiration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A persisted embedding record.
///
/// Created by the ingestion path, read by the query executor, destroyed
/// only by the expiration sweeper or an explicit delete. `content` and
/// `vector` are immutable once written; there is no partial-update path,
/// so `updated_at == created_at` for the record's whole lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// UUID v7, assigned at creation, unique across the store.
    pub id: Uuid,
    /// Original text payload.
    pub content: String,
    /// Embedding vector; length always equals the deployment dimension.
    pub vector: Vec<f32>,
    /// Primary scope key. Queries scoped to one tenant never see another's.
    pub tenant_id: Option<String>,
    pub agent_id: Option<String>,
    pub session_id: Option<String>,
    pub app_id: Option<String>,
    /// Open string-keyed mapping, filtered by exact match per key.
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
    /// Tag set, filtered by "any of" membership.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Absent means the record never expires. Compared against wall-clock
    /// time at every read; physical deletion is only space reclamation.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmbeddingRecord {
    /// Whether this record is logically dead at the given instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => false,
        }
    }
}

/// Input draft for the ingestion path.
///
/// Carries everything the caller supplies; the store assigns `id` and
/// timestamps. `expires_at` arrives as an RFC 3339 string and is parsed
/// during validation so malformed input fails before any write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewEmbedding {
    pub content: String,
    pub vector: Vec<f32>,
    pub tenant_id: Option<String>,
    pub agent_id: Option<String>,
    pub session_id: Option<String>,
    pub app_id: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
    #[serde(default)]
    pub categories: Vec<String>,
    /// RFC 3339 expiration instant, e.g. `2027-01-01T00:00:00Z`.
    pub expires_at: Option<String>,
}

/// Declarative search descriptor.
///
/// Every present scalar scope field becomes an equality clause; all
/// present clauses are AND-combined. An empty descriptor matches every
/// live record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilter {
    pub tenant_id: Option<String>,
    pub agent_id: Option<String>,
    pub session_id: Option<String>,
    pub app_id: Option<String>,
    /// "Any of" category membership (OR within the field, AND with the rest).
    pub categories: Option<Vec<String>>,
    /// One exact-match clause per supplied key; absent keys impose nothing.
    pub metadata: Option<serde_json::Map<String, Value>>,
}

/// A search hit: the record plus its similarity score.
///
/// Similarity is a cosine-equivalent score in `[-1, 1]`; higher is closer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredEmbedding {
    pub record: EmbeddingRecord,
    pub similarity: f32,
}
