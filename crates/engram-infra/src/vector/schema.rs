//! Arrow schema definition for the embeddings table.
//!
//! The vector column dimension comes from `StoreConfig`, not a constant:
//! one geometry per deployment. Timestamps are stored as fixed-width
//! RFC 3339 strings (microsecond precision, `Z` suffix) so the engine's
//! string comparison orders them chronologically, which the expiration
//! sweep relies on for its pushed-down predicate.
//!
//! Arrow versions MUST match lancedb's transitive dependency (57.3 for
//! lancedb 0.26).

use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema};
use chrono::{DateTime, SecondsFormat, Utc};

/// Schema for the embeddings table.
///
/// `metadata` and `categories` are JSON-encoded text columns; they are
/// filtered in the query executor, not pushed down to the engine.
pub fn embeddings_schema(dimension: i32) -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("tenant_id", DataType::Utf8, true),
        Field::new("agent_id", DataType::Utf8, true),
        Field::new("session_id", DataType::Utf8, true),
        Field::new("app_id", DataType::Utf8, true),
        Field::new("metadata", DataType::Utf8, false),
        Field::new("categories", DataType::Utf8, false),
        Field::new("expires_at", DataType::Utf8, true),
        Field::new("created_at", DataType::Utf8, false),
        Field::new("updated_at", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dimension,
            ),
            false,
        ),
    ])
}

/// Format an instant as a fixed-width sortable RFC 3339 string.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an instant written by `format_instant`.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
