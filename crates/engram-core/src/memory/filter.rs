//! Filter builder: compiles a declarative `SearchFilter` into a record
//! predicate.
//!
//! Each present scalar scope field becomes an equality clause; categories
//! become an "any of" membership clause; metadata expands to one equality
//! clause per supplied key. All clauses are AND-combined. A liveness
//! clause excluding expired records is always present and is evaluated
//! against the instant each candidate is examined, not the instant the
//! query began, so newly-expired records never leak.

use chrono::{DateTime, Utc};
use engram_types::embedding::{EmbeddingRecord, SearchFilter};
use serde_json::Value;

/// A single compiled filter clause.
#[derive(Debug, Clone)]
enum Clause {
    TenantEq(String),
    AgentEq(String),
    SessionEq(String),
    AppEq(String),
    CategoriesAny(Vec<String>),
    MetadataEq(String, Value),
}

impl Clause {
    fn matches(&self, record: &EmbeddingRecord) -> bool {
        match self {
            Clause::TenantEq(v) => record.tenant_id.as_deref() == Some(v),
            Clause::AgentEq(v) => record.agent_id.as_deref() == Some(v),
            Clause::SessionEq(v) => record.session_id.as_deref() == Some(v),
            Clause::AppEq(v) => record.app_id.as_deref() == Some(v),
            Clause::CategoriesAny(wanted) => {
                wanted.iter().any(|c| record.categories.contains(c))
            }
            Clause::MetadataEq(key, value) => record.metadata.get(key) == Some(value),
        }
    }
}

/// Compiled predicate over `EmbeddingRecord`.
///
/// Built once per query from the caller's descriptor; applied to every
/// candidate the index returns. An empty descriptor compiles to the
/// "match everything live" predicate.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    clauses: Vec<Clause>,
}

impl RecordFilter {
    /// Compile a search descriptor into a predicate.
    pub fn compile(filter: &SearchFilter) -> Self {
        let mut clauses = Vec::new();

        if let Some(v) = &filter.tenant_id {
            clauses.push(Clause::TenantEq(v.clone()));
        }
        if let Some(v) = &filter.agent_id {
            clauses.push(Clause::AgentEq(v.clone()));
        }
        if let Some(v) = &filter.session_id {
            clauses.push(Clause::SessionEq(v.clone()));
        }
        if let Some(v) = &filter.app_id {
            clauses.push(Clause::AppEq(v.clone()));
        }
        if let Some(categories) = &filter.categories
            && !categories.is_empty()
        {
            clauses.push(Clause::CategoriesAny(categories.clone()));
        }
        if let Some(metadata) = &filter.metadata {
            for (key, value) in metadata {
                clauses.push(Clause::MetadataEq(key.clone(), value.clone()));
            }
        }

        Self { clauses }
    }

    /// Whether the record satisfies every clause and is live at `now`.
    pub fn matches(&self, record: &EmbeddingRecord, now: DateTime<Utc>) -> bool {
        if record.is_expired(now) {
            return false;
        }
        self.clauses.iter().all(|clause| clause.matches(record))
    }
}
