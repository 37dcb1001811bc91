use thiserror::Error;

/// Errors surfaced by the vector memory store.
///
/// Every operation returns these as typed results; nothing is swallowed
/// except sweeper-internal delete failures, which are logged and retried
/// on the next sweep cycle.
#[derive(Debug, Error)]
pub enum MemoryStoreError {
    /// Malformed input: missing content, unparseable expiry. Never
    /// retried automatically.
    #[error("validation error: {0}")]
    Validation(String),

    /// A vector's length does not match the deployment dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The referenced record id does not exist.
    #[error("record not found")]
    NotFound,

    /// A caller-supplied deadline elapsed. Ingestion guarantees no
    /// partial write occurred before this was raised.
    #[error("operation deadline exceeded")]
    Timeout,

    /// The underlying engine is unreachable. Retryable by the caller;
    /// the store itself never retries to avoid duplicate-write risk.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Any other engine-reported failure.
    #[error("storage error: {0}")]
    Storage(String),
}
