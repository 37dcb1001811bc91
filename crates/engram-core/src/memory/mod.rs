//! Scoped vector memory: ingestion, filtered ANN search, TTL expiration.
//!
//! `VectorIndex` is the port the infrastructure layer implements (e.g.,
//! LanceDB in `engram-infra`). `MemoryStore` drives it: validate-then-write
//! ingestion, filter compilation, oversampled similarity search, and the
//! maintenance sweep. `ExpirationSweeper` runs the sweep on a cadence.

pub mod filter;
pub mod index;
pub mod store;
pub mod sweeper;
