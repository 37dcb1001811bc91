//! Business logic for the Engram vector memory store.
//!
//! This crate defines the `VectorIndex` port that the infrastructure
//! layer implements, plus the store orchestration built on top of it:
//! ingestion validation, filter compilation, the oversample-then-filter
//! query executor, and the expiration sweeper. It depends only on
//! `engram-types` -- never on `engram-infra` or any database/IO crate.

pub mod memory;
