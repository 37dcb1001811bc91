//! Shared domain types for the Engram vector memory store.
//!
//! This crate contains the record model, query descriptor, configuration,
//! and error types used across the Engram workspace.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod embedding;
pub mod error;
