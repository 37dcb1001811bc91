//! Infrastructure implementations for the Engram vector memory store.
//!
//! Provides the LanceDB-backed `VectorIndex` adapter that `engram-core`
//! drives. Nothing in here reaches ambient global state: a constructed
//! store handle is passed to every component.

pub mod vector;
