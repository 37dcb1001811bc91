//! LanceDB vector database infrastructure.
//!
//! `LanceVectorStore` manages the connection and table lifecycle;
//! `LanceVectorIndex` implements the `VectorIndex` port over it.
//! Arrow schemas define the table structure.

pub mod index;
pub mod lance;
pub mod schema;
