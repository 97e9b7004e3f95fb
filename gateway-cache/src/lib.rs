//! Semantic vector cache and disk-backed key-value store.

pub mod disk;
pub mod semantic;
pub mod vector;

pub use disk::{DiskStore, DiskStoreError};
pub use semantic::{EmbeddingError, EmbeddingProvider, SemanticCache, SemanticHit};
pub use vector::{SearchHit, VectorStore};
