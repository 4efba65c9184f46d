//! Collaborator contracts for the knowledge pipeline.
//!
//! Persistent storage engines are external to the core; this crate names
//! the seams the pipeline and router talk through, and ships
//! concurrency-safe in-memory implementations used by tests and the CLI:
//!
//! - [`SpecStore`] — spec-value version chains + keyword lookup
//! - [`ChunkStore`] — knowledge chunks with atomic content-hash dedup
//! - [`VectorIndex`] — exact cosine top-k with metadata filters
//! - [`FeatureStore`] — best-effort feature/USP records
//! - [`KvCache`] — TTL key-value cache with prefix invalidation
//! - [`EmbeddingProvider`] — batch-friendly embedding seam
//! - [`LineageWriter`] — fire-and-forget audit sink

#![forbid(unsafe_code)]

pub mod cache;
pub mod chunk_store;
pub mod embedder;
pub mod feature_store;
pub mod lineage;
pub mod spec_store;
pub mod vector_index;

pub use cache::{KvCache, MemoryCache};
pub use chunk_store::{ChunkStore, MemoryChunkStore, RowChunkInsert};
pub use embedder::{EmbeddingProvider, FlakyEmbedder, HashEmbedder};
pub use feature_store::{FeatureRecord, FeatureStore, MemoryFeatureStore};
pub use lineage::{LineageWriter, MemoryLineage};
pub use spec_store::{MemorySpecStore, SpecStore, SpecUpsertOutcome};
pub use vector_index::{MemoryVectorIndex, VectorEntry, VectorFilters, VectorHit, VectorIndex};
