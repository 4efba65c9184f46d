//! Ingestion side of the knowledge pipeline.
//!
//! One [`IngestionPipeline::ingest`] call drives a brochure from source
//! acquisition through spec/feature/chunk persistence, content-hash
//! deduplication, and batched embedding with partial-failure recovery.
//! Re-running the same content is idempotent: deterministic spec IDs and
//! content hashes collapse onto the existing records.

#![forbid(unsafe_code)]

pub mod chunk_persist;
pub mod extractor;
pub mod metrics;
pub mod pipeline;

pub use chunk_persist::{ChunkPersistOutcome, ChunkScope, EmbedOutcome, embed_chunks, persist_chunks};
pub use extractor::PdfExtractor;
pub use metrics::{PipelineMetrics, PipelineMetricsSnapshot};
pub use pipeline::IngestionPipeline;
