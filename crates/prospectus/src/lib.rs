//! Product-brochure knowledge pipeline.
//!
//! Ingests markdown brochures into structured facts and semantically
//! searchable chunks, and answers natural-language or structured queries
//! about them with calibrated confidence. See the sub-crates:
//!
//! - `prospectus-core` — data model, config, canonicalization
//! - `prospectus-parser` — markdown → `ParsedBrochure`
//! - `prospectus-store` — collaborator contracts + in-memory impls
//! - `prospectus-ingest` — the ingestion pipeline
//! - `prospectus-retrieval` — the retrieval router
//!
//! [`LocalEngine`] wires the in-memory implementations into a working
//! pipeline + router pair, with JSON snapshots for CLI persistence.

#![forbid(unsafe_code)]

use std::path::Path;
use std::sync::Arc;

pub use prospectus_core::{
    CancelContext, Config, Error, Result, content_hash, normalize_category, normalize_spec_name,
    normalize_unit, spec_value_id,
};
pub use prospectus_core::model::{
    AvailabilityState, ChunkType, CompletionStatus, IngestionRequest, IngestionResult,
    JobStatus, KnowledgeChunk, Provenance, QueryIntent, RequestMode, RetrievalRequest,
    RetrievalResponse, SemanticChunk, SpecAvailabilityStatus, SpecFact, SpecValue, meta_keys,
};
pub use prospectus_ingest::{IngestionPipeline, PdfExtractor, PipelineMetricsSnapshot};
pub use prospectus_parser::{ParserOptions, parse_brochure};
pub use prospectus_retrieval::{
    AvailabilityDetector, ConfidenceCalculator, RetrievalRouter, RowChunkGroup,
    group_row_chunks,
};
pub use prospectus_store::{
    ChunkStore, EmbeddingProvider, FeatureStore, FlakyEmbedder, HashEmbedder, KvCache,
    LineageWriter, MemoryCache, MemoryChunkStore, MemoryFeatureStore, MemoryLineage,
    MemorySpecStore, MemoryVectorIndex, SpecStore, VectorIndex,
};

/// Snapshot file names inside a state directory.
const SPECS_FILE: &str = "specs.json";
const CHUNKS_FILE: &str = "chunks.json";
const VECTORS_FILE: &str = "vectors.json";

/// An in-memory pipeline + router pair, for tests and the CLI.
pub struct LocalEngine {
    /// Shared configuration.
    pub config: Config,
    /// Spec-value store.
    pub spec_store: Arc<MemorySpecStore>,
    /// Feature/USP store.
    pub feature_store: Arc<MemoryFeatureStore>,
    /// Chunk store.
    pub chunk_store: Arc<MemoryChunkStore>,
    /// Vector index.
    pub vector_index: Arc<MemoryVectorIndex>,
    /// Query cache.
    pub cache: Arc<MemoryCache>,
    /// Embedding provider.
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Lineage sink.
    pub lineage: Arc<MemoryLineage>,
    /// The ingestion pipeline.
    pub pipeline: IngestionPipeline,
    /// The retrieval router.
    pub router: RetrievalRouter,
}

impl LocalEngine {
    /// A fresh engine with the deterministic token-hash embedder.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let dimension = config.embedding_dimension;
        Self::with_stores(
            config,
            Arc::new(MemorySpecStore::new()),
            Arc::new(MemoryChunkStore::new()),
            Arc::new(MemoryVectorIndex::new(dimension)),
            Arc::new(HashEmbedder::new(dimension)),
        )
    }

    /// An engine over explicit stores and embedder (test doubles welcome).
    #[must_use]
    pub fn with_stores(
        config: Config,
        spec_store: Arc<MemorySpecStore>,
        chunk_store: Arc<MemoryChunkStore>,
        vector_index: Arc<MemoryVectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let feature_store = Arc::new(MemoryFeatureStore::new());
        let cache = Arc::new(MemoryCache::new());
        let lineage = Arc::new(MemoryLineage::new());

        let pipeline = IngestionPipeline::new(
            config.clone(),
            Arc::clone(&spec_store) as Arc<dyn SpecStore>,
            Arc::clone(&feature_store) as Arc<dyn FeatureStore>,
            Arc::clone(&chunk_store) as Arc<dyn ChunkStore>,
            Arc::clone(&vector_index) as Arc<dyn VectorIndex>,
            Arc::clone(&cache) as Arc<dyn KvCache>,
            Arc::clone(&embedder),
            Arc::clone(&lineage) as Arc<dyn LineageWriter>,
        );
        let router = RetrievalRouter::new(
            config.clone(),
            Arc::clone(&spec_store) as Arc<dyn SpecStore>,
            Arc::clone(&vector_index) as Arc<dyn VectorIndex>,
            Arc::clone(&cache) as Arc<dyn KvCache>,
            Arc::clone(&embedder),
            Arc::clone(&lineage) as Arc<dyn LineageWriter>,
        );

        Self {
            config,
            spec_store,
            feature_store,
            chunk_store,
            vector_index,
            cache,
            embedder,
            lineage,
            pipeline,
            router,
        }
    }

    /// Restore an engine from JSON snapshots under `state_dir`. Missing
    /// files start empty.
    pub fn load(state_dir: &Path, config: Config) -> Result<Self> {
        let dimension = config.embedding_dimension;
        let spec_store = Arc::new(MemorySpecStore::load(&state_dir.join(SPECS_FILE))?);
        let chunk_store = Arc::new(MemoryChunkStore::load(&state_dir.join(CHUNKS_FILE))?);
        let vector_index = Arc::new(MemoryVectorIndex::load(
            &state_dir.join(VECTORS_FILE),
            dimension,
        )?);
        Ok(Self::with_stores(
            config,
            spec_store,
            chunk_store,
            vector_index,
            Arc::new(HashEmbedder::new(dimension)),
        ))
    }

    /// Persist JSON snapshots under `state_dir`.
    pub fn save(&self, state_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(state_dir)?;
        self.spec_store.save(&state_dir.join(SPECS_FILE))?;
        self.chunk_store.save(&state_dir.join(CHUNKS_FILE))?;
        self.vector_index.save(&state_dir.join(VECTORS_FILE))?;
        Ok(())
    }
}
