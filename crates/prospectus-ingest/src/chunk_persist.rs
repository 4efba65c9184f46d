//! Chunk persistence: row-level dedup and batched embedding.
//!
//! Row chunks are find-or-inserted by content hash; a dedup hit only grows
//! the existing chunk's `parsed_spec_ids` set. Prose and global chunks are
//! created unconditionally.
//!
//! Embedding runs in batches. A failed batch falls back to per-chunk
//! calls: chunks that succeed individually complete, the rest stay
//! `incomplete` with the error logged. Ingestion never aborts because of
//! embedding failures; the retry surface picks the leftovers up later.

use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use prospectus_core::cancel::CancelContext;
use prospectus_core::error::Result;
use prospectus_core::ids::spec_value_id;
use prospectus_core::model::{
    ChunkType, CompletionStatus, KnowledgeChunk, ParsedBrochure, ParsedChunk, Visibility,
};
use prospectus_store::{
    ChunkStore, EmbeddingProvider, RowChunkInsert, VectorEntry, VectorIndex,
};

use crate::metrics::PipelineMetrics;

/// Scoping for one ingestion job's chunk writes.
#[derive(Debug, Clone, Copy)]
pub struct ChunkScope {
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Owning product.
    pub product_id: Uuid,
    /// Campaign variant slice.
    pub campaign_variant_id: Option<Uuid>,
    /// Document source the chunks came from.
    pub source_doc_id: Uuid,
}

/// Outcome of the persistence half.
#[derive(Debug, Default)]
pub struct ChunkPersistOutcome {
    /// Chunks created.
    pub created: usize,
    /// Row chunks collapsed onto an existing hash.
    pub deduplicated: usize,
    /// Chunk IDs awaiting embedding.
    pub pending: Vec<Uuid>,
    /// Non-fatal problems.
    pub errors: Vec<String>,
}

/// Outcome of the embedding half.
#[derive(Debug, Default)]
pub struct EmbedOutcome {
    /// Embeddings attached.
    pub succeeded: usize,
    /// Chunks left without a vector.
    pub failed: usize,
    /// Per-chunk failure descriptions.
    pub errors: Vec<String>,
}

/// Materialize a parsed chunk as a persistable knowledge chunk.
fn to_knowledge_chunk(parsed: &ParsedChunk, scope: ChunkScope) -> KnowledgeChunk {
    KnowledgeChunk {
        id: Uuid::new_v4(),
        tenant_id: scope.tenant_id,
        product_id: scope.product_id,
        campaign_variant_id: scope.campaign_variant_id,
        text: parsed.text.clone(),
        chunk_type: parsed.chunk_type,
        source_page: parsed.source_page,
        start_line: parsed.start_line,
        end_line: parsed.end_line,
        metadata: parsed.metadata.clone(),
        content_hash: parsed.content_hash().map(ToString::to_string),
        completion_status: CompletionStatus::Incomplete,
        embedding_vector: None,
        embedding_model: String::new(),
        embedding_version: String::new(),
        source_doc_id: scope.source_doc_id,
        visibility: Visibility::Visible,
        created_at: Utc::now(),
    }
}

/// Persist every parsed chunk, deduplicating row chunks by content hash.
///
/// Row chunks and parsed specs come off the same table rows in the same
/// order, so the n-th row chunk is linked to the n-th spec's deterministic
/// identity.
pub fn persist_chunks(
    store: &dyn ChunkStore,
    brochure: &ParsedBrochure,
    scope: ChunkScope,
    metrics: &PipelineMetrics,
) -> ChunkPersistOutcome {
    let mut outcome = ChunkPersistOutcome::default();
    let mut row_index = 0_usize;

    for parsed in &brochure.raw_chunks {
        let chunk = to_knowledge_chunk(parsed, scope);
        if parsed.chunk_type == ChunkType::SpecRow {
            let spec_id = brochure.specs.get(row_index).map(|spec| {
                spec_value_id(scope.tenant_id, scope.product_id, &spec.category, &spec.name)
            });
            row_index += 1;

            match store.insert_row_chunk(chunk) {
                Ok(insert) => {
                    let chunk_id = insert.id();
                    match insert {
                        RowChunkInsert::Inserted(_) => {
                            outcome.created += 1;
                            outcome.pending.push(chunk_id);
                            PipelineMetrics::add(&metrics.chunks_created, 1);
                        }
                        RowChunkInsert::Deduplicated(_) => {
                            outcome.deduplicated += 1;
                            PipelineMetrics::add(&metrics.chunks_deduplicated, 1);
                        }
                    }
                    if let Some(spec_id) = spec_id {
                        if let Err(e) =
                            store.append_parsed_spec_id(scope.tenant_id, chunk_id, spec_id)
                        {
                            warn!(%chunk_id, error = %e, "failed to link spec id");
                            outcome.errors.push(format!(
                                "link spec {spec_id} to chunk {chunk_id}: {e}"
                            ));
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "row chunk insert failed");
                    outcome.errors.push(format!("row chunk insert: {e}"));
                }
            }
        } else {
            match store.insert(chunk) {
                Ok(chunk_id) => {
                    outcome.created += 1;
                    outcome.pending.push(chunk_id);
                    PipelineMetrics::add(&metrics.chunks_created, 1);
                }
                Err(e) => {
                    warn!(error = %e, "chunk insert failed");
                    outcome.errors.push(format!("chunk insert: {e}"));
                }
            }
        }
    }

    debug!(
        created = outcome.created,
        deduplicated = outcome.deduplicated,
        "persisted chunks"
    );
    outcome
}

/// Index metadata for one completed chunk: the chunk's own bag plus the
/// structural fields the retrieval side materializes facts from.
fn index_metadata(chunk: &KnowledgeChunk) -> indexmap::IndexMap<String, serde_json::Value> {
    let mut metadata = chunk.metadata.clone();
    metadata.insert("text".to_string(), json!(chunk.text));
    metadata.insert("source_page".to_string(), json!(chunk.source_page));
    metadata
}

/// Attach one embedding: chunk store transition plus vector-index insert.
fn complete_chunk(
    store: &dyn ChunkStore,
    index: &dyn VectorIndex,
    embedder: &dyn EmbeddingProvider,
    chunk: &KnowledgeChunk,
    vector: Vec<f32>,
) -> Result<()> {
    store.attach_embedding(
        chunk.tenant_id,
        chunk.id,
        vector.clone(),
        embedder.model_id(),
        "1",
    )?;
    index.insert(vec![VectorEntry {
        id: chunk.id,
        tenant_id: chunk.tenant_id,
        product_id: chunk.product_id,
        campaign_variant_id: chunk.campaign_variant_id,
        chunk_type: chunk.chunk_type,
        vector,
        metadata: index_metadata(chunk),
    }])?;
    Ok(())
}

/// Embed chunks in batches with per-chunk fallback on batch failure.
pub fn embed_chunks(
    store: &dyn ChunkStore,
    index: &dyn VectorIndex,
    embedder: &dyn EmbeddingProvider,
    chunks: &[KnowledgeChunk],
    batch_size: usize,
    metrics: &PipelineMetrics,
    cancel: &CancelContext,
) -> EmbedOutcome {
    let mut outcome = EmbedOutcome::default();

    for batch in chunks.chunks(batch_size.max(1)) {
        if let Err(e) = cancel.check("embedding") {
            outcome
                .errors
                .push(format!("embedding stopped early: {e}"));
            outcome.failed += batch.len();
            continue;
        }

        let texts: Vec<&str> = batch.iter().map(|chunk| chunk.text.as_str()).collect();
        PipelineMetrics::add(&metrics.embed_batches, 1);

        match embedder.embed_batch(&texts, cancel) {
            Ok(vectors) => {
                for (chunk, vector) in batch.iter().zip(vectors) {
                    match complete_chunk(store, index, embedder, chunk, vector) {
                        Ok(()) => outcome.succeeded += 1,
                        Err(e) => {
                            warn!(chunk_id = %chunk.id, error = %e, "failed to complete chunk");
                            outcome.failed += 1;
                            outcome.errors.push(format!("chunk {}: {e}", chunk.id));
                        }
                    }
                }
            }
            Err(batch_error) => {
                // Batch collapsed: recover chunk by chunk
                warn!(error = %batch_error, "embedding batch failed, retrying per chunk");
                for chunk in batch {
                    match embedder.embed_single(&chunk.text, cancel) {
                        Ok(vector) => match complete_chunk(store, index, embedder, chunk, vector)
                        {
                            Ok(()) => outcome.succeeded += 1,
                            Err(e) => {
                                outcome.failed += 1;
                                outcome.errors.push(format!("chunk {}: {e}", chunk.id));
                            }
                        },
                        Err(e) => {
                            warn!(chunk_id = %chunk.id, error = %e, "embedding failed, chunk stays incomplete");
                            outcome.failed += 1;
                            outcome.errors.push(format!("embed chunk {}: {e}", chunk.id));
                        }
                    }
                }
            }
        }
    }

    PipelineMetrics::add(&metrics.embeddings_succeeded, outcome.succeeded as u64);
    PipelineMetrics::add(&metrics.embeddings_failed, outcome.failed as u64);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospectus_core::cancel::CancelContext;
    use prospectus_parser::{ParserOptions, parse_brochure};
    use prospectus_store::{FlakyEmbedder, HashEmbedder, MemoryChunkStore, MemoryVectorIndex};

    const DOC: &str = "\
| Exterior | Colors | Color | Red | Standard |
| Exterior | Colors | Color | Red | Standard |
| Engine | Power | 88 bhp |
";

    fn scope() -> ChunkScope {
        ChunkScope {
            tenant_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            campaign_variant_id: None,
            source_doc_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn identical_rows_collapse_to_one_chunk() {
        let store = MemoryChunkStore::new();
        let brochure = parse_brochure(DOC, &ParserOptions::default());
        let metrics = PipelineMetrics::new();
        let outcome = persist_chunks(&store, &brochure, scope(), &metrics);
        assert_eq!(outcome.deduplicated, 1);
        // Two distinct rows plus prose chunks; the duplicate collapsed
        assert!(outcome.created >= 2);
    }

    #[test]
    fn dedup_appends_spec_ids_to_survivor() {
        let store = MemoryChunkStore::new();
        let brochure = parse_brochure(DOC, &ParserOptions::default());
        let metrics = PipelineMetrics::new();
        let s = scope();
        persist_chunks(&store, &brochure, s, &metrics);
        let rows: Vec<_> = store
            .all_chunks(s.tenant_id)
            .into_iter()
            .filter(|c| c.chunk_type == ChunkType::SpecRow)
            .collect();
        assert_eq!(rows.len(), 2);
        for row in rows {
            assert!(!row.parsed_spec_ids().is_empty());
        }
    }

    #[test]
    fn batch_embedding_completes_all_chunks() {
        let store = MemoryChunkStore::new();
        let index = MemoryVectorIndex::new(64);
        let embedder = HashEmbedder::new(64);
        let brochure = parse_brochure(DOC, &ParserOptions::default());
        let metrics = PipelineMetrics::new();
        let s = scope();
        let persisted = persist_chunks(&store, &brochure, s, &metrics);
        let pending = store.pending_embedding(s.tenant_id).unwrap();
        assert_eq!(pending.len(), persisted.pending.len());

        let outcome = embed_chunks(
            &store,
            &index,
            &embedder,
            &pending,
            75,
            &metrics,
            &CancelContext::none(),
        );
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.succeeded, pending.len());
        assert!(store.pending_embedding(s.tenant_id).unwrap().is_empty());
        assert_eq!(index.count(s.tenant_id).unwrap(), pending.len());
    }

    #[test]
    fn batch_failure_recovers_per_chunk() {
        let store = MemoryChunkStore::new();
        let index = MemoryVectorIndex::new(64);
        // The Power row's text carries the marker; everything else is fine
        let embedder = FlakyEmbedder::new(64, vec!["88 bhp".to_string()]);
        let brochure = parse_brochure(DOC, &ParserOptions::default());
        let metrics = PipelineMetrics::new();
        let s = scope();
        persist_chunks(&store, &brochure, s, &metrics);
        let pending = store.pending_embedding(s.tenant_id).unwrap();

        let outcome = embed_chunks(
            &store,
            &index,
            &embedder,
            &pending,
            75,
            &metrics,
            &CancelContext::none(),
        );
        assert!(outcome.failed >= 1);
        assert_eq!(outcome.succeeded + outcome.failed, pending.len());
        assert!(!outcome.errors.is_empty());

        // Failed chunks stay on the retry surface without vectors
        let leftover = store.pending_embedding(s.tenant_id).unwrap();
        assert_eq!(leftover.len(), outcome.failed);
        for chunk in leftover {
            assert!(chunk.embedding_vector.is_none());
            assert!(chunk.completion_invariant_holds());
        }
    }
}
