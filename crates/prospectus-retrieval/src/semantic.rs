//! The semantic search path.
//!
//! Embeds a question once, queries the vector index under the request's
//! filters, and materializes structured facts out of row/spec-fact hits
//! whose metadata carries `{category, name, value}`. Materialized facts
//! are `provenance = semantic` with confidence `1 - distance`.

use tracing::debug;
use uuid::Uuid;

use prospectus_core::cancel::CancelContext;
use prospectus_core::error::Result;
use prospectus_core::model::{
    ChunkType, FactSource, Provenance, RetrievalRequest, SemanticChunk, SpecFact, meta_keys,
};
use prospectus_store::{EmbeddingProvider, VectorFilters, VectorHit, VectorIndex};

/// Build index filters from a retrieval request.
#[must_use]
pub fn vector_filters(request: &RetrievalRequest) -> VectorFilters {
    VectorFilters {
        product_ids: request.product_ids.clone(),
        campaign_variant_id: request.campaign_variant_id,
        categories: request.filters.categories.clone(),
        chunk_types: request.filters.chunk_types.clone(),
    }
}

/// Surface one vector hit as a semantic chunk.
fn to_semantic_chunk(hit: VectorHit) -> SemanticChunk {
    let text = hit
        .metadata
        .get("text")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();
    let source_page = hit
        .metadata
        .get("source_page")
        .and_then(serde_json::Value::as_u64)
        .and_then(|page| u32::try_from(page).ok())
        .unwrap_or(0);
    SemanticChunk {
        id: hit.id,
        text,
        chunk_type: hit.chunk_type,
        distance: hit.distance,
        source_page,
        metadata: hit.metadata,
    }
}

/// Synthesize a structured fact from a row/spec-fact hit, when its
/// metadata carries the structural fields.
fn materialize_fact(chunk: &SemanticChunk) -> Option<SpecFact> {
    if !matches!(chunk.chunk_type, ChunkType::SpecRow | ChunkType::SpecFact) {
        return None;
    }
    let category = chunk.meta_str(meta_keys::PARENT_CATEGORY)?;
    let name = chunk.meta_str(meta_keys::SPECIFICATION_TYPE)?;
    let value = chunk.meta_str(meta_keys::VALUE)?;
    if name.is_empty() || value.is_empty() {
        return None;
    }
    let spec_item_id = chunk
        .metadata
        .get(meta_keys::PARSED_SPEC_IDS)
        .and_then(serde_json::Value::as_array)
        .and_then(|ids| ids.first())
        .and_then(serde_json::Value::as_str)
        .and_then(|id| Uuid::parse_str(id).ok());
    Some(SpecFact {
        spec_item_id,
        category: category.to_string(),
        name: name.to_string(),
        value: value.to_string(),
        unit: None,
        key_features: String::new(),
        variant_availability: chunk
            .meta_str(meta_keys::ADDITIONAL_METADATA)
            .unwrap_or_default()
            .to_string(),
        explanation: chunk
            .meta_str(meta_keys::EXPLANATION)
            .unwrap_or_default()
            .to_string(),
        provenance: Provenance::Semantic,
        confidence: chunk.similarity(),
        campaign_variant_id: None,
        source: FactSource {
            document_id: None,
            page: Some(chunk.source_page),
            url: None,
        },
    })
}

/// Run semantic search for one question.
///
/// Returns the hit chunks (best similarity first) and the facts
/// materialized from them.
pub fn semantic_search(
    embedder: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    request: &RetrievalRequest,
    question: &str,
    k: usize,
    cancel: &CancelContext,
) -> Result<(Vec<SemanticChunk>, Vec<SpecFact>)> {
    cancel.check("semantic search")?;
    let query_vector = embedder.embed_single(question, cancel)?;
    let hits = index.search(
        request.tenant_id,
        &query_vector,
        k,
        &vector_filters(request),
    )?;
    debug!(hits = hits.len(), "semantic search returned");

    let chunks: Vec<SemanticChunk> = hits.into_iter().map(to_semantic_chunk).collect();
    let facts: Vec<SpecFact> = chunks.iter().filter_map(materialize_fact).collect();
    Ok((chunks, facts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::json;

    fn row_hit(distance: f64) -> SemanticChunk {
        let mut metadata = IndexMap::new();
        metadata.insert(meta_keys::PARENT_CATEGORY.to_string(), json!("Exterior"));
        metadata.insert(meta_keys::SUB_CATEGORY.to_string(), json!("Colors"));
        metadata.insert(meta_keys::SPECIFICATION_TYPE.to_string(), json!("Color"));
        metadata.insert(meta_keys::VALUE.to_string(), json!("Red"));
        metadata.insert(meta_keys::EXPLANATION.to_string(), json!("Color is Red."));
        SemanticChunk {
            id: Uuid::new_v4(),
            text: "Category: Exterior".into(),
            chunk_type: ChunkType::SpecRow,
            distance,
            source_page: 3,
            metadata,
        }
    }

    #[test]
    fn row_hits_materialize_semantic_facts() {
        let fact = materialize_fact(&row_hit(0.25)).unwrap();
        assert_eq!(fact.provenance, Provenance::Semantic);
        assert_eq!(fact.name, "Color");
        assert_eq!(fact.value, "Red");
        assert_eq!(fact.explanation, "Color is Red.");
        assert!((fact.confidence - 0.75).abs() < 1e-9);
        assert_eq!(fact.source.page, Some(3));
    }

    #[test]
    fn prose_hits_do_not_materialize() {
        let mut chunk = row_hit(0.25);
        chunk.chunk_type = ChunkType::Global;
        assert!(materialize_fact(&chunk).is_none());
    }

    #[test]
    fn incomplete_metadata_does_not_materialize() {
        let mut chunk = row_hit(0.25);
        chunk.metadata.shift_remove(meta_keys::VALUE);
        assert!(materialize_fact(&chunk).is_none());
    }
}
