//! Hierarchical grouping of row chunks (presentation contract).
//!
//! Primary key `parent_category` (default `"Uncategorized"`), secondary
//! key `sub_category` (default `"General"`). Group members and group order
//! both preserve retrieval order (best similarity first). Computed in
//! memory over the top-k set; there is no store-side group operation.

use indexmap::IndexMap;

use prospectus_core::model::{
    ChunkType, DEFAULT_PARENT_CATEGORY, DEFAULT_SUB_CATEGORY, SemanticChunk, meta_keys,
};

/// One `(parent_category, sub_category)` group of row chunks.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RowChunkGroup {
    /// Primary grouping key.
    pub parent_category: String,
    /// Secondary grouping key.
    pub sub_category: String,
    /// Members in retrieval order.
    pub chunks: Vec<SemanticChunk>,
}

/// Group the row chunks of a result set hierarchically.
///
/// Non-row chunks are ignored; they have no category structure to group
/// under.
#[must_use]
pub fn group_row_chunks(chunks: &[SemanticChunk]) -> Vec<RowChunkGroup> {
    let mut groups: IndexMap<(String, String), Vec<SemanticChunk>> = IndexMap::new();
    for chunk in chunks {
        if chunk.chunk_type != ChunkType::SpecRow {
            continue;
        }
        let parent = chunk
            .meta_str(meta_keys::PARENT_CATEGORY)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_PARENT_CATEGORY)
            .to_string();
        let sub = chunk
            .meta_str(meta_keys::SUB_CATEGORY)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_SUB_CATEGORY)
            .to_string();
        groups.entry((parent, sub)).or_default().push(chunk.clone());
    }
    groups
        .into_iter()
        .map(|((parent_category, sub_category), chunks)| RowChunkGroup {
            parent_category,
            sub_category,
            chunks,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn row_chunk(parent: Option<&str>, sub: Option<&str>, distance: f64) -> SemanticChunk {
        let mut metadata = IndexMap::new();
        if let Some(parent) = parent {
            metadata.insert(meta_keys::PARENT_CATEGORY.to_string(), json!(parent));
        }
        if let Some(sub) = sub {
            metadata.insert(meta_keys::SUB_CATEGORY.to_string(), json!(sub));
        }
        SemanticChunk {
            id: Uuid::new_v4(),
            text: String::new(),
            chunk_type: ChunkType::SpecRow,
            distance,
            source_page: 1,
            metadata,
        }
    }

    #[test]
    fn groups_by_parent_then_sub() {
        let chunks = vec![
            row_chunk(Some("Exterior"), Some("Colors"), 0.1),
            row_chunk(Some("Exterior"), Some("Colors"), 0.2),
            row_chunk(Some("Engine"), None, 0.3),
        ];
        let groups = group_row_chunks(&chunks);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].parent_category, "Exterior");
        assert_eq!(groups[0].sub_category, "Colors");
        assert_eq!(groups[0].chunks.len(), 2);
        assert_eq!(groups[1].sub_category, "General");
    }

    #[test]
    fn retrieval_order_preserved_within_groups() {
        let chunks = vec![
            row_chunk(Some("Exterior"), Some("Colors"), 0.1),
            row_chunk(Some("Exterior"), Some("Colors"), 0.4),
        ];
        let groups = group_row_chunks(&chunks);
        assert!(groups[0].chunks[0].distance < groups[0].chunks[1].distance);
    }

    #[test]
    fn missing_categories_take_defaults() {
        let groups = group_row_chunks(&[row_chunk(None, None, 0.1)]);
        assert_eq!(groups[0].parent_category, "Uncategorized");
        assert_eq!(groups[0].sub_category, "General");
    }

    #[test]
    fn non_row_chunks_are_ignored() {
        let mut chunk = row_chunk(Some("Exterior"), None, 0.1);
        chunk.chunk_type = ChunkType::Global;
        assert!(group_row_chunks(&[chunk]).is_empty());
    }
}
