//! Vector index contract and in-memory implementation.
//!
//! The in-memory index runs exact cosine similarity over all vectors with
//! metadata filtering applied first, and returns a deterministic top-k:
//! distance ascending, chunk ID ascending on ties. Every operation is
//! tenant-scoped; cross-tenant hits are a bug, not a tuning problem.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use prospectus_core::error::{Error, Result};
use prospectus_core::model::ChunkType;

/// One vector with its filterable metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorEntry {
    /// Backing chunk identity.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Owning product.
    pub product_id: Uuid,
    /// Campaign variant slice.
    pub campaign_variant_id: Option<Uuid>,
    /// Chunk discriminator, used by type filters.
    pub chunk_type: ChunkType,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Opaque metadata handed back on hits.
    #[serde(default)]
    pub metadata: IndexMap<String, serde_json::Value>,
}

/// A scored hit from vector search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorHit {
    /// Backing chunk identity.
    pub id: Uuid,
    /// Cosine distance in `[0, 1]` (lower is closer).
    pub distance: f64,
    /// Cosine similarity (`1 - distance`).
    pub score: f64,
    /// Chunk discriminator.
    pub chunk_type: ChunkType,
    /// Opaque metadata from the entry.
    pub metadata: IndexMap<String, serde_json::Value>,
}

/// Filter predicates applied before similarity ranking.
#[derive(Debug, Clone, Default)]
pub struct VectorFilters {
    /// Restrict to these products.
    pub product_ids: Vec<Uuid>,
    /// Restrict to one campaign variant.
    pub campaign_variant_id: Option<Uuid>,
    /// Restrict to these categories (matched against `parent_category`).
    pub categories: Vec<String>,
    /// Restrict to these chunk types.
    pub chunk_types: Vec<ChunkType>,
}

/// Vector index contract.
pub trait VectorIndex: Send + Sync {
    /// Insert entries. Vectors must match the index dimension.
    fn insert(&self, entries: Vec<VectorEntry>) -> Result<()>;

    /// Exact top-k search with filters. Deterministic ordering.
    fn search(
        &self,
        tenant_id: Uuid,
        vector: &[f32],
        k: usize,
        filters: &VectorFilters,
    ) -> Result<Vec<VectorHit>>;

    /// Remove entries by chunk ID.
    fn delete(&self, tenant_id: Uuid, ids: &[Uuid]) -> Result<()>;

    /// Number of entries for a tenant.
    fn count(&self, tenant_id: Uuid) -> Result<usize>;
}

/// Cosine similarity clamped to `[0, 1]`.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

/// In-memory exact-search vector index.
#[derive(Debug)]
pub struct MemoryVectorIndex {
    dimension: usize,
    tenants: RwLock<HashMap<Uuid, Vec<VectorEntry>>>,
}

impl MemoryVectorIndex {
    /// An empty index expecting vectors of `dimension`.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            tenants: RwLock::new(HashMap::new()),
        }
    }

    /// The expected vector dimension.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Persist every entry to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tenants = self.tenants.read().expect("vector index lock poisoned");
        let entries: Vec<&VectorEntry> = tenants.values().flatten().collect();
        std::fs::write(path, serde_json::to_vec(&entries)?)?;
        Ok(())
    }

    /// Rebuild an index from a JSON snapshot. A missing file is an empty
    /// index.
    pub fn load(path: &Path, dimension: usize) -> Result<Self> {
        let index = Self::new(dimension);
        if !path.exists() {
            return Ok(index);
        }
        let entries: Vec<VectorEntry> = serde_json::from_slice(&std::fs::read(path)?)?;
        index.insert(entries)?;
        Ok(index)
    }

    fn matches(entry: &VectorEntry, filters: &VectorFilters) -> bool {
        if !filters.product_ids.is_empty() && !filters.product_ids.contains(&entry.product_id) {
            return false;
        }
        if let Some(campaign) = filters.campaign_variant_id {
            if entry.campaign_variant_id != Some(campaign) {
                return false;
            }
        }
        if !filters.chunk_types.is_empty() && !filters.chunk_types.contains(&entry.chunk_type) {
            return false;
        }
        if !filters.categories.is_empty() {
            let category = entry
                .metadata
                .get("parent_category")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_lowercase();
            if !filters
                .categories
                .iter()
                .any(|c| c.to_lowercase() == category)
            {
                return false;
            }
        }
        true
    }
}

impl VectorIndex for MemoryVectorIndex {
    fn insert(&self, entries: Vec<VectorEntry>) -> Result<()> {
        for entry in &entries {
            if entry.vector.len() != self.dimension {
                return Err(Error::VectorIndex(format!(
                    "vector dimension {} does not match index dimension {}",
                    entry.vector.len(),
                    self.dimension
                )));
            }
        }
        let mut tenants = self.tenants.write().expect("vector index lock poisoned");
        for entry in entries {
            let tenant = tenants.entry(entry.tenant_id).or_default();
            // Re-inserting a chunk replaces its previous vector
            tenant.retain(|existing| existing.id != entry.id);
            tenant.push(entry);
        }
        Ok(())
    }

    fn search(
        &self,
        tenant_id: Uuid,
        vector: &[f32],
        k: usize,
        filters: &VectorFilters,
    ) -> Result<Vec<VectorHit>> {
        if vector.len() != self.dimension {
            return Err(Error::VectorIndex(format!(
                "query dimension {} does not match index dimension {}",
                vector.len(),
                self.dimension
            )));
        }
        let tenants = self.tenants.read().expect("vector index lock poisoned");
        let Some(entries) = tenants.get(&tenant_id) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<VectorHit> = entries
            .iter()
            .filter(|entry| Self::matches(entry, filters))
            .map(|entry| {
                let score = cosine_similarity(vector, &entry.vector);
                VectorHit {
                    id: entry.id,
                    distance: 1.0 - score,
                    score,
                    chunk_type: entry.chunk_type,
                    metadata: entry.metadata.clone(),
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    fn delete(&self, tenant_id: Uuid, ids: &[Uuid]) -> Result<()> {
        let mut tenants = self.tenants.write().expect("vector index lock poisoned");
        if let Some(entries) = tenants.get_mut(&tenant_id) {
            entries.retain(|entry| !ids.contains(&entry.id));
        }
        Ok(())
    }

    fn count(&self, tenant_id: Uuid) -> Result<usize> {
        let tenants = self.tenants.read().expect("vector index lock poisoned");
        Ok(tenants.get(&tenant_id).map_or(0, Vec::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(tenant: Uuid, product: Uuid, vector: Vec<f32>, chunk_type: ChunkType) -> VectorEntry {
        VectorEntry {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            product_id: product,
            campaign_variant_id: None,
            chunk_type,
            vector,
            metadata: IndexMap::new(),
        }
    }

    #[test]
    fn search_ranks_by_similarity() {
        let index = MemoryVectorIndex::new(3);
        let tenant = Uuid::new_v4();
        let product = Uuid::new_v4();
        index
            .insert(vec![
                entry(tenant, product, vec![1.0, 0.0, 0.0], ChunkType::SpecRow),
                entry(tenant, product, vec![0.0, 1.0, 0.0], ChunkType::SpecRow),
            ])
            .unwrap();
        let hits = index
            .search(tenant, &[1.0, 0.0, 0.0], 2, &VectorFilters::default())
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].distance < hits[1].distance);
        assert!(hits[0].distance < 1e-6);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let index = MemoryVectorIndex::new(3);
        let tenant = Uuid::new_v4();
        assert!(index
            .insert(vec![entry(tenant, Uuid::new_v4(), vec![1.0], ChunkType::Global)])
            .is_err());
        assert!(index
            .search(tenant, &[1.0], 1, &VectorFilters::default())
            .is_err());
    }

    #[test]
    fn search_is_tenant_scoped() {
        let index = MemoryVectorIndex::new(2);
        let tenant = Uuid::new_v4();
        index
            .insert(vec![entry(tenant, Uuid::new_v4(), vec![1.0, 0.0], ChunkType::Global)])
            .unwrap();
        let hits = index
            .search(Uuid::new_v4(), &[1.0, 0.0], 5, &VectorFilters::default())
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn chunk_type_filter_applies() {
        let index = MemoryVectorIndex::new(2);
        let tenant = Uuid::new_v4();
        let product = Uuid::new_v4();
        index
            .insert(vec![
                entry(tenant, product, vec![1.0, 0.0], ChunkType::SpecRow),
                entry(tenant, product, vec![1.0, 0.0], ChunkType::Global),
            ])
            .unwrap();
        let filters = VectorFilters {
            chunk_types: vec![ChunkType::SpecRow],
            ..VectorFilters::default()
        };
        let hits = index.search(tenant, &[1.0, 0.0], 5, &filters).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_type, ChunkType::SpecRow);
    }

    #[test]
    fn category_filter_reads_metadata() {
        let index = MemoryVectorIndex::new(2);
        let tenant = Uuid::new_v4();
        let product = Uuid::new_v4();
        let mut exterior = entry(tenant, product, vec![1.0, 0.0], ChunkType::SpecRow);
        exterior
            .metadata
            .insert("parent_category".into(), json!("Exterior"));
        let mut engine = entry(tenant, product, vec![1.0, 0.0], ChunkType::SpecRow);
        engine
            .metadata
            .insert("parent_category".into(), json!("Engine"));
        index.insert(vec![exterior, engine]).unwrap();

        let filters = VectorFilters {
            categories: vec!["exterior".into()],
            ..VectorFilters::default()
        };
        let hits = index.search(tenant, &[1.0, 0.0], 5, &filters).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata["parent_category"], "Exterior");
    }

    #[test]
    fn reinsert_replaces_vector() {
        let index = MemoryVectorIndex::new(2);
        let tenant = Uuid::new_v4();
        let mut e = entry(tenant, Uuid::new_v4(), vec![1.0, 0.0], ChunkType::Global);
        index.insert(vec![e.clone()]).unwrap();
        e.vector = vec![0.0, 1.0];
        index.insert(vec![e]).unwrap();
        assert_eq!(index.count(tenant).unwrap(), 1);
    }
}
