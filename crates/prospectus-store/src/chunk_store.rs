//! Knowledge-chunk store contract and in-memory implementation.
//!
//! Row chunks are identified by content hash: `insert_row_chunk` is an
//! atomic find-or-insert so two concurrent writers with the same hash can
//! never both create a row. The unique-hash invariant holds at quiescence
//! because the lookup and the insert happen under one write lock.
//!
//! A chunk is mutated only to (a) append to its `parsed_spec_ids` set and
//! (b) attach an embedding. `Complete` is terminal.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use serde_json::{Value, json};
use uuid::Uuid;

use prospectus_core::error::{Error, Result};
use prospectus_core::model::{CompletionStatus, KnowledgeChunk, meta_keys};

/// Outcome of a row-chunk insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowChunkInsert {
    /// No existing chunk carried this content hash; a new row was created.
    Inserted(Uuid),
    /// An existing chunk already carries this content hash.
    Deduplicated(Uuid),
}

impl RowChunkInsert {
    /// The surviving chunk identity.
    #[must_use]
    pub const fn id(self) -> Uuid {
        match self {
            Self::Inserted(id) | Self::Deduplicated(id) => id,
        }
    }
}

/// Read/write contract for persisted chunks.
pub trait ChunkStore: Send + Sync {
    /// Insert a chunk unconditionally (prose/global chunks).
    fn insert(&self, chunk: KnowledgeChunk) -> Result<Uuid>;

    /// Atomic find-or-insert by content hash for row chunks. The chunk
    /// must carry a non-null `content_hash`.
    fn insert_row_chunk(&self, chunk: KnowledgeChunk) -> Result<RowChunkInsert>;

    /// Fetch one chunk.
    fn get(&self, tenant_id: Uuid, chunk_id: Uuid) -> Result<Option<KnowledgeChunk>>;

    /// Find the chunk carrying a content hash, if any.
    fn find_by_content_hash(&self, tenant_id: Uuid, hash: &str)
    -> Result<Option<KnowledgeChunk>>;

    /// Add a deterministic spec-value ID to a chunk's `parsed_spec_ids`
    /// set. Idempotent.
    fn append_parsed_spec_id(&self, tenant_id: Uuid, chunk_id: Uuid, spec_id: Uuid) -> Result<()>;

    /// Attach an embedding and transition the chunk to `Complete`.
    fn attach_embedding(
        &self,
        tenant_id: Uuid,
        chunk_id: Uuid,
        vector: Vec<f32>,
        model: &str,
        version: &str,
    ) -> Result<()>;

    /// Move an unembedded chunk between `Incomplete` and `RetryNeeded`.
    /// `Complete` is terminal and rejects any transition.
    fn mark_status(&self, tenant_id: Uuid, chunk_id: Uuid, status: CompletionStatus)
    -> Result<()>;

    /// The retry surface: every chunk still awaiting an embedding.
    fn pending_embedding(&self, tenant_id: Uuid) -> Result<Vec<KnowledgeChunk>>;

    /// Number of chunks for a tenant.
    fn count(&self, tenant_id: Uuid) -> Result<usize>;
}

#[derive(Debug, Default)]
struct TenantChunks {
    chunks: HashMap<Uuid, KnowledgeChunk>,
    /// content hash → chunk id (unique where present)
    by_hash: HashMap<String, Uuid>,
}

/// In-memory chunk store.
#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    tenants: RwLock<HashMap<Uuid, TenantChunks>>,
}

impl MemoryChunkStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every chunk for a tenant, for snapshots and tests.
    #[must_use]
    pub fn all_chunks(&self, tenant_id: Uuid) -> Vec<KnowledgeChunk> {
        let tenants = self.tenants.read().expect("chunk store lock poisoned");
        tenants
            .get(&tenant_id)
            .map(|t| t.chunks.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Persist every chunk to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tenants = self.tenants.read().expect("chunk store lock poisoned");
        let chunks: Vec<&KnowledgeChunk> = tenants
            .values()
            .flat_map(|t| t.chunks.values())
            .collect();
        std::fs::write(path, serde_json::to_vec_pretty(&chunks)?)?;
        Ok(())
    }

    /// Rebuild a store from a JSON snapshot. A missing file is an empty
    /// store.
    pub fn load(path: &Path) -> Result<Self> {
        let store = Self::new();
        if !path.exists() {
            return Ok(store);
        }
        let chunks: Vec<KnowledgeChunk> = serde_json::from_slice(&std::fs::read(path)?)?;
        {
            let mut tenants = store.tenants.write().expect("chunk store lock poisoned");
            for chunk in chunks {
                let tenant = tenants.entry(chunk.tenant_id).or_default();
                if let Some(hash) = &chunk.content_hash {
                    tenant.by_hash.insert(hash.clone(), chunk.id);
                }
                tenant.chunks.insert(chunk.id, chunk);
            }
        }
        Ok(store)
    }

    fn with_chunk_mut<T>(
        &self,
        tenant_id: Uuid,
        chunk_id: Uuid,
        f: impl FnOnce(&mut KnowledgeChunk) -> Result<T>,
    ) -> Result<T> {
        let mut tenants = self.tenants.write().expect("chunk store lock poisoned");
        let chunk = tenants
            .get_mut(&tenant_id)
            .and_then(|t| t.chunks.get_mut(&chunk_id))
            .ok_or_else(|| Error::ChunkNotFound(chunk_id.to_string()))?;
        f(chunk)
    }
}

impl ChunkStore for MemoryChunkStore {
    fn insert(&self, chunk: KnowledgeChunk) -> Result<Uuid> {
        let mut tenants = self.tenants.write().expect("chunk store lock poisoned");
        let tenant = tenants.entry(chunk.tenant_id).or_default();
        if let Some(hash) = &chunk.content_hash {
            if tenant.by_hash.contains_key(hash) {
                return Err(Error::HashCollision(hash.clone()));
            }
            tenant.by_hash.insert(hash.clone(), chunk.id);
        }
        let id = chunk.id;
        tenant.chunks.insert(id, chunk);
        Ok(id)
    }

    fn insert_row_chunk(&self, chunk: KnowledgeChunk) -> Result<RowChunkInsert> {
        let hash = chunk
            .content_hash
            .clone()
            .ok_or_else(|| Error::Validation("row chunk without content hash".into()))?;
        let mut tenants = self.tenants.write().expect("chunk store lock poisoned");
        let tenant = tenants.entry(chunk.tenant_id).or_default();
        if let Some(existing) = tenant.by_hash.get(&hash) {
            return Ok(RowChunkInsert::Deduplicated(*existing));
        }
        let id = chunk.id;
        tenant.by_hash.insert(hash, id);
        tenant.chunks.insert(id, chunk);
        Ok(RowChunkInsert::Inserted(id))
    }

    fn get(&self, tenant_id: Uuid, chunk_id: Uuid) -> Result<Option<KnowledgeChunk>> {
        let tenants = self.tenants.read().expect("chunk store lock poisoned");
        Ok(tenants
            .get(&tenant_id)
            .and_then(|t| t.chunks.get(&chunk_id))
            .cloned())
    }

    fn find_by_content_hash(
        &self,
        tenant_id: Uuid,
        hash: &str,
    ) -> Result<Option<KnowledgeChunk>> {
        let tenants = self.tenants.read().expect("chunk store lock poisoned");
        Ok(tenants.get(&tenant_id).and_then(|t| {
            t.by_hash
                .get(hash)
                .and_then(|id| t.chunks.get(id))
                .cloned()
        }))
    }

    fn append_parsed_spec_id(&self, tenant_id: Uuid, chunk_id: Uuid, spec_id: Uuid) -> Result<()> {
        self.with_chunk_mut(tenant_id, chunk_id, |chunk| {
            let ids = chunk
                .metadata
                .entry(meta_keys::PARSED_SPEC_IDS.to_string())
                .or_insert_with(|| json!([]));
            let Value::Array(list) = ids else {
                return Err(Error::Internal("parsed_spec_ids is not an array".into()));
            };
            let rendered = json!(spec_id.to_string());
            if !list.contains(&rendered) {
                list.push(rendered);
            }
            Ok(())
        })
    }

    fn attach_embedding(
        &self,
        tenant_id: Uuid,
        chunk_id: Uuid,
        vector: Vec<f32>,
        model: &str,
        version: &str,
    ) -> Result<()> {
        self.with_chunk_mut(tenant_id, chunk_id, |chunk| {
            chunk.embedding_vector = Some(vector);
            chunk.embedding_model = model.to_string();
            chunk.embedding_version = version.to_string();
            chunk.completion_status = CompletionStatus::Complete;
            Ok(())
        })
    }

    fn mark_status(
        &self,
        tenant_id: Uuid,
        chunk_id: Uuid,
        status: CompletionStatus,
    ) -> Result<()> {
        self.with_chunk_mut(tenant_id, chunk_id, |chunk| {
            if chunk.completion_status == CompletionStatus::Complete {
                return Err(Error::Validation(
                    "complete chunks cannot change status".into(),
                ));
            }
            if status == CompletionStatus::Complete {
                return Err(Error::Validation(
                    "completion requires an attached embedding".into(),
                ));
            }
            chunk.completion_status = status;
            Ok(())
        })
    }

    fn pending_embedding(&self, tenant_id: Uuid) -> Result<Vec<KnowledgeChunk>> {
        let tenants = self.tenants.read().expect("chunk store lock poisoned");
        let mut pending: Vec<KnowledgeChunk> = tenants
            .get(&tenant_id)
            .map(|t| {
                t.chunks
                    .values()
                    .filter(|c| c.completion_status.needs_embedding())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        pending.sort_by_key(|c| (c.created_at, c.id));
        Ok(pending)
    }

    fn count(&self, tenant_id: Uuid) -> Result<usize> {
        let tenants = self.tenants.read().expect("chunk store lock poisoned");
        Ok(tenants.get(&tenant_id).map_or(0, |t| t.chunks.len()))
    }
}
