//! Pipeline metrics.
//!
//! Lock-free counters shared by concurrent ingestion jobs, with a
//! serializable snapshot for health surfaces.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters for ingestion activity across a process lifetime.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Ingestion jobs started.
    pub jobs_started: AtomicU64,
    /// Ingestion jobs that reached `succeeded`.
    pub jobs_succeeded: AtomicU64,
    /// Ingestion jobs that reached `failed`.
    pub jobs_failed: AtomicU64,
    /// Spec values written (created or updated).
    pub specs_persisted: AtomicU64,
    /// Spec conflicts recorded.
    pub spec_conflicts: AtomicU64,
    /// Chunks created.
    pub chunks_created: AtomicU64,
    /// Row chunks collapsed onto an existing hash.
    pub chunks_deduplicated: AtomicU64,
    /// Embedding batch calls issued.
    pub embed_batches: AtomicU64,
    /// Embeddings attached.
    pub embeddings_succeeded: AtomicU64,
    /// Chunks left incomplete after embedding failures.
    pub embeddings_failed: AtomicU64,
}

impl PipelineMetrics {
    /// Fresh zeroed metrics.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            jobs_started: AtomicU64::new(0),
            jobs_succeeded: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            specs_persisted: AtomicU64::new(0),
            spec_conflicts: AtomicU64::new(0),
            chunks_created: AtomicU64::new(0),
            chunks_deduplicated: AtomicU64::new(0),
            embed_batches: AtomicU64::new(0),
            embeddings_succeeded: AtomicU64::new(0),
            embeddings_failed: AtomicU64::new(0),
        }
    }

    /// Increment a counter by `n`.
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// A point-in-time snapshot.
    #[must_use]
    pub fn snapshot(&self) -> PipelineMetricsSnapshot {
        PipelineMetricsSnapshot {
            jobs_started: self.jobs_started.load(Ordering::Relaxed),
            jobs_succeeded: self.jobs_succeeded.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            specs_persisted: self.specs_persisted.load(Ordering::Relaxed),
            spec_conflicts: self.spec_conflicts.load(Ordering::Relaxed),
            chunks_created: self.chunks_created.load(Ordering::Relaxed),
            chunks_deduplicated: self.chunks_deduplicated.load(Ordering::Relaxed),
            embed_batches: self.embed_batches.load(Ordering::Relaxed),
            embeddings_succeeded: self.embeddings_succeeded.load(Ordering::Relaxed),
            embeddings_failed: self.embeddings_failed.load(Ordering::Relaxed),
        }
    }
}

/// Serializable snapshot of [`PipelineMetrics`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineMetricsSnapshot {
    pub jobs_started: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub specs_persisted: u64,
    pub spec_conflicts: u64,
    pub chunks_created: u64,
    pub chunks_deduplicated: u64,
    pub embed_batches: u64,
    pub embeddings_succeeded: u64,
    pub embeddings_failed: u64,
}
