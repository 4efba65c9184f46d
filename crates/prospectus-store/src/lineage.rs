//! Lineage writer contract and in-memory implementation.
//!
//! The lineage sink is fire-and-forget: recording never blocks a response
//! and never fails the caller. Events carry a monotonic per-process
//! sequence number.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use uuid::Uuid;

use prospectus_core::model::LineageEvent;

/// Audit sink contract. Best-effort by design.
pub trait LineageWriter: Send + Sync {
    /// Record one event. Implementations swallow their own failures.
    fn record(&self, kind: &str, tenant_id: Uuid, payload: serde_json::Value);

    /// The most recent `limit` events for a tenant, oldest first.
    /// Write-only sinks return nothing.
    fn recent(&self, tenant_id: Uuid, limit: usize) -> Vec<LineageEvent> {
        let _ = (tenant_id, limit);
        Vec::new()
    }
}

/// In-memory lineage sink.
#[derive(Debug, Default)]
pub struct MemoryLineage {
    seq: AtomicU64,
    events: Mutex<Vec<LineageEvent>>,
}

impl MemoryLineage {
    /// An empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().expect("lineage lock poisoned").len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LineageWriter for MemoryLineage {
    fn record(&self, kind: &str, tenant_id: Uuid, payload: serde_json::Value) {
        let event = LineageEvent {
            seq: self.seq.fetch_add(1, Ordering::SeqCst),
            kind: kind.to_string(),
            tenant_id,
            payload,
            created_at: Utc::now(),
        };
        self.events.lock().expect("lineage lock poisoned").push(event);
    }

    fn recent(&self, tenant_id: Uuid, limit: usize) -> Vec<LineageEvent> {
        let events = self.events.lock().expect("lineage lock poisoned");
        let tenant_events: Vec<LineageEvent> = events
            .iter()
            .filter(|event| event.tenant_id == tenant_id)
            .cloned()
            .collect();
        let skip = tenant_events.len().saturating_sub(limit);
        tenant_events.into_iter().skip(skip).collect()
    }
}
