//! Retrieval side of the knowledge pipeline.
//!
//! The [`RetrievalRouter`] is the single entry point: it detects intent,
//! chooses structured-first vs semantic-fallback paths, fans structured
//! multi-spec requests out over a bounded worker pool, classifies per-spec
//! availability, aggregates confidence, and exposes the hierarchical
//! grouping contract for row chunks.

#![forbid(unsafe_code)]

pub mod availability;
pub mod batch;
pub mod confidence;
pub mod grouping;
pub mod intent;
pub mod router;
pub mod semantic;
pub mod summary;

pub use availability::{AvailabilityDetector, AvailabilityThresholds};
pub use batch::process_in_parallel;
pub use confidence::{ConfidenceCalculator, ConfidenceWeights};
pub use grouping::{RowChunkGroup, group_row_chunks};
pub use intent::detect_intent;
pub use router::RetrievalRouter;
pub use semantic::semantic_search;
pub use summary::compose_summary;
