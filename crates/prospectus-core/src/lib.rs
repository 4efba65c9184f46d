//! Shared foundations for the prospectus knowledge pipeline.
//!
//! This crate holds everything both sides of the pipeline depend on:
//! - the data model ([`model`]) shared by parser, ingestion, and retrieval
//! - configuration ([`config`]) loaded from `PROSPECTUS_*` env vars
//! - deterministic identities ([`ids`]) for spec values
//! - content canonicalization and hashing ([`canonical`])
//! - the unit/category/spec-name normalizers ([`units`], [`categories`],
//!   [`specnames`])
//! - cancellation contexts ([`cancel`])

#![forbid(unsafe_code)]

pub mod cancel;
pub mod canonical;
pub mod categories;
pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod specnames;
pub mod units;

pub use cancel::CancelContext;
pub use canonical::{content_hash, normalize_for_hash, sha256_hex, strip_markdown};
pub use categories::normalize_category;
pub use config::Config;
pub use error::{Error, Result};
pub use ids::{SPEC_NAMESPACE, spec_value_id};
pub use model::{
    AvailabilityState, BrochureMetadata, ChunkType, CompletionStatus, DocumentSource, FactSource,
    IngestionCounts, IngestionError, IngestionRequest, IngestionResult, JobStatus, KnowledgeChunk,
    LineageEvent, ParseError, ParseSeverity, ParsedBrochure, ParsedChunk, ParsedFeature,
    ParsedSpec, ParsedUsp, Provenance, QueryIntent, RequestMode, RetrievalFilters,
    RetrievalRequest, RetrievalResponse, SemanticChunk, SpecAvailabilityStatus, SpecFact,
    SpecStatus, SpecValue, Visibility, meta_keys,
};
pub use specnames::normalize_spec_name;
pub use units::normalize_unit;
