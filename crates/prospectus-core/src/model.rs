//! Shared data model for the knowledge pipeline.
//!
//! Parser-side records ([`ParsedBrochure`], [`ParsedSpec`], [`ParsedChunk`])
//! live only for the duration of one ingestion job. Persisted records
//! ([`SpecValue`], [`KnowledgeChunk`], [`DocumentSource`]) are scoped by a
//! `(tenant_id, product_id, campaign_variant_id)` triple and are written
//! through the store contracts in `prospectus-store`.
//!
//! The row-chunk metadata keys in [`meta_keys`] are a wire contract:
//! downstream consumers (vector index filters, spec-fact materialization)
//! key off them bit-exactly.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────
// Wire-contract metadata keys
// ────────────────────────────────────────────────────────────────────

/// Row-chunk metadata bag keys (bit-exact wire contract).
pub mod meta_keys {
    /// Top-level category of the table row.
    pub const PARENT_CATEGORY: &str = "parent_category";
    /// Secondary category of the table row.
    pub const SUB_CATEGORY: &str = "sub_category";
    /// Specification name of the table row.
    pub const SPECIFICATION_TYPE: &str = "specification_type";
    /// Specification value of the table row.
    pub const VALUE: &str = "value";
    /// Trailing metadata cell of the table row.
    pub const ADDITIONAL_METADATA: &str = "additional_metadata";
    /// Hex SHA-256 over the normalized chunk text.
    pub const CONTENT_HASH: &str = "content_hash";
    /// Set of deterministic spec-value IDs this chunk backs.
    pub const PARSED_SPEC_IDS: &str = "parsed_spec_ids";
    /// Single-sentence gloss used for spec-fact materialization.
    pub const EXPLANATION: &str = "explanation";
    /// Raw table cells, kept for auditability.
    pub const TABLE_COLUMNS: [&str; 5] = [
        "table_column_1",
        "table_column_2",
        "table_column_3",
        "table_column_4",
        "table_column_5",
    ];
}

/// Default parent category when the table cell is empty.
pub const DEFAULT_PARENT_CATEGORY: &str = "Uncategorized";
/// Default sub-category when the table cell is empty.
pub const DEFAULT_SUB_CATEGORY: &str = "General";
/// Default specification type when the table cell is empty.
pub const DEFAULT_SPECIFICATION_TYPE: &str = "Unknown";

// ────────────────────────────────────────────────────────────────────
// Enums
// ────────────────────────────────────────────────────────────────────

/// Discriminates the heterogeneous chunk set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    /// One spec-table row, formatted as structured key-value text.
    SpecRow,
    /// A materialized spec fact (retrieval-side synthetic chunks).
    SpecFact,
    /// A feature-section block.
    FeatureBlock,
    /// A unique-selling-point bullet.
    Usp,
    /// A frequently-asked-question block.
    Faq,
    /// A cross-product comparison block.
    Comparison,
    /// Product-wide prose or feature text.
    Global,
}

impl ChunkType {
    /// Wire string for the chunk type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SpecRow => "spec_row",
            Self::SpecFact => "spec_fact",
            Self::FeatureBlock => "feature_block",
            Self::Usp => "usp",
            Self::Faq => "faq",
            Self::Comparison => "comparison",
            Self::Global => "global",
        }
    }
}

impl std::fmt::Display for ChunkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chunk-level embedding state.
///
/// `Complete` is terminal; a chunk never transitions back once its vector
/// is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionStatus {
    /// Vector attached; the chunk is visible to the vector index.
    Complete,
    /// Persisted without a vector, awaiting embedding.
    #[default]
    Incomplete,
    /// Queued for an out-of-band re-embedding attempt.
    RetryNeeded,
}

impl CompletionStatus {
    /// Wire string for the completion status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Incomplete => "incomplete",
            Self::RetryNeeded => "retry-needed",
        }
    }

    /// Whether the chunk is discoverable by the retry surface.
    #[must_use]
    pub const fn needs_embedding(self) -> bool {
        matches!(self, Self::Incomplete | Self::RetryNeeded)
    }
}

impl std::fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a persisted spec value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpecStatus {
    /// Current authoritative value.
    #[default]
    Active,
    /// Disagrees with an existing active value; blocks publish.
    Conflict,
    /// Superseded by a later version.
    Deprecated,
}

/// Where a retrieval-side fact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Keyword lookup against the spec view.
    Structured,
    /// Materialized from a vector-index hit.
    Semantic,
}

/// Chunk visibility towards retrieval consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Served to retrieval consumers.
    #[default]
    Visible,
    /// Persisted but excluded from retrieval.
    Hidden,
}

/// Severity of a collected parse problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseSeverity {
    /// Recoverable; parsing continued.
    Warning,
    /// Content was dropped or mangled.
    Error,
}

/// Query intent classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    /// Cross-product or cross-variant comparison.
    Comparison,
    /// Free-form question answering.
    Qa,
    /// Lookup of a concrete specification value.
    SpecLookup,
    /// Anything else.
    #[default]
    General,
}

/// Which retrieval dispatch path the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestMode {
    /// Free-text question routing.
    #[default]
    NaturalLanguage,
    /// Multi-spec structured lookup; no question routing.
    Structured,
}

/// Availability classification for one requested spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityState {
    /// Confidently present in retrieved results.
    Found,
    /// Weak evidence only.
    Partial,
    /// No usable evidence.
    #[default]
    Unavailable,
}

/// Ingestion job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, not yet started.
    #[default]
    Pending,
    /// Phases executing.
    Running,
    /// All fatal phases completed (conflicts and embedding failures allowed).
    Succeeded,
    /// A fatal phase failed.
    Failed,
}

// ────────────────────────────────────────────────────────────────────
// Parser output
// ────────────────────────────────────────────────────────────────────

/// A problem collected (not raised) while parsing a brochure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseError {
    /// Problem severity.
    pub severity: ParseSeverity,
    /// Human-readable description.
    pub message: String,
    /// Line number in the source document, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl ParseError {
    /// Collect a warning.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: ParseSeverity::Warning,
            message: message.into(),
            line: None,
        }
    }

    /// Collect an error.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: ParseSeverity::Error,
            message: message.into(),
            line: None,
        }
    }
}

/// Document-level metadata from the frontmatter block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrochureMetadata {
    /// Document title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Product name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    /// Model year.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_year: Option<i32>,
    /// Locale (e.g. `en-IN`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Market slice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    /// Trim level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim: Option<String>,
    /// Extraction provenance (which extractor produced the markdown).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extractor: Option<String>,
}

/// One structured spec-table row, parser-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedSpec {
    /// Normalized category.
    pub category: String,
    /// Specification name.
    pub name: String,
    /// Raw value string.
    pub value: String,
    /// Normalized unit, when one was extracted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Key-features cell.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub key_features: String,
    /// Variant-availability cell.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub variant_availability: String,
    /// Numeric interpretation of `value`, when it parses after comma-stripping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<f64>,
    /// Parser confidence in this record.
    pub confidence: f64,
    /// Page the row was found on.
    pub source_page: u32,
    /// In-page line the row was found on.
    pub source_line: u32,
    /// The raw table row text.
    pub raw_text: String,
}

/// The atomic unit of retrievable text, parser-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedChunk {
    /// Chunk text. For row chunks this is the structured key-value format.
    pub text: String,
    /// Chunk discriminator.
    pub chunk_type: ChunkType,
    /// Page the chunk came from.
    pub source_page: u32,
    /// First in-page line covered (approximate for prose chunks).
    pub start_line: u32,
    /// Last in-page line covered (approximate for prose chunks).
    pub end_line: u32,
    /// Metadata bag. Row chunks carry the full wire-contract bag;
    /// prose chunks carry only structural fields.
    #[serde(default)]
    pub metadata: IndexMap<String, serde_json::Value>,
}

impl ParsedChunk {
    /// Metadata string value, when present.
    #[must_use]
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(serde_json::Value::as_str)
    }

    /// The content hash from the metadata bag, when present.
    #[must_use]
    pub fn content_hash(&self) -> Option<&str> {
        self.meta_str(meta_keys::CONTENT_HASH)
    }
}

/// A feature bullet from the Features/Highlights section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFeature {
    /// Bullet text.
    pub text: String,
    /// Inferred tag (safety, comfort, technology, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Page the bullet was found on.
    pub source_page: u32,
}

/// A unique-selling-point bullet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedUsp {
    /// Bullet text.
    pub text: String,
    /// Inferred tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Page the bullet was found on.
    pub source_page: u32,
}

/// Parser output for one markdown document. Transient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedBrochure {
    /// Frontmatter metadata.
    pub metadata: BrochureMetadata,
    /// Structured spec records.
    pub specs: Vec<ParsedSpec>,
    /// Feature bullets.
    pub features: Vec<ParsedFeature>,
    /// USP bullets.
    pub usps: Vec<ParsedUsp>,
    /// Heterogeneous chunk list (row, global, prose).
    pub raw_chunks: Vec<ParsedChunk>,
    /// Page number → raw page text.
    pub source_pages: IndexMap<u32, String>,
    /// Collected parse problems.
    pub errors: Vec<ParseError>,
}

// ────────────────────────────────────────────────────────────────────
// Persisted records
// ────────────────────────────────────────────────────────────────────

/// A persisted spec value with a deterministic identity.
///
/// Concurrent writes to the same deterministic ID form a version chain;
/// `version` increases monotonically within the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecValue {
    /// Deterministic v5 UUID over `(tenant, product, category, name)`.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Owning product.
    pub product_id: Uuid,
    /// Campaign variant slice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_variant_id: Option<Uuid>,
    /// Normalized category.
    pub category: String,
    /// Specification name.
    pub name: String,
    /// Value string.
    pub value: String,
    /// Normalized unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Key-features cell.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub key_features: String,
    /// Variant-availability cell.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub variant_availability: String,
    /// Numeric interpretation, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<f64>,
    /// Ingestion confidence.
    pub confidence: f64,
    /// Lifecycle status.
    pub status: SpecStatus,
    /// Monotonic version within the identity chain.
    pub version: u32,
    /// Document source that produced this version.
    pub source_doc_id: Uuid,
    /// Page the value came from.
    pub source_page: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A persisted chunk: [`ParsedChunk`] plus identity, scoping, and
/// embedding state.
///
/// Invariant: `completion_status == Complete ⇔ embedding_vector != None`.
/// `content_hash` is unique per tenant where non-null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Chunk identity.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Owning product.
    pub product_id: Uuid,
    /// Campaign variant slice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_variant_id: Option<Uuid>,
    /// Chunk text.
    pub text: String,
    /// Chunk discriminator.
    pub chunk_type: ChunkType,
    /// Page the chunk came from.
    pub source_page: u32,
    /// First in-page line covered.
    pub start_line: u32,
    /// Last in-page line covered.
    pub end_line: u32,
    /// Metadata bag (wire contract for row chunks).
    #[serde(default)]
    pub metadata: IndexMap<String, serde_json::Value>,
    /// Hex SHA-256 over normalized text. Null for legacy/prose chunks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Embedding state.
    pub completion_status: CompletionStatus,
    /// Attached embedding vector, when complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_vector: Option<Vec<f32>>,
    /// Model that produced the embedding.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub embedding_model: String,
    /// Version tag of the embedding model.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub embedding_version: String,
    /// Document source this chunk was ingested from.
    pub source_doc_id: Uuid,
    /// Retrieval visibility.
    pub visibility: Visibility,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl KnowledgeChunk {
    /// Whether the completion invariant holds for this record.
    #[must_use]
    pub const fn completion_invariant_holds(&self) -> bool {
        matches!(
            (&self.completion_status, &self.embedding_vector),
            (CompletionStatus::Complete, Some(_))
                | (CompletionStatus::Incomplete | CompletionStatus::RetryNeeded, None)
        )
    }

    /// Deterministic spec-value IDs this chunk backs.
    #[must_use]
    pub fn parsed_spec_ids(&self) -> Vec<Uuid> {
        self.metadata
            .get(meta_keys::PARSED_SPEC_IDS)
            .and_then(serde_json::Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(serde_json::Value::as_str)
                    .filter_map(|s| Uuid::parse_str(s).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Provenance record for one ingested source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSource {
    /// Record identity.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Owning product.
    pub product_id: Uuid,
    /// Campaign variant slice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_variant_id: Option<Uuid>,
    /// Hex SHA-256 of the raw source content.
    pub content_sha256: String,
    /// Absolute storage URI of the source.
    pub storage_uri: String,
    /// Operator who triggered the ingestion.
    pub operator: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A fire-and-forget audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageEvent {
    /// Monotonic per-process sequence number.
    pub seq: u64,
    /// Event kind (`ingestion`, `query`).
    pub kind: String,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Event payload.
    pub payload: serde_json::Value,
    /// Emission timestamp.
    pub created_at: DateTime<Utc>,
}

// ────────────────────────────────────────────────────────────────────
// Retrieval-side views
// ────────────────────────────────────────────────────────────────────

/// Where a fact's source document places it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactSource {
    /// Source document identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<Uuid>,
    /// Source page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Source URL, when the document has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Retrieval-side view of a spec, possibly synthesized from a semantic hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecFact {
    /// Backing spec-value identity, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_item_id: Option<Uuid>,
    /// Category.
    pub category: String,
    /// Spec name.
    pub name: String,
    /// Value string.
    pub value: String,
    /// Normalized unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Key-features cell.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub key_features: String,
    /// Variant-availability cell.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub variant_availability: String,
    /// Single-sentence gloss.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub explanation: String,
    /// Structured or semantic origin.
    pub provenance: Provenance,
    /// Fact confidence in `[0, 1]`.
    pub confidence: f64,
    /// Campaign variant slice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_variant_id: Option<Uuid>,
    /// Source document location.
    #[serde(default)]
    pub source: FactSource,
}

/// A vector-index hit surfaced to the caller.
///
/// `distance` is cosine distance in `[0, 1]`; similarity is `1 - distance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticChunk {
    /// Backing chunk identity.
    pub id: Uuid,
    /// Chunk text.
    pub text: String,
    /// Chunk discriminator.
    pub chunk_type: ChunkType,
    /// Cosine distance from the query vector.
    pub distance: f64,
    /// Page the chunk came from.
    pub source_page: u32,
    /// Opaque metadata from the index.
    #[serde(default)]
    pub metadata: IndexMap<String, serde_json::Value>,
}

impl SemanticChunk {
    /// Cosine similarity (`1 - distance`), clamped to `[0, 1]`.
    #[must_use]
    pub fn similarity(&self) -> f64 {
        (1.0 - self.distance).clamp(0.0, 1.0)
    }

    /// Metadata string value, when present.
    #[must_use]
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(serde_json::Value::as_str)
    }
}

/// Availability classification for one requested spec name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecAvailabilityStatus {
    /// The spec name as originally requested.
    pub spec_name: String,
    /// Classification.
    pub status: AvailabilityState,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Alternate names considered during lookup.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub alternative_names: Vec<String>,
    /// Facts that matched.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub matched_specs: Vec<SpecFact>,
    /// Semantic chunks that matched.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub matched_chunks: Vec<SemanticChunk>,
}

impl SpecAvailabilityStatus {
    /// An unavailable status with zero confidence.
    #[must_use]
    pub fn unavailable(spec_name: impl Into<String>) -> Self {
        Self {
            spec_name: spec_name.into(),
            status: AvailabilityState::Unavailable,
            confidence: 0.0,
            alternative_names: Vec::new(),
            matched_specs: Vec::new(),
            matched_chunks: Vec::new(),
        }
    }
}

/// Filters applied to retrieval.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalFilters {
    /// Restrict to these categories.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub categories: Vec<String>,
    /// Restrict to these chunk types.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub chunk_types: Vec<ChunkType>,
}

/// A retrieval request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalRequest {
    /// Owning tenant. Every query is tenant-scoped.
    pub tenant_id: Uuid,
    /// Products in scope.
    pub product_ids: Vec<Uuid>,
    /// Campaign variant slice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_variant_id: Option<Uuid>,
    /// Free-text question (natural-language mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    /// Requested spec names (structured mode).
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub requested_specs: Vec<String>,
    /// Dispatch mode.
    #[serde(default)]
    pub request_mode: RequestMode,
    /// Caller-supplied intent, adopted when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_hint: Option<QueryIntent>,
    /// Retrieval filters.
    #[serde(default)]
    pub filters: RetrievalFilters,
    /// Vector search top-k override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_chunks: Option<usize>,
    /// Include lineage events in the response.
    #[serde(default)]
    pub include_lineage: bool,
    /// Include a composed summary in the response.
    #[serde(default)]
    pub include_summary: bool,
}

impl RetrievalRequest {
    /// A natural-language request for one tenant/product pair.
    #[must_use]
    pub fn question(tenant_id: Uuid, product_id: Uuid, question: impl Into<String>) -> Self {
        Self {
            tenant_id,
            product_ids: vec![product_id],
            campaign_variant_id: None,
            question: Some(question.into()),
            requested_specs: Vec::new(),
            request_mode: RequestMode::NaturalLanguage,
            intent_hint: None,
            filters: RetrievalFilters::default(),
            max_chunks: None,
            include_lineage: false,
            include_summary: false,
        }
    }

    /// A structured multi-spec request.
    #[must_use]
    pub fn structured(tenant_id: Uuid, product_id: Uuid, specs: Vec<String>) -> Self {
        Self {
            requested_specs: specs,
            request_mode: RequestMode::Structured,
            question: None,
            ..Self::question(tenant_id, product_id, String::new())
        }
    }

    /// Whether this request takes the structured dispatch path.
    #[must_use]
    pub fn is_structured(&self) -> bool {
        !self.requested_specs.is_empty() || self.request_mode == RequestMode::Structured
    }
}

/// A retrieval response. Queries always produce one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResponse {
    /// Detected or adopted intent.
    pub intent: QueryIntent,
    /// Wall-clock latency of the query.
    pub latency_ms: u64,
    /// Structured facts (keyword-sourced and semantically materialized).
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub structured_facts: Vec<SpecFact>,
    /// Semantic chunks, best similarity first.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub semantic_chunks: Vec<SemanticChunk>,
    /// Comparison blocks (comparison intent only).
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub comparisons: Vec<SemanticChunk>,
    /// Lineage events, when requested.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub lineage: Vec<LineageEvent>,
    /// Per-spec availability (structured mode).
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub spec_availability: Vec<SpecAvailabilityStatus>,
    /// Aggregated response confidence in `[0, 1]`.
    pub overall_confidence: f64,
    /// Composed summary, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl RetrievalResponse {
    /// An empty response carrying only intent, used on hard failure.
    #[must_use]
    pub fn empty(intent: QueryIntent) -> Self {
        Self {
            intent,
            latency_ms: 0,
            structured_facts: Vec::new(),
            semantic_chunks: Vec::new(),
            comparisons: Vec::new(),
            lineage: Vec::new(),
            spec_availability: Vec::new(),
            overall_confidence: 0.0,
            summary: None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────
// Ingestion job
// ────────────────────────────────────────────────────────────────────

/// A request to ingest one brochure. Exactly one content source is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionRequest {
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Owning product.
    pub product_id: Uuid,
    /// Campaign variant slice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<Uuid>,
    /// Markdown source path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown_path: Option<std::path::PathBuf>,
    /// PDF source path (routed through the external extractor).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<std::path::PathBuf>,
    /// Operator who triggered the ingestion.
    pub operator: String,
    /// Overwrite existing values instead of version-chaining conflicts.
    #[serde(default)]
    pub overwrite: bool,
    /// Publish the campaign on success (blocked by conflicts).
    #[serde(default)]
    pub auto_publish: bool,
}

/// A phase-tagged error accumulated by an ingestion job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionError {
    /// Pipeline phase that produced the error.
    pub phase: String,
    /// Problem severity.
    pub severity: ParseSeverity,
    /// Human-readable description.
    pub message: String,
}

/// Counters accumulated by an ingestion job.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IngestionCounts {
    /// Spec values created.
    pub specs_created: usize,
    /// Spec values updated (new version on an existing identity).
    pub specs_updated: usize,
    /// Features persisted.
    pub features: usize,
    /// USPs persisted.
    pub usps: usize,
    /// Chunks created.
    pub chunks_created: usize,
    /// Row chunks collapsed onto an existing content hash.
    pub chunks_deduplicated: usize,
    /// Embeddings attached.
    pub embeddings_succeeded: usize,
    /// Chunks left incomplete after embedding failures.
    pub embeddings_failed: usize,
}

/// The outcome of one ingestion job. Always populated, even on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionResult {
    /// Final job status.
    pub status: JobStatus,
    /// Source document record, when phase 4 completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentSource>,
    /// Accumulated counters.
    pub counts: IngestionCounts,
    /// Spec-value IDs that conflicted during persistence. Blocks publish.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub conflicting_specs: Vec<Uuid>,
    /// Accumulated errors and warnings.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<IngestionError>,
    /// Wall-clock duration of the job.
    pub duration_ms: u64,
}

impl IngestionResult {
    /// Whether a downstream publish is allowed.
    #[must_use]
    pub fn publish_allowed(&self) -> bool {
        self.status == JobStatus::Succeeded && self.conflicting_specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_status_wire_strings() {
        assert_eq!(CompletionStatus::Complete.as_str(), "complete");
        assert_eq!(CompletionStatus::RetryNeeded.as_str(), "retry-needed");
        let json = serde_json::to_string(&CompletionStatus::RetryNeeded).unwrap();
        assert_eq!(json, "\"retry-needed\"");
    }

    #[test]
    fn chunk_type_wire_strings() {
        assert_eq!(ChunkType::SpecRow.as_str(), "spec_row");
        let json = serde_json::to_string(&ChunkType::FeatureBlock).unwrap();
        assert_eq!(json, "\"feature_block\"");
    }

    #[test]
    fn completion_invariant_detection() {
        let mut chunk = KnowledgeChunk {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            campaign_variant_id: None,
            text: "x".into(),
            chunk_type: ChunkType::Global,
            source_page: 1,
            start_line: 1,
            end_line: 1,
            metadata: IndexMap::new(),
            content_hash: None,
            completion_status: CompletionStatus::Incomplete,
            embedding_vector: None,
            embedding_model: String::new(),
            embedding_version: String::new(),
            source_doc_id: Uuid::new_v4(),
            visibility: Visibility::Visible,
            created_at: Utc::now(),
        };
        assert!(chunk.completion_invariant_holds());

        chunk.completion_status = CompletionStatus::Complete;
        assert!(!chunk.completion_invariant_holds());

        chunk.embedding_vector = Some(vec![0.0; 4]);
        assert!(chunk.completion_invariant_holds());
    }

    #[test]
    fn structured_request_dispatch() {
        let tenant = Uuid::new_v4();
        let product = Uuid::new_v4();
        assert!(RetrievalRequest::structured(tenant, product, vec!["Mileage".into()])
            .is_structured());
        assert!(!RetrievalRequest::question(tenant, product, "what colors?").is_structured());
    }

    #[test]
    fn publish_blocked_by_conflicts() {
        let result = IngestionResult {
            status: JobStatus::Succeeded,
            document: None,
            counts: IngestionCounts::default(),
            conflicting_specs: vec![Uuid::new_v4()],
            errors: Vec::new(),
            duration_ms: 0,
        };
        assert!(!result.publish_allowed());
    }
}
