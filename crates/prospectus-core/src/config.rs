//! Configuration for the knowledge pipeline.
//!
//! Configuration is loaded from `PROSPECTUS_*` environment variables with
//! hard defaults, so a bare process starts with sensible behavior. Values
//! are clamped to their supported ranges at load time rather than erroring.

use std::env;
use std::time::Duration;

/// Environment variable for the prose chunk size (bytes).
pub const CHUNK_SIZE_ENV: &str = "PROSPECTUS_CHUNK_SIZE";
/// Environment variable for the prose chunk overlap (bytes).
pub const CHUNK_OVERLAP_ENV: &str = "PROSPECTUS_CHUNK_OVERLAP";
/// Environment variable for the embedding batch size.
pub const EMBEDDING_BATCH_SIZE_ENV: &str = "PROSPECTUS_EMBEDDING_BATCH_SIZE";
/// Environment variable for the retrieval top-k.
pub const MAX_CHUNKS_ENV: &str = "PROSPECTUS_MAX_CHUNKS";
/// Environment variable toggling the structured-first lookup.
pub const STRUCTURED_FIRST_ENV: &str = "PROSPECTUS_STRUCTURED_FIRST";
/// Environment variable toggling the semantic fallback path.
pub const SEMANTIC_FALLBACK_ENV: &str = "PROSPECTUS_SEMANTIC_FALLBACK";
/// Environment variable for the keyword confidence threshold.
pub const KEYWORD_CONFIDENCE_ENV: &str = "PROSPECTUS_KEYWORD_CONFIDENCE_THRESHOLD";
/// Environment variable for the availability confidence threshold.
pub const MIN_AVAILABILITY_CONFIDENCE_ENV: &str = "PROSPECTUS_MIN_AVAILABILITY_CONFIDENCE";
/// Environment variable for the availability similarity threshold.
pub const MIN_SIMILARITY_ENV: &str = "PROSPECTUS_MIN_SIMILARITY_THRESHOLD";
/// Environment variable for the batch processing worker count.
pub const BATCH_WORKERS_ENV: &str = "PROSPECTUS_BATCH_PROCESSING_WORKERS";
/// Environment variable for the batch processing timeout (seconds).
pub const BATCH_TIMEOUT_ENV: &str = "PROSPECTUS_BATCH_PROCESSING_TIMEOUT_SECONDS";
/// Environment variable for the query cache TTL (seconds).
pub const CACHE_TTL_ENV: &str = "PROSPECTUS_CACHE_TTL_SECONDS";
/// Environment variable toggling query-result caching.
pub const CACHE_RESULTS_ENV: &str = "PROSPECTUS_CACHE_RESULTS";
/// Environment variable for the embedding dimension.
pub const EMBEDDING_DIMENSION_ENV: &str = "PROSPECTUS_EMBEDDING_DIMENSION";
/// Environment variable for the PDF extractor command.
pub const PDF_EXTRACTOR_ENV: &str = "PROSPECTUS_PDF_EXTRACTOR";

/// Default prose chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 512;
/// Default prose chunk overlap in bytes.
pub const DEFAULT_CHUNK_OVERLAP: usize = 64;
/// Default embedding batch size.
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 75;
/// Supported embedding batch size range.
pub const EMBEDDING_BATCH_SIZE_RANGE: (usize, usize) = (50, 100);
/// Default retrieval top-k.
pub const DEFAULT_MAX_CHUNKS: usize = 8;
/// Default batch processing worker count.
pub const DEFAULT_BATCH_WORKERS: usize = 5;
/// Default batch processing deadline.
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Default query cache TTL.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
/// Default embedding dimension.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;

/// Pipeline configuration.
///
/// One instance is shared (by clone) between the ingestion pipeline and the
/// retrieval router; neither mutates it after construction.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct Config {
    // Parser
    /// Prose chunk budget in bytes.
    pub chunk_size: usize,
    /// Bytes of the previous prose chunk seeded into the next one.
    pub chunk_overlap: usize,

    // Ingestion
    /// Chunks per embedding batch call (clamped to 50–100).
    pub embedding_batch_size: usize,
    /// Expected embedding vector dimension.
    pub embedding_dimension: usize,
    /// Command invoked to extract markdown from a PDF.
    pub pdf_extractor_cmd: String,
    /// Confidence above which a disagreeing re-ingested spec value is a conflict.
    pub conflict_confidence_threshold: f64,

    // Retrieval
    /// Vector search top-k.
    pub max_chunks: usize,
    /// Run the keyword-based structured lookup before any semantic search.
    pub structured_first: bool,
    /// Fall back to semantic search when structured lookup is inconclusive.
    pub semantic_fallback: bool,
    /// Structured facts below this confidence trigger the semantic fallback.
    pub keyword_confidence_threshold: f64,
    /// Availability detector fact-confidence threshold.
    pub min_availability_confidence: f64,
    /// Availability detector similarity threshold.
    pub min_similarity_threshold: f64,
    /// Confidence aggregation weight for structured facts.
    pub structured_weight: f64,
    /// Confidence aggregation weight for semantic chunks.
    pub semantic_weight: f64,
    /// Confidence aggregation weight for the keyword signal.
    pub keyword_weight: f64,

    // Batch processing
    /// Worker threads for structured multi-spec requests.
    pub batch_workers: usize,
    /// Deadline applied across one batch request.
    pub batch_timeout: Duration,

    // Cache
    /// Whether query responses are cached.
    pub cache_results: bool,
    /// TTL applied to cached query responses.
    pub cache_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            embedding_batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            pdf_extractor_cmd: "brochure-extract".to_string(),
            conflict_confidence_threshold: 0.5,
            max_chunks: DEFAULT_MAX_CHUNKS,
            structured_first: true,
            semantic_fallback: true,
            keyword_confidence_threshold: 0.8,
            min_availability_confidence: 0.6,
            min_similarity_threshold: 0.5,
            structured_weight: 0.5,
            semantic_weight: 0.3,
            keyword_weight: 0.2,
            batch_workers: DEFAULT_BATCH_WORKERS,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            cache_results: true,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut config = Self {
            chunk_size: env_usize(CHUNK_SIZE_ENV, defaults.chunk_size),
            chunk_overlap: env_usize(CHUNK_OVERLAP_ENV, defaults.chunk_overlap),
            embedding_batch_size: env_usize(
                EMBEDDING_BATCH_SIZE_ENV,
                defaults.embedding_batch_size,
            ),
            embedding_dimension: env_usize(EMBEDDING_DIMENSION_ENV, defaults.embedding_dimension),
            pdf_extractor_cmd: env::var(PDF_EXTRACTOR_ENV)
                .unwrap_or_else(|_| defaults.pdf_extractor_cmd.clone()),
            max_chunks: env_usize(MAX_CHUNKS_ENV, defaults.max_chunks),
            structured_first: env_bool(STRUCTURED_FIRST_ENV, defaults.structured_first),
            semantic_fallback: env_bool(SEMANTIC_FALLBACK_ENV, defaults.semantic_fallback),
            keyword_confidence_threshold: env_f64(
                KEYWORD_CONFIDENCE_ENV,
                defaults.keyword_confidence_threshold,
            ),
            min_availability_confidence: env_f64(
                MIN_AVAILABILITY_CONFIDENCE_ENV,
                defaults.min_availability_confidence,
            ),
            min_similarity_threshold: env_f64(
                MIN_SIMILARITY_ENV,
                defaults.min_similarity_threshold,
            ),
            batch_workers: env_usize(BATCH_WORKERS_ENV, defaults.batch_workers),
            batch_timeout: Duration::from_secs(env_u64(
                BATCH_TIMEOUT_ENV,
                defaults.batch_timeout.as_secs(),
            )),
            cache_ttl: Duration::from_secs(env_u64(
                CACHE_TTL_ENV,
                defaults.cache_ttl.as_secs(),
            )),
            cache_results: env_bool(CACHE_RESULTS_ENV, defaults.cache_results),
            ..defaults
        };
        config.clamp();
        config
    }

    /// Clamp all knobs to their supported ranges.
    pub fn clamp(&mut self) {
        let (lo, hi) = EMBEDDING_BATCH_SIZE_RANGE;
        self.embedding_batch_size = self.embedding_batch_size.clamp(lo, hi);
        self.batch_workers = self.batch_workers.max(1);
        self.max_chunks = self.max_chunks.max(1);
        self.chunk_size = self.chunk_size.max(64);
        if self.chunk_overlap >= self.chunk_size {
            self.chunk_overlap = self.chunk_size / 2;
        }
        self.keyword_confidence_threshold = self.keyword_confidence_threshold.clamp(0.0, 1.0);
        self.min_availability_confidence = self.min_availability_confidence.clamp(0.0, 1.0);
        self.min_similarity_threshold = self.min_similarity_threshold.clamp(0.0, 1.0);
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).map_or(default, |v| {
        matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = Config::default();
        assert_eq!(config.chunk_size, 512);
        assert_eq!(config.chunk_overlap, 64);
        assert_eq!(config.embedding_batch_size, 75);
        assert_eq!(config.batch_workers, 5);
        assert_eq!(config.batch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn batch_size_clamped_to_supported_range() {
        let mut config = Config {
            embedding_batch_size: 7,
            ..Config::default()
        };
        config.clamp();
        assert_eq!(config.embedding_batch_size, 50);

        config.embedding_batch_size = 5000;
        config.clamp();
        assert_eq!(config.embedding_batch_size, 100);
    }

    #[test]
    fn overlap_never_reaches_chunk_size() {
        let mut config = Config {
            chunk_size: 128,
            chunk_overlap: 500,
            ..Config::default()
        };
        config.clamp();
        assert!(config.chunk_overlap < config.chunk_size);
    }
}
