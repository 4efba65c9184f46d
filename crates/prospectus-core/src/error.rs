//! Error types for the prospectus knowledge pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the knowledge pipeline
#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ==========================================================================
    // Validation Errors
    // ==========================================================================
    #[error("Invalid argument: {0}")]
    Validation(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    // ==========================================================================
    // Resource Not Found Errors
    // ==========================================================================
    #[error("Spec not found: {0}")]
    SpecNotFound(String),

    #[error("Chunk not found: {0}")]
    ChunkNotFound(String),

    #[error("Campaign not found: {0}")]
    CampaignNotFound(String),

    // ==========================================================================
    // Conflict Errors
    // ==========================================================================
    #[error("Spec value conflict: {0}")]
    SpecConflict(String),

    #[error("Content hash collision: {0}")]
    HashCollision(String),

    // ==========================================================================
    // External Collaborator Errors
    // ==========================================================================
    #[error("PDF extraction failed: {0}")]
    Extraction(String),

    #[error("Embedding provider error: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    VectorIndex(String),

    #[error("Spec store error: {0}")]
    Store(String),

    #[error("Cache error: {0}")]
    Cache(String),

    // ==========================================================================
    // Timeout/Cancellation
    // ==========================================================================
    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Operation cancelled")]
    Cancelled,

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ==========================================================================
    // Internal Errors
    // ==========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error type string (for JSON responses)
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Validation(_) | Self::MissingField(_) => "VALIDATION",
            Self::SpecNotFound(_) | Self::ChunkNotFound(_) | Self::CampaignNotFound(_) => {
                "NOT_FOUND"
            }
            Self::SpecConflict(_) | Self::HashCollision(_) => "CONFLICT",
            Self::Extraction(_) => "EXTRACTION",
            Self::Embedding(_) => "EMBEDDING",
            Self::VectorIndex(_) => "VECTOR_INDEX",
            Self::Store(_) => "STORE",
            Self::Cache(_) => "CACHE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Cancelled => "CANCELLED",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether the error is transient and can be retried
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Embedding(_) | Self::Cache(_) | Self::Timeout(_) | Self::Io(_)
        )
    }
}
