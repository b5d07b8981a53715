//! Error taxonomy for the delinquency risk pipeline.

use thiserror::Error;

/// Errors surfaced by the decision pipeline and its capabilities.
///
/// All variants propagate unchanged to the request boundary; the transport
/// layer maps `kind()` onto its own status vocabulary.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or missing request fields. Raised at the boundary,
    /// never inside the pipeline.
    #[error("validation error: {0}")]
    Validation(String),

    /// Well-typed but structurally invalid input (e.g. non-positive
    /// income). Client-side failure, not retryable.
    #[error("domain error: {0}")]
    Domain(String),

    /// Scorer or explainer artifact not loaded/ready. Retryable by the
    /// caller after backoff; never retried internally.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Scoring succeeded but no explanation can be produced. Fails the
    /// whole response; a decision without its explanation is invalid.
    #[error("attribution unavailable: {0}")]
    AttributionUnavailable(String),

    /// Invariant violation (probability out of range, incomplete tier
    /// mapping, broken attribution conservation). Always a bug.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Stable error kind string for wire-level error events.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation_error",
            PipelineError::Domain(_) => "domain_error",
            PipelineError::ServiceUnavailable(_) => "service_unavailable",
            PipelineError::AttributionUnavailable(_) => "attribution_unavailable",
            PipelineError::Internal(_) => "internal_error",
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
