//! Error types for enrichment steps.
//!
//! Extraction errors never abort an enrichment pass; they are recorded as
//! diagnostics against the request that caused them.

use thiserror::Error;

/// Errors raised by a single extraction step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The request body is not valid JSON
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),

    /// The request body could not be decoded at capture time
    #[error("request body unavailable: {0}")]
    BodyUnavailable(String),

    /// A percent-encoded value decoded to invalid UTF-8
    #[error("could not decode {field}: {reason}")]
    Decode {
        /// Parameter being decoded
        field: String,
        /// Decoder failure
        reason: String,
    },
}

/// Result type for extraction steps.
pub type Result<T> = std::result::Result<T, ExtractError>;
