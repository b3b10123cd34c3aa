//! Error types for the capture subsystem.
//!
//! Store operations never fail; only allowlist compilation can.

use thiserror::Error;

/// Errors that can occur while configuring capture.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// A URL match pattern is malformed
    #[error("invalid URL pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Why it was rejected
        reason: String,
    },

    /// The compiled pattern was rejected by the regex engine
    #[error("pattern compilation failed: {0}")]
    Regex(#[from] regex::Error),
}

/// Result type for capture operations.
pub type Result<T> = std::result::Result<T, CaptureError>;

impl From<CaptureError> for bidlens_core::BidlensError {
    fn from(err: CaptureError) -> Self {
        Self::Capture(err.to_string())
    }
}
