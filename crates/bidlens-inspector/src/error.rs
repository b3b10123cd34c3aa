//! Error types for the inspector.

use bidlens_capture::CaptureError;
use bidlens_page::PageError;
use thiserror::Error;

/// Errors raised around the inspection pipeline.
///
/// A run itself never fails; these cover wiring it up and the cookie source.
#[derive(Error, Debug)]
pub enum InspectorError {
    /// The cookie source could not answer
    #[error("cookie lookup failed: {0}")]
    Cookies(String),

    /// Page fixture or page access failed
    #[error(transparent)]
    Page(#[from] PageError),

    /// Capture store could not be configured
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Malformed session, cookie or report JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for inspector operations.
pub type Result<T> = std::result::Result<T, InspectorError>;

impl From<InspectorError> for bidlens_core::BidlensError {
    fn from(err: InspectorError) -> Self {
        match err {
            InspectorError::Page(e) => e.into(),
            InspectorError::Capture(e) => e.into(),
            InspectorError::Io(e) => Self::Io(e),
            other => Self::Internal(other.to_string()),
        }
    }
}
