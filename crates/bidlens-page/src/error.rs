//! Error types for page-context access.

use thiserror::Error;

/// Errors raised by a [`PageContext`](crate::PageContext) or while loading
/// page fixtures.
#[derive(Error, Debug)]
pub enum PageError {
    /// The host could not run code in the page
    #[error("script injection failed: {0}")]
    ScriptInjection(String),

    /// An auction library accessor threw or returned garbage
    #[error("{accessor}: {message}")]
    AccessorFailed {
        /// Accessor name, e.g. `getBidResponses`
        accessor: String,
        /// Failure reported by the page
        message: String,
    },

    /// The page refused access to a storage area or key
    #[error("storage access denied: {0}")]
    StorageDenied(String),

    /// The resource counter was given nothing to search for
    #[error("search phrase must not be empty")]
    EmptyPhrase,

    /// A fixture file could not be parsed
    #[error("invalid page fixture: {0}")]
    Fixture(#[from] serde_json::Error),

    /// A fixture file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for page-context operations.
pub type Result<T> = std::result::Result<T, PageError>;

impl From<PageError> for bidlens_core::BidlensError {
    fn from(err: PageError) -> Self {
        Self::Page(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessor_failure_display() {
        let err = PageError::AccessorFailed {
            accessor: "getBidResponses".to_string(),
            message: "pbjs.getBidResponses is not a function".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "getBidResponses: pbjs.getBidResponses is not a function"
        );
    }

    #[test]
    fn test_converts_to_core_error() {
        let err: bidlens_core::BidlensError = PageError::EmptyPhrase.into();
        assert!(err.to_string().contains("search phrase"));
    }
}
