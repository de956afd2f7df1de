//! Error types for the DWH agent core.
//!
//! Component operations distinguish "nothing matched" (an Ok value with empty
//! content) from genuine failures. Only the latter surface here; the service
//! layer converts every variant into a structured `success = false` envelope
//! before it can cross the HTTP boundary.

use thiserror::Error;

/// Main error type for the DWH agent core
#[derive(Error, Debug)]
pub enum DwhError {
    #[error("store query failed: {0}")]
    Store(#[from] sqlx::Error),

    #[error("table identifier '{table}' rejected: {reason}")]
    InvalidIdentifier { table: String, reason: String },

    #[error("lot resolution failed for table '{table}': {message}")]
    ResolutionFailed { table: String, message: String },

    #[error("fetch for table '{table}' timed out after {timeout_ms}ms")]
    QueryTimeout { table: String, timeout_ms: u64 },
}

impl DwhError {
    pub fn invalid_identifier(table: impl Into<String>, reason: impl Into<String>) -> Self {
        DwhError::InvalidIdentifier {
            table: table.into(),
            reason: reason.into(),
        }
    }

    pub fn resolution_failed(table: impl Into<String>, message: impl Into<String>) -> Self {
        DwhError::ResolutionFailed {
            table: table.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for convenience
pub type DwhResult<T> = Result<T, DwhError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DwhError::invalid_identifier("pac; drop", "not a valid identifier");
        assert_eq!(
            err.to_string(),
            "table identifier 'pac; drop' rejected: not a valid identifier"
        );

        let err = DwhError::QueryTimeout {
            table: "pac_1000".into(),
            timeout_ms: 30_000,
        };
        assert!(err.to_string().contains("30000ms"));
    }
}
