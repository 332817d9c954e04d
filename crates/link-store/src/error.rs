//! Error types for link store operations.

use thiserror::Error;

/// Error type for all link store operations.
///
/// Supports automatic conversion from reqwest and serde_json errors
/// via `#[from]`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network or transport-level HTTP error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store returned a non-success HTTP status.
    ///
    /// Contains the status code and response body for debugging.
    /// Common causes: authentication failure, RLS policy violation,
    /// schema mismatch.
    #[error("store error: {status} - {message}")]
    Api {
        /// The HTTP status code returned by the store.
        status: u16,
        /// The response body, typically containing error details.
        message: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration or initialization error.
    ///
    /// Used for invalid API URLs, missing credentials, or calls made
    /// before an auth context has been set.
    #[error("configuration error: {0}")]
    Config(String),

    /// A realtime filter expression could not be parsed.
    #[error("invalid filter expression: {0}")]
    Filter(String),
}

/// Convenience Result type alias for link store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = StoreError::Api {
            status: 401,
            message: "JWT expired".to_string(),
        };
        assert_eq!(format!("{}", err), "store error: 401 - JWT expired");
    }

    #[test]
    fn config_error_display() {
        let err = StoreError::Config("missing auth context".to_string());
        assert_eq!(
            format!("{}", err),
            "configuration error: missing auth context"
        );
    }

    #[test]
    fn json_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("not json {{{").unwrap_err();
        let err: StoreError = serde_err.into();
        assert!(format!("{}", err).starts_with("JSON error:"));
    }
}
