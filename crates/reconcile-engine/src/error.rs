//! Error types for reconciliation operations.

use thiserror::Error;

/// Error type for reconciliation operations.
///
/// Component entry points catch this internally and degrade; it only
/// crosses a public boundary on the per-component contracts that
/// report failure counts.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The underlying link store failed.
    #[error("store error: {0}")]
    Store(#[from] link_store::StoreError),
}

/// Convenience Result type alias for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;
