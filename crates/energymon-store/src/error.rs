//! Error types for store operations.

use thiserror::Error;

/// Errors from statistics store operations.
///
/// Reads never fail for missing data; these cover contract violations
/// only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A port batch contained the `ANY` request wildcard, which must never
    /// be stored as a key.
    #[error("wildcard port number cannot be stored")]
    WildcardPort,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
