//! Domain error type shared by the StockCare domain crates.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Rule violations raised by domain types.
///
/// Each layer above maps these into its own error enum; storage failures never
/// appear here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. blank name, non-positive quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated (e.g. illegal status transition).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Identifier text that does not parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Command addressed an aggregate that was never created.
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. stale version, record still referenced).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
