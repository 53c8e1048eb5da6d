//! Shared error type and observability helpers for the ebb workspace.
//!
//! Every other crate depends on this one, so it stays intentionally small:
//! the [`EbbError`] enum, the [`Result`] alias, and the [`observability`]
//! module that wires up `tracing` for the binary and for integration tests.

pub mod observability;

/// Error types used across the ebb workspace.
#[derive(thiserror::Error, Debug)]
pub enum EbbError {
    /// The remote service rejected a request or could not be reached.
    #[error("API error: {0}")]
    Api(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pagination stopped making progress and was aborted.
    #[error("Pagination error: {0}")]
    Pagination(String),
}

/// Convenient alias for results that use [`EbbError`].
pub type Result<T> = std::result::Result<T, EbbError>;
