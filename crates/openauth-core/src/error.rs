//! Common error types for the OpenAuth gateway.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while parsing shared types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The configuration document was empty.
    #[error("configuration document is empty")]
    EmptyDocument,

    /// The configuration document could not be parsed.
    #[error("malformed configuration document: {0}")]
    Parse(String),

    /// A username did not have the service-account shape.
    #[error("invalid principal: {0}")]
    InvalidPrincipal(String),
}
