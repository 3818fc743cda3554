//! Authentication and token error types.

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors raised by the identity gate.
///
/// The variants exist so logs can tell causes apart. Callers outside the
/// gate only ever see a uniform 401.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization: Bearer <token>` header was presented.
    #[error("missing bearer token")]
    MissingBearer,

    /// The identity authority reported the token as not authenticated.
    #[error("token not authenticated")]
    NotAuthenticated,

    /// The authority returned a username that is not a service account.
    #[error("malformed principal: {0}")]
    MalformedPrincipal(String),

    /// The principal is authenticated but absent from the allow-list.
    #[error("principal not allowed: {0}")]
    NotAllowed(String),

    /// The identity authority could not be reached or answered garbage.
    #[error("identity authority unavailable: {0}")]
    AuthorityUnavailable(String),

    /// The gate or an authority was misconfigured.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::MissingBearer
            | Self::NotAuthenticated
            | Self::MalformedPrincipal(_)
            | Self::NotAllowed(_)
            | Self::AuthorityUnavailable(_) => 401,
            Self::Config(_) => 500,
        }
    }
}

/// Errors raised while minting or validating trust tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// A required input field was absent when minting.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// An input field had the wrong shape when minting.
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// A validated token lacks a claim the issuer requires.
    #[error("missing required claim: {0}")]
    MissingClaim(String),

    /// The token header names a different algorithm than the issuer uses.
    #[error("algorithm mismatch: expected {expected}, found {found}")]
    AlgorithmMismatch {
        /// Configured algorithm.
        expected: String,
        /// Algorithm in the token header.
        found: String,
    },

    /// The token is past its expiry.
    #[error("token expired")]
    TokenExpired,

    /// The signature does not verify.
    #[error("invalid signature")]
    InvalidSignature,

    /// The token could not be decoded.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The configured algorithm is not an HMAC algorithm.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The issuer configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Signing failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TokenError {
    /// Returns the appropriate HTTP status code for this error.
    ///
    /// Input problems at mint time are the caller's fault (400); anything
    /// wrong with a presented token is a 401.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::MissingField(_) | Self::InvalidField(_) => 400,
            Self::MissingClaim(_)
            | Self::AlgorithmMismatch { .. }
            | Self::TokenExpired
            | Self::InvalidSignature
            | Self::InvalidToken(_) => 401,
            Self::UnsupportedAlgorithm(_) | Self::Config(_) | Self::Internal(_) => 500,
        }
    }
}
