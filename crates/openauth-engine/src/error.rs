//! Error types for the pipeline engine.
//!
//! Three layers: compiling a document (`ConfigError`), the control operations
//! around it (`ControlError`), and serving a request against the live table
//! (`DispatchError`). Filter and handler outcomes have their own types since
//! they are produced by the chain, not by the engine.

use openauth_auth::AuthError;
use openauth_core::CoreError;
use thiserror::Error;

/// A result type using `ControlError`.
pub type Result<T> = std::result::Result<T, ControlError>;

/// A document failed to compile. The live table is unchanged.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document did not parse.
    #[error(transparent)]
    Document(#[from] CoreError),

    /// A route names a method that is not a standard HTTP method.
    #[error("route {route}: invalid HTTP method `{method}`")]
    InvalidMethod {
        /// Index of the route in the document.
        route: usize,
        /// Method as written.
        method: String,
    },

    /// A route path pattern is malformed.
    #[error("route {route}: invalid path `{path}`: {reason}")]
    InvalidPath {
        /// Index of the route in the document.
        route: usize,
        /// Path as written.
        path: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A route claims a path owned by the gateway.
    #[error("route {route}: path `{path}` is reserved")]
    ReservedPath {
        /// Index of the route in the document.
        route: usize,
        /// Path as written.
        path: String,
    },

    /// Two routes share a method and normalized path.
    #[error("duplicate route {method} {path}")]
    DuplicateRoute {
        /// HTTP method.
        method: String,
        /// Normalized path.
        path: String,
    },

    /// A route names a handler that is not registered.
    #[error("route {route}: unknown handler `{handler}`")]
    UnknownHandler {
        /// Index of the route in the document.
        route: usize,
        /// Handler identifier as written.
        handler: String,
    },

    /// A filter configuration is malformed.
    #[error("route {route}, filter {index}: {reason}")]
    InvalidFilter {
        /// Index of the route in the document.
        route: usize,
        /// Index of the filter within the route.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        400
    }
}

/// Errors from control operations (publishing, allow-list replacement).
#[derive(Debug, Error)]
pub enum ControlError {
    /// The submitted document was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The caller was not admitted by the identity gate.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// The submitted allow-list was rejected.
    #[error("invalid allow-list: {0}")]
    InvalidAllowList(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ControlError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Config(_) | Self::InvalidAllowList(_) => 400,
            Self::Auth(_) => 401,
            Self::Internal(_) => 500,
        }
    }
}

/// Failure of the single outbound call a request filter makes.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The call did not complete.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call exceeded the filter timeout.
    #[error("timed out")]
    Timeout,

    /// The service answered with a status other than 200.
    #[error("unexpected status {0}")]
    Status(u16),

    /// The service answered 200 without an `{"allow": bool}` object.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Why a filter refused a request.
#[derive(Debug, Error)]
pub enum RejectReason {
    /// A condition did not hold.
    #[error("condition {index} failed: {condition}")]
    ConditionFailed {
        /// Index of the failing condition.
        index: usize,
        /// Human-readable form of the condition.
        condition: String,
    },

    /// The remote validation service answered `allow: false`.
    #[error("denied by remote validation")]
    Denied,

    /// The remote validation call failed. Treated as a denial.
    #[error("remote validation failed: {0}")]
    Upstream(#[from] UpstreamError),

    /// The request body is not a JSON object.
    #[error("request body is not a JSON object")]
    MalformedBody,

    /// The caller's bucket is empty.
    #[error("rate limit exceeded")]
    RateLimited,
}

/// A filter chain stopped the request.
#[derive(Debug, Error)]
#[error("rejected by {kind} filter `{filter}`: {reason}")]
pub struct FilterRejection {
    /// Name of the rejecting filter.
    pub filter: String,
    /// Kind of the rejecting filter.
    pub kind: &'static str,
    /// Why it rejected.
    pub reason: RejectReason,
}

impl FilterRejection {
    /// Returns the appropriate HTTP status code for this rejection.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self.reason {
            RejectReason::RateLimited => 429,
            _ => 403,
        }
    }
}

/// Errors returned by terminal handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The request is missing something the handler needs.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The presented credential is not valid.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Internal(_) => 500,
        }
    }
}

/// Errors from serving a request against the live table.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No route matches the method and path.
    #[error("no route for {method} {path}")]
    NotFound {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
    },

    /// A filter rejected the request.
    #[error(transparent)]
    Rejected(#[from] FilterRejection),

    /// A control route failed.
    #[error(transparent)]
    Control(#[from] ControlError),

    /// The terminal handler failed.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl DispatchError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Rejected(r) => r.http_status_code(),
            Self::Control(e) => e.http_status_code(),
            Self::Handler(e) => e.http_status_code(),
        }
    }
}
