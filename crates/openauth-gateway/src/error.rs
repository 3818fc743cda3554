//! API error types and responses.
//!
//! This module defines the standard error format for all API responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use openauth_auth::AuthError;
use openauth_engine::{ControlError, DispatchError, HandlerError, RejectReason};

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The caller was not admitted. Deliberately carries no detail.
    #[error("unauthorized")]
    Unauthorized,

    /// A filter refused the request.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// No route matches.
    #[error("not found: {0}")]
    NotFound(String),

    /// Too many requests, rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// Invalid request body or parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::RateLimited => "rate_limited",
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Config(msg) => {
                tracing::error!(error = %msg, "Identity gate misconfigured");
                Self::Internal("authentication service error".to_string())
            }
            // The gate already logged the cause.
            _ => Self::Unauthorized,
        }
    }
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::Auth(auth_err) => Self::from(auth_err),
            ControlError::Config(config_err) => Self::BadRequest(config_err.to_string()),
            ControlError::InvalidAllowList(msg) => Self::BadRequest(msg),
            ControlError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                Self::Internal(msg)
            }
        }
    }
}

impl From<HandlerError> for ApiError {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::BadRequest(msg) => Self::BadRequest(msg),
            HandlerError::Unauthorized(_) => Self::Unauthorized,
            HandlerError::Internal(msg) => {
                tracing::error!(error = %msg, "Handler error");
                Self::Internal(msg)
            }
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NotFound { method, path } => Self::NotFound(format!("{method} {path}")),
            DispatchError::Rejected(rejection) => match rejection.reason {
                RejectReason::RateLimited => Self::RateLimited,
                _ => Self::Forbidden(format!("rejected by filter `{}`", rejection.filter)),
            },
            DispatchError::Control(e) => Self::from(e),
            DispatchError::Handler(e) => Self::from(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openauth_engine::{ConfigError, FilterRejection};

    #[test]
    fn error_status_codes() {
        assert_eq!(
            ApiError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("f".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("test".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::RateLimited.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::Internal("test".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_codes() {
        assert_eq!(ApiError::Unauthorized.code(), "unauthorized");
        assert_eq!(ApiError::Forbidden("f".into()).code(), "forbidden");
        assert_eq!(ApiError::NotFound("test".into()).code(), "not_found");
        assert_eq!(ApiError::RateLimited.code(), "rate_limited");
    }

    #[test]
    fn auth_failures_are_indistinguishable() {
        let errors = [
            AuthError::MissingBearer,
            AuthError::NotAuthenticated,
            AuthError::MalformedPrincipal("x".into()),
            AuthError::NotAllowed("system:serviceaccount:a:b".into()),
            AuthError::AuthorityUnavailable("down".into()),
        ];
        for err in errors {
            let api = ApiError::from(ControlError::Auth(err));
            assert!(matches!(api, ApiError::Unauthorized));
            assert_eq!(api.to_string(), "unauthorized");
        }
    }

    #[test]
    fn dispatch_errors_map_to_statuses() {
        let rejected = |reason| {
            ApiError::from(DispatchError::Rejected(FilterRejection {
                filter: "limit".to_string(),
                kind: "rate_limit",
                reason,
            }))
        };
        assert!(matches!(rejected(RejectReason::RateLimited), ApiError::RateLimited));
        assert!(matches!(rejected(RejectReason::Denied), ApiError::Forbidden(_)));

        let config = DispatchError::Control(ControlError::Config(ConfigError::ReservedPath {
            route: 0,
            path: "/health".to_string(),
        }));
        assert_eq!(ApiError::from(config).status_code(), StatusCode::BAD_REQUEST);

        let missing = DispatchError::NotFound {
            method: "GET".to_string(),
            path: "/nope".to_string(),
        };
        assert_eq!(ApiError::from(missing).status_code(), StatusCode::NOT_FOUND);
    }
}
