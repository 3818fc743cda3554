//! Identity gate and token issuer for the OpenAuth gateway.
//!
//! This crate provides the two trust boundaries of the gateway:
//!
//! - The **identity gate** authenticates callers of the control endpoints
//!   against a cluster identity authority and an allow-list
//! - The **token issuer** mints and validates HMAC-signed trust tokens for
//!   downstream consumers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │ Config           │────▶│  IdentityGate    │──── AllowList (RwLock)
//! │ Controller       │     └────────┬─────────┘
//! └──────────────────┘              │
//!                          ┌────────▼─────────┐
//!                          │IdentityAuthority │
//!                          │  (trait)         │
//!                          └────────┬─────────┘
//!                 ┌─────────────────┼──────────────────┐
//!        ┌────────▼─────────┐ ┌─────▼──────────┐ ┌─────▼──────────┐
//!        │ TokenReview      │ │ HttpIdentity   │ │ StaticIdentity │
//!        │ (Kubernetes API) │ │ (POST /v1/...) │ │ (test-utils)   │
//!        └──────────────────┘ └────────────────┘ └────────────────┘
//!
//! ┌──────────────────┐     ┌──────────────────┐
//! │ login / verify   │────▶│  TokenIssuer     │ HS256/384/512
//! │ handlers         │     └──────────────────┘
//! └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use openauth_auth::{TokenIssuer, TokenIssuerConfig};
//!
//! let issuer = TokenIssuer::new(TokenIssuerConfig::with_secret("secret")).unwrap();
//! let input = serde_json::json!({"username": "alice"});
//! let issued = issuer.generate(input.as_object().unwrap()).unwrap();
//!
//! let claims = issuer.validate(&issued.token).unwrap();
//! assert_eq!(claims.sub, "alice");
//! assert_eq!(claims.iss, "OpenAuth");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod error;
pub mod identity;
pub mod token;
pub mod token_review;

pub use client::HttpIdentityAuthority;
pub use error::{AuthError, Result, TokenError};
pub use identity::{bearer_token, AllowList, IdentityAuthority, IdentityGate, IdentityReview};
pub use token::{IssuedClaims, IssuedToken, TokenIssuer, TokenIssuerConfig, ISSUER};
pub use token_review::TokenReviewAuthority;

#[cfg(any(test, feature = "test-utils"))]
pub use identity::StaticIdentityAuthority;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_status_codes() {
        assert_eq!(AuthError::MissingBearer.http_status_code(), 401);
        assert_eq!(AuthError::NotAuthenticated.http_status_code(), 401);
        assert_eq!(AuthError::NotAllowed("x".into()).http_status_code(), 401);
        assert_eq!(
            AuthError::AuthorityUnavailable("down".into()).http_status_code(),
            401
        );
        assert_eq!(AuthError::Config("bad".into()).http_status_code(), 500);
    }

    #[test]
    fn token_error_status_codes() {
        assert_eq!(TokenError::MissingField("role".into()).http_status_code(), 400);
        assert_eq!(TokenError::TokenExpired.http_status_code(), 401);
        assert_eq!(TokenError::InvalidSignature.http_status_code(), 401);
        assert_eq!(
            TokenError::AlgorithmMismatch {
                expected: "HS256".into(),
                found: "HS384".into()
            }
            .http_status_code(),
            401
        );
        assert_eq!(TokenError::Internal("x".into()).http_status_code(), 500);
    }
}
