//! HTTP identity authority client.
//!
//! For deployments where the cluster API server is not reachable directly,
//! credentials can be reviewed by an HTTP service exposing
//! `POST /v1/authenticate` with body `{"token": "..."}` and answering
//! `{"authenticated": bool, "principal": "system:serviceaccount:<ns>:<name>"}`.
//! A `username` field is accepted in place of `principal`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::error::{AuthError, Result};
use crate::identity::{IdentityAuthority, IdentityReview};

/// Request payload sent to the authority.
#[derive(Debug, Serialize)]
struct AuthenticateRequest<'a> {
    token: &'a str,
}

/// Identity authority reached over HTTP.
pub struct HttpIdentityAuthority {
    base_url: String,
    client: reqwest::Client,
}

impl HttpIdentityAuthority {
    /// Create a client for the authority at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if the URL does not parse or the HTTP
    /// client cannot be created.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|e| AuthError::Config(format!("invalid identity URL `{base_url}`: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { base_url, client })
    }

    /// Get the authenticate endpoint URL.
    #[must_use]
    pub fn authenticate_url(&self) -> String {
        format!("{}/v1/authenticate", self.base_url)
    }
}

#[async_trait]
impl IdentityAuthority for HttpIdentityAuthority {
    async fn review(&self, token: &str) -> Result<IdentityReview> {
        let response = self
            .client
            .post(self.authenticate_url())
            .json(&AuthenticateRequest { token })
            .send()
            .await
            .map_err(|e| AuthError::AuthorityUnavailable(format!("request failed: {e}")))?;

        let status = response.status();
        debug!(status = %status, "Identity authority responded");

        match status.as_u16() {
            200 => response
                .json::<IdentityReview>()
                .await
                .map_err(|e| AuthError::AuthorityUnavailable(format!("invalid response: {e}"))),
            401 | 403 => Ok(IdentityReview::default()),
            _ => Err(AuthError::AuthorityUnavailable(format!("HTTP {status}"))),
        }
    }
}
