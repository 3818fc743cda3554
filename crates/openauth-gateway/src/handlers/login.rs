//! Login terminal handler: mints a trust token.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::Map;

use openauth_auth::{TokenError, TokenIssuer};
use openauth_engine::{FilterContext, HandlerError, HandlerResponse, RequestView, TerminalHandler};

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Signed token.
    pub token: String,
    /// Expiry in RFC 3339.
    pub expires_at: Option<String>,
}

/// Mints a token from the request body overlaid with the data collected by
/// the filter chain. Collected values win over body values.
#[derive(Debug, Clone)]
pub struct LoginHandler {
    issuer: Arc<TokenIssuer>,
}

impl LoginHandler {
    /// Create a handler minting with `issuer`.
    #[must_use]
    pub const fn new(issuer: Arc<TokenIssuer>) -> Self {
        Self { issuer }
    }
}

#[async_trait]
impl TerminalHandler for LoginHandler {
    async fn handle(
        &self,
        req: &RequestView,
        ctx: &FilterContext,
    ) -> Result<HandlerResponse, HandlerError> {
        let mut input = if req.body.is_empty() {
            Map::new()
        } else {
            req.json_object().ok_or_else(|| {
                HandlerError::BadRequest("request body must be a JSON object".to_string())
            })?
        };
        input.extend(ctx.collected.clone());

        let issued = self.issuer.generate(&input).map_err(|e| match e {
            TokenError::MissingField(_) | TokenError::InvalidField(_) => {
                HandlerError::BadRequest(e.to_string())
            }
            other => HandlerError::Internal(other.to_string()),
        })?;

        let response = LoginResponse {
            expires_at: issued
                .claims
                .expires_at()
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            token: issued.token,
        };
        let body = serde_json::to_value(response)
            .map_err(|e| HandlerError::Internal(format!("failed to encode response: {e}")))?;
        Ok(HandlerResponse::ok(body))
    }
}
