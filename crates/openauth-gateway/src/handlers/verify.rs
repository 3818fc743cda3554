//! Verify terminal handler: validates a trust token.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use openauth_auth::{bearer_token, TokenIssuer};
use openauth_engine::{FilterContext, HandlerError, HandlerResponse, RequestView, TerminalHandler};

/// Validates a token taken from the body's `token` field, or from the
/// `Authorization` header when the body has none.
#[derive(Debug, Clone)]
pub struct VerifyHandler {
    issuer: Arc<TokenIssuer>,
}

impl VerifyHandler {
    /// Create a handler validating with `issuer`.
    #[must_use]
    pub const fn new(issuer: Arc<TokenIssuer>) -> Self {
        Self { issuer }
    }
}

fn presented_token(req: &RequestView) -> Option<String> {
    let from_body = req
        .json_object()
        .and_then(|body| match body.get("token") {
            Some(Value::String(token)) if !token.is_empty() => Some(token.clone()),
            _ => None,
        });
    from_body.or_else(|| {
        bearer_token(req.header("authorization"))
            .ok()
            .map(str::to_string)
    })
}

#[async_trait]
impl TerminalHandler for VerifyHandler {
    async fn handle(
        &self,
        req: &RequestView,
        _ctx: &FilterContext,
    ) -> Result<HandlerResponse, HandlerError> {
        let token = presented_token(req)
            .ok_or_else(|| HandlerError::BadRequest("no token presented".to_string()))?;

        let claims = self.issuer.validate(&token).map_err(|e| {
            if e.http_status_code() == 401 {
                tracing::debug!(error = %e, "Token rejected");
                HandlerError::Unauthorized(e.to_string())
            } else {
                HandlerError::Internal(e.to_string())
            }
        })?;

        Ok(HandlerResponse::ok(json!({
            "message": "Token is valid",
            "claims": claims,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, Method};
    use openauth_auth::TokenIssuerConfig;
    use serde_json::Map;

    fn issuer() -> Arc<TokenIssuer> {
        Arc::new(TokenIssuer::new(TokenIssuerConfig::with_secret("test-secret")).unwrap())
    }

    fn mint(issuer: &TokenIssuer) -> String {
        let mut input = Map::new();
        input.insert("username".to_string(), json!("testuser"));
        issuer.generate(&input).unwrap().token
    }

    #[tokio::test]
    async fn accepts_token_in_body() {
        let issuer = issuer();
        let token = mint(&issuer);
        let req = RequestView::new(Method::POST, "/verify")
            .with_body(json!({ "token": token }).to_string());

        let response = VerifyHandler::new(issuer)
            .handle(&req, &FilterContext::default())
            .await
            .unwrap();
        assert_eq!(response.body["message"], "Token is valid");
        assert_eq!(response.body["claims"]["sub"], "testuser");
    }

    #[tokio::test]
    async fn accepts_bearer_header() {
        let issuer = issuer();
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {}", mint(&issuer))).unwrap(),
        );
        let req = RequestView::new(Method::GET, "/verify").with_headers(headers);

        assert!(VerifyHandler::new(issuer)
            .handle(&req, &FilterContext::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn rejects_foreign_token() {
        let other = TokenIssuer::new(TokenIssuerConfig::with_secret("other-secret")).unwrap();
        let req = RequestView::new(Method::POST, "/verify")
            .with_body(json!({ "token": mint(&other) }).to_string());

        let err = VerifyHandler::new(issuer())
            .handle(&req, &FilterContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn missing_token_is_bad_request() {
        let err = VerifyHandler::new(issuer())
            .handle(&RequestView::new(Method::POST, "/verify"), &FilterContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::BadRequest(_)));
    }
}
