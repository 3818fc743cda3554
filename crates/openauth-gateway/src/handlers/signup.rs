//! Signup terminal handler.

use async_trait::async_trait;
use serde_json::{json, Value};

use openauth_engine::{FilterContext, HandlerError, HandlerResponse, RequestView, TerminalHandler};

/// Acknowledges a signup that passed its filter chain.
///
/// Account creation itself is delegated to request filters; this handler
/// reports what they collected.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignupHandler;

#[async_trait]
impl TerminalHandler for SignupHandler {
    async fn handle(
        &self,
        _req: &RequestView,
        ctx: &FilterContext,
    ) -> Result<HandlerResponse, HandlerError> {
        Ok(HandlerResponse::ok(json!({
            "message": "Signup successful",
            "data": Value::Object(ctx.collected.clone()),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    #[tokio::test]
    async fn reports_collected_data() {
        let mut ctx = FilterContext::default();
        ctx.collected.insert("user_id".to_string(), json!(42));

        let response = SignupHandler
            .handle(&RequestView::new(Method::POST, "/signup"), &ctx)
            .await
            .unwrap();

        assert_eq!(response.body["message"], "Signup successful");
        assert_eq!(response.body["data"]["user_id"], 42);
    }
}
