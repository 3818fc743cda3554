//! Terminal handlers and their registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::Value;

use crate::error::HandlerError;
use crate::request::{FilterContext, RequestView};

/// A JSON response produced by the end of a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    /// Response status.
    pub status: StatusCode,
    /// JSON body.
    pub body: Value,
}

impl HandlerResponse {
    /// A 200 response.
    #[must_use]
    pub const fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }
}

/// The final step of a route, run once every filter has allowed the request.
#[async_trait]
pub trait TerminalHandler: Send + Sync {
    /// Produce a response.
    ///
    /// # Errors
    ///
    /// Returns a `HandlerError` if the request cannot be served.
    async fn handle(
        &self,
        req: &RequestView,
        ctx: &FilterContext,
    ) -> Result<HandlerResponse, HandlerError>;
}

/// Handlers available to configuration documents, by identifier.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn TerminalHandler>>,
}

impl HandlerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `name`, replacing any previous one.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, handler: Arc<dyn TerminalHandler>) -> Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    /// Look up a handler.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn TerminalHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Registered identifiers, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}
