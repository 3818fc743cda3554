//! Request view and per-request filter context.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use serde_json::{Map, Value};

/// Caller key used when no address can be determined.
pub const UNKNOWN_CALLER: &str = "unknown";

/// Read-only view of an inbound request as seen by filters and handlers.
///
/// The body is buffered, so every filter can read it independently.
#[derive(Debug, Clone)]
pub struct RequestView {
    /// Request method.
    pub method: Method,
    /// Request path without the query string.
    pub path: String,
    /// Request headers. Lookups are case-insensitive.
    pub headers: HeaderMap,
    /// Decoded query parameters.
    pub query: HashMap<String, String>,
    /// Path parameters captured by the matched route.
    pub params: HashMap<String, String>,
    /// Buffered body.
    pub body: Bytes,
    /// Peer address of the connection, if known.
    pub remote_addr: Option<SocketAddr>,
}

impl RequestView {
    /// A request with no headers, query, or body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query: HashMap::new(),
            params: HashMap::new(),
            body: Bytes::new(),
            remote_addr: None,
        }
    }

    /// Set the headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set the query parameters.
    #[must_use]
    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the peer address.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// A header value, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// A query parameter.
    #[must_use]
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// A path parameter captured by the matched route.
    #[must_use]
    pub fn path_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The body parsed as a JSON object, if it is one.
    #[must_use]
    pub fn json_object(&self) -> Option<Map<String, Value>> {
        match serde_json::from_slice::<Value>(&self.body) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// Key identifying the caller for rate limiting.
    ///
    /// First `X-Forwarded-For` entry, else the peer IP, else [`UNKNOWN_CALLER`].
    #[must_use]
    pub fn caller(&self) -> String {
        self.header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .or_else(|| self.remote_addr.map(|a| a.ip().to_string()))
            .unwrap_or_else(|| UNKNOWN_CALLER.to_string())
    }
}

/// Data threaded through a filter chain.
///
/// Filters add to `collected`; later filters and the terminal handler see
/// everything earlier filters added.
#[derive(Debug, Clone, Default)]
pub struct FilterContext {
    /// Data collected by filters so far.
    pub collected: Map<String, Value>,
}
