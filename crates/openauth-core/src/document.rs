//! Configuration document model.
//!
//! A configuration document is the unit submitted to the control endpoint.
//! It is an ordered list of route specifications, each carrying its ordered
//! filter pipeline and the identifier of its terminal handler. Documents are
//! YAML; JSON is accepted since it is a YAML subset.
//!
//! ```yaml
//! routes:
//!   - method: POST
//!     path: /login
//!     handler: login
//!     filters:
//!       - kind: condition
//!         conditions:
//!           - subject: header
//!             operator: equals
//!             key: X-Client
//!             value: mobile
//!       - kind: request
//!         remote_endpoint: http://otp-check.default.svc/verify
//!         fields_to_forward: [username, otp]
//! ```
//!
//! Types in this module are purely declarative. Semantic validation (known
//! handlers, parseable URLs, unique routes) happens when the document is
//! compiled into a route table.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A complete configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigDocument {
    /// Routes in declaration order.
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

impl ConfigDocument {
    /// Parse a document from YAML (or JSON) text.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::EmptyDocument` for blank input and
    /// `CoreError::Parse` if the text does not deserialize into a document.
    pub fn from_yaml(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(CoreError::EmptyDocument);
        }
        serde_yaml::from_str(input).map_err(|e| CoreError::Parse(e.to_string()))
    }

    /// Parse a document from a raw request body.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Parse` if the body is not UTF-8 or not a valid document.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| CoreError::Parse("document is not valid UTF-8".to_string()))?;
        Self::from_yaml(text)
    }
}

/// A declarative route: method, path pattern, filter pipeline and handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteSpec {
    /// HTTP method (e.g. `POST`).
    pub method: String,
    /// Path pattern. Segments written `:name` or `{name}` capture path parameters.
    pub path: String,
    /// Filters executed in order before the handler.
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    /// Identifier of the terminal handler (e.g. `login`).
    pub handler: String,
}

/// A filter declaration, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterSpec {
    /// Delegate the decision to a remote validation service.
    Request(RequestFilterSpec),
    /// Compare request metadata against expected values.
    Condition(ConditionFilterSpec),
    /// Token-bucket rate limiting per caller.
    RateLimit(RateLimitFilterSpec),
}

impl FilterSpec {
    /// The kind tag as it appears in documents.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Condition(_) => "condition",
            Self::RateLimit(_) => "rate_limit",
        }
    }

    /// The optional operator-assigned name of this filter.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Request(spec) => spec.name.as_deref(),
            Self::Condition(spec) => spec.name.as_deref(),
            Self::RateLimit(spec) => Some(spec.name.as_str()),
        }
    }
}

/// Configuration of a request filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestFilterSpec {
    /// Name used in logs and rejection messages.
    #[serde(default)]
    pub name: Option<String>,
    /// URL the outbound validation call is sent to.
    pub remote_endpoint: String,
    /// Headers attached to the outbound call.
    #[serde(default)]
    pub outbound_headers: BTreeMap<String, String>,
    /// Body fields copied into the outbound call. All others are dropped.
    pub fields_to_forward: Vec<String>,
}

/// Configuration of a condition filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionFilterSpec {
    /// Name used in logs and rejection messages.
    #[serde(default)]
    pub name: Option<String>,
    /// Conditions evaluated in order.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Configuration of a rate limit filter.
///
/// Bucket state is keyed by `name`, so a route keeps its allowance across
/// reconfigurations as long as the name is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitFilterSpec {
    /// Bucket namespace.
    pub name: String,
    /// Sustained refill rate.
    pub requests_per_second: u32,
    /// Bucket capacity.
    pub burst: u32,
}

/// A single comparison against request metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    /// Where the compared value is read from.
    pub subject: ConditionSubject,
    /// How the value is compared.
    pub operator: ConditionOperator,
    /// Header name, query parameter or path parameter to read.
    pub key: String,
    /// Expected value.
    pub value: String,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} `{}` {} \"{}\"",
            self.subject, self.key, self.operator, self.value
        )
    }
}

/// Source of the value a condition inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionSubject {
    /// A request header (case-insensitive name).
    Header,
    /// A query string parameter.
    Query,
    /// A path parameter captured by the route pattern.
    #[serde(alias = "param")]
    PathParam,
}

impl fmt::Display for ConditionSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => f.write_str("header"),
            Self::Query => f.write_str("query"),
            Self::PathParam => f.write_str("path_param"),
        }
    }
}

/// String comparison applied by a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// Exact match.
    Equals,
    /// Substring match.
    Contains,
    /// Actual value starts with the expected value.
    Prefix,
    /// Actual value ends with the expected value.
    Suffix,
}

impl ConditionOperator {
    /// Apply the comparison.
    #[must_use]
    pub fn apply(self, actual: &str, expected: &str) -> bool {
        match self {
            Self::Equals => actual == expected,
            Self::Contains => actual.contains(expected),
            Self::Prefix => actual.starts_with(expected),
            Self::Suffix => actual.ends_with(expected),
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals => f.write_str("equals"),
            Self::Contains => f.write_str("contains"),
            Self::Prefix => f.write_str("prefix"),
            Self::Suffix => f.write_str("suffix"),
        }
    }
}
