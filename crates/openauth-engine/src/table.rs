//! Immutable route table.
//!
//! A table is built once by the compiler and never mutated afterwards.
//! Static paths resolve with a single hash lookup. Parameterised paths are
//! bucketed by method and segment count and scanned in declared order.
//! A static route always wins over a parameterised one.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use tracing::debug;

use crate::error::{ConfigError, FilterRejection};
use crate::filters::{Filter, FilterOutcome};
use crate::handler::TerminalHandler;
use crate::request::{FilterContext, RequestView};

/// Split a path into its non-empty segments.
fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Canonical form of a concrete path: leading slash, no empty segments.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    format!("/{}", segments(path).join("/"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A route path pattern. `:name` and `{name}` segments capture parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a pattern.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the pattern does not start
    /// with `/`, has an empty or repeated parameter name, or has stray braces.
    pub fn parse(raw: &str) -> Result<Self, String> {
        if !raw.starts_with('/') {
            return Err("path must start with `/`".to_string());
        }

        let mut seen = HashSet::new();
        let mut parsed = Vec::new();
        for seg in segments(raw) {
            let param = seg
                .strip_prefix(':')
                .or_else(|| seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')));

            match param {
                Some("") => return Err(format!("empty parameter name in `{seg}`")),
                Some(name) if name.contains(['{', '}', ':']) => {
                    return Err(format!("invalid parameter name in `{seg}`"))
                }
                Some(name) => {
                    if !seen.insert(name) {
                        return Err(format!("parameter `{name}` appears twice"));
                    }
                    parsed.push(Segment::Param(name.to_string()));
                }
                None if seg.contains(['{', '}']) => {
                    return Err(format!("unbalanced braces in `{seg}`"))
                }
                None => parsed.push(Segment::Literal(seg.to_string())),
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments: parsed,
        })
    }

    /// A pattern with no parameters. Every segment matches verbatim.
    #[must_use]
    pub(crate) fn literal(path: &str) -> Self {
        Self {
            raw: path.to_string(),
            segments: segments(path)
                .into_iter()
                .map(|s| Segment::Literal(s.to_string()))
                .collect(),
        }
    }

    /// The pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the pattern has no parameters.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.segments.iter().all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Normalized form used for duplicate detection. Parameters become `:`,
    /// so `/users/:id` and `/users/{uid}` collide.
    #[must_use]
    pub fn key(&self) -> String {
        let parts: Vec<&str> = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Literal(l) => l.as_str(),
                Segment::Param(_) => ":",
            })
            .collect();
        format!("/{}", parts.join("/"))
    }

    fn segment_count(&self) -> usize {
        self.segments.len()
    }

    fn capture(&self, path: &[&str]) -> Option<HashMap<String, String>> {
        if path.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (pattern, actual) in self.segments.iter().zip(path) {
            match pattern {
                Segment::Literal(l) if l == actual => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), (*actual).to_string());
                }
            }
        }
        Some(params)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// What a route does once its filters have allowed the request.
#[derive(Clone)]
pub enum RouteTarget {
    /// Publish a new configuration document.
    Publish,
    /// Replace the identity gate's allow-list.
    ReplaceAllowList,
    /// Run an application handler.
    Handler {
        /// Identifier the handler is registered under.
        name: String,
        /// The handler.
        handler: Arc<dyn TerminalHandler>,
    },
}

impl fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Publish => f.write_str("Publish"),
            Self::ReplaceAllowList => f.write_str("ReplaceAllowList"),
            Self::Handler { name, .. } => f.debug_tuple("Handler").field(name).finish(),
        }
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Publish => f.write_str("<publish>"),
            Self::ReplaceAllowList => f.write_str("<allow-list>"),
            Self::Handler { name, .. } => f.write_str(name),
        }
    }
}

/// A compiled route.
#[derive(Debug, Clone)]
pub struct ExecutableRoute {
    method: Method,
    pattern: PathPattern,
    filters: Vec<Filter>,
    target: RouteTarget,
}

impl ExecutableRoute {
    /// Bind a route.
    #[must_use]
    pub fn new(method: Method, pattern: PathPattern, filters: Vec<Filter>, target: RouteTarget) -> Self {
        Self {
            method,
            pattern,
            filters,
            target,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Path pattern.
    #[must_use]
    pub const fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Filters in execution order.
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Terminal target.
    #[must_use]
    pub const fn target(&self) -> &RouteTarget {
        &self.target
    }

    /// Run the filters in order, stopping at the first rejection.
    ///
    /// # Errors
    ///
    /// Returns the first `FilterRejection`. Later filters do not run.
    pub async fn run_chain(&self, req: &RequestView, ctx: &mut FilterContext) -> Result<(), FilterRejection> {
        for filter in &self.filters {
            if let FilterOutcome::Reject(reason) = filter.process(req, ctx).await {
                return Err(FilterRejection {
                    filter: filter.name().to_string(),
                    kind: filter.kind(),
                    reason,
                });
            }
            debug!(filter = filter.name(), route = %self.pattern, "Filter allowed request");
        }
        Ok(())
    }
}

/// A route resolved for a concrete request.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    /// The matched route.
    pub route: &'a ExecutableRoute,
    /// Captured path parameters.
    pub params: HashMap<String, String>,
}

/// An immutable, indexed set of routes.
#[derive(Debug)]
pub struct RouteTable {
    generation: u64,
    routes: Vec<ExecutableRoute>,
    static_routes: HashMap<(Method, String), usize>,
    param_routes: HashMap<(Method, usize), Vec<usize>>,
}

impl RouteTable {
    /// Index routes into a table.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateRoute` if two routes share a method and
    /// normalized pattern.
    pub fn new(generation: u64, routes: Vec<ExecutableRoute>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        let mut static_routes = HashMap::new();
        let mut param_routes: HashMap<(Method, usize), Vec<usize>> = HashMap::new();

        for (i, route) in routes.iter().enumerate() {
            let key = route.pattern.key();
            if !seen.insert((route.method.clone(), key.clone())) {
                return Err(ConfigError::DuplicateRoute {
                    method: route.method.to_string(),
                    path: key,
                });
            }

            if route.pattern.is_static() {
                static_routes.insert((route.method.clone(), key), i);
            } else {
                param_routes
                    .entry((route.method.clone(), route.pattern.segment_count()))
                    .or_default()
                    .push(i);
            }
        }

        Ok(Self {
            generation,
            routes,
            static_routes,
            param_routes,
        })
    }

    /// Generation number. Increases by one with every publish.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Routes in declared order, followed by the built-in control routes.
    #[must_use]
    pub fn routes(&self) -> &[ExecutableRoute] {
        &self.routes
    }

    /// Number of routes, control routes included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table has no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolve a request.
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let normalized = normalize_path(path);
        if let Some(&i) = self.static_routes.get(&(method.clone(), normalized)) {
            return Some(RouteMatch {
                route: &self.routes[i],
                params: HashMap::new(),
            });
        }

        let segs = segments(path);
        self.param_routes
            .get(&(method.clone(), segs.len()))?
            .iter()
            .find_map(|&i| {
                let route = &self.routes[i];
                route
                    .pattern
                    .capture(&segs)
                    .map(|params| RouteMatch { route, params })
            })
    }
}
