//! Compiles route specifications into a route table.
//!
//! Compilation is all-or-nothing: the first problem aborts it and nothing
//! is produced. The built-in control routes are appended to every table.

use axum::http::Method;

use openauth_core::RouteSpec;

use crate::error::ConfigError;
use crate::filters::{Filter, FilterEnvironment};
use crate::handler::HandlerRegistry;
use crate::table::{normalize_path, ExecutableRoute, PathPattern, RouteTable, RouteTarget};

/// Path of the publish endpoint.
pub const CONFIG_PATH: &str = "/config";

/// Path of the allow-list endpoint.
pub const ALLOW_LIST_PATH: &str = "/config/allow-list";

/// Path of the gateway health endpoint.
pub const HEALTH_PATH: &str = "/health";

/// Paths documents may not claim.
pub const RESERVED_PATHS: &[&str] = &[CONFIG_PATH, ALLOW_LIST_PATH, HEALTH_PATH];

fn parse_method(route: usize, method: &str) -> Result<Method, ConfigError> {
    match method.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        "HEAD" => Ok(Method::HEAD),
        "OPTIONS" => Ok(Method::OPTIONS),
        _ => Err(ConfigError::InvalidMethod {
            route,
            method: method.to_string(),
        }),
    }
}

fn control_routes() -> [ExecutableRoute; 2] {
    let route = |method, path: &str, target| {
        ExecutableRoute::new(method, PathPattern::literal(path), Vec::new(), target)
    };
    [
        route(Method::POST, CONFIG_PATH, RouteTarget::Publish),
        route(Method::PUT, ALLOW_LIST_PATH, RouteTarget::ReplaceAllowList),
    ]
}

/// Compile `specs` into a table with the given generation.
///
/// # Errors
///
/// Returns the first `ConfigError` found: an invalid method or path, a
/// reserved path, an unknown handler, a malformed filter, or a duplicate route.
pub fn compile(
    specs: &[RouteSpec],
    registry: &HandlerRegistry,
    env: &FilterEnvironment,
    generation: u64,
) -> Result<RouteTable, ConfigError> {
    let mut routes = Vec::with_capacity(specs.len() + 2);

    for (i, spec) in specs.iter().enumerate() {
        let method = parse_method(i, &spec.method)?;

        let pattern = PathPattern::parse(&spec.path).map_err(|reason| ConfigError::InvalidPath {
            route: i,
            path: spec.path.clone(),
            reason,
        })?;

        let normalized = normalize_path(&spec.path);
        if RESERVED_PATHS.contains(&normalized.as_str()) {
            return Err(ConfigError::ReservedPath {
                route: i,
                path: spec.path.clone(),
            });
        }

        let handler = registry
            .get(&spec.handler)
            .ok_or_else(|| ConfigError::UnknownHandler {
                route: i,
                handler: spec.handler.clone(),
            })?;

        let filters = spec
            .filters
            .iter()
            .enumerate()
            .map(|(index, f)| {
                Filter::build(f, index, env).map_err(|reason| ConfigError::InvalidFilter {
                    route: i,
                    index,
                    reason,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        routes.push(ExecutableRoute::new(
            method,
            pattern,
            filters,
            RouteTarget::Handler {
                name: spec.handler.clone(),
                handler,
            },
        ));
    }

    routes.extend(control_routes());
    RouteTable::new(generation, routes)
}
