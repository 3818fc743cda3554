//! Config controller: owns the live route table and swaps it atomically.
//!
//! Readers load the current table with a single atomic pointer read and keep
//! it for the whole request, so a publish never affects requests already in
//! flight. Publishers are serialised by an async mutex. Callers are
//! authenticated before the mutex is taken, so no network I/O happens while
//! a publish is pending.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{info, warn};

use openauth_auth::{AllowList, IdentityGate};
use openauth_core::{ConfigDocument, Principal};

use crate::compile::compile;
use crate::error::{ConfigError, ControlError, DispatchError, Result};
use crate::filters::FilterEnvironment;
use crate::handler::{HandlerRegistry, HandlerResponse};
use crate::request::{FilterContext, RequestView};
use crate::table::{RouteMatch, RouteTable, RouteTarget};

/// Outcome of a successful publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Generation of the newly live table.
    pub generation: u64,
    /// Number of routes in it, control routes included.
    pub routes: usize,
}

/// Owns the live route table and the operations that replace it.
pub struct ConfigController {
    live: ArcSwap<RouteTable>,
    publish_lock: Mutex<u64>,
    gate: Arc<IdentityGate>,
    registry: HandlerRegistry,
    environment: FilterEnvironment,
}

impl ConfigController {
    /// Create a controller serving generation 0 (control routes only).
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Internal` if the empty table cannot be built.
    pub fn new(
        gate: Arc<IdentityGate>,
        registry: HandlerRegistry,
        environment: FilterEnvironment,
    ) -> Result<Self> {
        let initial = compile(&[], &registry, &environment, 0)
            .map_err(|e| ControlError::Internal(format!("failed to build initial table: {e}")))?;

        Ok(Self {
            live: ArcSwap::from_pointee(initial),
            publish_lock: Mutex::new(0),
            gate,
            registry,
            environment,
        })
    }

    /// The live table. Hold the returned `Arc` to keep serving from it.
    #[must_use]
    pub fn live(&self) -> Arc<RouteTable> {
        self.live.load_full()
    }

    /// Generation of the live table.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.live.load().generation()
    }

    /// The identity gate guarding control operations.
    #[must_use]
    pub fn gate(&self) -> &IdentityGate {
        &self.gate
    }

    /// Authenticate the caller, then compile and publish `body`.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Auth` if the caller is refused (the body is not
    /// even parsed) and `ControlError::Config` if the document is rejected.
    /// In both cases the live table is unchanged.
    pub async fn submit(&self, authorization: Option<&str>, body: &[u8]) -> Result<PublishReceipt> {
        let principal = self.gate.authenticate(authorization).await?;
        self.publish(body, Some(&principal)).await
    }

    /// Publish `body` without authentication. For the startup document only.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Config` if the document is rejected.
    pub async fn load_document(&self, body: &[u8]) -> Result<PublishReceipt> {
        self.publish(body, None).await
    }

    async fn publish(&self, body: &[u8], by: Option<&Principal>) -> Result<PublishReceipt> {
        let document = ConfigDocument::from_bytes(body)
            .map_err(ConfigError::from)
            .inspect_err(|e| warn!(error = %e, "Rejected configuration document"))?;

        let mut generation = self.publish_lock.lock().await;
        let next = *generation + 1;

        let table = compile(&document.routes, &self.registry, &self.environment, next)
            .inspect_err(|e| warn!(error = %e, "Rejected configuration document"))?;
        let routes = table.len();

        self.live.store(Arc::new(table));
        *generation = next;

        info!(
            generation = next,
            routes,
            principal = by.map_or_else(|| "<startup>".to_string(), ToString::to_string),
            "Published route table"
        );

        Ok(PublishReceipt {
            generation: next,
            routes,
        })
    }

    /// Authenticate the caller, then replace the allow-list with `body`
    /// (a JSON object of namespace to account names).
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Auth` if the caller is refused and
    /// `ControlError::InvalidAllowList` if the body is malformed or admits
    /// nobody.
    pub async fn replace_allow_list(&self, authorization: Option<&str>, body: &[u8]) -> Result<usize> {
        let principal = self.gate.authenticate(authorization).await?;

        let allow_list: AllowList = serde_json::from_slice(body)
            .map_err(|e| ControlError::InvalidAllowList(e.to_string()))?;
        if allow_list.is_empty() {
            return Err(ControlError::InvalidAllowList(
                "allow-list must admit at least one account".to_string(),
            ));
        }

        let accounts = allow_list.len();
        self.gate.replace_allow_list(allow_list);
        info!(principal = %principal, accounts, "Replaced allow-list");
        Ok(accounts)
    }

    /// Serve a request against the live table.
    ///
    /// The table is loaded once, so the request completes against the
    /// generation that was live when it arrived.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::NotFound` for unmatched requests,
    /// `DispatchError::Rejected` when a filter refuses the request, and the
    /// target's error otherwise.
    pub async fn dispatch(&self, mut request: RequestView) -> std::result::Result<HandlerResponse, DispatchError> {
        let table = self.live();
        let Some(RouteMatch { route, params }) = table.lookup(&request.method, &request.path) else {
            return Err(DispatchError::NotFound {
                method: request.method.to_string(),
                path: request.path,
            });
        };
        request.params = params;

        let mut ctx = FilterContext::default();
        route.run_chain(&request, &mut ctx).await.inspect_err(|r| {
            warn!(
                generation = table.generation(),
                route = %route.pattern(),
                filter = %r.filter,
                reason = %r.reason,
                "Request rejected"
            );
        })?;

        match route.target() {
            RouteTarget::Publish => {
                let receipt = self
                    .submit(request.header("authorization"), &request.body)
                    .await?;
                Ok(HandlerResponse::ok(json!({
                    "message": "Configuration updated",
                    "generation": receipt.generation,
                    "routes": receipt.routes,
                })))
            }
            RouteTarget::ReplaceAllowList => {
                let accounts = self
                    .replace_allow_list(request.header("authorization"), &request.body)
                    .await?;
                Ok(HandlerResponse::ok(json!({
                    "message": "Allow-list updated",
                    "accounts": accounts,
                })))
            }
            RouteTarget::Handler { handler, .. } => Ok(handler.handle(&request, &ctx).await?),
        }
    }
}
