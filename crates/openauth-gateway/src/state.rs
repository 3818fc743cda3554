//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use openauth_engine::ConfigController;

use crate::config::GatewayConfig;

/// Shared application state for the gateway.
#[derive(Clone)]
pub struct GatewayState {
    /// Owner of the live route table.
    pub controller: Arc<ConfigController>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl GatewayState {
    /// Create a new gateway state.
    #[must_use]
    pub const fn new(controller: Arc<ConfigController>, config: GatewayConfig) -> Self {
        Self { controller, config }
    }
}
