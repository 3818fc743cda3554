//! Health check endpoint.
//!
//! This module provides the public health check endpoint. It is mounted on
//! the axum router directly, so it answers even while no document is live.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::state::GatewayState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Generation of the live route table.
    pub generation: u64,
}

/// Health check handler.
///
/// # Example
///
/// ```text
/// GET /health
///
/// Response: 200 OK
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "generation": 3
/// }
/// ```
pub async fn health(State(state): State<GatewayState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        generation: state.controller.generation(),
    };

    (StatusCode::OK, Json(response))
}
