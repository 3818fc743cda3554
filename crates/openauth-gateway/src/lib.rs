//! HTTP ingress gateway for OpenAuth.
//!
//! The gateway serves every request from a route table that can be replaced
//! at runtime by posting a configuration document to `/config`. It handles:
//!
//! - Dispatching requests through each route's filter chain
//! - Publishing new tables, guarded by the identity gate
//! - Minting and validating trust tokens (`login`, `verify`)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Clients                               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    openauth-gateway                          │
//! │  ┌─────────────┐ ┌──────────────────┐ ┌─────────────────┐   │
//! │  │   /health   │ │ fallback         │ │ signup / login  │   │
//! │  │             │ │ dispatch         │ │ / verify        │   │
//! │  └─────────────┘ └──────────────────┘ └─────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┼──────────────┐
//!               ▼              ▼              ▼
//!        ┌──────────┐   ┌──────────┐   ┌──────────┐
//!        │ Config   │   │ Identity │   │ Remote   │
//!        │Controller│   │ Gate     │   │ Services │
//!        └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use openauth_auth::{AllowList, IdentityGate, TokenIssuer, TokenReviewAuthority};
//! use openauth_engine::{ConfigController, FilterEnvironment};
//! use openauth_gateway::{create_router, handlers, GatewayConfig, GatewayState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::from_env()?;
//! let issuer = Arc::new(TokenIssuer::new(config.token.clone())?);
//! let authority = Arc::new(TokenReviewAuthority::try_default().await?);
//! let gate = Arc::new(IdentityGate::new(authority, AllowList::default()));
//! let env = FilterEnvironment::new(config.filter_timeout())?;
//! let controller = ConfigController::new(gate, handlers::registry(&issuer), env)?;
//!
//! let app = create_router(GatewayState::new(Arc::new(controller), config));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::{ConfigLoadError, GatewayConfig};
pub use error::ApiError;
pub use routes::create_router;
pub use state::GatewayState;
