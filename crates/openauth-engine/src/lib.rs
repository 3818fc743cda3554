//! Pipeline engine for the OpenAuth gateway.
//!
//! This crate turns configuration documents into an immutable route table
//! and serves requests against whichever table is live:
//!
//! - **Filters**: ordered request checks (remote validation, conditions,
//!   rate limiting) that allow or reject a request
//! - **Route table**: compiled routes indexed by method and path, never
//!   mutated once built
//! - **Config controller**: authenticates publishers, compiles documents and
//!   swaps the live table atomically
//!
//! # Architecture
//!
//! ```text
//!   POST /config ──▶ IdentityGate ──▶ parse ──▶ compile ──▶ ArcSwap::store
//!                                                              │
//!                                   ┌──────────────────────────▼──┐
//!   request ──▶ dispatch ──load────▶│ RouteTable (generation N)   │
//!                  │                │  (method, path) → route     │
//!                  │                └─────────────────────────────┘
//!                  ▼
//!        ┌─────────────────────────────────────────────┐
//!        │ filter 1 ──▶ filter 2 ──▶ ... ──▶ handler   │
//!        │ (first rejection stops the chain)           │
//!        └─────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use openauth_auth::{AllowList, IdentityGate, TokenReviewAuthority};
//! use openauth_engine::{ConfigController, FilterEnvironment, HandlerRegistry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let authority = Arc::new(TokenReviewAuthority::try_default().await?);
//! let gate = Arc::new(IdentityGate::new(authority, AllowList::default()));
//! let env = FilterEnvironment::new(Duration::from_secs(5))?;
//!
//! let controller = ConfigController::new(gate, HandlerRegistry::new(), env)?;
//! controller.load_document(b"routes: []").await?;
//! assert_eq!(controller.generation(), 1);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod compile;
pub mod controller;
pub mod error;
pub mod filters;
pub mod handler;
pub mod request;
pub mod table;

pub use compile::{compile, ALLOW_LIST_PATH, CONFIG_PATH, HEALTH_PATH, RESERVED_PATHS};
pub use controller::{ConfigController, PublishReceipt};
pub use error::{
    ConfigError, ControlError, DispatchError, FilterRejection, HandlerError, RejectReason, Result,
    UpstreamError,
};
pub use filters::{Filter, FilterEnvironment, FilterOutcome, RateLimitStore};
pub use handler::{HandlerRegistry, HandlerResponse, TerminalHandler};
pub use request::{FilterContext, RequestView};
pub use table::{ExecutableRoute, PathPattern, RouteMatch, RouteTable, RouteTarget};
