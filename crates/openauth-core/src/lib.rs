//! Shared types for the OpenAuth gateway.
//!
//! This crate holds the declarative pieces every other crate agrees on:
//!
//! - **Configuration documents**: the YAML/JSON route table description
//!   submitted to the control endpoint
//! - **Principals**: service-account identities returned by the cluster
//!   identity authority
//! - **Error types**: parse failures shared across crates
//!
//! # Example
//!
//! ```
//! use openauth_core::{ConfigDocument, Principal};
//!
//! let doc = ConfigDocument::from_yaml(
//!     "routes:\n  - method: POST\n    path: /login\n    handler: login\n",
//! ).unwrap();
//! assert_eq!(doc.routes.len(), 1);
//!
//! let principal = Principal::parse("system:serviceaccount:default:config-updater").unwrap();
//! assert_eq!(principal.namespace(), "default");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod document;
pub mod error;
pub mod principal;

pub use document::{
    Condition, ConditionFilterSpec, ConditionOperator, ConditionSubject, ConfigDocument,
    FilterSpec, RateLimitFilterSpec, RequestFilterSpec, RouteSpec,
};
pub use error::{CoreError, Result};
pub use principal::Principal;
