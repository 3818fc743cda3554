//! HTTP request handlers.
//!
//! `health` and `dispatch` are axum handlers. `signup`, `login` and `verify`
//! are terminal handlers that configuration documents refer to by name.

use std::sync::Arc;

use openauth_auth::TokenIssuer;
use openauth_engine::HandlerRegistry;

pub mod dispatch;
pub mod health;
pub mod login;
pub mod signup;
pub mod verify;

pub use login::LoginHandler;
pub use signup::SignupHandler;
pub use verify::VerifyHandler;

/// The terminal handlers this gateway offers to configuration documents.
#[must_use]
pub fn registry(issuer: &Arc<TokenIssuer>) -> HandlerRegistry {
    HandlerRegistry::new()
        .with("signup", Arc::new(SignupHandler))
        .with("login", Arc::new(LoginHandler::new(Arc::clone(issuer))))
        .with("verify", Arc::new(VerifyHandler::new(Arc::clone(issuer))))
}
