//! Identity gate guarding reconfiguration.
//!
//! The gate extracts a bearer credential, asks an [`IdentityAuthority`]
//! whether it is authenticated, decomposes the reported username into a
//! [`Principal`] and checks it against the [`AllowList`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use openauth_core::Principal;

use crate::error::{AuthError, Result};

/// Namespace of the account allowed when nothing else is configured.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Name of the account allowed when nothing else is configured.
pub const DEFAULT_ACCOUNT: &str = "config-updater";

/// Outcome of asking the identity authority about a credential.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdentityReview {
    /// Whether the authority vouches for the credential.
    pub authenticated: bool,
    /// Principal reported for the credential, if any. Authorities that
    /// answer with Kubernetes' `username` field are accepted too.
    #[serde(default, alias = "username")]
    pub principal: Option<String>,
}

/// Something that can verify a bearer credential.
#[async_trait]
pub trait IdentityAuthority: Send + Sync {
    /// Review a bearer credential.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AuthorityUnavailable` if the authority cannot be
    /// reached. A rejected credential is an `Ok` review with
    /// `authenticated == false`.
    async fn review(&self, token: &str) -> Result<IdentityReview>;
}

/// Namespace to allowed account names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowList(HashMap<String, HashSet<String>>);

impl AllowList {
    /// An allow-list that admits nobody.
    #[must_use]
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Admit `namespace/name`.
    pub fn allow(&mut self, namespace: impl Into<String>, name: impl Into<String>) {
        self.0
            .entry(namespace.into())
            .or_default()
            .insert(name.into());
    }

    /// Whether the principal is admitted.
    #[must_use]
    pub fn contains(&self, principal: &Principal) -> bool {
        self.0
            .get(principal.namespace())
            .is_some_and(|names| names.contains(principal.name()))
    }

    /// Number of admitted accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.values().map(HashSet::len).sum()
    }

    /// Whether nobody is admitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse a comma-separated `namespace/name` list.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if an entry is not `namespace/name`.
    pub fn parse_accounts(input: &str) -> Result<Self> {
        let mut list = Self::empty();
        for entry in input.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.split_once('/') {
                Some((ns, name)) if !ns.is_empty() && !name.is_empty() && !name.contains('/') => {
                    list.allow(ns, name);
                }
                _ => {
                    return Err(AuthError::Config(format!(
                        "allow-list entry `{entry}` is not namespace/name"
                    )))
                }
            }
        }
        Ok(list)
    }
}

impl Default for AllowList {
    /// Admits only `default/config-updater`.
    fn default() -> Self {
        let mut list = Self::empty();
        list.allow(DEFAULT_NAMESPACE, DEFAULT_ACCOUNT);
        list
    }
}

/// Extract the credential from an `Authorization` header value.
///
/// # Errors
///
/// Returns `AuthError::MissingBearer` if the header is absent, uses another
/// scheme, or carries an empty token.
pub fn bearer_token(authorization: Option<&str>) -> Result<&str> {
    let value = authorization.ok_or(AuthError::MissingBearer)?;
    let (scheme, token) = value.split_once(' ').ok_or(AuthError::MissingBearer)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingBearer);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingBearer);
    }
    Ok(token)
}

/// Authenticates callers of the control endpoints.
pub struct IdentityGate {
    authority: Arc<dyn IdentityAuthority>,
    allow_list: RwLock<AllowList>,
}

impl IdentityGate {
    /// Create a gate over an authority and an initial allow-list.
    #[must_use]
    pub fn new(authority: Arc<dyn IdentityAuthority>, allow_list: AllowList) -> Self {
        Self {
            authority,
            allow_list: RwLock::new(allow_list),
        }
    }

    /// Replace the allow-list. In-flight checks see either the old or the new list.
    pub fn replace_allow_list(&self, allow_list: AllowList) {
        *self.allow_list.write() = allow_list;
    }

    /// Authenticate the caller behind an `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns an `AuthError` describing why the caller was refused. Every
    /// variant is reported to the client as the same 401.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<Principal> {
        match self.check(authorization).await {
            Ok(principal) => {
                debug!(principal = %principal, "Caller authenticated");
                Ok(principal)
            }
            Err(e) => {
                warn!(error = %e, "Identity gate rejected caller");
                Err(e)
            }
        }
    }

    async fn check(&self, authorization: Option<&str>) -> Result<Principal> {
        let token = bearer_token(authorization)?;
        let review = self.authority.review(token).await?;

        if !review.authenticated {
            return Err(AuthError::NotAuthenticated);
        }

        let reported = review
            .principal
            .ok_or_else(|| AuthError::MalformedPrincipal("no principal".to_string()))?;
        let principal =
            Principal::parse(&reported).map_err(|_| AuthError::MalformedPrincipal(reported))?;

        if self.allow_list.read().contains(&principal) {
            Ok(principal)
        } else {
            Err(AuthError::NotAllowed(principal.to_string()))
        }
    }
}

/// A static authority for tests and dev mode.
///
/// Accepts tokens of the form `test-token:<namespace>:<name>` and reports
/// them as the matching service account. Anything else is unauthenticated.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, Copy)]
pub struct StaticIdentityAuthority {
    /// When `false`, every review fails as if the authority were down.
    pub available: bool,
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for StaticIdentityAuthority {
    fn default() -> Self {
        Self { available: true }
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl IdentityAuthority for StaticIdentityAuthority {
    async fn review(&self, token: &str) -> Result<IdentityReview> {
        if !self.available {
            return Err(AuthError::AuthorityUnavailable(
                "static authority disabled".to_string(),
            ));
        }

        let review = token
            .strip_prefix("test-token:")
            .and_then(|rest| rest.split_once(':'))
            .map_or_else(IdentityReview::default, |(ns, name)| IdentityReview {
                authenticated: true,
                principal: Some(Principal::new(ns, name).to_string()),
            });
        Ok(review)
    }
}
