//! Service-account principals.
//!
//! The identity authority reports authenticated callers as usernames of the
//! form `system:serviceaccount:<namespace>:<name>`. A [`Principal`] is the
//! decomposed form used for allow-list checks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Username prefix shared by every service account.
pub const SERVICE_ACCOUNT_PREFIX: &str = "system:serviceaccount:";

/// A service-account identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    namespace: String,
    name: String,
}

impl Principal {
    /// Create a principal from its parts.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse a `system:serviceaccount:<namespace>:<name>` username.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidPrincipal` if the prefix is missing, the
    /// remainder does not split into exactly two parts, or a part is empty.
    pub fn parse(username: &str) -> Result<Self> {
        let rest = username
            .strip_prefix(SERVICE_ACCOUNT_PREFIX)
            .ok_or_else(|| CoreError::InvalidPrincipal(username.to_string()))?;

        let mut parts = rest.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(namespace), Some(name), None) if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(namespace, name))
            }
            _ => Err(CoreError::InvalidPrincipal(username.to_string())),
        }
    }

    /// The namespace part.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The account name part.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SERVICE_ACCOUNT_PREFIX}{}:{}", self.namespace, self.name)
    }
}

impl FromStr for Principal {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_account() {
        let p = Principal::parse("system:serviceaccount:default:config-updater").unwrap();
        assert_eq!(p.namespace(), "default");
        assert_eq!(p.name(), "config-updater");
    }

    #[test]
    fn display_roundtrips() {
        let p = Principal::new("ops", "deployer");
        let s = p.to_string();
        assert_eq!(s, "system:serviceaccount:ops:deployer");
        assert_eq!(s.parse::<Principal>().unwrap(), p);
    }

    #[test]
    fn rejects_other_usernames() {
        assert!(Principal::parse("kubernetes-admin").is_err());
        assert!(Principal::parse("system:node:worker-1").is_err());
    }

    #[test]
    fn rejects_wrong_part_count() {
        assert!(Principal::parse("system:serviceaccount:default").is_err());
        assert!(Principal::parse("system:serviceaccount:default:a:b").is_err());
        assert!(Principal::parse("system:serviceaccount::name").is_err());
        assert!(Principal::parse("system:serviceaccount:ns:").is_err());
    }
}
