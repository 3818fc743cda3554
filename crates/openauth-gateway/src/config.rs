//! Gateway configuration types.
//!
//! Configuration is read from environment variables at startup. Everything
//! except the token secret has a default.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use openauth_auth::TokenIssuerConfig;

/// A configuration value was missing or malformed.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// A required variable is unset.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable could not be parsed.
    #[error("invalid value for {var}: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Parse failure.
        reason: String,
    },
}

/// Configuration for the gateway service.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Listen address (e.g., "0.0.0.0:8080").
    #[serde(default = "GatewayConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Allowed CORS origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Whole-request timeout in seconds.
    #[serde(default = "GatewayConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Timeout of a request filter's outbound call, in milliseconds.
    #[serde(default = "GatewayConfig::default_filter_timeout")]
    pub filter_timeout_ms: u64,

    /// Base URL of an HTTP identity authority. Kubernetes `TokenReview` is
    /// used when unset.
    #[serde(default)]
    pub identity_url: Option<String>,

    /// Audiences `TokenReview` requests are restricted to. Empty means the
    /// API server's default audience.
    #[serde(default)]
    pub review_audiences: Vec<String>,

    /// Initial allow-list as `namespace/name,namespace/name`.
    #[serde(default)]
    pub allowed_accounts: Option<String>,

    /// Path of a configuration document published at startup.
    #[serde(default)]
    pub initial_config: Option<String>,

    /// Token issuer settings.
    pub token: TokenIssuerConfig,
}

impl GatewayConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    const fn default_max_body() -> usize {
        1024 * 1024 // 1 MB
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    const fn default_filter_timeout() -> u64 {
        5000
    }

    /// Defaults for everything but the token secret.
    #[must_use]
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            cors_origins: vec!["*".to_string()],
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
            filter_timeout_ms: Self::default_filter_timeout(),
            identity_url: None,
            review_audiences: Vec::new(),
            allowed_accounts: None,
            initial_config: None,
            token: TokenIssuerConfig::with_secret(secret),
        }
    }

    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `OPENAUTH_JWT_SECRET` is unset or a numeric
    /// variable does not parse.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` to resolve variable names.
    ///
    /// # Errors
    ///
    /// See [`GatewayConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigLoadError> {
        let secret = lookup("OPENAUTH_JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigLoadError::Missing("OPENAUTH_JWT_SECRET"))?;
        let mut config = Self::with_secret(secret);

        if let Some(v) = lookup("LISTEN_ADDR") {
            config.listen_addr = v;
        }
        if let Some(v) = lookup("OPENAUTH_CORS_ORIGINS") {
            config.cors_origins = split_list(&v);
        }
        if let Some(v) = lookup("OPENAUTH_MAX_BODY_BYTES") {
            config.max_body_bytes = parse_number("OPENAUTH_MAX_BODY_BYTES", &v)?;
        }
        if let Some(v) = lookup("OPENAUTH_REQUEST_TIMEOUT_SECONDS") {
            config.request_timeout_seconds = parse_number("OPENAUTH_REQUEST_TIMEOUT_SECONDS", &v)?;
        }
        if let Some(v) = lookup("OPENAUTH_FILTER_TIMEOUT_MS") {
            config.filter_timeout_ms = parse_number("OPENAUTH_FILTER_TIMEOUT_MS", &v)?;
        }
        config.identity_url = lookup("OPENAUTH_IDENTITY_URL").filter(|s| !s.is_empty());
        if let Some(v) = lookup("OPENAUTH_REVIEW_AUDIENCES") {
            config.review_audiences = split_list(&v);
        }
        config.allowed_accounts = lookup("OPENAUTH_ALLOWED_ACCOUNTS").filter(|s| !s.is_empty());
        config.initial_config = lookup("OPENAUTH_INITIAL_CONFIG").filter(|s| !s.is_empty());

        if let Some(v) = lookup("OPENAUTH_JWT_ALGORITHM") {
            config.token.algorithm = v;
        }
        if let Some(v) = lookup("OPENAUTH_TOKEN_TTL_SECONDS") {
            config.token.ttl_seconds = parse_number("OPENAUTH_TOKEN_TTL_SECONDS", &v)?;
        }
        if let Some(v) = lookup("OPENAUTH_REQUIRED_FIELDS") {
            config.token.required_fields = split_list(&v);
        }
        if let Some(v) = lookup("OPENAUTH_SUBJECT_FIELD") {
            config.token.subject_field = v;
        }

        Ok(config)
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Get the request filter timeout as a `Duration`.
    #[must_use]
    pub const fn filter_timeout(&self) -> Duration {
        Duration::from_millis(self.filter_timeout_ms)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigLoadError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigLoadError::Invalid {
        var,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<GatewayConfig, ConfigLoadError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        GatewayConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[("OPENAUTH_JWT_SECRET", "s")]).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.cors_origins, vec!["*".to_string()]);
        assert_eq!(config.max_body_bytes, 1024 * 1024);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.filter_timeout(), Duration::from_secs(5));
        assert_eq!(config.token.algorithm, "HS256");
        assert_eq!(config.token.subject_field, "username");
        assert!(config.identity_url.is_none());
        assert!(config.review_audiences.is_empty());
        assert!(config.initial_config.is_none());
    }

    #[test]
    fn secret_is_required() {
        assert!(matches!(
            load(&[]),
            Err(ConfigLoadError::Missing("OPENAUTH_JWT_SECRET"))
        ));
        assert!(load(&[("OPENAUTH_JWT_SECRET", "")]).is_err());
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("OPENAUTH_JWT_SECRET", "s"),
            ("LISTEN_ADDR", "127.0.0.1:9000"),
            ("OPENAUTH_REQUIRED_FIELDS", "username, role"),
            ("OPENAUTH_TOKEN_TTL_SECONDS", "60"),
            ("OPENAUTH_FILTER_TIMEOUT_MS", "250"),
            ("OPENAUTH_IDENTITY_URL", "http://authority:8080"),
            ("OPENAUTH_ALLOWED_ACCOUNTS", "ops/deployer"),
            ("OPENAUTH_REVIEW_AUDIENCES", "openauth, https://kubernetes.default.svc"),
        ])
        .unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.token.required_fields, vec!["username", "role"]);
        assert_eq!(config.token.ttl_seconds, 60);
        assert_eq!(config.filter_timeout(), Duration::from_millis(250));
        assert_eq!(config.identity_url.as_deref(), Some("http://authority:8080"));
        assert_eq!(config.allowed_accounts.as_deref(), Some("ops/deployer"));
        assert_eq!(
            config.review_audiences,
            vec!["openauth", "https://kubernetes.default.svc"]
        );
    }

    #[test]
    fn rejects_bad_numbers() {
        let result = load(&[
            ("OPENAUTH_JWT_SECRET", "s"),
            ("OPENAUTH_TOKEN_TTL_SECONDS", "an hour"),
        ]);
        assert!(matches!(
            result,
            Err(ConfigLoadError::Invalid {
                var: "OPENAUTH_TOKEN_TTL_SECONDS",
                ..
            })
        ));
    }
}
