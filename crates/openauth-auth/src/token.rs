//! Trust token issuance and validation.
//!
//! Tokens are HMAC-signed JWTs with issuer `OpenAuth`. The subject comes from
//! a configurable input field (`username` by default) and every configured
//! required field is copied from the input as an application claim.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::TokenError;

/// Issuer claim stamped on every token.
pub const ISSUER: &str = "OpenAuth";

/// Claim names the issuer owns. Required fields may not shadow them.
pub const REGISTERED_CLAIMS: &[&str] = &["sub", "iss", "iat", "nbf", "exp", "jti", "aud"];

type Result<T> = std::result::Result<T, TokenError>;

/// Configuration for the token issuer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenIssuerConfig {
    /// Shared HMAC secret.
    pub secret: String,

    /// Signing algorithm name.
    #[serde(default = "TokenIssuerConfig::default_algorithm")]
    pub algorithm: String,

    /// Token lifetime in seconds.
    #[serde(default = "TokenIssuerConfig::default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Input fields that must be present and are copied into the token.
    #[serde(default)]
    pub required_fields: Vec<String>,

    /// Input field used as the `sub` claim.
    #[serde(default = "TokenIssuerConfig::default_subject_field")]
    pub subject_field: String,
}

impl TokenIssuerConfig {
    fn default_algorithm() -> String {
        "HS256".to_string()
    }

    const fn default_ttl_seconds() -> u64 {
        3600
    }

    fn default_subject_field() -> String {
        "username".to_string()
    }

    /// Configuration with defaults for everything but the secret.
    #[must_use]
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: Self::default_algorithm(),
            ttl_seconds: Self::default_ttl_seconds(),
            required_fields: Vec::new(),
            subject_field: Self::default_subject_field(),
        }
    }
}

/// Claims carried by an issued token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedClaims {
    /// Subject.
    pub sub: String,
    /// Issuer, always [`ISSUER`].
    pub iss: String,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Not-before (unix seconds).
    pub nbf: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
    /// Unique token id.
    pub jti: String,
    /// Application claims copied from the input.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IssuedClaims {
    /// Expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// A freshly minted token and the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Encoded JWT.
    pub token: String,
    /// Claims inside the token.
    pub claims: IssuedClaims,
}

/// Mints and validates trust tokens.
pub struct TokenIssuer {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: i64,
    required_fields: Vec<String>,
    subject_field: String,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.algorithm)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("required_fields", &self.required_fields)
            .field("subject_field", &self.subject_field)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Build an issuer from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the algorithm is not HMAC, the secret is empty,
    /// the TTL is zero, or a required field shadows a registered claim.
    pub fn new(config: TokenIssuerConfig) -> Result<Self> {
        let algorithm = Algorithm::from_str(&config.algorithm)
            .map_err(|_| TokenError::UnsupportedAlgorithm(config.algorithm.clone()))?;
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(TokenError::UnsupportedAlgorithm(config.algorithm));
        }

        if config.secret.is_empty() {
            return Err(TokenError::Config("secret must not be empty".to_string()));
        }

        let ttl_seconds = i64::try_from(config.ttl_seconds)
            .ok()
            .filter(|ttl| *ttl > 0)
            .ok_or_else(|| TokenError::Config("ttl must be a positive number of seconds".to_string()))?;

        if config.subject_field.is_empty() {
            return Err(TokenError::Config("subject field must not be empty".to_string()));
        }

        if let Some(field) = config
            .required_fields
            .iter()
            .find(|f| REGISTERED_CLAIMS.contains(&f.as_str()))
        {
            return Err(TokenError::Config(format!(
                "required field `{field}` collides with a registered claim"
            )));
        }

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl_seconds,
            required_fields: config.required_fields,
            subject_field: config.subject_field,
        })
    }

    /// The signing algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Fields the issuer requires in its input.
    #[must_use]
    pub fn required_fields(&self) -> &[String] {
        &self.required_fields
    }

    /// Mint a token for `input`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::MissingField` if the subject field or a required
    /// field is absent, and `TokenError::InvalidField` if the subject is not
    /// a non-empty string.
    pub fn generate(&self, input: &Map<String, Value>) -> Result<IssuedToken> {
        self.generate_at(input, Utc::now())
    }

    /// Mint a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::generate`].
    pub fn generate_at(&self, input: &Map<String, Value>, now: DateTime<Utc>) -> Result<IssuedToken> {
        let sub = match input.get(&self.subject_field) {
            None | Some(Value::Null) => return Err(TokenError::MissingField(self.subject_field.clone())),
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(_) => return Err(TokenError::InvalidField(self.subject_field.clone())),
        };

        let mut extra = Map::new();
        for field in &self.required_fields {
            match input.get(field) {
                None | Some(Value::Null) => return Err(TokenError::MissingField(field.clone())),
                Some(value) => {
                    extra.insert(field.clone(), value.clone());
                }
            }
        }

        let iat = now.timestamp();
        let claims = IssuedClaims {
            sub,
            iss: ISSUER.to_string(),
            iat,
            nbf: iat,
            exp: iat.saturating_add(self.ttl_seconds),
            jti: uuid::Uuid::new_v4().to_string(),
            extra,
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Internal(format!("failed to sign token: {e}")))?;

        debug!(sub = %claims.sub, jti = %claims.jti, exp = claims.exp, "Issued token");

        Ok(IssuedToken { token, claims })
    }

    /// Validate a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `AlgorithmMismatch` if the header names another algorithm,
    /// `InvalidSignature` if the signature does not verify, `TokenExpired`
    /// once `now >= exp`, and `MissingClaim` if a required field is absent.
    pub fn validate(&self, token: &str) -> Result<IssuedClaims> {
        self.validate_at(token, Utc::now())
    }

    /// Validate a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::validate`].
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<IssuedClaims> {
        let header = decode_header(token).map_err(|e| TokenError::InvalidToken(e.to_string()))?;
        if header.alg != self.algorithm {
            return Err(TokenError::AlgorithmMismatch {
                expected: format!("{:?}", self.algorithm),
                found: format!("{:?}", header.alg),
            });
        }

        // Time checks are done below against the supplied clock.
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["sub", "iss", "exp"]);

        let claims = decode::<IssuedClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::InvalidToken(e.to_string()),
            })?
            .claims;

        let now = now.timestamp();
        if now >= claims.exp {
            return Err(TokenError::TokenExpired);
        }
        if now < claims.nbf {
            return Err(TokenError::InvalidToken("token not yet valid".to_string()));
        }

        if let Some(field) = self
            .required_fields
            .iter()
            .find(|f| !claims.extra.contains_key(f.as_str()))
        {
            return Err(TokenError::MissingClaim(field.clone()));
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn config() -> TokenIssuerConfig {
        TokenIssuerConfig {
            required_fields: vec!["username".to_string(), "role".to_string()],
            ..TokenIssuerConfig::with_secret("test-secret")
        }
    }

    fn input(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn config_defaults() {
        let config: TokenIssuerConfig = serde_json::from_str(r#"{"secret":"s"}"#).unwrap();
        assert_eq!(config.algorithm, "HS256");
        assert_eq!(config.ttl_seconds, 3600);
        assert_eq!(config.subject_field, "username");
        assert!(config.required_fields.is_empty());
    }

    #[test]
    fn rejects_non_hmac_algorithm() {
        let config = TokenIssuerConfig {
            algorithm: "RS256".to_string(),
            ..config()
        };
        assert!(matches!(
            TokenIssuer::new(config),
            Err(TokenError::UnsupportedAlgorithm(_))
        ));

        let config = TokenIssuerConfig {
            algorithm: "none".to_string(),
            ..TokenIssuerConfig::with_secret("s")
        };
        assert!(TokenIssuer::new(config).is_err());
    }

    #[test]
    fn rejects_bad_config() {
        assert!(TokenIssuer::new(TokenIssuerConfig::with_secret("")).is_err());

        let zero_ttl = TokenIssuerConfig {
            ttl_seconds: 0,
            ..config()
        };
        assert!(TokenIssuer::new(zero_ttl).is_err());

        let shadowing = TokenIssuerConfig {
            required_fields: vec!["exp".to_string()],
            ..config()
        };
        assert!(matches!(
            TokenIssuer::new(shadowing),
            Err(TokenError::Config(_))
        ));
    }

    #[test]
    fn generates_and_validates() {
        let issuer = TokenIssuer::new(config()).unwrap();
        let issued = issuer
            .generate(&input(json!({"username": "testuser", "role": "admin", "password": "x"})))
            .unwrap();

        assert_eq!(issued.claims.sub, "testuser");
        assert_eq!(issued.claims.iss, ISSUER);
        assert_eq!(issued.claims.exp, issued.claims.iat + 3600);
        assert_eq!(issued.claims.extra.get("role"), Some(&json!("admin")));
        assert!(!issued.claims.extra.contains_key("password"));

        let claims = issuer.validate(&issued.token).unwrap();
        assert_eq!(claims, issued.claims);
    }

    #[test]
    fn missing_required_field_fails_to_mint() {
        let issuer = TokenIssuer::new(config()).unwrap();
        let result = issuer.generate(&input(json!({"username": "testuser"})));
        match result {
            Err(TokenError::MissingField(field)) => assert_eq!(field, "role"),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn missing_subject_fails_to_mint() {
        let issuer = TokenIssuer::new(TokenIssuerConfig::with_secret("s")).unwrap();
        let err = issuer.generate(&input(json!({"role": "admin"}))).unwrap_err();
        assert!(matches!(err, TokenError::MissingField(ref f) if f == "username"));
        assert_eq!(err.http_status_code(), 400);

        let err = issuer.generate(&input(json!({"username": 42}))).unwrap_err();
        assert!(matches!(err, TokenError::InvalidField(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = TokenIssuer::new(config()).unwrap();
        let now = Utc::now();
        let issued = issuer
            .generate_at(
                &input(json!({"username": "testuser", "role": "admin"})),
                now - Duration::hours(2),
            )
            .unwrap();

        let err = issuer.validate_at(&issued.token, now).unwrap_err();
        assert!(matches!(err, TokenError::TokenExpired));
        assert_eq!(err.http_status_code(), 401);
    }

    #[test]
    fn token_expires_exactly_at_exp() {
        let issuer = TokenIssuer::new(config()).unwrap();
        let now = Utc::now();
        let issued = issuer
            .generate_at(&input(json!({"username": "u", "role": "r"})), now)
            .unwrap();

        let just_before = now + Duration::seconds(3599);
        assert!(issuer.validate_at(&issued.token, just_before).is_ok());

        let at_expiry = now + Duration::seconds(3600);
        assert!(matches!(
            issuer.validate_at(&issued.token, at_expiry),
            Err(TokenError::TokenExpired)
        ));
    }

    #[test]
    fn algorithm_mismatch_is_rejected() {
        let hs384 = TokenIssuer::new(TokenIssuerConfig {
            algorithm: "HS384".to_string(),
            ..config()
        })
        .unwrap();
        let hs256 = TokenIssuer::new(config()).unwrap();

        let issued = hs384
            .generate(&input(json!({"username": "u", "role": "r"})))
            .unwrap();

        assert!(matches!(
            hs256.validate(&issued.token),
            Err(TokenError::AlgorithmMismatch { .. })
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issuer = TokenIssuer::new(config()).unwrap();
        let other = TokenIssuer::new(TokenIssuerConfig {
            secret: "another-secret".to_string(),
            ..config()
        })
        .unwrap();

        let issued = other
            .generate(&input(json!({"username": "u", "role": "r"})))
            .unwrap();
        assert!(matches!(
            issuer.validate(&issued.token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn token_without_required_claim_is_rejected() {
        let lenient = TokenIssuer::new(TokenIssuerConfig::with_secret("test-secret")).unwrap();
        let strict = TokenIssuer::new(config()).unwrap();

        let issued = lenient.generate(&input(json!({"username": "u"}))).unwrap();
        assert!(matches!(
            strict.validate(&issued.token),
            Err(TokenError::MissingClaim(_))
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        let issuer = TokenIssuer::new(config()).unwrap();
        assert!(matches!(
            issuer.validate("not.a.jwt"),
            Err(TokenError::InvalidToken(_))
        ));
    }

    #[test]
    fn each_token_has_a_unique_id() {
        let issuer = TokenIssuer::new(config()).unwrap();
        let data = input(json!({"username": "u", "role": "r"}));
        let a = issuer.generate(&data).unwrap();
        let b = issuer.generate(&data).unwrap();
        assert_ne!(a.claims.jti, b.claims.jti);
    }
}
