//! Kubernetes `TokenReview` identity authority.

use async_trait::async_trait;
use k8s_openapi::api::authentication::v1::{TokenReview, TokenReviewSpec};
use kube::api::{Api, ObjectMeta, PostParams};
use kube::Client;
use tracing::debug;

use crate::error::{AuthError, Result};
use crate::identity::{IdentityAuthority, IdentityReview};

/// Verifies bearer tokens by creating a `TokenReview` against the API server.
pub struct TokenReviewAuthority {
    client: Client,
    audiences: Option<Vec<String>>,
}

impl TokenReviewAuthority {
    /// Connect using in-cluster config or the local kubeconfig.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if no Kubernetes client can be built.
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| AuthError::Config(format!("failed to create Kubernetes client: {e}")))?;
        Ok(Self::with_client(client))
    }

    /// Use a pre-configured client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            audiences: None,
        }
    }

    /// Restrict reviews to tokens issued for these audiences.
    #[must_use]
    pub fn with_audiences(mut self, audiences: Vec<String>) -> Self {
        self.audiences = Some(audiences);
        self
    }
}

#[async_trait]
impl IdentityAuthority for TokenReviewAuthority {
    async fn review(&self, token: &str) -> Result<IdentityReview> {
        let request = TokenReview {
            metadata: ObjectMeta::default(),
            spec: TokenReviewSpec {
                token: Some(token.to_string()),
                audiences: self.audiences.clone(),
            },
            status: None,
        };

        let api: Api<TokenReview> = Api::all(self.client.clone());
        let response = api
            .create(&PostParams::default(), &request)
            .await
            .map_err(|e| AuthError::AuthorityUnavailable(format!("TokenReview failed: {e}")))?;

        let status = response.status.unwrap_or_default();
        let review = IdentityReview {
            authenticated: status.authenticated.unwrap_or(false),
            principal: status.user.and_then(|u| u.username),
        };

        debug!(
            authenticated = review.authenticated,
            principal = ?review.principal,
            "TokenReview completed"
        );

        Ok(review)
    }
}
