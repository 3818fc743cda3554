//! OpenAuth Gateway - HTTP ingress with a hot-swapped route table.
//!
//! This is the main entry point for the gateway service. It starts with only
//! the control routes live and serves whatever configuration documents are
//! later published to `POST /config`.
//!
//! # Identity authority
//!
//! Set `OPENAUTH_IDENTITY_URL` to review bearer tokens against an HTTP
//! authority. Otherwise the in-cluster Kubernetes `TokenReview` API is used,
//! restricted to `OPENAUTH_REVIEW_AUDIENCES` when set.
//!
//! # Dev Mode
//!
//! Build with `--features dev-mode` to use a static authority that needs no
//! network access. Use tokens in format: `test-token:<namespace>:<name>`

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "dev-mode")]
use openauth_auth::StaticIdentityAuthority;
#[cfg(not(feature = "dev-mode"))]
use openauth_auth::{HttpIdentityAuthority, TokenReviewAuthority};
use openauth_auth::{AllowList, IdentityAuthority, IdentityGate, TokenIssuer};
use openauth_engine::{ConfigController, FilterEnvironment};
use openauth_gateway::{create_router, handlers, GatewayConfig, GatewayState};

/// How often idle rate-limit buckets are swept.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Buckets untouched for this long are dropped.
const BUCKET_MAX_IDLE: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,openauth=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting OpenAuth Gateway");

    let config = GatewayConfig::from_env()?;
    tracing::info!(
        listen_addr = %config.listen_addr,
        identity_url = ?config.identity_url,
        initial_config = ?config.initial_config,
        filter_timeout_ms = config.filter_timeout_ms,
        "Gateway configuration loaded"
    );

    let issuer = Arc::new(TokenIssuer::new(config.token.clone())?);
    tracing::info!(
        algorithm = ?issuer.algorithm(),
        required_fields = ?issuer.required_fields(),
        "Token issuer initialized"
    );

    let allow_list = match &config.allowed_accounts {
        Some(accounts) => AllowList::parse_accounts(accounts)?,
        None => AllowList::default(),
    };
    tracing::info!(accounts = allow_list.len(), "Allow-list loaded");

    #[cfg(feature = "dev-mode")]
    let authority: Arc<dyn IdentityAuthority> = {
        tracing::warn!("DEV MODE ENABLED - using static identity authority");
        tracing::warn!("Use tokens in format: test-token:<namespace>:<name>");
        Arc::new(StaticIdentityAuthority::default())
    };

    #[cfg(not(feature = "dev-mode"))]
    let authority: Arc<dyn IdentityAuthority> = match &config.identity_url {
        Some(url) => {
            tracing::info!(identity_url = %url, "Using HTTP identity authority");
            Arc::new(HttpIdentityAuthority::new(url.clone(), config.filter_timeout())?)
        }
        None => {
            tracing::info!(
                audiences = ?config.review_audiences,
                "Using Kubernetes TokenReview identity authority"
            );
            let authority = TokenReviewAuthority::try_default().await?;
            if config.review_audiences.is_empty() {
                Arc::new(authority)
            } else {
                Arc::new(authority.with_audiences(config.review_audiences.clone()))
            }
        }
    };

    let gate = Arc::new(IdentityGate::new(authority, allow_list));
    let environment = FilterEnvironment::new(config.filter_timeout())?;
    let rate_limits = Arc::clone(environment.rate_limits());
    let controller = Arc::new(ConfigController::new(
        gate,
        handlers::registry(&issuer),
        environment,
    )?);

    if let Some(path) = &config.initial_config {
        let document = tokio::fs::read(path).await?;
        let receipt = controller.load_document(&document).await?;
        tracing::info!(
            path = %path,
            generation = receipt.generation,
            routes = receipt.routes,
            "Initial configuration loaded"
        );
    }

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            let pruned = rate_limits.prune_idle(BUCKET_MAX_IDLE);
            if pruned > 0 {
                tracing::debug!(pruned, remaining = rate_limits.len(), "Pruned idle rate-limit buckets");
            }
        }
    });

    let listen_addr = config.listen_addr.clone();
    let app = create_router(GatewayState::new(controller, config));

    // Start HTTP server
    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
