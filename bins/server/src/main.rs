//! PharmaCare API Server
//!
//! Main entry point for the PharmaCare backend service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use mockable::{Clock, DefaultClock};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pharmacare_api::{AppState, create_router};
use pharmacare_core::{DataStore, PaymentReconciler, StoreHandles};
use pharmacare_db::{SeaStore, connect_pool};
use pharmacare_gateway::{GatewayClient, GatewaySettings};
use pharmacare_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pharmacare=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    // Two pools: the standard role for caller-scoped reads, the elevated
    // role for login, webhooks, and cross-tenant propagation.
    let db = &config.database;
    let standard = connect_pool(&db.url, db.max_connections, db.min_connections)
        .await
        .context("failed to connect to database")?;
    let elevated = connect_pool(db.elevated_url(), db.max_connections, db.min_connections)
        .await
        .context("failed to connect to database with the elevated role")?;
    info!(
        separate_elevated_role = db.elevated_url.is_some(),
        "Connected to database"
    );

    let standard: Arc<dyn DataStore> = Arc::new(SeaStore::new(standard));
    let elevated: Arc<dyn DataStore> = Arc::new(SeaStore::new(elevated));
    let stores = StoreHandles::new(standard, elevated);

    let session_ttl_secs = i64::try_from(config.jwt.session_ttl_secs)
        .context("jwt.session_ttl_secs is out of range")?;
    let jwt_service = Arc::new(JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        session_ttl_secs,
    }));

    let payment = &config.payment;
    let verify_timeout = Duration::from_secs(payment.verify_timeout_secs);
    let gateway = GatewayClient::new(GatewaySettings {
        base_url: payment.base_url.clone(),
        secret_key: payment.secret_key.clone(),
        redirect_url: payment.redirect_url.clone(),
        timeout: verify_timeout,
    })
    .context("failed to build payment gateway client")?;
    info!(base_url = %payment.base_url, currency = %payment.currency, "Payment gateway configured");

    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(DefaultClock);
    let payments = PaymentReconciler::new(stores.elevated(), Arc::new(gateway), Arc::clone(&clock))
        .with_verify_timeout(verify_timeout)
        .with_default_currency(payment.currency.clone());

    let state = AppState::new(&stores, jwt_service, payments, clock)
        .with_verbose_errors(config.auth.verbose_errors)
        .with_webhook_hash(payment.webhook_hash.clone());
    if state.webhook_hash.is_none() {
        tracing::warn!("payment.webhook_hash is not set; webhook deliveries are not authenticated");
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
