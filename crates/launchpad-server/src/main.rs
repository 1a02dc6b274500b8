//! Launchpad HTTP Server
//!
//! Axum server for the landing page: Stripe subscription checkout, the Stripe
//! webhook receiver and the static front-end.

mod auth;
mod config;
mod error;
mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use launchpad_billing::{
    AccountStore, CheckoutSettings, MemoryAccountStore, PgAccountStore, StripeClient,
};

use crate::auth::SessionKeys;
use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    // Initialize account store
    let store: Arc<dyn AccountStore> = match &config.database_url {
        Some(url) => {
            let store = PgAccountStore::connect(url.expose_secret()).await?;
            store.migrate().await?;
            tracing::info!("✓ Connected to PostgreSQL");
            Arc::new(store)
        }
        None => {
            tracing::warn!("⚠ DATABASE_URL not set - using in-memory account store");
            tracing::warn!("  Accounts are lost on restart");
            Arc::new(MemoryAccountStore::new())
        }
    };

    // Initialize payments
    let stripe = StripeClient::new(
        config.stripe.secret_key.expose_secret(),
        config.stripe.webhook_secret.expose_secret(),
    )
    .with_webhook_tolerance(config.stripe.webhook_tolerance_secs);
    tracing::info!(price_id = %config.stripe.price_id, "✓ Stripe configured");

    // Build application state
    let state = AppState::new(
        store,
        Arc::new(stripe),
        CheckoutSettings::new(config.stripe.price_id.clone(), config.base_url.clone()),
        SessionKeys::new(config.auth_secret.expose_secret().as_bytes()),
    );

    let app = routes::router(state, &config.static_dir);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 launchpad server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                      - Health check");
    tracing::info!("  POST /api/create-checkout-session - Start Stripe checkout");
    tracing::info!("  POST /api/webhooks/stripe         - Stripe webhook receiver");
    tracing::info!("  GET  /*                           - Static files ({})", config.static_dir);
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
