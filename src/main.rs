//! Paylane server binary.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use paylane::adapters::cryptomus::{CryptomusAdapter, CryptomusConfig};
use paylane::adapters::http::billing::{billing_router, BillingAppState};
use paylane::adapters::memory::{
    InMemoryCoupons, InMemoryPaymentIntents, InMemoryProducts, InMemoryPurchases,
    InMemoryReminders, InMemorySubscriptions, InMemoryUsers, InMemoryWebhookEvents,
    RecordingNotifier,
};
use paylane::adapters::stripe::{StripeCardAdapter, StripeConfig};
use paylane::application::handlers::billing::RedirectUrls;
use paylane::config::AppConfig;
use paylane::domain::billing::{CardWebhookVerifier, CryptoSigner};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(&config.server.log_level)
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = build_state(&config);

    let cors = if config.server.cors_origins_list().is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<axum::http::HeaderValue> = config
            .server
            .cors_origins_list()
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins)
    };

    let app = Router::new()
        .nest("/api", billing_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors);

    let addr = config.server.socket_addr();
    tracing::info!(%addr, "paylane listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Wires the application state.
///
/// The document store here is the in-process adapter; deployments embed
/// this crate next to the real store and swap the repository
/// implementations at this seam.
fn build_state(config: &AppConfig) -> BillingAppState {
    let signer = CryptoSigner::new(
        config.cryptomus.api_key.clone(),
        config.cryptomus.merchant_id.clone(),
    );

    BillingAppState {
        products: Arc::new(InMemoryProducts::new()),
        coupons: Arc::new(InMemoryCoupons::new()),
        subscriptions: Arc::new(InMemorySubscriptions::new()),
        purchases: Arc::new(InMemoryPurchases::new()),
        intents: Arc::new(InMemoryPaymentIntents::new()),
        reminders: Arc::new(InMemoryReminders::new()),
        users: Arc::new(InMemoryUsers::new()),
        webhook_events: Arc::new(InMemoryWebhookEvents::new()),
        notifier: Arc::new(RecordingNotifier::new()),
        card: Arc::new(StripeCardAdapter::new(StripeConfig::new(
            config.stripe.api_key.clone(),
        ))),
        crypto: Arc::new(CryptomusAdapter::new(
            CryptomusConfig::new(),
            signer.clone(),
        )),
        card_verifier: CardWebhookVerifier::new(config.stripe.webhook_secret.clone()),
        crypto_signer: signer,
        urls: RedirectUrls::new(config.urls.public_base_url.clone()),
    }
}
