use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kopi_storefront::api::{build_router, AppState};
use kopi_storefront::config::AppConfig;
use kopi_storefront::payment::InvoiceClient;
use kopi_storefront::shipping::RateClient;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(AppConfig::load()?);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    tracing::debug!(?config, "configuration loaded");

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let rates = match &config.rate_base_url {
        Some(base) => RateClient::with_base_url(
            &config.rate_api_key,
            config.http_timeout_secs,
            config.retry_policy(),
            base,
        )?,
        None => RateClient::new(
            &config.rate_api_key,
            config.http_timeout_secs,
            config.retry_policy(),
        )?,
    };
    let invoices = match &config.payment_base_url {
        Some(base) => InvoiceClient::with_base_url(
            &config.payment_secret_key,
            &config.public_base_url,
            config.http_timeout_secs,
            base,
        )?,
        None => InvoiceClient::new(
            &config.payment_secret_key,
            &config.public_base_url,
            config.http_timeout_secs,
        )?,
    };

    let bind_addr = config.bind_addr;
    let app = build_router(AppState::new(db, config, rates, invoices));

    tracing::info!("kopi-storefront listening on {bind_addr}");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
