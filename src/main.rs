//! crowdfund-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crowdfund_gateway::auth::TokenVerifier;
use crowdfund_gateway::config::GatewayConfig;
use crowdfund_gateway::persistence::{FundingStore, MemoryStore, PostgresStore};
use crowdfund_gateway::service::spawn_lifecycle_sweep;
use crowdfund_gateway::{build_app, build_state};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting crowdfund-gateway");

    let verifier = TokenVerifier::from_config(&config.auth)?;

    // Select the store
    let store: Arc<dyn FundingStore> = if config.persistence_enabled {
        let pg = PostgresStore::connect(&config).await?;
        pg.migrate().await?;
        tracing::info!("persistence: postgres");
        Arc::new(pg)
    } else {
        tracing::warn!("persistence disabled, using in-memory store");
        Arc::new(MemoryStore::new())
    };

    let app_state = build_state(store, &config, verifier);

    if let Some(period) = config.lifecycle_sweep_interval() {
        let _sweep = spawn_lifecycle_sweep(app_state.campaign_service.as_ref().clone(), period);
        tracing::info!(period_secs = period.as_secs(), "lifecycle sweep enabled");
    }

    let app = build_app(app_state, Duration::from_secs(config.request_timeout_secs.max(1)));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
