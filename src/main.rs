// =============================================================================
// Equity Analyst - Main Entry Point
// =============================================================================
//
// Serves daily-bar technical analysis and scoring over REST.  No state is
// carried between requests apart from the per-day bar cache and the runtime
// configuration.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod api;
mod app_state;
mod error;
mod indicators;
mod ladder;
mod market_data;
mod runtime_config;
mod signals;
mod types;

use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::runtime_config::{RuntimeConfig, CONFIG_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Equity Analyst starting up");

    let config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    if std::env::var(api::auth::ADMIN_TOKEN_ENV).map_or(true, |t| t.is_empty()) {
        warn!(
            "{} not set; policy changes over the API are disabled",
            api::auth::ADMIN_TOKEN_ENV
        );
    }

    info!(
        default_ticker = %config.default_ticker,
        lookback_days = config.lookback_days,
        scoring_policy = %config.scoring_policy,
        remote_flow = config.enable_remote_flow,
        market_index = config.enable_market_index,
        "configuration ready"
    );

    // ── 2. Shared state ──────────────────────────────────────────────────
    let state = Arc::new(AppState::new(config, CONFIG_PATH)?);

    // ── 3. API server ────────────────────────────────────────────────────
    let bind_addr =
        std::env::var("ANALYST_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "API server listening");

    let app = api::rest::router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // ── 4. Graceful shutdown ─────────────────────────────────────────────
    let stats = state.stats();
    if let Err(e) = state.config_snapshot().save(CONFIG_PATH) {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!(
        served = stats.analyses_served,
        failed = stats.analyses_failed,
        uptime_secs = stats.uptime_secs,
        "Equity Analyst shut down complete"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    warn!("Shutdown signal received - stopping gracefully");
}
