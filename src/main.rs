//! HK Transit cache warmer
//!
//! Restores the persisted caches, loads MTR reference data, prefetches the
//! KMB stop and route listings, then keeps the expiry sweep running until
//! shutdown.

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hk_transit::{spawn_sweep_task, AppState, Config};

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Assemble cache, fetcher and services
/// 4. Restore the persisted KMB cache
/// 5. Start background expiry sweep
/// 6. Initialize MTR reference data and warm the KMB listings
/// 7. Persist and stop on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hk_transit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting HK Transit cache warmer");

    let config = Config::from_env();
    info!(
        "Configuration loaded: kmb={}, cache_dir={}, max_retries={}, sweep_interval={}s",
        config.kmb_base_url,
        config.cache_dir.display(),
        config.max_retries,
        config.sweep_interval_secs
    );

    let state = AppState::from_config(&config).context("failed to assemble services")?;

    if let Err(e) = state.cache.restore().await {
        warn!("Starting with an empty cache: {}", e);
    }

    let sweep_handle = spawn_sweep_task(state.cache.clone(), config.sweep_interval());
    info!("Background expiry sweep started");

    if let Err(e) = state.mtr.initialize().await {
        warn!("MTR reference data unavailable: {}", e);
    }
    match state.kmb.fetch_all_stops().await {
        Ok(stops) => info!("{} KMB stops available", stops.len()),
        Err(e) => warn!("KMB stops unavailable: {}", e),
    }
    match state.kmb.fetch_all_route_stops().await {
        Ok(route_stops) => info!("{} KMB route stops available", route_stops.len()),
        Err(e) => warn!("KMB route stops unavailable: {}", e),
    }

    shutdown_signal().await;

    sweep_handle.abort();
    warn!("Expiry sweep aborted");

    let stats = state.cache.stats().await;
    info!(
        "Cache stats: {} hits, {} misses ({:.1}% hit rate), {} stale fallbacks, {} swept",
        stats.hits,
        stats.misses,
        stats.hit_rate() * 100.0,
        stats.stale_fallbacks,
        stats.swept
    );

    state
        .cache
        .persist()
        .await
        .context("failed to persist cache on shutdown")?;
    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
