//! # docshare-agent
//!
//! Headless sync agent. Keeps the local catalog cache warm by checking
//! staleness on a fixed interval, so a client started later opens with a
//! recent catalog even when it launches offline.

use anyhow::Context;
use docshare_client::{init_tracing, AppState, ClientConfig};
use docshare_sync::RefreshOutcome;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    init_tracing();
    info!("Starting docshare sync agent v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ClientConfig::from_env();
    info!(
        api_url = %config.api_url,
        authenticated = config.api_token.is_some(),
        interval_secs = config.sync_interval.as_secs(),
        fetch_timeout_secs = config.fetch_timeout.as_secs(),
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Open the cache and wire the sync layer
    // -----------------------------------------------------------------------
    let interval = config.sync_interval;
    let state = AppState::open(config).context("failed to initialize client state")?;
    info!(
        records = state.cache.len(),
        last_refresh_at = state.coordinator.policy().last_refresh_at(),
        "Catalog cache ready"
    );

    // -----------------------------------------------------------------------
    // 4. Refresh on an interval until Ctrl+C
    // -----------------------------------------------------------------------
    let mut ticker = tokio::time::interval(interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match state.documents.refresh_documents_if_stale().await {
                    Ok(RefreshOutcome::Fresh) => debug!("catalog still fresh"),
                    Ok(RefreshOutcome::Refreshed { records }) => {
                        info!(records, "catalog synced");
                    }
                    Err(e) => warn!(error = %e, "sync failed, serving cached catalog"),
                }
            }
            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    Ok(())
}
