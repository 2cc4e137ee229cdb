//! Headless dashboard runner.
//! Polls the configured feed on the refresh interval and logs a summary of
//! every successful load until Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;

use quake_dashboard::{
    format::format_magnitude, telemetry, DashboardConfig, RefreshController, Store, StoreEvent,
    UsgsFeed,
};

fn log_summary(store: &Store) {
    let (filtered, total) = store.counts();
    let stats = store.statistics();
    tracing::info!(
        total,
        filtered,
        max_magnitude = %format_magnitude(Some(stats.max_magnitude)),
        avg_magnitude = %format_magnitude(Some(stats.avg_magnitude)),
        max_depth_km = stats.max_depth,
        "earthquakes loaded"
    );
    for bucket in store.magnitude_histogram() {
        tracing::info!(label = %bucket.label, count = bucket.count, "magnitude bucket");
    }
    let busiest = store
        .hourly_activity(chrono::Utc::now())
        .into_iter()
        .max_by_key(|h| h.count)
        .filter(|h| h.count > 0);
    if let Some(h) = busiest {
        tracing::info!(hour = %h.label, count = h.count, "busiest UTC hour in the last 24h");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cfg = DashboardConfig::load_default().context("loading dashboard config")?;
    tracing::info!(
        base_url = %cfg.feed_base_url,
        timeframe = %cfg.timeframe,
        refresh_secs = cfg.refresh_interval_secs,
        "starting earthquake dashboard"
    );

    let store = Arc::new(Store::new());
    let source = Arc::new(UsgsFeed::from_config(&cfg).context("building feed client")?);
    let controller = RefreshController::new(
        Arc::clone(&store),
        source,
        cfg.timeframe,
        cfg.refresh_interval(),
    );

    let mut events = store.subscribe();
    controller.start_auto_refresh();

    loop {
        tokio::select! {
            ev = events.recv() => match ev {
                Ok(StoreEvent::LoadSucceeded { .. }) => log_summary(&store),
                Ok(StoreEvent::LoadFailed { message }) => {
                    tracing::warn!(%message, "refresh failed; keeping previous data");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => tracing::debug!(skipped = n, "event receiver lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    controller.shutdown();
    Ok(())
}
