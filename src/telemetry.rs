// src/telemetry.rs
use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG_JSON: &str = "QUAKE_LOG_JSON";
const DEFAULT_FILTER: &str = "quake_dashboard=info,feed=info,store=info,refresh=info,warn";

/// Install the global tracing subscriber. Filter comes from `RUST_LOG`
/// (falls back to [`DEFAULT_FILTER`]); `QUAKE_LOG_JSON=1` switches to JSON
/// lines. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var(ENV_LOG_JSON).ok().is_some_and(|v| v == "1");

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_ok() {
        describe_metrics();
    }
}

/// One-time metrics registration so series carry descriptions once a
/// recorder is installed.
pub fn describe_metrics() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_fetch_total", "Feed fetch attempts.");
        describe_counter!("feed_errors_total", "Failed feed fetches, labelled by kind.");
        describe_counter!("feed_events_total", "Features parsed from feed documents.");
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("store_records", "Records held after the last successful load.");
        describe_gauge!("store_filtered_records", "Records passing the active filters.");
        describe_counter!(
            "store_stale_responses_total",
            "Load results dropped because a newer load superseded them."
        );
    });
}
