// src/lib.rs
// Public library surface for the headless runner and integration tests.

pub mod aggregate;
pub mod config;
pub mod export;
pub mod feed;
pub mod filter;
pub mod format;
pub mod model;
pub mod refresh;
pub mod store;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{aggregate, hourly_activity, magnitude_histogram, Statistics};
pub use crate::config::DashboardConfig;
pub use crate::feed::types::{FeedError, FeedSource, Timeframe};
pub use crate::feed::usgs::UsgsFeed;
pub use crate::filter::{apply_filters, FilterPatch, FilterState};
pub use crate::model::{classify, classify_depth, color_for, EarthquakeRecord, MagnitudeClass};
pub use crate::refresh::RefreshController;
pub use crate::store::{ApplicationState, LoadTicket, Store, StoreEvent};
