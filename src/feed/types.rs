// src/feed/types.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::model::EarthquakeRecord;

/// Closed set of summary feeds the client knows how to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Hour,
    #[default]
    Day,
    Week,
    Month,
}

impl Timeframe {
    pub fn key(self) -> &'static str {
        match self {
            Timeframe::Hour => "hour",
            Timeframe::Day => "day",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
        }
    }

    /// Path segment appended to the feed base URL.
    pub fn path(self) -> &'static str {
        match self {
            Timeframe::Hour => "all_hour.geojson",
            Timeframe::Day => "all_day.geojson",
            Timeframe::Week => "all_week.geojson",
            Timeframe::Month => "all_month.geojson",
        }
    }

    /// `{base}/{path}` with exactly one slash between them.
    pub fn url(self, base: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.path())
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let k = s.trim().to_ascii_lowercase();
        match k.strip_prefix("all_").unwrap_or(k.as_str()) {
            "hour" => Ok(Timeframe::Hour),
            "day" => Ok(Timeframe::Day),
            "week" => Ok(Timeframe::Week),
            "month" => Ok(Timeframe::Month),
            _ => Err(format!("unknown timeframe '{s}'")),
        }
    }
}

/// Why a fetch produced no records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    /// Transport, DNS or timeout failure.
    #[error("Failed to fetch earthquake data: network error: {0}")]
    NetworkFailure(String),
    #[error("Failed to fetch earthquake data: HTTP error! status: {status}")]
    HttpStatusFailure { status: u16 },
    /// Body was not JSON or had no `features` array.
    #[error("Failed to fetch earthquake data: invalid data format: {0}")]
    MalformedFeed(String),
    /// Caller aborted the fetch. Never shown to the user.
    #[error("fetch cancelled")]
    Cancelled,
}

impl FeedError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FeedError::Cancelled)
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedError::NetworkFailure(_) => "network",
            FeedError::HttpStatusFailure { .. } => "http_status",
            FeedError::MalformedFeed(_) => "malformed",
            FeedError::Cancelled => "cancelled",
        }
    }
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, timeframe: Timeframe) -> Result<Vec<EarthquakeRecord>, FeedError>;
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Owner side of a cancellation pair; dropping it does not cancel.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observer side handed to the fetch.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled; pends forever if the handle goes away first.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Run `source.fetch` until it finishes or `signal` fires, whichever is first.
pub async fn fetch_cancellable(
    source: &dyn FeedSource,
    timeframe: Timeframe,
    mut signal: CancelSignal,
) -> Result<Vec<EarthquakeRecord>, FeedError> {
    if signal.is_cancelled() {
        return Err(FeedError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = signal.cancelled() => Err(FeedError::Cancelled),
        res = source.fetch(timeframe) => res,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_keys_and_urls() {
        assert_eq!("day".parse::<Timeframe>().unwrap(), Timeframe::Day);
        assert_eq!("all_week".parse::<Timeframe>().unwrap(), Timeframe::Week);
        assert_eq!(" Hour ".parse::<Timeframe>().unwrap(), Timeframe::Hour);
        assert!("year".parse::<Timeframe>().is_err());
        assert_eq!(
            Timeframe::Day.url("https://example.test/summary/"),
            "https://example.test/summary/all_day.geojson"
        );
    }

    #[test]
    fn error_messages_are_user_facing() {
        let e = FeedError::HttpStatusFailure { status: 503 };
        assert_eq!(
            e.to_string(),
            "Failed to fetch earthquake data: HTTP error! status: 503"
        );
        assert!(FeedError::Cancelled.is_cancelled());
        assert!(!e.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_signal_resolves_after_cancel() {
        let (handle, mut signal) = cancel_pair();
        assert!(!signal.is_cancelled());
        handle.cancel();
        signal.cancelled().await;
        assert!(signal.is_cancelled());
    }
}
