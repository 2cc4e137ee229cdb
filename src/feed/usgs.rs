use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;

use crate::config::DashboardConfig;
use crate::feed::parse_feed;
use crate::feed::types::{FeedError, FeedSource, Timeframe};
use crate::model::EarthquakeRecord;

pub const USGS_FEED_BASE: &str = "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary";

pub struct UsgsFeed {
    mode: Mode,
}

enum Mode {
    // Owned copy of a canned document; same body for every timeframe.
    Fixture(String),
    Http {
        base_url: String,
        client: reqwest::Client,
    },
}

impl UsgsFeed {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_base_url(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("quake-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            mode: Mode::Http {
                base_url: base_url.into(),
                client,
            },
        })
    }

    pub fn from_config(cfg: &DashboardConfig) -> anyhow::Result<Self> {
        Self::from_base_url(cfg.feed_base_url.clone(), cfg.request_timeout())
    }

    async fn fetch_http(
        client: &reqwest::Client,
        url: &str,
    ) -> Result<Vec<EarthquakeRecord>, FeedError> {
        let resp = client
            .get(url)
            .header("Accept", "application/geo+json, application/json")
            .send()
            .await
            .map_err(|e| FeedError::NetworkFailure(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::HttpStatusFailure {
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FeedError::NetworkFailure(format!("reading body: {e}")))?;
        parse_feed(&body)
    }
}

#[async_trait]
impl FeedSource for UsgsFeed {
    async fn fetch(&self, timeframe: Timeframe) -> Result<Vec<EarthquakeRecord>, FeedError> {
        counter!("feed_fetch_total").increment(1);
        let res = match &self.mode {
            Mode::Fixture(s) => parse_feed(s),
            Mode::Http { base_url, client } => {
                let url = timeframe.url(base_url);
                tracing::debug!(target: "feed", %url, "fetching feed");
                Self::fetch_http(client, &url).await
            }
        };

        match &res {
            Ok(records) => {
                tracing::info!(target: "feed", timeframe = %timeframe, records = records.len(), "feed fetched")
            }
            Err(e) => {
                tracing::warn!(target: "feed", timeframe = %timeframe, kind = e.kind(), error = %e, "feed fetch failed");
                counter!("feed_errors_total", "kind" => e.kind()).increment(1);
            }
        }
        res
    }

    fn name(&self) -> &'static str {
        "USGS"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_mode_serves_the_same_body_for_any_timeframe() {
        let feed = UsgsFeed::from_fixture_str(r#"{"features":[{"id":"x","properties":{"mag":1.0}}]}"#);
        assert_eq!(feed.name(), "USGS");
        for tf in [Timeframe::Hour, Timeframe::Month] {
            let rs = feed.fetch(tf).await.unwrap();
            assert_eq!(rs.len(), 1);
            assert_eq!(rs[0].id, "x");
        }
    }

    #[tokio::test]
    async fn fixture_mode_reports_malformed_documents() {
        let feed = UsgsFeed::from_fixture_str("[]");
        let err = feed.fetch(Timeframe::Day).await.unwrap_err();
        assert_eq!(err.kind(), "malformed");
    }
}
