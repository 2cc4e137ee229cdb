// src/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::feed::types::Timeframe;
use crate::feed::usgs::USGS_FEED_BASE;

pub const ENV_CONFIG_PATH: &str = "QUAKE_DASHBOARD_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/dashboard.toml";

/// Five minutes, as on the live site.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 5 * 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub feed_base_url: String,
    pub timeframe: Timeframe,
    pub refresh_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            feed_base_url: USGS_FEED_BASE.to_string(),
            timeframe: Timeframe::Day,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl DashboardConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s).context("parsing dashboard config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading dashboard config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Load using env var + fallbacks:
    /// 1) $QUAKE_DASHBOARD_CONFIG
    /// 2) config/dashboard.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        if self.feed_base_url.trim().is_empty() {
            bail!("feed_base_url must not be empty");
        }
        if self.refresh_interval_secs == 0 {
            bail!("refresh_interval_secs must be > 0");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be > 0");
        }
        Ok(())
    }
}
