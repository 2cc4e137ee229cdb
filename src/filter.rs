//! # Filter Engine
//! Magnitude threshold AND case-insensitive region substring over a record
//! set. Always recomputed from scratch; there is no incremental path.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::model::EarthquakeRecord;

pub const MIN_MAGNITUDE_FLOOR: f64 = 0.0;
pub const MIN_MAGNITUDE_CEIL: f64 = 9.0;

/// Active filters. `Default` filters nothing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterState {
    /// In `[0, 9]`.
    pub min_magnitude: f64,
    /// Case-insensitive substring of `place`; empty matches everything.
    pub region: String,
}

/// Partial update merged into a [`FilterState`]. `None` leaves a field alone.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterPatch {
    #[serde(default)]
    pub min_magnitude: Option<f64>,
    #[serde(default)]
    pub region: Option<String>,
}

/// Quick-filter thresholds offered next to the slider.
pub const MAGNITUDE_PRESETS: [(&str, f64); 6] = [
    ("All", 0.0),
    ("3.0+", 3.0),
    ("4.0+", 4.0),
    ("5.0+", 5.0),
    ("6.0+", 6.0),
    ("7.0+", 7.0),
];

impl FilterPatch {
    /// Patch for a quick-filter label from [`MAGNITUDE_PRESETS`]. Leaves the
    /// region alone.
    pub fn preset(label: &str) -> Option<Self> {
        MAGNITUDE_PRESETS
            .iter()
            .find(|(l, _)| l.eq_ignore_ascii_case(label.trim()))
            .map(|&(_, m)| Self::min_magnitude(m))
    }

    pub fn min_magnitude(m: f64) -> Self {
        Self {
            min_magnitude: Some(m),
            region: None,
        }
    }

    pub fn region(r: impl Into<String>) -> Self {
        Self {
            min_magnitude: None,
            region: Some(r.into()),
        }
    }
}

impl FilterState {
    /// Merge a patch, clamping the threshold into range. NaN resets to 0.
    pub fn merge(&mut self, patch: FilterPatch) {
        if let Some(m) = patch.min_magnitude {
            self.min_magnitude = clamp_magnitude(m);
        }
        if let Some(r) = patch.region {
            self.region = r;
        }
    }

    pub fn is_active(&self) -> bool {
        self.min_magnitude > MIN_MAGNITUDE_FLOOR || !self.region.is_empty()
    }

    /// Whether a single record passes both tests.
    pub fn matches(&self, record: &EarthquakeRecord) -> bool {
        self.matches_with_needle(record, &self.region.to_lowercase())
    }

    fn matches_with_needle(&self, record: &EarthquakeRecord, needle: &str) -> bool {
        if record.magnitude_or_zero() < self.min_magnitude {
            return false;
        }
        if needle.is_empty() {
            return true;
        }
        record
            .place
            .as_deref()
            .unwrap_or_default()
            .to_lowercase()
            .contains(needle)
    }
}

fn clamp_magnitude(m: f64) -> f64 {
    if m.is_nan() {
        MIN_MAGNITUDE_FLOOR
    } else {
        m.clamp(MIN_MAGNITUDE_FLOOR, MIN_MAGNITUDE_CEIL)
    }
}

/// Subset of `records` passing `filters`, preserving input order.
pub fn apply_filters(records: &[EarthquakeRecord], filters: &FilterState) -> Vec<EarthquakeRecord> {
    let needle = filters.region.to_lowercase();
    records
        .iter()
        .filter(|r| filters.matches_with_needle(r, &needle))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    Magnitude,
    Time,
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

fn sort_value(r: &EarthquakeRecord, key: SortKey) -> f64 {
    match key {
        SortKey::Magnitude => r.magnitude_or_zero(),
        SortKey::Time => r.time.unwrap_or(0) as f64,
        SortKey::Depth => r.depth_km.filter(|d| d.is_finite()).unwrap_or(0.0),
    }
}

/// Stable sort in place; absent values sort as 0.
pub fn sort_records(records: &mut [EarthquakeRecord], key: SortKey, order: SortOrder) {
    records.sort_by(|a, b| {
        let ord = sort_value(a, key)
            .partial_cmp(&sort_value(b, key))
            .unwrap_or(Ordering::Equal);
        match order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    });
}
