//! # Derived Aggregation Engine
//! Pure O(n) statistics and histograms over a record set. Every function is
//! total: empty or partially populated input yields zeros, never NaN.

use chrono::{DateTime, TimeZone, Timelike, Utc};
use serde::Serialize;

use crate::model::{EarthquakeRecord, MagnitudeClass};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Summary numbers shown above the charts.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub max_magnitude: f64,
    pub min_magnitude: f64,
    pub avg_magnitude: f64,
    pub max_depth: f64,
    pub avg_depth: f64,
    /// `(earliest, latest)` timestamps in ms, if any record has one.
    pub time_range: Option<(i64, i64)>,
}

#[derive(Default)]
struct Acc {
    n: usize,
    // running mean; a plain sum overflows for extreme inputs
    mean: f64,
    min: f64,
    max: f64,
}

impl Acc {
    fn push(&mut self, v: f64) {
        if self.n == 0 {
            self.min = v;
            self.max = v;
        } else {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
        self.n += 1;
        self.mean += (v - self.mean) / self.n as f64;
    }

    // Floors at 0 so callers only ever see finite, non-negative numbers.
    fn max(&self) -> f64 {
        if self.n == 0 { 0.0 } else { self.max.max(0.0) }
    }

    fn min(&self) -> f64 {
        if self.n == 0 { 0.0 } else { self.min.max(0.0) }
    }

    fn avg(&self) -> f64 {
        if self.n == 0 || !self.mean.is_finite() {
            0.0
        } else {
            self.mean.max(0.0)
        }
    }
}

/// Statistics over `records`, skipping absent/non-finite values per field.
pub fn aggregate(records: &[EarthquakeRecord]) -> Statistics {
    let mut mags = Acc::default();
    let mut depths = Acc::default();
    let mut range: Option<(i64, i64)> = None;

    for r in records {
        if let Some(m) = r.magnitude.filter(|m| m.is_finite()) {
            mags.push(m);
        }
        if let Some(d) = r.depth_km.filter(|d| d.is_finite()) {
            depths.push(d);
        }
        if let Some(t) = r.time {
            range = Some(match range {
                None => (t, t),
                Some((lo, hi)) => (lo.min(t), hi.max(t)),
            });
        }
    }

    Statistics {
        total: records.len(),
        max_magnitude: mags.max(),
        min_magnitude: mags.min(),
        avg_magnitude: mags.avg(),
        max_depth: depths.max(),
        avg_depth: depths.avg(),
        time_range: range,
    }
}

// ---------------------------------------------------------------------------
// Magnitude histogram
// ---------------------------------------------------------------------------

/// Fixed bucket boundaries `[min, max)`.
pub const MAGNITUDE_BUCKETS: [(f64, f64); 4] = [(0.0, 2.5), (2.5, 4.5), (4.5, 6.0), (6.0, 10.0)];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MagnitudeBucket {
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub color: &'static str,
    pub count: usize,
}

const BUCKET_LABELS: [&str; 4] = [
    "Minor (0-2.5)",
    "Light (2.5-4.5)",
    "Moderate (4.5-6.0)",
    "Strong (6.0+)",
];

fn bucket_index(m: f64) -> usize {
    // out-of-range magnitudes clamp into the edge buckets
    MAGNITUDE_BUCKETS
        .iter()
        .position(|&(lo, hi)| m >= lo && m < hi)
        .unwrap_or(if m < MAGNITUDE_BUCKETS[0].0 { 0 } else { MAGNITUDE_BUCKETS.len() - 1 })
}

/// Four ascending buckets, always emitted. Records without a magnitude are
/// not counted.
pub fn magnitude_histogram(records: &[EarthquakeRecord]) -> Vec<MagnitudeBucket> {
    let mut counts = [0usize; MAGNITUDE_BUCKETS.len()];
    for m in records.iter().filter_map(|r| r.magnitude.filter(|m| m.is_finite())) {
        counts[bucket_index(m)] += 1;
    }

    MAGNITUDE_BUCKETS
        .iter()
        .enumerate()
        .map(|(i, &(min, max))| MagnitudeBucket {
            label: BUCKET_LABELS[i].to_string(),
            min,
            max,
            color: MagnitudeClass::BANDS[i].color(),
            count: counts[i],
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Hourly activity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourBucket {
    /// UTC hour of day, 0..=23.
    pub hour: u32,
    pub count: usize,
    /// `"HH:00"`
    pub label: String,
}

/// 24 buckets keyed by UTC hour-of-day for records at most 24h older than
/// `now`. Records from different days that share an hour land in the same
/// bucket.
pub fn hourly_activity(records: &[EarthquakeRecord], now: DateTime<Utc>) -> Vec<HourBucket> {
    let now_ms = now.timestamp_millis();
    let mut counts = [0usize; 24];

    for t in records.iter().filter_map(|r| r.time) {
        if now_ms.saturating_sub(t) > DAY_MS {
            continue;
        }
        if let Some(dt) = Utc.timestamp_millis_opt(t).single() {
            counts[dt.hour() as usize] += 1;
        }
    }

    (0..24u32)
        .map(|hour| HourBucket {
            hour,
            count: counts[hour as usize],
            label: format!("{hour:02}:00"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, mag: Option<f64>, depth: Option<f64>, time: Option<i64>) -> EarthquakeRecord {
        let mut r = EarthquakeRecord::new(id);
        r.magnitude = mag;
        r.depth_km = depth;
        r.time = time;
        r
    }

    #[test]
    fn empty_set_is_all_zero() {
        let s = aggregate(&[]);
        assert_eq!(s, Statistics::default());
        let h = magnitude_histogram(&[]);
        assert_eq!(h.len(), 4);
        assert!(h.iter().all(|b| b.count == 0));
        assert_eq!(hourly_activity(&[], Utc::now()).len(), 24);
    }

    #[test]
    fn absent_values_are_ignored_not_zeroed() {
        let rs = vec![
            rec("a", Some(5.2), Some(10.0), Some(1_000)),
            rec("b", Some(2.1), None, Some(500)),
            rec("c", None, Some(300.0), None),
        ];
        let s = aggregate(&rs);
        assert_eq!(s.total, 3);
        assert_eq!(s.max_magnitude, 5.2);
        assert_eq!(s.min_magnitude, 2.1);
        assert!((s.avg_magnitude - 3.65).abs() < 1e-9);
        assert_eq!(s.max_depth, 300.0);
        assert_eq!(s.avg_depth, 155.0);
        assert_eq!(s.time_range, Some((500, 1_000)));
    }

    #[test]
    fn extreme_values_keep_statistics_finite() {
        let rs = vec![
            rec("a", Some(1e308), Some(1e308), None),
            rec("b", Some(1e308), Some(1e308), None),
        ];
        let s = aggregate(&rs);
        assert_eq!(s.avg_magnitude, 1e308);
        assert_eq!(s.avg_depth, 1e308);
        assert!(s.max_magnitude.is_finite());

        // v - mean overflows here; the result is clamped, not infinite
        let rs = vec![rec("lo", Some(-1e308), None, None), rec("hi", Some(1e308), None, None)];
        let s = aggregate(&rs);
        assert!(s.avg_magnitude.is_finite() && s.avg_magnitude >= 0.0);
    }

    #[test]
    fn boundaries_go_to_the_higher_bucket() {
        let rs: Vec<_> = [2.5, 4.5, 6.0, 2.49, 11.0, -0.3]
            .iter()
            .enumerate()
            .map(|(i, m)| rec(&i.to_string(), Some(*m), None, None))
            .collect();
        let counts: Vec<usize> = magnitude_histogram(&rs).iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 1, 1, 2]);
    }

    #[test]
    fn bucket_labels() {
        let labels: Vec<String> = magnitude_histogram(&[]).into_iter().map(|b| b.label).collect();
        assert_eq!(
            labels,
            vec!["Minor (0-2.5)", "Light (2.5-4.5)", "Moderate (4.5-6.0)", "Strong (6.0+)"]
        );
    }

    #[test]
    fn hourly_uses_utc_hour_and_24h_cutoff() {
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 12, 30, 0).unwrap();
        let at = |d: u32, h: u32| {
            Some(Utc.with_ymd_and_hms(2025, 6, d, h, 5, 0).unwrap().timestamp_millis())
        };
        let rs = vec![
            rec("a", None, None, at(2, 3)),
            rec("b", None, None, at(1, 13)),
            rec("c", None, None, at(2, 13)), // different day, same hour as b
            rec("d", None, None, at(1, 11)), // older than 24h
            rec("e", None, None, None),
        ];
        let h = hourly_activity(&rs, now);
        assert_eq!(h[3].count, 1);
        assert_eq!(h[13].count, 2);
        assert_eq!(h[11].count, 0);
        assert_eq!(h.iter().map(|b| b.count).sum::<usize>(), 3);
        assert_eq!(h[7].label, "07:00");
    }
}
