//! CSV export of a record set.

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};

use crate::model::EarthquakeRecord;

pub const CSV_HEADER: [&str; 8] = [
    "ID",
    "Magnitude",
    "Location",
    "Latitude",
    "Longitude",
    "Depth (km)",
    "Time",
    "URL",
];

fn opt_fixed(v: Option<f64>, places: usize) -> String {
    v.filter(|x| x.is_finite())
        .map(|x| format!("{x:.places$}"))
        .unwrap_or_default()
}

fn iso_time(ts_ms: Option<i64>) -> String {
    ts_ms
        .and_then(|t| Utc.timestamp_millis_opt(t).single())
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_default()
}

/// One row per record, absent fields as empty cells. Quoting is left to the
/// csv writer.
pub fn to_csv(records: &[EarthquakeRecord]) -> Result<String> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(CSV_HEADER).context("writing csv header")?;

    for r in records {
        w.write_record([
            r.id.clone(),
            opt_fixed(r.magnitude, 1),
            r.place.clone().unwrap_or_default(),
            opt_fixed(r.latitude, 4),
            opt_fixed(r.longitude, 4),
            opt_fixed(r.depth_km, 1),
            iso_time(r.time),
            r.detail_url.clone().unwrap_or_default(),
        ])
        .with_context(|| format!("writing csv row for {}", r.id))?;
    }

    let bytes = w.into_inner().context("flushing csv writer")?;
    String::from_utf8(bytes).context("csv output is not utf-8")
}
