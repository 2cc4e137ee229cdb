//! Display helpers for list rows, popups and chart captions.

use chrono::{DateTime, TimeZone, Utc};

use crate::model::classify_depth;

/// Sentinel for an absent magnitude.
pub const NOT_AVAILABLE: &str = "N/A";
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

/// One decimal place, or `"N/A"` for absent input.
pub fn format_magnitude(magnitude: Option<f64>) -> String {
    match magnitude.filter(|m| m.is_finite()) {
        Some(m) => format!("{m:.1}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// `"12.3 km (shallow)"`; `"Unknown"` when absent.
pub fn format_depth(depth_km: Option<f64>) -> String {
    match depth_km.filter(|d| d.is_finite()) {
        Some(d) => format!("{:.1} km ({})", d.abs(), classify_depth(d).label()),
        None => "Unknown".to_string(),
    }
}

/// `"35.000°N, 139.000°E"`
pub fn format_coordinates(lat: f64, lon: f64) -> String {
    let lat_dir = if lat >= 0.0 { 'N' } else { 'S' };
    let lon_dir = if lon >= 0.0 { 'E' } else { 'W' };
    format!("{:.3}°{lat_dir}, {:.3}°{lon_dir}", lat.abs(), lon.abs())
}

pub fn display_place(place: Option<&str>) -> &str {
    match place {
        Some(p) if !p.trim().is_empty() => p,
        _ => UNKNOWN_LOCATION,
    }
}

fn to_utc(ts_ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ts_ms).single()
}

/// Absolute UTC time, e.g. `"Mar 4, 2025, 13:05 UTC"`.
pub fn format_time(ts_ms: Option<i64>) -> String {
    ts_ms
        .and_then(to_utc)
        .map(|dt| dt.format("%b %-d, %Y, %H:%M UTC").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Relative age like `"5m ago"`; older than a week falls back to a date.
pub fn format_relative_time(ts_ms: Option<i64>, now: DateTime<Utc>) -> String {
    let Some(then) = ts_ms.and_then(to_utc) else {
        return "Unknown".to_string();
    };
    let diff = now.signed_duration_since(then);
    let minutes = diff.num_minutes();
    let hours = diff.num_hours();
    let days = diff.num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else {
        then.format("%Y-%m-%d").to_string()
    }
}
