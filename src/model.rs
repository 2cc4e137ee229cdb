//! # Earthquake Record Model
//! Normalized shape of one feed entry plus the pure classification functions
//! shared by the map, the list and the charts.
//!
//! One canonical magnitude table is used everywhere (label, color, marker
//! radius, description). Its cut points line up with the histogram buckets
//! in [`crate::aggregate`]:
//!
//! | band     | range          |
//! |----------|----------------|
//! | Minor    | `< 2.5`        |
//! | Light    | `[2.5, 4.5)`   |
//! | Moderate | `[4.5, 6.0)`   |
//! | Strong   | `[6.0, 7.0)`   |
//! | Major    | `[7.0, 8.0)`   |
//! | Great    | `>= 8.0`       |
//!
//! Absent or non-finite magnitude is `Unknown`, never the lowest band.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// One earthquake event as seen by the rest of the crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthquakeRecord {
    /// Stable key for selection and list rendering.
    pub id: String,
    pub place: Option<String>,
    pub magnitude: Option<f64>,
    /// Milliseconds since the Unix epoch.
    pub time: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub depth_km: Option<f64>,
    pub tsunami: bool,
    pub detail_url: Option<String>,
}

impl EarthquakeRecord {
    /// Minimal record with only an id; everything else absent.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            place: None,
            magnitude: None,
            time: None,
            latitude: None,
            longitude: None,
            depth_km: None,
            tsunami: false,
            detail_url: None,
        }
    }

    /// Magnitude for thresholding: absent counts as 0.
    pub fn magnitude_or_zero(&self) -> f64 {
        self.magnitude.filter(|m| m.is_finite()).unwrap_or(0.0)
    }

    /// `(lat, lon)` when both are present and finite.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }

    /// Whether the record can be placed on the map.
    pub fn is_mappable(&self) -> bool {
        self.coordinates().is_some()
    }

    pub fn magnitude_class(&self) -> MagnitudeClass {
        classify(self.magnitude)
    }

    pub fn depth_class(&self) -> Option<DepthClass> {
        self.depth_km.filter(|d| d.is_finite()).map(classify_depth)
    }

    pub fn has_tsunami_warning(&self) -> bool {
        self.tsunami
    }

    /// Great-circle distance to a point, if this record has coordinates.
    pub fn distance_km_to(&self, lat: f64, lon: f64) -> Option<f64> {
        self.coordinates()
            .map(|(rlat, rlon)| haversine_km(rlat, rlon, lat, lon))
    }
}

// ---------------------------------------------------------------------------
// Magnitude classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MagnitudeClass {
    Unknown,
    Minor,
    Light,
    Moderate,
    Strong,
    Major,
    Great,
}

/// Neutral token for unknown magnitude.
pub const COLOR_UNKNOWN: &str = "#9CA3AF";

impl MagnitudeClass {
    /// Known bands in ascending order.
    pub const BANDS: [MagnitudeClass; 6] = [
        MagnitudeClass::Minor,
        MagnitudeClass::Light,
        MagnitudeClass::Moderate,
        MagnitudeClass::Strong,
        MagnitudeClass::Major,
        MagnitudeClass::Great,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MagnitudeClass::Unknown => "Unknown",
            MagnitudeClass::Minor => "Minor",
            MagnitudeClass::Light => "Light",
            MagnitudeClass::Moderate => "Moderate",
            MagnitudeClass::Strong => "Strong",
            MagnitudeClass::Major => "Major",
            MagnitudeClass::Great => "Great",
        }
    }

    /// Color token, hotter for stronger bands.
    pub fn color(self) -> &'static str {
        match self {
            MagnitudeClass::Unknown => COLOR_UNKNOWN,
            MagnitudeClass::Minor => "#22C55E",
            MagnitudeClass::Light => "#EAB308",
            MagnitudeClass::Moderate => "#F97316",
            MagnitudeClass::Strong => "#EF4444",
            MagnitudeClass::Major => "#B91C1C",
            MagnitudeClass::Great => "#7F1D1D",
        }
    }

    /// Map marker radius in pixels.
    pub fn marker_radius(self) -> u8 {
        match self {
            MagnitudeClass::Unknown => 6,
            MagnitudeClass::Minor => 6,
            MagnitudeClass::Light => 8,
            MagnitudeClass::Moderate => 10,
            MagnitudeClass::Strong => 12,
            MagnitudeClass::Major => 14,
            MagnitudeClass::Great => 16,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            MagnitudeClass::Unknown => "Magnitude not reported",
            MagnitudeClass::Minor => "Generally not felt by people",
            MagnitudeClass::Light => "Weak shaking, rarely causes damage",
            MagnitudeClass::Moderate => "Moderate shaking, some damage to weak structures",
            MagnitudeClass::Strong => "Strong to violent shaking, damage to buildings",
            MagnitudeClass::Major => "Serious damage over large areas",
            MagnitudeClass::Great => "Devastating damage, felt over very large areas",
        }
    }
}

impl std::fmt::Display for MagnitudeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a magnitude into the canonical band table.
pub fn classify(magnitude: Option<f64>) -> MagnitudeClass {
    let Some(m) = magnitude.filter(|m| m.is_finite()) else {
        return MagnitudeClass::Unknown;
    };
    if m >= 8.0 {
        MagnitudeClass::Great
    } else if m >= 7.0 {
        MagnitudeClass::Major
    } else if m >= 6.0 {
        MagnitudeClass::Strong
    } else if m >= 4.5 {
        MagnitudeClass::Moderate
    } else if m >= 2.5 {
        MagnitudeClass::Light
    } else {
        MagnitudeClass::Minor
    }
}

/// Color token for a magnitude; same bands as [`classify`].
pub fn color_for(magnitude: Option<f64>) -> &'static str {
    classify(magnitude).color()
}

pub fn magnitude_description(magnitude: Option<f64>) -> &'static str {
    classify(magnitude).description()
}

// ---------------------------------------------------------------------------
// Depth classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepthClass {
    /// `< 70 km`
    Shallow,
    /// `70..300 km`
    Intermediate,
    /// `>= 300 km`
    Deep,
}

impl DepthClass {
    pub fn label(self) -> &'static str {
        match self {
            DepthClass::Shallow => "shallow",
            DepthClass::Intermediate => "intermediate",
            DepthClass::Deep => "deep",
        }
    }
}

/// Classify a hypocenter depth. Negative depths (above sea level) use their
/// absolute value.
pub fn classify_depth(depth_km: f64) -> DepthClass {
    let d = depth_km.abs();
    if d < 70.0 {
        DepthClass::Shallow
    } else if d < 300.0 {
        DepthClass::Intermediate
    } else {
        DepthClass::Deep
    }
}

// ---------------------------------------------------------------------------
// Map boundary
// ---------------------------------------------------------------------------

/// What the map collaborator needs to place one marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub magnitude: Option<f64>,
    pub color: &'static str,
    pub radius: u8,
}

impl MapMarker {
    /// `None` for records without usable coordinates.
    pub fn from_record(r: &EarthquakeRecord) -> Option<Self> {
        let (latitude, longitude) = r.coordinates()?;
        let class = r.magnitude_class();
        Some(Self {
            id: r.id.clone(),
            latitude,
            longitude,
            magnitude: r.magnitude,
            color: class.color(),
            radius: class.marker_radius(),
        })
    }
}

/// Markers for every spatially placeable record, in input order.
pub fn map_markers(records: &[EarthquakeRecord]) -> Vec<MapMarker> {
    records.iter().filter_map(MapMarker::from_record).collect()
}

/// Haversine distance in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}
