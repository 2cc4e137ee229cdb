// src/feed/mod.rs
pub mod types;
pub mod usgs;

use metrics::{counter, histogram};
use serde_json::Value;

use crate::feed::types::FeedError;
use crate::model::EarthquakeRecord;

/// Parse a GeoJSON summary document into normalized records.
///
/// The document must carry a `features` array; anything else is a
/// `MalformedFeed` error rather than a partial result. Individual features
/// are never rejected: unusable fields simply become absent.
pub fn parse_feed(body: &str) -> Result<Vec<EarthquakeRecord>, FeedError> {
    let t0 = std::time::Instant::now();
    let doc: Value = serde_json::from_str(body)
        .map_err(|e| FeedError::MalformedFeed(format!("body is not JSON: {e}")))?;

    let features = match doc.get("features") {
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(FeedError::MalformedFeed(
                "`features` is not an array".to_string(),
            ))
        }
        None => return Err(FeedError::MalformedFeed("missing `features`".to_string())),
    };

    let out: Vec<EarthquakeRecord> = features
        .iter()
        .enumerate()
        .map(|(i, f)| normalize_feature(f, i))
        .collect();

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_parse_ms").record(ms);
    counter!("feed_events_total").increment(out.len() as u64);
    Ok(out)
}

fn finite(v: Option<&Value>) -> Option<f64> {
    v.and_then(Value::as_f64).filter(|x| x.is_finite())
}

fn non_empty_str(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Map one GeoJSON feature onto a record, field by field.
pub fn normalize_feature(feature: &Value, index: usize) -> EarthquakeRecord {
    let props = feature.get("properties");
    let prop = |k: &str| props.and_then(|p| p.get(k));
    let coords = feature
        .get("geometry")
        .and_then(|g| g.get("coordinates"))
        .and_then(Value::as_array);
    let coord = |i: usize| finite(coords.and_then(|c| c.get(i)));

    let id = non_empty_str(feature.get("id")).unwrap_or_else(|| format!("feature-{index}"));

    // 0/1 in the feed, occasionally a bool
    let tsunami = match prop("tsunami") {
        Some(Value::Bool(b)) => *b,
        Some(v) => v.as_f64().is_some_and(|x| x != 0.0),
        None => false,
    };

    EarthquakeRecord {
        id,
        place: non_empty_str(prop("place")),
        magnitude: finite(prop("mag")),
        time: prop("time").and_then(Value::as_i64),
        longitude: coord(0),
        latitude: coord(1),
        depth_km: coord(2).or_else(|| finite(prop("depth"))),
        tsunami,
        detail_url: non_empty_str(prop("url")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_documents_without_feature_array() {
        assert!(matches!(parse_feed("{}"), Err(FeedError::MalformedFeed(_))));
        assert!(matches!(
            parse_feed(r#"{"features": {"a": 1}}"#),
            Err(FeedError::MalformedFeed(_))
        ));
        assert!(matches!(parse_feed("<html>"), Err(FeedError::MalformedFeed(_))));
        assert!(parse_feed(r#"{"features": []}"#).unwrap().is_empty());
    }

    #[test]
    fn normalizes_full_feature() {
        let f = json!({
            "type": "Feature",
            "id": "us7000abcd",
            "properties": {
                "mag": 5.2, "place": "Tokyo, Japan", "time": 1_700_000_000_000i64,
                "tsunami": 1, "url": "https://example.test/us7000abcd"
            },
            "geometry": {"type": "Point", "coordinates": [139.7, 35.6, 42.0]}
        });
        let r = normalize_feature(&f, 0);
        assert_eq!(r.id, "us7000abcd");
        assert_eq!(r.magnitude, Some(5.2));
        assert_eq!(r.latitude, Some(35.6));
        assert_eq!(r.longitude, Some(139.7));
        assert_eq!(r.depth_km, Some(42.0));
        assert_eq!(r.time, Some(1_700_000_000_000));
        assert!(r.tsunami);
        assert_eq!(r.place.as_deref(), Some("Tokyo, Japan"));
    }

    #[test]
    fn malformed_fields_become_absent() {
        let f = json!({
            "properties": {"mag": null, "place": "", "time": "yesterday", "depth": 12.5, "tsunami": 0},
            "geometry": {"coordinates": ["x", null]}
        });
        let r = normalize_feature(&f, 7);
        assert_eq!(r.id, "feature-7");
        assert_eq!(r.magnitude, None);
        assert_eq!(r.place, None);
        assert_eq!(r.time, None);
        assert_eq!(r.coordinates(), None);
        assert_eq!(r.depth_km, Some(12.5));
        assert!(!r.tsunami);
    }
}
