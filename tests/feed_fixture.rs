// tests/feed_fixture.rs
use chrono::{TimeZone, Utc};
use quake_dashboard::{
    aggregate, hourly_activity, magnitude_histogram, FeedSource, Timeframe, UsgsFeed,
};
use std::fs;

async fn fixture_records() -> Vec<quake_dashboard::EarthquakeRecord> {
    let body = fs::read_to_string("tests/fixtures/all_day.geojson")
        .expect("missing tests/fixtures/all_day.geojson");
    let feed = UsgsFeed::from_fixture_str(&body);
    feed.fetch(Timeframe::Day).await.expect("fixture parses")
}

#[tokio::test]
async fn fixture_yields_every_feature_in_feed_order() {
    let records = fixture_records().await;
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["us7000p1a1", "nn00890001", "ak0250001", "us7000p1a2", "us7000p1a3"]
    );
}

#[tokio::test]
async fn partially_broken_features_are_kept_with_absent_fields() {
    let records = fixture_records().await;

    let alaska = &records[2];
    assert_eq!(alaska.magnitude, None);
    assert!(alaska.is_mappable());

    let no_geometry = &records[3];
    assert!(!no_geometry.is_mappable());
    assert_eq!(no_geometry.place, None);
    assert_eq!(no_geometry.magnitude, Some(4.6));

    assert!(records[0].has_tsunami_warning());
    assert!(records[1..].iter().all(|r| !r.has_tsunami_warning()));
    assert_eq!(records[4].depth_km, Some(560.1));
}

#[tokio::test]
async fn fixture_aggregates() {
    let records = fixture_records().await;

    let stats = aggregate(&records);
    assert_eq!(stats.total, 5);
    assert_eq!(stats.max_magnitude, 6.4);
    assert!((stats.avg_magnitude - (5.2 + 2.1 + 4.6 + 6.4) / 4.0).abs() < 1e-9);
    assert_eq!(stats.max_depth, 560.1);

    // null magnitude is left out of the histogram entirely
    let counts: Vec<usize> = magnitude_histogram(&records).iter().map(|b| b.count).collect();
    assert_eq!(counts, vec![1, 0, 2, 1]);

    let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
    let hours = hourly_activity(&records, now);
    let busy: Vec<u32> = hours.iter().filter(|h| h.count > 0).map(|h| h.hour).collect();
    assert_eq!(busy, vec![7, 8, 9, 10, 11]);
}
