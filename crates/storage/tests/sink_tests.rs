//! Tests for the file and in-memory storage backends.

use chrono::{TimeZone, Utc};
use field_processor::{CollectionProperties, MapFeatureCollection};
use storage::{
    FileMapSink, InterpolatedMapDocument, MapSink, MemoryMapSink, StationSource, StationsFile,
};
use test_utils::{fields, write_temp_file};

fn collection(levels: Vec<f64>) -> MapFeatureCollection {
    MapFeatureCollection::new(CollectionProperties {
        description: "Temperature contours".to_string(),
        units: "°C".to_string(),
        levels,
    })
}

fn document(field: &str, minute: u32, levels: Vec<f64>) -> InterpolatedMapDocument {
    let at = Utc.with_ymd_and_hms(2025, 5, 20, 14, minute, 30).unwrap();
    InterpolatedMapDocument::new(field, &collection(levels), at, 10).unwrap()
}

// ============================================================================
// FileMapSink
// ============================================================================

#[tokio::test]
async fn test_file_sink_writes_named_geojson() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FileMapSink::new(dir.path()).await.unwrap();
    sink.upsert_map(&document(fields::TEMPERATURE, 37, vec![0.0, 10.0]))
        .await
        .unwrap();

    let path = dir
        .path()
        .join("contours_latestTemperature_20250520T1430Z.geojson");
    let text = std::fs::read_to_string(path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["type"], "FeatureCollection");
    assert_eq!(value["properties"]["units"], "°C");
}

#[tokio::test]
async fn test_file_sink_upsert_replaces_same_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FileMapSink::new(dir.path()).await.unwrap();
    sink.upsert_map(&document(fields::TEMPERATURE, 31, vec![0.0, 10.0]))
        .await
        .unwrap();
    sink.upsert_map(&document(fields::TEMPERATURE, 38, vec![0.0, 5.0]))
        .await
        .unwrap();

    let files = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(files, 1);

    let latest = sink.latest_map(fields::TEMPERATURE).await.unwrap().unwrap();
    assert_eq!(latest.collection().unwrap().properties.levels, vec![0.0, 5.0]);
}

#[tokio::test]
async fn test_file_sink_latest_picks_newest_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FileMapSink::new(dir.path()).await.unwrap();
    sink.upsert_map(&document(fields::TEMPERATURE, 5, vec![1.0, 2.0]))
        .await
        .unwrap();
    sink.upsert_map(&document(fields::TEMPERATURE, 45, vec![3.0, 4.0]))
        .await
        .unwrap();
    sink.upsert_map(&document(fields::WIND_SPEED, 55, vec![5.0, 6.0]))
        .await
        .unwrap();

    let latest = sink.latest_map(fields::TEMPERATURE).await.unwrap().unwrap();
    assert_eq!(latest.time_bucket, Utc.with_ymd_and_hms(2025, 5, 20, 14, 40, 0).unwrap());
    assert!(sink.latest_map(fields::HUMIDITY).await.unwrap().is_none());
}

// ============================================================================
// MemoryMapSink
// ============================================================================

#[tokio::test]
async fn test_memory_sink_idempotent_upsert() {
    let sink = MemoryMapSink::new();
    let doc = document(fields::WIND_SPEED, 12, vec![0.0, 5.0, 10.0]);
    sink.upsert_map(&doc).await.unwrap();
    sink.upsert_map(&doc).await.unwrap();
    assert_eq!(sink.len().await, 1);
    assert_eq!(sink.latest_map(fields::WIND_SPEED).await.unwrap(), Some(doc));
}

#[tokio::test]
async fn test_memory_sink_latest_per_field() {
    let sink = MemoryMapSink::new();
    sink.upsert_map(&document(fields::WIND_SPEED, 2, vec![0.0, 1.0])).await.unwrap();
    sink.upsert_map(&document(fields::WIND_SPEED, 22, vec![0.0, 2.0])).await.unwrap();
    sink.upsert_map(&document(fields::TEMPERATURE, 52, vec![0.0, 3.0])).await.unwrap();

    let latest = sink.latest_map(fields::WIND_SPEED).await.unwrap().unwrap();
    assert_eq!(latest.collection().unwrap().properties.levels, vec![0.0, 2.0]);
}

// ============================================================================
// StationsFile
// ============================================================================

#[tokio::test]
async fn test_stations_file_keeps_requested_fields() {
    let file = write_temp_file(
        r#"[
            {"station_id": "a", "lon": -41.8, "lat": -22.3,
             "values": {"latestTemperature": 25.1, "rainVolumeAcc": 0.2}},
            {"station_id": "b", "lon": -41.7, "lat": -22.2}
        ]"#,
        ".json",
    );
    let source = StationsFile::new(file.path());
    let readings = source
        .online_stations(&[fields::TEMPERATURE.to_string()], Utc::now())
        .await
        .unwrap();

    assert_eq!(readings.len(), 2);
    assert_eq!(readings[0].value(fields::TEMPERATURE), Some(25.1));
    assert!(readings[0].values.get("rainVolumeAcc").is_none());
    assert!(readings[1].values.is_empty());
}

#[tokio::test]
async fn test_stations_file_missing_is_error() {
    let source = StationsFile::new("/nonexistent/stations.json");
    assert!(source.online_stations(&[], Utc::now()).await.is_err());
}
