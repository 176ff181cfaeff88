//! Common test fixtures for contour-mapper tests.
//!
//! This module provides pre-defined boundaries, configurations and helpers
//! for writing them to disk.

use std::io::Write;

use tempfile::NamedTempFile;

/// Common bounding boxes `(min_x, min_y, max_x, max_y)` for testing.
pub mod bbox {
    /// A coastal study area around a few dozen stations
    pub const STUDY_AREA: (f64, f64, f64, f64) = (-42.0, -22.5, -41.6, -22.1);

    /// Unit square at the origin
    pub const UNIT: (f64, f64, f64, f64) = (0.0, 0.0, 1.0, 1.0);
}

/// Field names used across tests.
pub mod fields {
    pub const TEMPERATURE: &str = "latestTemperature";
    pub const WIND_SPEED: &str = "latestWindSpeed";
    pub const HUMIDITY: &str = "latestHumidity";
}

/// A square boundary as a GeoJSON FeatureCollection with one feature.
pub fn square_boundary_geojson(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> String {
    serde_json::json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": { "name": "study area" },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [min_x, min_y],
                    [max_x, min_y],
                    [max_x, max_y],
                    [min_x, max_y],
                    [min_x, min_y]
                ]]
            }
        }]
    })
    .to_string()
}

/// Field configuration with a temperature field (rbf) and a wind field
/// (kriging).
pub const FIELD_CONFIG_YAML: &str = r##"
fields:
  latestTemperature:
    interpolation: rbf
    description: Temperature contours
    unit: "°C"
    min_value: -10
    levels:
      - { limit: 0, color: "#313695" }
      - { limit: 10, color: "#74add1" }
      - { limit: 20, color: "#fee090" }
      - { limit: 30, color: "#d73027" }
  latestWindSpeed:
    interpolation: kriging
    unit: m/s
    min_value: 0
    fill_opacity: 0.6
    levels:
      - { limit: 0, color: "#ffffcc" }
      - { limit: 5, color: "#a1dab4" }
      - { limit: 10 }
"##;

/// Write `contents` to a temporary file with the given suffix.
///
/// The file is removed when the returned handle is dropped.
pub fn write_temp_file(contents: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}
