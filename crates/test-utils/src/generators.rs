//! Synthetic station data generators.
//!
//! These generators create predictable, verifiable station layouts that
//! can be used across the test suite.

use map_common::{StationReading, StationSample};

/// Creates a rectangular layout of stations with values from `value(lon, lat)`.
///
/// Station ids are `st-<row>-<col>`; rows walk north from `origin`.
///
/// # Example
///
/// ```
/// use test_utils::station_grid;
///
/// let stations = station_grid((0.0, 0.0), 3, 2, 0.5, |lon, lat| lon + lat);
/// assert_eq!(stations.len(), 6);
/// assert_eq!(stations[4].value, Some(1.0)); // row 1, col 1 -> 0.5 + 0.5
/// ```
pub fn station_grid<F>(
    origin: (f64, f64),
    cols: usize,
    rows: usize,
    spacing: f64,
    value: F,
) -> Vec<StationSample>
where
    F: Fn(f64, f64) -> f64,
{
    let mut stations = Vec::with_capacity(cols * rows);
    for row in 0..rows {
        for col in 0..cols {
            let lon = origin.0 + col as f64 * spacing;
            let lat = origin.1 + row as f64 * spacing;
            stations.push(StationSample::new(
                format!("st-{}-{}", row, col),
                lon,
                lat,
                Some(value(lon, lat)),
            ));
        }
    }
    stations
}

/// Four well-behaved stations plus one extreme reading, all inside the same
/// 0.1 degree outlier cell anchored at `origin`.
///
/// Normal values are 4, 8, 12 and 16 at the corners; the outlier (`spike`)
/// sits in the middle with id `spike`.
pub fn outlier_cluster(origin: (f64, f64), spike: f64) -> Vec<StationSample> {
    let (x, y) = origin;
    vec![
        StationSample::new("sw", x + 0.01, y + 0.01, Some(4.0)),
        StationSample::new("se", x + 0.08, y + 0.01, Some(8.0)),
        StationSample::new("nw", x + 0.01, y + 0.08, Some(12.0)),
        StationSample::new("ne", x + 0.08, y + 0.08, Some(16.0)),
        StationSample::new("spike", x + 0.05, y + 0.05, Some(spike)),
    ]
}

/// Wrap per-field samples as station readings carrying one metric.
///
/// Undefined samples get a `null` metric value.
pub fn readings_for(field: &str, samples: &[StationSample]) -> Vec<StationReading> {
    samples
        .iter()
        .map(|s| {
            let value = s
                .value
                .map(serde_json::Value::from)
                .unwrap_or(serde_json::Value::Null);
            StationReading::new(s.station_id.clone(), s.lon, s.lat).with_value(field, value)
        })
        .collect()
}

/// Merge several per-field reading sets that share station ids.
pub fn merge_readings(sets: Vec<Vec<StationReading>>) -> Vec<StationReading> {
    let mut merged: Vec<StationReading> = Vec::new();
    for set in sets {
        for reading in set {
            match merged.iter_mut().find(|r| r.station_id == reading.station_id) {
                Some(existing) => existing.values.extend(reading.values),
                None => merged.push(reading),
            }
        }
    }
    merged
}
