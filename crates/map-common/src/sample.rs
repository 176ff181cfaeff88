//! Station readings as returned by the data source, and the per-field
//! samples derived from them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One online station with all of its metric values for this run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StationReading {
    pub station_id: String,
    pub lon: f64,
    pub lat: f64,
    /// Raw metric values keyed by field name. Anything non-numeric is
    /// treated as missing.
    #[serde(default)]
    pub values: HashMap<String, Value>,
}

impl StationReading {
    pub fn new(station_id: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            station_id: station_id.into(),
            lon,
            lat,
            values: HashMap::new(),
        }
    }

    /// Set a metric value.
    pub fn with_value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    /// Numeric value of `field`, if present and finite.
    pub fn value(&self, field: &str) -> Option<f64> {
        self.values
            .get(field)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
    }

    /// The sample this station contributes to `field`.
    pub fn sample(&self, field: &str) -> StationSample {
        StationSample {
            station_id: self.station_id.clone(),
            lon: self.lon,
            lat: self.lat,
            value: self.value(field),
        }
    }
}

/// A single station's value for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSample {
    pub station_id: String,
    pub lon: f64,
    pub lat: f64,
    pub value: Option<f64>,
}

impl StationSample {
    pub fn new(station_id: impl Into<String>, lon: f64, lat: f64, value: Option<f64>) -> Self {
        Self {
            station_id: station_id.into(),
            lon,
            lat,
            value,
        }
    }

    /// True when the sample has a usable value and position.
    pub fn is_defined(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite() && self.value.is_some()
    }
}

/// Extract the samples for `field` from every reading, dropping stations
/// without a usable value.
pub fn samples_for_field(readings: &[StationReading], field: &str) -> Vec<StationSample> {
    readings
        .iter()
        .map(|r| r.sample(field))
        .filter(StationSample::is_defined)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_numeric_values_are_missing() {
        let reading = StationReading::new("macae-01", -41.78, -22.37)
            .with_value("latestTemperature", json!(24.5))
            .with_value("latestWindGust", json!("n/a"))
            .with_value("rainVolumeAcc", Value::Null);

        assert_eq!(reading.value("latestTemperature"), Some(24.5));
        assert_eq!(reading.value("latestWindGust"), None);
        assert_eq!(reading.value("rainVolumeAcc"), None);
        assert_eq!(reading.value("unknown"), None);
    }

    #[test]
    fn test_samples_for_field_drops_missing() {
        let readings = vec![
            StationReading::new("a", 0.0, 0.0).with_value("t", json!(1.0)),
            StationReading::new("b", 1.0, 0.0).with_value("t", json!(null)),
            StationReading::new("c", 2.0, 0.0),
        ];
        let samples = samples_for_field(&readings, "t");
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].station_id, "a");
    }

    #[test]
    fn test_reading_deserializes_without_values() {
        let reading: StationReading =
            serde_json::from_str(r#"{"station_id":"x","lon":1.0,"lat":2.0}"#).unwrap();
        assert!(reading.values.is_empty());
    }
}
