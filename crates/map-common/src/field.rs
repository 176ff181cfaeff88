//! Per-field contouring configuration.
//!
//! A field is one measured quantity (temperature, wind gust, ...). Its
//! configuration lists the level thresholds that bound each contour
//! interval, the color for each interval, and the interpolation strategy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{MapError, MapResult};

/// Interpolation strategy used to grid a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    /// Linear radial basis function through every sample.
    Rbf,
    /// Ordinary kriging with a linear variogram.
    Kriging,
}

impl FromStr for InterpolationMethod {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rbf" => Ok(InterpolationMethod::Rbf),
            "kriging" => Ok(InterpolationMethod::Kriging),
            other => Err(MapError::UnsupportedMethod(other.to_string())),
        }
    }
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpolationMethod::Rbf => write!(f, "rbf"),
            InterpolationMethod::Kriging => write!(f, "kriging"),
        }
    }
}

/// A level threshold as written in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LevelEntry {
    /// Threshold value in field units
    pub limit: f64,
    /// Color of the interval starting at this threshold
    #[serde(default)]
    pub color: Option<String>,
}

/// Resolved configuration for a single field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldConfig {
    pub field_name: String,
    /// Strictly increasing thresholds; interval i is `(levels[i], levels[i+1]]`.
    pub levels: Vec<f64>,
    /// One color per interval. May be shorter than the interval count.
    pub colors: Vec<String>,
    /// Interpolation method name as configured; resolved with [`FieldConfig::method`].
    pub interpolation: String,
    /// Samples below this floor are discarded before interpolation.
    pub min_value: Option<f64>,
    /// Collection-level description
    pub description: String,
    /// Unit label for the collection metadata
    pub unit: String,
    /// Fill opacity hint attached to every feature
    pub fill_opacity: f64,
    /// Intervals whose entry had no color and borrowed a neighbour's
    #[serde(default)]
    pub borrowed_colors: usize,
}

impl FieldConfig {
    /// Build a configuration from raw level entries.
    ///
    /// Entries are sorted by limit. Interval i takes the color of the entry
    /// at its lower bound; the color on the top entry has no interval. An
    /// entry without a color takes the previous interval's color (the next
    /// one's at the bottom), so colors stay aligned with their intervals.
    pub fn from_entries(
        field_name: impl Into<String>,
        interpolation: impl Into<String>,
        mut entries: Vec<LevelEntry>,
    ) -> Self {
        entries.sort_by(|a, b| a.limit.total_cmp(&b.limit));

        let interval_count = entries.len().saturating_sub(1);
        let (colors, borrowed_colors) = align_colors(&entries[..interval_count]);

        Self {
            field_name: field_name.into(),
            levels: entries.iter().map(|e| e.limit).collect(),
            colors,
            interpolation: interpolation.into(),
            min_value: None,
            description: default_description(),
            unit: String::new(),
            fill_opacity: default_fill_opacity(),
            borrowed_colors,
        }
    }

    /// Build a configuration from explicit levels and colors.
    pub fn new(
        field_name: impl Into<String>,
        levels: Vec<f64>,
        colors: Vec<String>,
        method: InterpolationMethod,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            levels,
            colors,
            interpolation: method.to_string(),
            min_value: None,
            description: default_description(),
            unit: String::new(),
            fill_opacity: default_fill_opacity(),
            borrowed_colors: 0,
        }
    }

    pub fn with_min_value(mut self, min_value: Option<f64>) -> Self {
        self.min_value = min_value;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_fill_opacity(mut self, fill_opacity: f64) -> Self {
        self.fill_opacity = fill_opacity;
        self
    }

    /// Resolve the configured interpolation method.
    pub fn method(&self) -> MapResult<InterpolationMethod> {
        self.interpolation.parse()
    }

    /// Number of contour intervals (levels - 1).
    pub fn interval_count(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// Bounds of interval `index`.
    pub fn interval(&self, index: usize) -> Option<(f64, f64)> {
        match (self.levels.get(index), self.levels.get(index + 1)) {
            (Some(&lower), Some(&upper)) => Some((lower, upper)),
            _ => None,
        }
    }

    /// Number of intervals that have no color of their own.
    pub fn missing_colors(&self) -> usize {
        self.interval_count().saturating_sub(self.colors.len()) + self.borrowed_colors
    }

    /// Color for interval `index`. Intervals past the end of the color list
    /// reuse the last color.
    pub fn color_for_interval(&self, index: usize) -> Option<&str> {
        self.colors
            .get(index)
            .or_else(|| self.colors.last())
            .map(String::as_str)
    }

    /// Check the structural invariants: at least two finite, strictly
    /// increasing levels and at least one color.
    pub fn validate(&self) -> MapResult<()> {
        if self.levels.len() < 2 {
            return Err(MapError::invalid_field(
                &self.field_name,
                format!("need at least 2 levels, got {}", self.levels.len()),
            ));
        }
        if self.levels.iter().any(|l| !l.is_finite()) {
            return Err(MapError::invalid_field(&self.field_name, "levels must be finite"));
        }
        if self.levels.windows(2).any(|w| w[0] >= w[1]) {
            return Err(MapError::invalid_field(
                &self.field_name,
                "levels must be strictly increasing",
            ));
        }
        if self.colors.is_empty() {
            return Err(MapError::invalid_field(&self.field_name, "no colors configured"));
        }
        if !(0.0..=1.0).contains(&self.fill_opacity) {
            return Err(MapError::invalid_field(
                &self.field_name,
                "fill_opacity must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

/// One color per interval entry. Gaps take the previous color; leading gaps
/// take the first color that follows. Empty when no entry has a color.
fn align_colors(entries: &[LevelEntry]) -> (Vec<String>, usize) {
    let Some(first) = entries.iter().find_map(|e| e.color.clone()) else {
        return (Vec::new(), 0);
    };

    let mut colors = Vec::with_capacity(entries.len());
    let mut borrowed = 0;
    let mut previous = first;
    for entry in entries {
        match &entry.color {
            Some(color) => previous = color.clone(),
            None => borrowed += 1,
        }
        colors.push(previous.clone());
    }
    (colors, borrowed)
}

pub fn default_description() -> String {
    "Value contours".to_string()
}

pub fn default_fill_opacity() -> f64 {
    0.8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(limit: f64, color: Option<&str>) -> LevelEntry {
        LevelEntry {
            limit,
            color: color.map(str::to_string),
        }
    }

    #[test]
    fn test_entries_sorted_and_colors_aligned() {
        let cfg = FieldConfig::from_entries(
            "latestTemperature",
            "rbf",
            vec![
                entry(30.0, Some("#d73027")),
                entry(10.0, Some("#74add1")),
                entry(20.0, Some("#fee090")),
            ],
        );
        assert_eq!(cfg.levels, vec![10.0, 20.0, 30.0]);
        assert_eq!(cfg.colors, vec!["#74add1", "#fee090"]);
        assert_eq!(cfg.missing_colors(), 0);
    }

    #[test]
    fn test_uncolored_entry_keeps_alignment() {
        let cfg = FieldConfig::from_entries(
            "latestWindSpeed",
            "kriging",
            vec![
                entry(0.0, Some("#ffffcc")),
                entry(5.0, None),
                entry(10.0, Some("#41b6c4")),
                entry(15.0, None),
            ],
        );
        assert_eq!(cfg.colors, vec!["#ffffcc", "#ffffcc", "#41b6c4"]);
        assert_eq!(cfg.color_for_interval(2), Some("#41b6c4"));
        assert_eq!(cfg.missing_colors(), 1);
    }

    #[test]
    fn test_leading_uncolored_entry_borrows_next() {
        let cfg = FieldConfig::from_entries(
            "latestTemperature",
            "rbf",
            vec![entry(0.0, None), entry(10.0, Some("#74add1")), entry(20.0, Some("#fee090")), entry(30.0, None)],
        );
        assert_eq!(cfg.color_for_interval(0), Some("#74add1"));
        assert_eq!(cfg.color_for_interval(1), Some("#74add1"));
        assert_eq!(cfg.color_for_interval(2), Some("#fee090"));
        assert_eq!(cfg.missing_colors(), 1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_no_colored_entries() {
        let cfg = FieldConfig::from_entries("t", "rbf", vec![entry(0.0, None), entry(1.0, None)]);
        assert!(cfg.colors.is_empty());
        assert_eq!(cfg.missing_colors(), 1);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_color_fallback_reuses_last() {
        let cfg = FieldConfig::new(
            "gust",
            vec![0.0, 10.0, 20.0],
            vec!["#0000ff".to_string()],
            InterpolationMethod::Rbf,
        );
        assert_eq!(cfg.missing_colors(), 1);
        assert_eq!(cfg.color_for_interval(0), Some("#0000ff"));
        assert_eq!(cfg.color_for_interval(1), Some("#0000ff"));
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("Kriging".parse::<InterpolationMethod>().unwrap(), InterpolationMethod::Kriging);
        assert_eq!(" rbf ".parse::<InterpolationMethod>().unwrap(), InterpolationMethod::Rbf);
        assert!(matches!(
            "idw".parse::<InterpolationMethod>(),
            Err(MapError::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn test_validate() {
        let ok = FieldConfig::new("t", vec![0.0, 1.0], vec!["#fff".into()], InterpolationMethod::Rbf);
        assert!(ok.validate().is_ok());

        let single = FieldConfig::new("t", vec![0.0], vec!["#fff".into()], InterpolationMethod::Rbf);
        assert!(single.validate().is_err());

        let unsorted = FieldConfig::new("t", vec![1.0, 1.0], vec!["#fff".into()], InterpolationMethod::Rbf);
        assert!(unsorted.validate().is_err());

        let no_colors = FieldConfig::new("t", vec![0.0, 1.0], vec![], InterpolationMethod::Rbf);
        assert!(no_colors.validate().is_err());
    }

    #[test]
    fn test_interval_bounds() {
        let cfg = FieldConfig::new("t", vec![0.0, 10.0, 20.0], vec![], InterpolationMethod::Rbf);
        assert_eq!(cfg.interval(1), Some((10.0, 20.0)));
        assert_eq!(cfg.interval(2), None);
    }
}
