//! Field configuration loading.
//!
//! One YAML file (JSON also parses) maps field names to their levels,
//! colors and interpolation method, with optional pipeline tunables:
//!
//! ```yaml
//! pipeline:
//!   grid_nx: 150
//! fields:
//!   latestTemperature:
//!     interpolation: rbf
//!     unit: "°C"
//!     levels:
//!       - { limit: 0, color: "#313695" }
//!       - { limit: 10, color: "#74add1" }
//!       - { limit: 20 }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use field_processor::PipelineSettings;
use map_common::{FieldConfig, LevelEntry};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Raw configuration file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    pipeline: SettingsOverrides,
    #[serde(default)]
    fields: BTreeMap<String, FieldEntry>,
}

/// One field as written in the file.
#[derive(Debug, Clone, Deserialize)]
struct FieldEntry {
    #[serde(default = "default_interpolation")]
    interpolation: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    min_value: Option<f64>,
    #[serde(default)]
    fill_opacity: Option<f64>,
    #[serde(default)]
    levels: Vec<LevelEntry>,
}

fn default_interpolation() -> String {
    "rbf".to_string()
}

/// Optional overrides for [`PipelineSettings`].
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SettingsOverrides {
    #[serde(default)]
    pub grid_nx: Option<usize>,
    #[serde(default)]
    pub grid_ny: Option<usize>,
    #[serde(default)]
    pub grid_buffer: Option<f64>,
    #[serde(default)]
    pub outlier_cell_size: Option<f64>,
    #[serde(default)]
    pub boundary_tolerance: Option<f64>,
    #[serde(default)]
    pub region_tolerance: Option<f64>,
    #[serde(default)]
    pub bucket_minutes: Option<u32>,
}

impl SettingsOverrides {
    pub fn apply(&self, base: PipelineSettings) -> PipelineSettings {
        PipelineSettings {
            grid_nx: self.grid_nx.unwrap_or(base.grid_nx),
            grid_ny: self.grid_ny.unwrap_or(base.grid_ny),
            grid_buffer: self.grid_buffer.unwrap_or(base.grid_buffer),
            outlier_cell_size: self.outlier_cell_size.unwrap_or(base.outlier_cell_size),
            boundary_tolerance: self.boundary_tolerance.unwrap_or(base.boundary_tolerance),
            region_tolerance: self.region_tolerance.unwrap_or(base.region_tolerance),
            bucket_minutes: self.bucket_minutes.unwrap_or(base.bucket_minutes),
        }
    }
}

/// Resolved configuration for a run: pipeline settings plus one
/// [`FieldConfig`] per configured field.
#[derive(Debug, Clone)]
pub struct MapperConfig {
    pub settings: PipelineSettings,
    fields: BTreeMap<String, FieldConfig>,
}

impl MapperConfig {
    /// Load configuration from a YAML (or JSON) file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!(
            path = %path.display(),
            fields = config.fields.len(),
            "Loaded field configuration"
        );
        Ok(config)
    }

    /// Parse configuration text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(content)?;
        let settings = file.pipeline.apply(PipelineSettings::default());

        let fields = file
            .fields
            .into_iter()
            .map(|(name, entry)| {
                let config = resolve_field(&name, entry);
                (name, config)
            })
            .collect();

        Ok(Self { settings, fields })
    }

    /// Configuration for `field`, if it has an entry.
    pub fn field(&self, field: &str) -> Option<&FieldConfig> {
        self.fields.get(field)
    }

    /// Configured field names in sorted order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn resolve_field(name: &str, entry: FieldEntry) -> FieldConfig {
    let mut config = FieldConfig::from_entries(name, entry.interpolation, entry.levels)
        .with_min_value(entry.min_value);
    if let Some(description) = entry.description {
        config = config.with_description(description);
    }
    if let Some(unit) = entry.unit {
        config = config.with_unit(unit);
    }
    if let Some(opacity) = entry.fill_opacity {
        config = config.with_fill_opacity(opacity);
    }

    if config.missing_colors() > 0 {
        warn!(
            field = %name,
            intervals = config.interval_count(),
            colors = config.colors.len(),
            "Intervals without their own color"
        );
    }
    debug!(
        field = %name,
        levels = config.levels.len(),
        method = %config.interpolation,
        "Resolved field configuration"
    );
    config
}
