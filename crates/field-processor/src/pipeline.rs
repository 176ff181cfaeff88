//! Per-field processing pipeline.
//!
//! Samples → outlier filter → interpolation → boundary mask → contour
//! extraction → post-processing → feature assembly. Each field runs the
//! stages in order and either ends with an assembled collection or stops
//! early with a [`SkipReason`].

use std::fmt;

use map_common::{FieldConfig, GridSpec, MapError, StationSample};
use tracing::{debug, info, instrument, warn};

use crate::assemble::assemble;
use crate::boundary::{Boundary, DEFAULT_BOUNDARY_TOLERANCE};
use crate::contour::extract_regions;
use crate::error::Result;
use crate::geojson::MapFeatureCollection;
use crate::interpolation::interpolator_for;
use crate::outlier::filter_outliers;
use crate::polygon::{process_regions, DEFAULT_REGION_TOLERANCE};

/// Tunables shared by every field of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Grid nodes along longitude
    pub grid_nx: usize,
    /// Grid nodes along latitude
    pub grid_ny: usize,
    /// Margin added around the sample extent, in degrees
    pub grid_buffer: f64,
    /// Outlier cell edge, in degrees
    pub outlier_cell_size: f64,
    /// Boundary simplification tolerance, in degrees
    pub boundary_tolerance: f64,
    /// Region simplification tolerance, in degrees
    pub region_tolerance: f64,
    /// Width of the persistence time bucket, in minutes
    pub bucket_minutes: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            grid_nx: 150,
            grid_ny: 150,
            grid_buffer: 0.05,
            outlier_cell_size: 0.1,
            boundary_tolerance: DEFAULT_BOUNDARY_TOLERANCE,
            region_tolerance: DEFAULT_REGION_TOLERANCE,
            bucket_minutes: 10,
        }
    }
}

/// Lifecycle of one field within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStage {
    Idle,
    Filtered,
    Interpolated,
    Masked,
    Contoured,
    Assembled,
    Persisted,
    Skipped,
}

impl fmt::Display for FieldStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldStage::Idle => "idle",
            FieldStage::Filtered => "filtered",
            FieldStage::Interpolated => "interpolated",
            FieldStage::Masked => "masked",
            FieldStage::Contoured => "contoured",
            FieldStage::Assembled => "assembled",
            FieldStage::Persisted => "persisted",
            FieldStage::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}

/// Why a field produced no collection.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Levels or colors fail validation.
    InvalidConfig(String),
    /// The interpolation method is not rbf or kriging.
    UnsupportedMethod(String),
    /// Nothing left after extraction and outlier filtering.
    NoSamples,
    /// The interpolation strategy failed.
    Interpolation(String),
    /// Every region was dropped or none was traced.
    NoFeatures,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InvalidConfig(m) => write!(f, "invalid configuration: {}", m),
            SkipReason::UnsupportedMethod(m) => write!(f, "unsupported interpolation method: {}", m),
            SkipReason::NoSamples => write!(f, "no samples after filtering"),
            SkipReason::Interpolation(m) => write!(f, "interpolation failed: {}", m),
            SkipReason::NoFeatures => write!(f, "no contour features"),
        }
    }
}

/// Result of running one field through the pipeline.
#[derive(Debug, Clone)]
pub enum FieldOutcome {
    Assembled(MapFeatureCollection),
    Skipped {
        /// Last stage reached before stopping
        stage: FieldStage,
        reason: SkipReason,
    },
}

impl FieldOutcome {
    fn skipped(stage: FieldStage, reason: SkipReason) -> Self {
        FieldOutcome::Skipped { stage, reason }
    }

    pub fn collection(&self) -> Option<&MapFeatureCollection> {
        match self {
            FieldOutcome::Assembled(fc) => Some(fc),
            FieldOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, FieldOutcome::Skipped { .. })
    }
}

/// Runs fields through the processing stages against a shared boundary.
#[derive(Debug, Clone)]
pub struct FieldPipeline {
    settings: PipelineSettings,
    boundary: Boundary,
}

impl FieldPipeline {
    pub fn new(settings: PipelineSettings, boundary: Boundary) -> Self {
        Self { settings, boundary }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// Process one field's samples.
    ///
    /// Skip conditions come back as [`FieldOutcome::Skipped`]; `Err` is
    /// reserved for faults such as an unusable grid.
    #[instrument(skip(self, config, samples), fields(field = %config.field_name, samples = samples.len()))]
    pub fn process(&self, config: &FieldConfig, samples: &[StationSample]) -> Result<FieldOutcome> {
        if let Err(e) = config.validate() {
            warn!(error = %e, "Skipping field with invalid configuration");
            return Ok(FieldOutcome::skipped(
                FieldStage::Idle,
                SkipReason::InvalidConfig(e.to_string()),
            ));
        }
        let method = match config.method() {
            Ok(method) => method,
            Err(MapError::UnsupportedMethod(m)) => {
                warn!(method = %m, "Skipping field with unsupported interpolation method");
                return Ok(FieldOutcome::skipped(
                    FieldStage::Idle,
                    SkipReason::UnsupportedMethod(m),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let filtered = filter_outliers(samples, self.settings.outlier_cell_size, config.min_value);
        debug!(
            stage = %FieldStage::Filtered,
            kept = filtered.samples.len(),
            iqr_rejected = filtered.iqr_rejected,
            floor_rejected = filtered.floor_rejected,
            "Filtered samples"
        );
        if filtered.samples.is_empty() {
            info!("No samples left after filtering, skipping field");
            return Ok(FieldOutcome::skipped(FieldStage::Filtered, SkipReason::NoSamples));
        }

        let grid = GridSpec::around_points(
            filtered.samples.iter().map(|s| (s.lon, s.lat)),
            self.settings.grid_buffer,
            self.settings.grid_nx,
            self.settings.grid_ny,
        )?;

        let interpolator = interpolator_for(method);
        let mut field = match interpolator.interpolate(&filtered.samples, &grid) {
            Ok(field) => field,
            Err(e) if e.is_skip() => {
                warn!(method = %method, error = %e, "Interpolation failed, skipping field");
                return Ok(FieldOutcome::skipped(
                    FieldStage::Filtered,
                    SkipReason::Interpolation(e.to_string()),
                ));
            }
            Err(e) => return Err(e),
        };
        debug!(stage = %FieldStage::Interpolated, method = %method, "Interpolated field");

        let masked = self.boundary.mask(&mut field);
        debug!(stage = %FieldStage::Masked, masked, defined = field.defined_count(), "Masked field");

        let regions = extract_regions(&field, &config.levels);
        debug!(stage = %FieldStage::Contoured, regions = regions.len(), "Traced contour regions");

        let processed = process_regions(&regions, &self.boundary, &field, self.settings.region_tolerance);
        if processed.is_empty() {
            info!("No contour features survived post-processing, skipping field");
            return Ok(FieldOutcome::skipped(FieldStage::Contoured, SkipReason::NoFeatures));
        }

        let collection = assemble(config, &processed);
        info!(
            stage = %FieldStage::Assembled,
            features = collection.features.len(),
            "Assembled contour features"
        );
        Ok(FieldOutcome::Assembled(collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, MultiPolygon, Polygon};
    use map_common::InterpolationMethod;

    fn pipeline() -> FieldPipeline {
        let square = Polygon::new(
            LineString::from(vec![(-1.0, -1.0), (2.0, -1.0), (2.0, 2.0), (-1.0, 2.0), (-1.0, -1.0)]),
            vec![],
        );
        let boundary = Boundary::new(MultiPolygon::new(vec![square]), 0.01).unwrap();
        let settings = PipelineSettings {
            grid_nx: 30,
            grid_ny: 30,
            ..PipelineSettings::default()
        };
        FieldPipeline::new(settings, boundary)
    }

    fn config(method: &str) -> FieldConfig {
        let mut config = FieldConfig::new(
            "latestTemperature",
            vec![0.0, 10.0, 20.0],
            vec!["#0000ff".to_string(), "#ff0000".to_string()],
            InterpolationMethod::Rbf,
        );
        config.interpolation = method.to_string();
        config
    }

    fn samples() -> Vec<StationSample> {
        vec![
            StationSample::new("a", 0.0, 0.0, Some(2.0)),
            StationSample::new("b", 1.0, 0.0, Some(8.0)),
            StationSample::new("c", 0.0, 1.0, Some(12.0)),
            StationSample::new("d", 1.0, 1.0, Some(18.0)),
        ]
    }

    #[test]
    fn test_default_settings() {
        let s = PipelineSettings::default();
        assert_eq!((s.grid_nx, s.grid_ny), (150, 150));
        assert_eq!(s.grid_buffer, 0.05);
        assert_eq!(s.outlier_cell_size, 0.1);
        assert_eq!(s.region_tolerance, 0.00025);
        assert_eq!(s.bucket_minutes, 10);
    }

    #[test]
    fn test_unsupported_method_skipped() {
        let outcome = pipeline().process(&config("idw"), &samples()).unwrap();
        assert!(matches!(
            outcome,
            FieldOutcome::Skipped { reason: SkipReason::UnsupportedMethod(_), .. }
        ));
    }

    #[test]
    fn test_no_colors_skipped() {
        let mut cfg = config("rbf");
        cfg.colors.clear();
        let outcome = pipeline().process(&cfg, &samples()).unwrap();
        assert!(matches!(
            outcome,
            FieldOutcome::Skipped { reason: SkipReason::InvalidConfig(_), .. }
        ));
    }

    #[test]
    fn test_all_null_samples_skipped() {
        let samples = vec![StationSample::new("a", 0.0, 0.0, None)];
        let outcome = pipeline().process(&config("rbf"), &samples).unwrap();
        assert!(matches!(
            outcome,
            FieldOutcome::Skipped { stage: FieldStage::Filtered, reason: SkipReason::NoSamples }
        ));
    }

    #[test]
    fn test_rbf_field_assembles() {
        let outcome = pipeline().process(&config("rbf"), &samples()).unwrap();
        let fc = outcome.collection().expect("assembled");
        assert!(!fc.features.is_empty());
        let levels: Vec<f64> = fc.features.iter().map(|f| f.properties.level).collect();
        assert!(levels.windows(2).all(|w| w[0] <= w[1]));
    }
}
