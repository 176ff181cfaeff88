//! Station field processing.
//!
//! Turns one field's scattered station samples into boundary-clipped filled
//! contour polygons, packaged as a GeoJSON feature collection.
//!
//! # Stages
//!
//! - [`outlier`]: per-cell IQR rejection and the configured value floor
//! - [`interpolation`]: linear RBF or ordinary kriging onto a regular grid
//! - [`boundary`]: study-area loading and grid masking
//! - [`contour`]: isoband tracing between consecutive levels
//! - [`polygon`]: repair, clipping, simplification and region statistics
//! - [`assemble`]: level and color properties, collection metadata
//!
//! [`pipeline::FieldPipeline`] runs them in order for a single field.

pub mod assemble;
pub mod boundary;
pub mod contour;
pub mod error;
pub mod geojson;
pub mod interpolation;
pub mod outlier;
pub mod pipeline;
pub mod polygon;

// Re-exports
pub use assemble::assemble;
pub use boundary::{Boundary, DEFAULT_BOUNDARY_TOLERANCE};
pub use contour::{extract_regions, ContourRegion};
pub use error::{ProcessError, Result};
pub use geojson::{
    CollectionProperties, FeatureProperties, MapFeature, MapFeatureCollection, MapGeometry,
};
pub use interpolation::{interpolator_for, Interpolator, KrigingInterpolator, RbfInterpolator};
pub use outlier::{filter_outliers, FilterOutcome};
pub use pipeline::{FieldOutcome, FieldPipeline, FieldStage, PipelineSettings, SkipReason};
pub use polygon::{process_regions, ProcessedRegion, RegionGeometry, RegionStats, DEFAULT_REGION_TOLERANCE};
