//! Feature assembly: levels, colors and statistics onto region geometry.

use map_common::FieldConfig;
use tracing::warn;

use crate::geojson::{CollectionProperties, FeatureProperties, MapFeature, MapFeatureCollection, MapGeometry};
use crate::polygon::ProcessedRegion;

/// Package processed regions as the field's feature collection.
///
/// Regions keep their incoming order. Intervals past the end of the color
/// list reuse the last color; the caller is expected to have rejected a
/// config with no colors at all.
pub fn assemble(config: &FieldConfig, regions: &[ProcessedRegion]) -> MapFeatureCollection {
    let missing = config.missing_colors();
    if missing > 0 {
        warn!(
            field = %config.field_name,
            intervals = config.interval_count(),
            colors = config.colors.len(),
            "Intervals without their own color, reusing a neighbouring color"
        );
    }

    let features = regions
        .iter()
        .filter_map(|region| {
            let Some(color) = config.color_for_interval(region.interval_index) else {
                warn!(
                    field = %config.field_name,
                    interval = region.interval_index,
                    "No color for interval, dropping region"
                );
                return None;
            };
            let properties = FeatureProperties {
                level: region.lower,
                level_upper: region.upper,
                color: color.to_string(),
                fill: color.to_string(),
                stroke: color.to_string(),
                fill_opacity: config.fill_opacity,
                value_min: region.stats.min,
                value_max: region.stats.max,
                value_mean: region.stats.mean,
            };
            Some(MapFeature::new(MapGeometry::from(&region.geometry), properties))
        })
        .collect();

    MapFeatureCollection::new(CollectionProperties {
        description: config.description.clone(),
        units: config.unit.clone(),
        levels: config.levels.clone(),
    })
    .with_features(features)
}
