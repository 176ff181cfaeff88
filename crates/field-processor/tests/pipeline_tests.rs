//! End-to-end tests of the per-field pipeline.

use field_processor::{
    filter_outliers, Boundary, FieldOutcome, FieldPipeline, MapFeatureCollection, PipelineSettings,
    SkipReason,
};
use map_common::{FieldConfig, InterpolationMethod, StationSample};
use test_utils::{assert_within_bbox, outlier_cluster, square_boundary_geojson, station_grid};

fn settings() -> PipelineSettings {
    PipelineSettings {
        grid_nx: 60,
        grid_ny: 60,
        ..PipelineSettings::default()
    }
}

fn pipeline(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> FieldPipeline {
    let settings = settings();
    let boundary = Boundary::from_geojson_str(
        &square_boundary_geojson(min_x, min_y, max_x, max_y),
        settings.boundary_tolerance,
    )
    .unwrap();
    FieldPipeline::new(settings, boundary)
}

fn colors(n: usize) -> Vec<String> {
    ["#313695", "#74add1", "#fee090", "#d73027"]
        .iter()
        .take(n)
        .map(|c| c.to_string())
        .collect()
}

/// Stations on a 5x5 layout with a smooth west-east gradient (18..24).
fn gradient_stations() -> Vec<StationSample> {
    station_grid((-42.0, -22.5), 5, 5, 0.1, |lon, lat| {
        20.0 + 10.0 * (lon + 42.0) - 5.0 * (lat + 22.5)
    })
}

fn positions(fc: &MapFeatureCollection) -> Vec<[f64; 2]> {
    fc.features
        .iter()
        .flat_map(|f| f.geometry.rings().into_iter().flatten().copied().collect::<Vec<_>>())
        .collect()
}

#[test]
fn test_scenario_outlier_removed_and_two_bands() {
    let samples = outlier_cluster((0.0, 0.0), 1000.0);

    let filtered = filter_outliers(&samples, 0.1, None);
    assert_eq!(filtered.samples.len(), 4);
    assert!(filtered.samples.iter().all(|s| s.station_id != "spike"));

    let config = FieldConfig::new(
        "latestWindSpeed",
        vec![0.0, 10.0, 20.0],
        colors(2),
        InterpolationMethod::Rbf,
    );
    let outcome = pipeline(-0.5, -0.5, 0.5, 0.5).process(&config, &samples).unwrap();
    let fc = outcome.collection().expect("field should assemble");

    let mut levels: Vec<f64> = fc.features.iter().map(|f| f.properties.level).collect();
    levels.dedup();
    assert_eq!(levels, vec![0.0, 10.0]);
}

#[test]
fn test_scenario_regions_inside_wide_boundary() {
    let (min_x, min_y, max_x, max_y) = (-42.2, -22.7, -41.4, -21.9);
    let config = FieldConfig::new(
        "latestTemperature",
        vec![15.0, 18.0, 21.0, 24.0, 27.0],
        colors(4),
        InterpolationMethod::Rbf,
    );
    let outcome = pipeline(min_x, min_y, max_x, max_y)
        .process(&config, &gradient_stations())
        .unwrap();
    let fc = outcome.collection().expect("field should assemble");
    for [x, y] in positions(fc) {
        assert_within_bbox!((x, y), (min_x, min_y, max_x, max_y), 1e-6);
    }
}

#[test]
fn test_regions_clipped_to_tight_boundary() {
    let (min_x, min_y, max_x, max_y) = (-41.9, -22.4, -41.7, -22.2);
    let config = FieldConfig::new(
        "latestTemperature",
        vec![15.0, 18.0, 21.0, 24.0, 27.0],
        colors(4),
        InterpolationMethod::Kriging,
    );
    let outcome = pipeline(min_x, min_y, max_x, max_y)
        .process(&config, &gradient_stations())
        .unwrap();
    let fc = outcome.collection().expect("field should assemble");
    assert!(!fc.features.is_empty());
    for [x, y] in positions(fc) {
        assert_within_bbox!((x, y), (min_x, min_y, max_x, max_y), 1e-6);
    }
}

#[test]
fn test_scenario_single_color_reused() {
    let config = FieldConfig::new(
        "latestTemperature",
        vec![15.0, 21.0, 27.0],
        colors(1),
        InterpolationMethod::Rbf,
    );
    let outcome = pipeline(-42.2, -22.7, -41.4, -21.9)
        .process(&config, &gradient_stations())
        .unwrap();
    let fc = outcome.collection().expect("field should assemble");
    assert!(fc.features.iter().any(|f| f.properties.level == 15.0));
    for feature in &fc.features {
        assert_eq!(feature.properties.color, "#313695");
    }
}

#[test]
fn test_kriging_duplicate_locations_skip_field() {
    let samples = vec![
        StationSample::new("a", -41.8, -22.3, Some(20.0)),
        StationSample::new("b", -41.8, -22.3, Some(22.0)),
    ];
    let config = FieldConfig::new(
        "latestHumidity",
        vec![0.0, 50.0, 100.0],
        colors(2),
        InterpolationMethod::Kriging,
    );
    let outcome = pipeline(-42.2, -22.7, -41.4, -21.9).process(&config, &samples).unwrap();
    assert!(matches!(
        outcome,
        FieldOutcome::Skipped { reason: SkipReason::Interpolation(_), .. }
    ));
}

#[test]
fn test_features_well_formed() {
    let config = FieldConfig::new(
        "latestTemperature",
        vec![15.0, 18.0, 21.0, 24.0, 27.0],
        colors(4),
        InterpolationMethod::Kriging,
    );
    let outcome = pipeline(-42.2, -22.7, -41.4, -21.9)
        .process(&config, &gradient_stations())
        .unwrap();
    let fc = outcome.collection().expect("field should assemble");

    for feature in &fc.features {
        for ring in feature.geometry.rings() {
            assert!(ring.len() >= 4);
            assert_eq!(ring.first(), ring.last());
            assert!(ring.iter().all(|p| p[0].is_finite() && p[1].is_finite()));
        }

        let p = &feature.properties;
        assert_eq!(p.fill, p.color);
        assert_eq!(p.stroke, p.color);
        match (p.value_min, p.value_max, p.value_mean) {
            (Some(min), Some(max), Some(mean)) => {
                assert!(min <= mean && mean <= max);
            }
            (None, None, None) => {}
            other => panic!("statistics must be all present or all null: {:?}", other),
        }
    }
}

#[test]
fn test_processing_is_deterministic() {
    let config = FieldConfig::new(
        "latestTemperature",
        vec![15.0, 18.0, 21.0, 24.0, 27.0],
        colors(4),
        InterpolationMethod::Rbf,
    );
    let p = pipeline(-42.2, -22.7, -41.4, -21.9);
    let a = p.process(&config, &gradient_stations()).unwrap();
    let b = p.process(&config, &gradient_stations()).unwrap();
    assert_eq!(a.collection(), b.collection());
}
