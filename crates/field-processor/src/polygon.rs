//! Post-processing of traced contour regions.
//!
//! Each raw region is repaired, clipped to the boundary, simplified and
//! normalized into a [`RegionGeometry`]. Statistics are then taken over the
//! grid nodes that fall inside the final shape.

use std::panic::{catch_unwind, AssertUnwindSafe};

use geo::{BooleanOps, BoundingRect, Contains, LineString, MultiPolygon, Point, Polygon};
use map_common::ScalarField;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::boundary::{simplify, Boundary};
use crate::contour::{close_ring, ContourRegion};
use crate::error::{ProcessError, Result};

/// Simplification tolerance for contour regions, in degrees.
pub const DEFAULT_REGION_TOLERANCE: f64 = 0.00025;

/// Final shape of a contour region.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionGeometry {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl RegionGeometry {
    /// Wrap normalized polygons; `None` when there are none.
    pub fn from_polygons(mut polygons: Vec<Polygon<f64>>) -> Option<Self> {
        match polygons.len() {
            0 => None,
            1 => polygons.pop().map(RegionGeometry::Polygon),
            _ => Some(RegionGeometry::MultiPolygon(MultiPolygon::new(polygons))),
        }
    }

    pub fn polygons(&self) -> Vec<&Polygon<f64>> {
        match self {
            RegionGeometry::Polygon(p) => vec![p],
            RegionGeometry::MultiPolygon(mp) => mp.0.iter().collect(),
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        let point = Point::new(x, y);
        match self {
            RegionGeometry::Polygon(p) => p.contains(&point),
            RegionGeometry::MultiPolygon(mp) => mp.contains(&point),
        }
    }

    fn bounds(&self) -> Option<geo::Rect<f64>> {
        match self {
            RegionGeometry::Polygon(p) => p.bounding_rect(),
            RegionGeometry::MultiPolygon(mp) => mp.bounding_rect(),
        }
    }
}

/// Value statistics over the defined grid nodes inside a region.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegionStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

/// A region ready for feature assembly.
#[derive(Debug, Clone)]
pub struct ProcessedRegion {
    pub interval_index: usize,
    pub lower: f64,
    pub upper: f64,
    pub geometry: RegionGeometry,
    pub stats: RegionStats,
}

/// Repair, clip, simplify and normalize one region.
///
/// Returns `Ok(None)` when nothing of the region survives clipping or
/// normalization.
pub fn post_process(
    polygon: &Polygon<f64>,
    boundary: &Boundary,
    tolerance: f64,
) -> Result<Option<RegionGeometry>> {
    let raw = MultiPolygon::new(vec![polygon.clone()]);

    // The boolean engine may panic on degenerate input; that only costs
    // this region.
    let clipped = catch_unwind(AssertUnwindSafe(|| {
        let repaired = raw.union(&MultiPolygon::new(Vec::new()));
        repaired.intersection(boundary.geometry())
    }))
    .map_err(|_| ProcessError::geometry("boolean operation failed"))?;

    if clipped.0.is_empty() {
        return Ok(None);
    }

    let simplified = simplify(&clipped, tolerance);
    Ok(normalize(simplified))
}

/// Drop non-finite coordinates and short rings, close every ring.
pub fn normalize(geometry: MultiPolygon<f64>) -> Option<RegionGeometry> {
    let polygons: Vec<Polygon<f64>> = geometry
        .0
        .into_iter()
        .filter_map(|polygon| {
            let (exterior, interiors) = polygon.into_inner();
            let exterior = clean_ring(exterior)?;
            let interiors = interiors.into_iter().filter_map(clean_ring).collect();
            Some(Polygon::new(exterior, interiors))
        })
        .collect();
    RegionGeometry::from_polygons(polygons)
}

fn clean_ring(ring: LineString<f64>) -> Option<LineString<f64>> {
    let coords: Vec<_> = ring
        .0
        .into_iter()
        .filter(|c| c.x.is_finite() && c.y.is_finite())
        .collect();
    let coords = close_ring(coords);
    (coords.len() >= 4).then(|| LineString::new(coords))
}

/// Min, max and mean of the defined nodes inside `geometry`.
pub fn region_statistics(geometry: &RegionGeometry, field: &ScalarField) -> RegionStats {
    let Some(bounds) = geometry.bounds() else {
        return RegionStats::default();
    };
    let grid = field.grid();
    let values = field.values();

    let inside: Vec<f64> = (0..grid.len())
        .into_par_iter()
        .filter_map(|idx| {
            let v = values[idx];
            if v.is_nan() {
                return None;
            }
            let (x, y) = grid.coord_at(idx);
            let in_bounds = x >= bounds.min().x
                && x <= bounds.max().x
                && y >= bounds.min().y
                && y <= bounds.max().y;
            (in_bounds && geometry.contains(x, y)).then_some(v)
        })
        .collect();

    if inside.is_empty() {
        return RegionStats::default();
    }
    let min = inside.iter().copied().fold(f64::INFINITY, f64::min);
    let max = inside.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = inside.iter().sum::<f64>() / inside.len() as f64;
    RegionStats {
        min: Some(min),
        max: Some(max),
        mean: Some(mean),
    }
}

/// Post-process every traced region, dropping the ones that fail or vanish.
pub fn process_regions(
    regions: &[ContourRegion],
    boundary: &Boundary,
    field: &ScalarField,
    tolerance: f64,
) -> Vec<ProcessedRegion> {
    let mut processed = Vec::with_capacity(regions.len());
    for region in regions {
        match post_process(&region.polygon, boundary, tolerance) {
            Ok(Some(geometry)) => {
                let stats = region_statistics(&geometry, field);
                processed.push(ProcessedRegion {
                    interval_index: region.interval_index,
                    lower: region.lower,
                    upper: region.upper,
                    geometry,
                    stats,
                });
            }
            Ok(None) => {
                debug!(level = region.lower, "Region vanished after clipping");
            }
            Err(e) => {
                warn!(level = region.lower, error = %e, "Dropping contour region");
            }
        }
    }
    processed
}
