//! Study-area boundary: loading, simplification and grid masking.

use std::path::Path;

use geo::{BoundingRect, Contains, Coord, LineString, MultiPolygon, Point, Polygon, SimplifyVwPreserve};
use map_common::{BoundingBox, ScalarField};
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ProcessError, Result};

/// Simplification tolerance applied to the boundary at load time, in degrees.
pub const DEFAULT_BOUNDARY_TOLERANCE: f64 = 0.01;

/// The fixed study area shared by every field of a run.
///
/// Holds the outline as loaded and a topology-preserving simplification of
/// it, which is what masking and clipping use.
#[derive(Debug, Clone)]
pub struct Boundary {
    original: MultiPolygon<f64>,
    simplified: MultiPolygon<f64>,
    bbox: BoundingBox,
}

impl Boundary {
    /// Build from a polygon set, simplifying with `tolerance` degrees.
    pub fn new(original: MultiPolygon<f64>, tolerance: f64) -> Result<Self> {
        if original.0.is_empty() {
            return Err(ProcessError::boundary("boundary has no polygons"));
        }

        let simplified = simplify(&original, tolerance);
        let rect = simplified
            .bounding_rect()
            .ok_or_else(|| ProcessError::boundary("boundary has no extent"))?;
        let bbox = BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y);

        Ok(Self {
            original,
            simplified,
            bbox,
        })
    }

    /// Parse a GeoJSON FeatureCollection (first feature), Feature or bare
    /// Polygon/MultiPolygon geometry.
    pub fn from_geojson_str(text: &str, tolerance: f64) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::new(parse_boundary_value(&value)?, tolerance)
    }

    /// Load a GeoJSON boundary file.
    pub fn from_file(path: impl AsRef<Path>, tolerance: f64) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ProcessError::boundary(format!("{}: {}", path.display(), e)))?;
        let boundary = Self::from_geojson_str(&text, tolerance)?;
        info!(
            path = %path.display(),
            polygons = boundary.simplified.0.len(),
            "Loaded boundary"
        );
        Ok(boundary)
    }

    /// Simplified outline used for masking and clipping.
    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.simplified
    }

    /// Outline as loaded.
    pub fn original(&self) -> &MultiPolygon<f64> {
        &self.original
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Whether (x, y) lies inside the simplified boundary.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.bbox.contains(x, y) && self.simplified.contains(&Point::new(x, y))
    }

    /// Make every node outside the boundary undefined. Returns the number of
    /// nodes masked.
    pub fn mask(&self, field: &mut ScalarField) -> usize {
        let grid = field.grid().clone();
        let outside: Vec<usize> = (0..grid.len())
            .into_par_iter()
            .filter(|&idx| {
                let (x, y) = grid.coord_at(idx);
                !self.contains(x, y)
            })
            .collect();

        for &idx in &outside {
            field.invalidate(idx);
        }
        debug!(masked = outside.len(), nodes = grid.len(), "Applied boundary mask");
        outside.len()
    }
}

/// Topology-preserving simplification. VW works on triangle areas, so the
/// linear tolerance is squared. Falls back to the input if everything
/// collapses.
pub fn simplify(geometry: &MultiPolygon<f64>, tolerance: f64) -> MultiPolygon<f64> {
    if !(tolerance > 0.0) {
        return geometry.clone();
    }
    let simplified = geometry.simplify_vw_preserve(&(tolerance * tolerance));
    if simplified.0.is_empty() {
        geometry.clone()
    } else {
        simplified
    }
}

fn parse_boundary_value(value: &Value) -> Result<MultiPolygon<f64>> {
    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            let first = value
                .get("features")
                .and_then(Value::as_array)
                .and_then(|f| f.first())
                .ok_or_else(|| ProcessError::boundary("feature collection has no features"))?;
            parse_boundary_value(first)
        }
        Some("Feature") => {
            let geometry = value
                .get("geometry")
                .ok_or_else(|| ProcessError::boundary("feature has no geometry"))?;
            parse_boundary_value(geometry)
        }
        Some("Polygon") => {
            let rings = value
                .get("coordinates")
                .ok_or_else(|| ProcessError::boundary("polygon has no coordinates"))?;
            Ok(MultiPolygon::new(vec![parse_polygon(rings)?]))
        }
        Some("MultiPolygon") => {
            let polygons = value
                .get("coordinates")
                .and_then(Value::as_array)
                .ok_or_else(|| ProcessError::boundary("multipolygon has no coordinates"))?;
            let parsed = polygons.iter().map(parse_polygon).collect::<Result<Vec<_>>>()?;
            Ok(MultiPolygon::new(parsed))
        }
        Some(other) => Err(ProcessError::boundary(format!(
            "unsupported boundary geometry type '{}'",
            other
        ))),
        None => Err(ProcessError::boundary("missing GeoJSON type")),
    }
}

fn parse_polygon(value: &Value) -> Result<Polygon<f64>> {
    let rings = value
        .as_array()
        .ok_or_else(|| ProcessError::boundary("polygon rings must be an array"))?;
    let mut parsed = rings.iter().map(parse_ring).collect::<Result<Vec<_>>>()?;
    if parsed.is_empty() {
        return Err(ProcessError::boundary("polygon has no rings"));
    }
    let exterior = parsed.remove(0);
    Ok(Polygon::new(exterior, parsed))
}

/// Positions may carry extra members (altitude); only x and y are kept.
fn parse_ring(value: &Value) -> Result<LineString<f64>> {
    let positions = value
        .as_array()
        .ok_or_else(|| ProcessError::boundary("ring must be an array of positions"))?;
    let coords = positions
        .iter()
        .map(|p| {
            let x = p.get(0).and_then(Value::as_f64);
            let y = p.get(1).and_then(Value::as_f64);
            match (x, y) {
                (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Ok(Coord { x, y }),
                _ => Err(ProcessError::boundary(format!("invalid position {}", p))),
            }
        })
        .collect::<Result<Vec<_>>>()?;
    if coords.len() < 4 {
        return Err(ProcessError::boundary("ring needs at least 4 positions"));
    }
    Ok(LineString::new(coords))
}
