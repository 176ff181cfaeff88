//! GeoJSON types for contour map output.
//!
//! A field's contours are published as one `FeatureCollection`. Besides
//! the standard members, the collection carries a `properties` object with
//! the description, unit label and the full level list, so clients can build
//! a legend without the field configuration.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

use crate::polygon::RegionGeometry;

/// A `[longitude, latitude]` position.
pub type Position = [f64; 2];

/// A GeoJSON FeatureCollection of contour regions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapFeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    /// Contour regions in ascending interval order.
    pub features: Vec<MapFeature>,

    /// Collection-level metadata.
    pub properties: CollectionProperties,
}

impl MapFeatureCollection {
    /// Create a new empty FeatureCollection.
    pub fn new(properties: CollectionProperties) -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            features: Vec::new(),
            properties,
        }
    }

    /// Add a feature to the collection.
    pub fn with_feature(mut self, feature: MapFeature) -> Self {
        self.features.push(feature);
        self
    }

    /// Add multiple features to the collection.
    pub fn with_features(mut self, features: Vec<MapFeature>) -> Self {
        self.features.extend(features);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Metadata describing the whole collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionProperties {
    pub description: String,
    pub units: String,
    /// Every level threshold used, ascending.
    pub levels: Vec<f64>,
}

/// One contour region.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapFeature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    pub geometry: MapGeometry,

    pub properties: FeatureProperties,
}

impl MapFeature {
    pub fn new(geometry: MapGeometry, properties: FeatureProperties) -> Self {
        Self {
            type_: "Feature".to_string(),
            geometry,
            properties,
        }
    }
}

/// Per-region properties. Statistics are `null` when no defined grid value
/// falls inside the region.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureProperties {
    /// Lower threshold of the interval
    pub level: f64,
    /// Upper threshold of the interval
    pub level_upper: f64,
    pub color: String,
    pub fill: String,
    pub stroke: String,
    #[serde(rename = "fill-opacity")]
    pub fill_opacity: f64,
    pub value_min: Option<f64>,
    pub value_max: Option<f64>,
    pub value_mean: Option<f64>,
}

/// Polygonal GeoJSON geometries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum MapGeometry {
    /// Array of linear rings (first is exterior, rest are holes).
    Polygon { coordinates: Vec<Vec<Position>> },

    /// Array of polygons, each an array of linear rings.
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
}

impl MapGeometry {
    /// Every ring of the geometry, exterior and holes alike.
    pub fn rings(&self) -> Vec<&Vec<Position>> {
        match self {
            MapGeometry::Polygon { coordinates } => coordinates.iter().collect(),
            MapGeometry::MultiPolygon { coordinates } => coordinates.iter().flatten().collect(),
        }
    }

    /// Convert into a geo multipolygon.
    pub fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        match self {
            MapGeometry::Polygon { coordinates } => {
                MultiPolygon::new(rings_to_polygon(coordinates).into_iter().collect())
            }
            MapGeometry::MultiPolygon { coordinates } => MultiPolygon::new(
                coordinates
                    .iter()
                    .filter_map(|rings| rings_to_polygon(rings))
                    .collect(),
            ),
        }
    }
}

impl From<&RegionGeometry> for MapGeometry {
    fn from(geometry: &RegionGeometry) -> Self {
        match geometry {
            RegionGeometry::Polygon(polygon) => MapGeometry::Polygon {
                coordinates: polygon_to_rings(polygon),
            },
            RegionGeometry::MultiPolygon(multi) => MapGeometry::MultiPolygon {
                coordinates: multi.0.iter().map(polygon_to_rings).collect(),
            },
        }
    }
}

fn ring_to_positions(ring: &LineString<f64>) -> Vec<Position> {
    ring.0.iter().map(|c| [c.x, c.y]).collect()
}

fn polygon_to_rings(polygon: &Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(ring_to_positions)
        .collect()
}

fn positions_to_ring(positions: &[Position]) -> LineString<f64> {
    LineString::new(positions.iter().map(|p| Coord { x: p[0], y: p[1] }).collect())
}

fn rings_to_polygon(rings: &[Vec<Position>]) -> Option<Polygon<f64>> {
    let (exterior, holes) = rings.split_first()?;
    Some(Polygon::new(
        positions_to_ring(exterior),
        holes.iter().map(|h| positions_to_ring(h)).collect(),
    ))
}
