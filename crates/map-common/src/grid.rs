//! Regular lon/lat grid specification and the scalar field evaluated on it.

use crate::BoundingBox;
use crate::{MapError, MapResult};
use serde::{Deserialize, Serialize};

/// Specification of a regular lon/lat grid.
///
/// Nodes are addressed as (i, j) where `i` walks longitude west to east and
/// `j` walks latitude south to north. Flat storage is row-major by latitude.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridSpec {
    /// Number of points in X (longitude) direction
    pub nx: usize,
    /// Number of points in Y (latitude) direction
    pub ny: usize,
    /// Spacing between longitude nodes in degrees
    pub dx: f64,
    /// Spacing between latitude nodes in degrees
    pub dy: f64,
    /// Westernmost node longitude
    pub first_x: f64,
    /// Southernmost node latitude
    pub first_y: f64,
}

impl GridSpec {
    /// Create a grid with `nx` x `ny` nodes spanning `bbox` inclusively
    /// (the same layout as `linspace(min, max, n)` on each axis).
    pub fn from_bbox(bbox: &BoundingBox, nx: usize, ny: usize) -> MapResult<Self> {
        if nx < 2 || ny < 2 {
            return Err(MapError::InvalidGrid(format!(
                "grid needs at least 2x2 nodes, got {}x{}",
                nx, ny
            )));
        }
        if !(bbox.width() > 0.0 && bbox.height() > 0.0) {
            return Err(MapError::InvalidGrid(format!(
                "degenerate extent {:?}",
                bbox
            )));
        }

        Ok(Self {
            nx,
            ny,
            dx: bbox.width() / (nx - 1) as f64,
            dy: bbox.height() / (ny - 1) as f64,
            first_x: bbox.min_x,
            first_y: bbox.min_y,
        })
    }

    /// Build the grid for a set of sample positions: their extent grown by
    /// `buffer` degrees, sampled at `nx` x `ny` nodes.
    pub fn around_points<I>(points: I, buffer: f64, nx: usize, ny: usize) -> MapResult<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let extent = BoundingBox::from_points(points)
            .ok_or_else(|| MapError::InvalidGrid("no finite sample positions".to_string()))?;
        Self::from_bbox(&extent.expand(buffer), nx, ny)
    }

    /// Longitude of column `i`.
    pub fn lon(&self, i: usize) -> f64 {
        self.first_x + i as f64 * self.dx
    }

    /// Latitude of row `j`.
    pub fn lat(&self, j: usize) -> f64 {
        self.first_y + j as f64 * self.dy
    }

    /// Convert a grid index to coordinates.
    pub fn index_to_coord(&self, i: usize, j: usize) -> Option<GridPoint> {
        if i >= self.nx || j >= self.ny {
            return None;
        }
        Some(GridPoint {
            x: self.lon(i),
            y: self.lat(j),
            i,
            j,
        })
    }

    /// Get the 1D array index for a 2D grid position.
    pub fn flat_index(&self, i: usize, j: usize) -> usize {
        j * self.nx + i
    }

    /// Coordinates of the node stored at flat index `idx`.
    pub fn coord_at(&self, idx: usize) -> (f64, f64) {
        (self.lon(idx % self.nx), self.lat(idx / self.nx))
    }

    /// Bounding box covered by the grid nodes.
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(
            self.first_x,
            self.first_y,
            self.lon(self.nx - 1),
            self.lat(self.ny - 1),
        )
    }

    /// Total number of grid points.
    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.nx == 0 || self.ny == 0
    }
}

/// A point on the grid with both indices and coordinates.
#[derive(Debug, Clone, Copy)]
pub struct GridPoint {
    pub x: f64,
    pub y: f64,
    pub i: usize,
    pub j: usize,
}

/// Values of an interpolated field over a [`GridSpec`].
///
/// Undefined nodes (outside the study area, or where evaluation failed) are
/// stored as NaN and surface as `None` through [`ScalarField::get`].
#[derive(Debug, Clone)]
pub struct ScalarField {
    grid: GridSpec,
    values: Vec<f64>,
}

impl ScalarField {
    /// Wrap row-major values for `grid`. Non-finite values become undefined.
    pub fn new(grid: GridSpec, mut values: Vec<f64>) -> MapResult<Self> {
        if values.len() != grid.len() {
            return Err(MapError::InvalidGrid(format!(
                "expected {} values for a {}x{} grid, got {}",
                grid.len(),
                grid.nx,
                grid.ny,
                values.len()
            )));
        }
        for v in values.iter_mut() {
            if !v.is_finite() {
                *v = f64::NAN;
            }
        }
        Ok(Self { grid, values })
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// Raw row-major storage, NaN for undefined nodes.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value at node (i, j), `None` when undefined or out of range.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i >= self.grid.nx || j >= self.grid.ny {
            return None;
        }
        let v = self.values[self.grid.flat_index(i, j)];
        if v.is_nan() {
            None
        } else {
            Some(v)
        }
    }

    /// Mark a node as undefined.
    pub fn invalidate(&mut self, idx: usize) {
        if let Some(v) = self.values.get_mut(idx) {
            *v = f64::NAN;
        }
    }

    /// Number of nodes carrying a defined value.
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    /// Minimum and maximum over defined nodes.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_matches_linspace() {
        let grid = GridSpec::from_bbox(&BoundingBox::new(0.0, 10.0, 1.0, 12.0), 11, 5).unwrap();
        assert!((grid.lon(0) - 0.0).abs() < 1e-12);
        assert!((grid.lon(10) - 1.0).abs() < 1e-12);
        assert!((grid.lat(4) - 12.0).abs() < 1e-12);
        assert!((grid.dy - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_around_points_applies_buffer() {
        let grid = GridSpec::around_points(vec![(-42.0, -22.5), (-41.5, -22.0)], 0.05, 150, 150)
            .unwrap();
        let bbox = grid.bbox();
        assert!((bbox.min_x + 42.05).abs() < 1e-9);
        assert!((bbox.max_y + 21.95).abs() < 1e-9);
        assert_eq!(grid.len(), 22_500);
    }

    #[test]
    fn test_single_point_grid_uses_buffer_extent() {
        let grid = GridSpec::around_points(vec![(5.0, 5.0)], 0.05, 3, 3).unwrap();
        assert!((grid.dx - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_grid_rejected() {
        assert!(GridSpec::from_bbox(&BoundingBox::new(0.0, 0.0, 0.0, 1.0), 3, 3).is_err());
        assert!(GridSpec::from_bbox(&BoundingBox::new(0.0, 0.0, 1.0, 1.0), 1, 3).is_err());
    }

    #[test]
    fn test_scalar_field_undefined_nodes() {
        let grid = GridSpec::from_bbox(&BoundingBox::new(0.0, 0.0, 1.0, 1.0), 2, 2).unwrap();
        let mut field = ScalarField::new(grid, vec![1.0, f64::INFINITY, 3.0, 4.0]).unwrap();
        assert_eq!(field.get(0, 0), Some(1.0));
        assert_eq!(field.get(1, 0), None);
        field.invalidate(3);
        assert_eq!(field.get(1, 1), None);
        assert_eq!(field.defined_count(), 2);
        assert_eq!(field.value_range(), Some((1.0, 3.0)));
    }

    #[test]
    fn test_scalar_field_length_mismatch() {
        let grid = GridSpec::from_bbox(&BoundingBox::new(0.0, 0.0, 1.0, 1.0), 2, 2).unwrap();
        assert!(ScalarField::new(grid, vec![1.0]).is_err());
    }
}
