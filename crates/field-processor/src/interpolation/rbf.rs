//! Linear radial basis function interpolation.

use map_common::{GridSpec, InterpolationMethod, ScalarField, StationSample};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use super::{constant_field, distance, evaluate_on_grid, Interpolator, SampleSet};
use crate::error::{ProcessError, Result};

/// Exact interpolant with basis `phi(r) = r` and no polynomial term.
///
/// Passes through every sample and extrapolates linearly, so every grid
/// node receives a value.
#[derive(Debug, Clone, Copy, Default)]
pub struct RbfInterpolator;

/// Solve `A w = values` with `A[i][j] = |p_i - p_j|`.
pub fn fit_linear_rbf(points: &[[f64; 2]], values: &[f64]) -> Result<Vec<f64>> {
    let n = points.len();
    if n != values.len() {
        return Err(ProcessError::interpolation("points and values differ in length"));
    }

    let a = DMatrix::from_fn(n, n, |i, j| distance(points[i], points[j]));
    let b = DVector::from_column_slice(values);

    let weights = a
        .lu()
        .solve(&b)
        .ok_or_else(|| ProcessError::interpolation("singular RBF system"))?;

    if weights.iter().any(|w| !w.is_finite()) {
        return Err(ProcessError::interpolation("RBF weights are not finite"));
    }
    Ok(weights.iter().copied().collect())
}

impl Interpolator for RbfInterpolator {
    fn method(&self) -> InterpolationMethod {
        InterpolationMethod::Rbf
    }

    fn interpolate(&self, samples: &[StationSample], grid: &GridSpec) -> Result<ScalarField> {
        let set = SampleSet::from_samples(samples)?;
        if let Some(value) = set.constant_value() {
            debug!(samples = set.len(), value, "Constant samples, skipping RBF fit");
            return constant_field(grid, value);
        }

        let weights = fit_linear_rbf(&set.points, &set.values)?;
        evaluate_on_grid(grid, &set.points, &weights, 0.0, |r| r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use map_common::BoundingBox;

    fn samples() -> Vec<StationSample> {
        vec![
            StationSample::new("a", 0.0, 0.0, Some(1.0)),
            StationSample::new("b", 1.0, 0.0, Some(3.0)),
            StationSample::new("c", 0.0, 1.0, Some(5.0)),
            StationSample::new("d", 1.0, 1.0, Some(7.0)),
        ]
    }

    #[test]
    fn test_rbf_reproduces_samples_at_nodes() {
        // Samples sit exactly on the corner nodes of a 3x3 grid.
        let grid = GridSpec::from_bbox(&BoundingBox::new(0.0, 0.0, 1.0, 1.0), 3, 3).unwrap();
        let field = RbfInterpolator.interpolate(&samples(), &grid).unwrap();
        assert!((field.get(0, 0).unwrap() - 1.0).abs() < 1e-9);
        assert!((field.get(2, 0).unwrap() - 3.0).abs() < 1e-9);
        assert!((field.get(0, 2).unwrap() - 5.0).abs() < 1e-9);
        assert!((field.get(2, 2).unwrap() - 7.0).abs() < 1e-9);
        assert_eq!(field.defined_count(), 9);
    }

    #[test]
    fn test_rbf_is_deterministic() {
        let grid = GridSpec::from_bbox(&BoundingBox::new(-0.1, -0.1, 1.1, 1.1), 10, 10).unwrap();
        let a = RbfInterpolator.interpolate(&samples(), &grid).unwrap();
        let b = RbfInterpolator.interpolate(&samples(), &grid).unwrap();
        assert_eq!(a.values(), b.values());
    }

    #[test]
    fn test_rbf_constant_samples() {
        let grid = GridSpec::from_bbox(&BoundingBox::new(0.0, 0.0, 1.0, 1.0), 4, 4).unwrap();
        let samples = vec![
            StationSample::new("a", 0.2, 0.2, Some(4.0)),
            StationSample::new("b", 0.8, 0.8, Some(4.0)),
        ];
        let field = RbfInterpolator.interpolate(&samples, &grid).unwrap();
        assert_eq!(field.value_range(), Some((4.0, 4.0)));
    }

    #[test]
    fn test_rbf_duplicate_locations_fail() {
        let grid = GridSpec::from_bbox(&BoundingBox::new(0.0, 0.0, 1.0, 1.0), 4, 4).unwrap();
        let samples = vec![
            StationSample::new("a", 0.5, 0.5, Some(1.0)),
            StationSample::new("b", 0.5, 0.5, Some(2.0)),
        ];
        assert!(RbfInterpolator.interpolate(&samples, &grid).is_err());
    }
}
