//! Scattered-sample interpolation onto a regular grid.
//!
//! Both strategies share the same shape: fit weights for a radial basis
//! once, then evaluate `sum(w_i * basis(|x - x_i|)) + offset` at every grid
//! node in parallel.

mod kriging;
mod rbf;

pub use kriging::{fit_linear_variogram, KrigingInterpolator, LinearVariogram};
pub use rbf::{fit_linear_rbf, RbfInterpolator};

use map_common::{GridSpec, InterpolationMethod, ScalarField, StationSample};
use rayon::prelude::*;

use crate::error::{ProcessError, Result};

/// Two samples closer than this (degrees) count as the same location.
pub const DUPLICATE_EPSILON: f64 = 1e-12;

/// Fits a continuous field through station samples and evaluates it on a grid.
pub trait Interpolator: Send + Sync {
    /// Strategy identifier, for logging.
    fn method(&self) -> InterpolationMethod;

    /// Fit the samples and evaluate every node of `grid`.
    fn interpolate(&self, samples: &[StationSample], grid: &GridSpec) -> Result<ScalarField>;
}

/// The interpolator for a configured method.
pub fn interpolator_for(method: InterpolationMethod) -> Box<dyn Interpolator> {
    match method {
        InterpolationMethod::Rbf => Box::new(RbfInterpolator),
        InterpolationMethod::Kriging => Box::new(KrigingInterpolator::default()),
    }
}

/// Sample positions and values, validated for interpolation.
pub(crate) struct SampleSet {
    pub points: Vec<[f64; 2]>,
    pub values: Vec<f64>,
}

impl SampleSet {
    /// Collect defined samples and reject coincident locations, which make
    /// every basis system singular.
    pub fn from_samples(samples: &[StationSample]) -> Result<Self> {
        let (points, values): (Vec<[f64; 2]>, Vec<f64>) = samples
            .iter()
            .filter(|s| s.is_defined())
            .filter_map(|s| s.value.map(|v| ([s.lon, s.lat], v)))
            .unzip();

        if points.is_empty() {
            return Err(ProcessError::EmptyInput("no samples to interpolate".to_string()));
        }

        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                if distance(points[i], points[j]) < DUPLICATE_EPSILON {
                    return Err(ProcessError::interpolation(format!(
                        "duplicate sample location at ({}, {})",
                        points[i][0], points[i][1]
                    )));
                }
            }
        }

        Ok(Self { points, values })
    }

    /// The common value when every sample agrees.
    pub fn constant_value(&self) -> Option<f64> {
        let first = self.values[0];
        self.values.iter().all(|&v| v == first).then_some(first)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}

pub(crate) fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

/// Evaluate `offset + sum(weights[i] * basis(|node - points[i]|))` on every
/// grid node.
pub(crate) fn evaluate_on_grid<F>(
    grid: &GridSpec,
    points: &[[f64; 2]],
    weights: &[f64],
    offset: f64,
    basis: F,
) -> Result<ScalarField>
where
    F: Fn(f64) -> f64 + Sync,
{
    let values: Vec<f64> = (0..grid.len())
        .into_par_iter()
        .map(|idx| {
            let (x, y) = grid.coord_at(idx);
            points
                .iter()
                .zip(weights)
                .map(|(&p, &w)| w * basis(distance([x, y], p)))
                .sum::<f64>()
                + offset
        })
        .collect();

    if values.iter().any(|v| !v.is_finite()) {
        return Err(ProcessError::interpolation("evaluation produced non-finite values"));
    }

    ScalarField::new(grid.clone(), values).map_err(ProcessError::from)
}

/// A field holding `value` at every node.
pub(crate) fn constant_field(grid: &GridSpec, value: f64) -> Result<ScalarField> {
    ScalarField::new(grid.clone(), vec![value; grid.len()]).map_err(ProcessError::from)
}
