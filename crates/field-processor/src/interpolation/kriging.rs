//! Ordinary kriging with a linear variogram.

use map_common::{GridSpec, InterpolationMethod, ScalarField, StationSample};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use super::{constant_field, distance, evaluate_on_grid, Interpolator, SampleSet, DUPLICATE_EPSILON};
use crate::error::{ProcessError, Result};

/// Number of lag bins in the experimental semivariogram.
pub const DEFAULT_LAGS: usize = 6;

/// `gamma(h) = slope * h + nugget` for h > 0, and 0 at zero lag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearVariogram {
    pub slope: f64,
    pub nugget: f64,
}

impl LinearVariogram {
    pub fn gamma(&self, h: f64) -> f64 {
        if h < DUPLICATE_EPSILON {
            0.0
        } else {
            self.slope * h + self.nugget
        }
    }
}

/// Fit a linear variogram to the binned experimental semivariogram.
///
/// Pairs are grouped into `nlags` equal-width distance bins between the
/// smallest and largest separation. Slope and nugget come from least
/// squares over the non-empty bins, constrained to be non-negative.
pub fn fit_linear_variogram(
    points: &[[f64; 2]],
    values: &[f64],
    nlags: usize,
) -> Result<LinearVariogram> {
    let n = points.len();
    if n < 2 {
        return Err(ProcessError::interpolation(
            "kriging needs at least 2 distinct locations",
        ));
    }

    let mut pairs = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            let d = distance(points[i], points[j]);
            let g = 0.5 * (values[i] - values[j]).powi(2);
            pairs.push((d, g));
        }
    }

    let nlags = nlags.max(1);
    let dmin = pairs.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let dmax = pairs.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let width = (dmax - dmin) / nlags as f64;

    let mut bins: Vec<(f64, f64)> = Vec::with_capacity(nlags);
    for k in 0..nlags {
        let lo = dmin + k as f64 * width;
        let hi = if k + 1 == nlags { dmax + 0.001 } else { dmin + (k + 1) as f64 * width };
        let members: Vec<&(f64, f64)> = pairs.iter().filter(|p| p.0 >= lo && p.0 < hi).collect();
        if members.is_empty() {
            continue;
        }
        let count = members.len() as f64;
        let lag = members.iter().map(|p| p.0).sum::<f64>() / count;
        let semivariance = members.iter().map(|p| p.1).sum::<f64>() / count;
        bins.push((lag, semivariance));
    }

    let variogram = least_squares_line(&bins);
    if !variogram.slope.is_finite() || !variogram.nugget.is_finite() {
        return Err(ProcessError::interpolation("variogram fit did not converge"));
    }
    Ok(variogram)
}

/// Non-negative least-squares line through (lag, semivariance) points.
fn least_squares_line(bins: &[(f64, f64)]) -> LinearVariogram {
    let count = bins.len() as f64;
    if bins.len() == 1 {
        let (lag, gamma) = bins[0];
        let slope = if lag > 0.0 { gamma / lag } else { 0.0 };
        return LinearVariogram { slope, nugget: 0.0 };
    }

    let mean_h = bins.iter().map(|b| b.0).sum::<f64>() / count;
    let mean_g = bins.iter().map(|b| b.1).sum::<f64>() / count;
    let sxx: f64 = bins.iter().map(|b| (b.0 - mean_h).powi(2)).sum();
    let sxy: f64 = bins.iter().map(|b| (b.0 - mean_h) * (b.1 - mean_g)).sum();

    let mut slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let mut nugget = mean_g - slope * mean_h;

    if slope < 0.0 {
        slope = 0.0;
        nugget = mean_g;
    }
    if nugget < 0.0 {
        nugget = 0.0;
        let shh: f64 = bins.iter().map(|b| b.0 * b.0).sum();
        let shg: f64 = bins.iter().map(|b| b.0 * b.1).sum();
        slope = if shh > 0.0 { (shg / shh).max(0.0) } else { 0.0 };
    }

    LinearVariogram { slope, nugget }
}

/// Ordinary kriging interpolator.
#[derive(Debug, Clone, Copy)]
pub struct KrigingInterpolator {
    pub nlags: usize,
}

impl Default for KrigingInterpolator {
    fn default() -> Self {
        Self { nlags: DEFAULT_LAGS }
    }
}

impl Interpolator for KrigingInterpolator {
    fn method(&self) -> InterpolationMethod {
        InterpolationMethod::Kriging
    }

    fn interpolate(&self, samples: &[StationSample], grid: &GridSpec) -> Result<ScalarField> {
        let set = SampleSet::from_samples(samples)?;
        if let Some(value) = set.constant_value() {
            debug!(samples = set.len(), value, "Constant samples, kriging estimate is flat");
            return constant_field(grid, value);
        }

        let variogram = fit_linear_variogram(&set.points, &set.values, self.nlags)?;
        debug!(
            slope = variogram.slope,
            nugget = variogram.nugget,
            samples = set.len(),
            "Fitted linear variogram"
        );

        // Bordered system [G 1; 1' 0] [w; mu] = [z; 0]. G is symmetric, so
        // the estimate at x is sum(gamma(|x - x_i|) * w_i) + mu.
        let n = set.len();
        let a = DMatrix::from_fn(n + 1, n + 1, |i, j| {
            if i == n && j == n {
                0.0
            } else if i == n || j == n {
                1.0
            } else {
                variogram.gamma(distance(set.points[i], set.points[j]))
            }
        });
        let mut rhs = DVector::zeros(n + 1);
        for (k, &v) in set.values.iter().enumerate() {
            rhs[k] = v;
        }

        let solution = a
            .lu()
            .solve(&rhs)
            .ok_or_else(|| ProcessError::interpolation("singular kriging system"))?;
        if solution.iter().any(|w| !w.is_finite()) {
            return Err(ProcessError::interpolation("kriging weights are not finite"));
        }

        let weights: Vec<f64> = solution.iter().take(n).copied().collect();
        let offset = solution[n];
        evaluate_on_grid(grid, &set.points, &weights, offset, |h| variogram.gamma(h))
    }
}
