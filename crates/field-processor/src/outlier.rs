//! Spatially local outlier rejection.
//!
//! Samples are bucketed into square cells of `cell_size` degrees. Inside each
//! cell holding at least [`MIN_CELL_SAMPLES`] values, Tukey fences
//! `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]` decide what is kept. Outliers are judged
//! against nearby stations only, since baselines vary strongly by location.

use std::collections::BTreeMap;

use map_common::StationSample;
use tracing::debug;

/// Cells with fewer samples than this keep everything.
pub const MIN_CELL_SAMPLES: usize = 4;

/// Multiplier applied to the interquartile range.
pub const IQR_FENCE: f64 = 1.5;

/// Result of filtering one field's samples.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Surviving samples, in input order
    pub samples: Vec<StationSample>,
    /// Samples outside their cell's fences
    pub iqr_rejected: usize,
    /// Samples below the configured floor
    pub floor_rejected: usize,
}

/// Integer cell coordinates for a position.
pub fn cell_key(lon: f64, lat: f64, cell_size: f64) -> (i64, i64) {
    if !(cell_size > 0.0) || !cell_size.is_finite() {
        return (0, 0);
    }
    ((lon / cell_size).floor() as i64, (lat / cell_size).floor() as i64)
}

/// Map each cell to the indices of the samples falling in it.
pub fn partition_cells(samples: &[StationSample], cell_size: f64) -> BTreeMap<(i64, i64), Vec<usize>> {
    let mut cells: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();
    for (idx, sample) in samples.iter().enumerate() {
        cells
            .entry(cell_key(sample.lon, sample.lat, cell_size))
            .or_default()
            .push(idx);
    }
    cells
}

/// Quantile `q` of sorted values with linear interpolation between order
/// statistics.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Tukey fences for a set of values.
pub fn iqr_fences(values: &[f64]) -> Option<(f64, f64)> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let q1 = quantile(&sorted, 0.25)?;
    let q3 = quantile(&sorted, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - IQR_FENCE * iqr, q3 + IQR_FENCE * iqr))
}

/// Remove local outliers and values below `min_value`.
///
/// Samples without a value are dropped up front. A non-positive
/// `cell_size` puts every sample in a single cell.
pub fn filter_outliers(
    samples: &[StationSample],
    cell_size: f64,
    min_value: Option<f64>,
) -> FilterOutcome {
    let defined: Vec<StationSample> = samples.iter().filter(|s| s.is_defined()).cloned().collect();
    if defined.is_empty() {
        return FilterOutcome::default();
    }

    let cells = partition_cells(&defined, cell_size);

    let mut keep = vec![true; defined.len()];
    let mut iqr_rejected = 0;

    for (cell, members) in &cells {
        if members.len() < MIN_CELL_SAMPLES {
            continue;
        }
        let values: Vec<f64> = members
            .iter()
            .filter_map(|&idx| defined[idx].value)
            .collect();
        let Some((low, high)) = iqr_fences(&values) else {
            continue;
        };
        for &idx in members {
            let inside = defined[idx].value.map_or(false, |v| v >= low && v <= high);
            if !inside {
                keep[idx] = false;
                iqr_rejected += 1;
                debug!(
                    station = %defined[idx].station_id,
                    cell_x = cell.0,
                    cell_y = cell.1,
                    low,
                    high,
                    "Rejected local outlier"
                );
            }
        }
    }

    let mut floor_rejected = 0;
    if let Some(floor) = min_value {
        for (idx, sample) in defined.iter().enumerate() {
            if keep[idx] && sample.value.map_or(true, |v| v < floor) {
                keep[idx] = false;
                floor_rejected += 1;
            }
        }
    }

    let samples = defined
        .into_iter()
        .zip(keep)
        .filter_map(|(s, kept)| kept.then_some(s))
        .collect();

    FilterOutcome {
        samples,
        iqr_rejected,
        floor_rejected,
    }
}
