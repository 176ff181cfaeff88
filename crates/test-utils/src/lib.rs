//! Shared test utilities for the contour-mapper workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic station generators
//! - Boundary and configuration fixtures
//! - Approximate-equality assertions
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, station_grid};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f64, 1.0_f64, 0.001_f64);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Assert that a position lies inside a bounding box `(min_x, min_y, max_x,
/// max_y)`, allowing `epsilon` of slack on every side.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_within_bbox;
///
/// assert_within_bbox!((0.5, 0.5), (0.0, 0.0, 1.0, 1.0), 1e-9);
/// ```
#[macro_export]
macro_rules! assert_within_bbox {
    (($x:expr, $y:expr), ($min_x:expr, $min_y:expr, $max_x:expr, $max_y:expr), $epsilon:expr) => {{
        let (x, y): (f64, f64) = ($x as f64, $y as f64);
        let eps: f64 = $epsilon as f64;
        if !(x >= $min_x - eps && x <= $max_x + eps && y >= $min_y - eps && y <= $max_y + eps) {
            panic!(
                "assertion failed: ({:?}, {:?}) outside ({:?}, {:?}, {:?}, {:?}) by more than {:?}",
                x, y, $min_x, $min_y, $max_x, $max_y, eps
            );
        }
    }};
}
