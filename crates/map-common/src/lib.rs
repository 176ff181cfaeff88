//! Common types shared across the contour mapper crates.

pub mod bbox;
pub mod error;
pub mod field;
pub mod grid;
pub mod sample;
pub mod time;

pub use bbox::BoundingBox;
pub use error::{MapError, MapResult};
pub use field::{FieldConfig, InterpolationMethod, LevelEntry};
pub use grid::{GridPoint, GridSpec, ScalarField};
pub use sample::{StationReading, StationSample};
pub use time::{time_bucket, TimeBucket};
