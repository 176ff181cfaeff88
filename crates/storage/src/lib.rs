//! Storage for the contour mapper.
//!
//! Provides the two narrow interfaces the scheduler talks to and their
//! implementations:
//! - [`StationSource`]: PostgreSQL (`station_metrics` joined to `stations`),
//!   a JSON stations file, or a fixed in-memory set
//! - [`MapSink`]: PostgreSQL upsert on `(field, interval)`, GeoJSON files,
//!   or an in-memory map

pub mod compression;
pub mod document;
pub mod error;
pub mod file;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use compression::{compress_collection, decompress_collection};
pub use document::InterpolatedMapDocument;
pub use error::{StorageError, StorageResult};
pub use file::{FileMapSink, StationsFile};
pub use memory::{MemoryMapSink, StaticStationSource};
pub use postgres::{PgMapStore, ONLINE_WINDOW_MINUTES};
pub use traits::{MapSink, StationSource};
