//! Narrow interfaces to the outside world: where station readings come
//! from and where finished maps go.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use map_common::StationReading;

use crate::document::InterpolatedMapDocument;
use crate::error::StorageResult;

/// Source of the stations that are online for a run.
#[async_trait]
pub trait StationSource: Send + Sync {
    /// Every station reporting recently enough as of `now`, with its values
    /// for `fields`. Called once per run.
    async fn online_stations(
        &self,
        fields: &[String],
        now: DateTime<Utc>,
    ) -> StorageResult<Vec<StationReading>>;
}

/// Destination for finished contour maps.
#[async_trait]
pub trait MapSink: Send + Sync {
    /// Insert or replace the document keyed by `(field_name, time_bucket)`.
    async fn upsert_map(&self, document: &InterpolatedMapDocument) -> StorageResult<()>;

    /// The newest stored document for `field`, if any.
    async fn latest_map(&self, field: &str) -> StorageResult<Option<InterpolatedMapDocument>>;
}
