//! In-memory source and sink, for tests and dry runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use map_common::{StationReading, TimeBucket};
use tokio::sync::RwLock;

use crate::document::InterpolatedMapDocument;
use crate::error::StorageResult;
use crate::traits::{MapSink, StationSource};

/// A fixed set of station readings.
#[derive(Debug, Clone, Default)]
pub struct StaticStationSource {
    readings: Vec<StationReading>,
}

impl StaticStationSource {
    pub fn new(readings: Vec<StationReading>) -> Self {
        Self { readings }
    }
}

#[async_trait]
impl StationSource for StaticStationSource {
    async fn online_stations(
        &self,
        _fields: &[String],
        _now: DateTime<Utc>,
    ) -> StorageResult<Vec<StationReading>> {
        Ok(self.readings.clone())
    }
}

/// Documents kept in a map keyed like the database table.
#[derive(Debug, Default)]
pub struct MemoryMapSink {
    documents: RwLock<BTreeMap<(String, TimeBucket), InterpolatedMapDocument>>,
}

impl MemoryMapSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored document in key order.
    pub async fn documents(&self) -> Vec<InterpolatedMapDocument> {
        self.documents.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl MapSink for MemoryMapSink {
    async fn upsert_map(&self, document: &InterpolatedMapDocument) -> StorageResult<()> {
        let key = (document.field_name.clone(), document.time_bucket);
        self.documents.write().await.insert(key, document.clone());
        Ok(())
    }

    async fn latest_map(&self, field: &str) -> StorageResult<Option<InterpolatedMapDocument>> {
        let documents = self.documents.read().await;
        Ok(documents
            .range((field.to_string(), DateTime::<Utc>::MIN_UTC)..=(field.to_string(), DateTime::<Utc>::MAX_UTC))
            .next_back()
            .map(|(_, doc)| doc.clone()))
    }
}
