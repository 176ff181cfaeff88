//! Persisted contour map documents.

use chrono::{DateTime, Utc};
use field_processor::MapFeatureCollection;
use map_common::{time_bucket, TimeBucket};
use serde::{Deserialize, Serialize};

use crate::compression::{compress_collection, decompress_collection};
use crate::error::StorageResult;

/// One field's contours for one time bucket.
///
/// Identity is `(field_name, time_bucket)`; writing the same key again
/// replaces the stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolatedMapDocument {
    pub field_name: String,
    /// Run timestamp truncated to the bucket interval
    pub time_bucket: TimeBucket,
    /// Untruncated run timestamp
    pub generated_at: DateTime<Utc>,
    /// Gzip of the canonical JSON feature collection
    pub compressed_feature_collection: Vec<u8>,
}

impl InterpolatedMapDocument {
    /// Build the document for a collection generated at `generated_at`.
    pub fn new(
        field_name: impl Into<String>,
        collection: &MapFeatureCollection,
        generated_at: DateTime<Utc>,
        bucket_minutes: u32,
    ) -> StorageResult<Self> {
        Ok(Self {
            field_name: field_name.into(),
            time_bucket: time_bucket(generated_at, bucket_minutes)?,
            generated_at,
            compressed_feature_collection: compress_collection(collection)?,
        })
    }

    /// Upsert key.
    pub fn key(&self) -> (&str, TimeBucket) {
        (&self.field_name, self.time_bucket)
    }

    /// Decompress the stored feature collection.
    pub fn collection(&self) -> StorageResult<MapFeatureCollection> {
        decompress_collection(&self.compressed_feature_collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use field_processor::CollectionProperties;

    #[test]
    fn test_document_key_is_bucketed() {
        let fc = MapFeatureCollection::new(CollectionProperties {
            description: "Value contours".to_string(),
            units: String::new(),
            levels: vec![0.0, 1.0],
        });
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 8, 47, 12).unwrap();
        let doc = InterpolatedMapDocument::new("latestTemperature", &fc, at, 10).unwrap();
        assert_eq!(doc.key().1, Utc.with_ymd_and_hms(2025, 6, 1, 8, 40, 0).unwrap());
        assert_eq!(doc.generated_at, at);
        assert_eq!(doc.collection().unwrap(), fc);
    }
}
