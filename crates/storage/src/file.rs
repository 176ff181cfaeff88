//! GeoJSON files on local disk.
//!
//! [`FileMapSink`] writes one uncompressed feature collection per document
//! as `contours_<field>_<bucket>.geojson`; [`StationsFile`] reads a JSON
//! array of station readings for runs without a database.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use map_common::StationReading;
use tracing::{debug, info, instrument};

use crate::compression::compress_collection;
use crate::document::InterpolatedMapDocument;
use crate::error::{StorageError, StorageResult};
use crate::traits::{MapSink, StationSource};

/// Bucket format used in file names. Sorts chronologically as text.
const BUCKET_FORMAT: &str = "%Y%m%dT%H%MZ";

/// Writes contour maps as GeoJSON files in a directory.
#[derive(Debug, Clone)]
pub struct FileMapSink {
    dir: PathBuf,
}

impl FileMapSink {
    /// Create the sink, creating `dir` if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a document key.
    pub fn path_for(&self, field: &str, bucket: DateTime<Utc>) -> PathBuf {
        self.dir
            .join(format!("contours_{}_{}.geojson", field, bucket.format(BUCKET_FORMAT)))
    }

    fn parse_bucket(field: &str, file_name: &str) -> Option<DateTime<Utc>> {
        let stamp = file_name
            .strip_prefix("contours_")?
            .strip_prefix(field)?
            .strip_prefix('_')?
            .strip_suffix(".geojson")?;
        NaiveDateTime::parse_from_str(stamp, BUCKET_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }
}

#[async_trait]
impl MapSink for FileMapSink {
    #[instrument(skip(self, document), fields(field = %document.field_name))]
    async fn upsert_map(&self, document: &InterpolatedMapDocument) -> StorageResult<()> {
        let collection = document.collection()?;
        let json = serde_json::to_vec_pretty(&collection)?;
        let path = self.path_for(&document.field_name, document.time_bucket);

        // Readers must never see a partial map.
        let tmp = path.with_extension("geojson.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        info!(path = %path.display(), bytes = json.len(), "Wrote contour map");
        Ok(())
    }

    async fn latest_map(&self, field: &str) -> StorageResult<Option<InterpolatedMapDocument>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut latest: Option<(DateTime<Utc>, PathBuf)> = None;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(bucket) = name.to_str().and_then(|n| Self::parse_bucket(field, n)) else {
                continue;
            };
            if latest.as_ref().map_or(true, |(b, _)| bucket > *b) {
                latest = Some((bucket, entry.path()));
            }
        }

        let Some((bucket, path)) = latest else {
            return Ok(None);
        };
        let bytes = tokio::fs::read(&path).await?;
        let collection = serde_json::from_slice(&bytes)?;
        let generated_at = tokio::fs::metadata(&path)
            .await?
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or(bucket);

        debug!(path = %path.display(), "Read latest contour map");
        Ok(Some(InterpolatedMapDocument {
            field_name: field.to_string(),
            time_bucket: bucket,
            generated_at,
            compressed_feature_collection: compress_collection(&collection)?,
        }))
    }
}

/// Station readings from a JSON file, for offline runs.
///
/// The file holds an array of `{station_id, lon, lat, values}` objects. It is
/// re-read on every query so edits show up on the next run; the online
/// window does not apply.
#[derive(Debug, Clone)]
pub struct StationsFile {
    path: PathBuf,
}

impl StationsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StationSource for StationsFile {
    async fn online_stations(
        &self,
        fields: &[String],
        _now: DateTime<Utc>,
    ) -> StorageResult<Vec<StationReading>> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            StorageError::Io(format!("{}: {}", self.path.display(), e))
        })?;
        let mut readings: Vec<StationReading> = serde_json::from_slice(&bytes)?;
        for reading in &mut readings {
            reading.values.retain(|k, _| fields.iter().any(|f| f == k));
        }
        debug!(path = %self.path.display(), stations = readings.len(), "Loaded stations file");
        Ok(readings)
    }
}
