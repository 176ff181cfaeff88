//! PostgreSQL station source and map store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use map_common::StationReading;

use crate::document::InterpolatedMapDocument;
use crate::error::{StorageError, StorageResult};
use crate::traits::{MapSink, StationSource};

/// Stations whose last record is older than this are offline.
pub const ONLINE_WINDOW_MINUTES: i64 = 10;

/// Database connection pool serving station readings and contour maps.
pub struct PgMapStore {
    pool: PgPool,
}

impl PgMapStore {
    /// Create a new store from a database URL.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Database(format!("Connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> StorageResult<()> {
        // Split SQL statements and execute them individually
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| StorageError::Database(format!("Migration failed: {}", e)))?;
            }
        }
        info!("Database schema ready");
        Ok(())
    }
}

#[async_trait]
impl StationSource for PgMapStore {
    #[instrument(skip(self, fields), fields(fields = fields.len()))]
    async fn online_stations(
        &self,
        fields: &[String],
        now: DateTime<Utc>,
    ) -> StorageResult<Vec<StationReading>> {
        let since = now - Duration::minutes(ONLINE_WINDOW_MINUTES);

        let rows = sqlx::query_as::<_, StationRow>(
            "SELECT s.slug AS station_id, s.longitude AS lon, s.latitude AS lat, m.metrics \
             FROM station_metrics m \
             JOIN stations s ON s.slug = m.station_slug \
             WHERE m.last_record_at >= $1 \
             ORDER BY s.slug",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Database(format!("Station query failed: {}", e)))?;

        let readings: Vec<StationReading> = rows.into_iter().map(|r| r.into_reading(fields)).collect();
        debug!(stations = readings.len(), since = %since, "Loaded online stations");
        Ok(readings)
    }
}

#[async_trait]
impl MapSink for PgMapStore {
    #[instrument(skip(self, document), fields(field = %document.field_name, bucket = %document.time_bucket))]
    async fn upsert_map(&self, document: &InterpolatedMapDocument) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO interpolated_maps (field, "interval", generated_at, geojson_compressed)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (field, "interval")
            DO UPDATE SET
                generated_at = EXCLUDED.generated_at,
                geojson_compressed = EXCLUDED.geojson_compressed
            "#,
        )
        .bind(&document.field_name)
        .bind(document.time_bucket)
        .bind(document.generated_at)
        .bind(&document.compressed_feature_collection)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(format!("Upsert failed: {}", e)))?;

        Ok(())
    }

    async fn latest_map(&self, field: &str) -> StorageResult<Option<InterpolatedMapDocument>> {
        let row = sqlx::query_as::<_, MapRow>(
            "SELECT field, \"interval\", generated_at, geojson_compressed \
             FROM interpolated_maps WHERE field = $1 \
             ORDER BY \"interval\" DESC LIMIT 1",
        )
        .bind(field)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))?;

        Ok(row.map(|r| r.into()))
    }
}

/// Internal row type for the station query.
#[derive(FromRow)]
struct StationRow {
    station_id: String,
    lon: f64,
    lat: f64,
    metrics: Value,
}

impl StationRow {
    /// Keep only the requested fields from the metrics object.
    fn into_reading(self, fields: &[String]) -> StationReading {
        let values: HashMap<String, Value> = match self.metrics {
            Value::Object(map) => map
                .into_iter()
                .filter(|(k, _)| fields.iter().any(|f| f == k))
                .collect(),
            _ => HashMap::new(),
        };
        StationReading {
            station_id: self.station_id,
            lon: self.lon,
            lat: self.lat,
            values,
        }
    }
}

/// Internal row type for map queries.
#[derive(FromRow)]
struct MapRow {
    field: String,
    interval: DateTime<Utc>,
    generated_at: DateTime<Utc>,
    geojson_compressed: Vec<u8>,
}

impl From<MapRow> for InterpolatedMapDocument {
    fn from(row: MapRow) -> Self {
        InterpolatedMapDocument {
            field_name: row.field,
            time_bucket: row.interval,
            generated_at: row.generated_at,
            compressed_feature_collection: row.geojson_compressed,
        }
    }
}

/// Database schema SQL.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS stations (
    slug VARCHAR(100) PRIMARY KEY,
    longitude DOUBLE PRECISION NOT NULL,
    latitude DOUBLE PRECISION NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE
);

CREATE TABLE IF NOT EXISTS station_metrics (
    station_slug VARCHAR(100) PRIMARY KEY REFERENCES stations(slug),
    last_record_at TIMESTAMPTZ NOT NULL,
    metrics JSONB NOT NULL DEFAULT '{}'::jsonb
);

CREATE INDEX IF NOT EXISTS idx_station_metrics_last_record ON station_metrics(last_record_at DESC);

CREATE TABLE IF NOT EXISTS interpolated_maps (
    field VARCHAR(100) NOT NULL,
    "interval" TIMESTAMPTZ NOT NULL,
    generated_at TIMESTAMPTZ NOT NULL,
    geojson_compressed BYTEA NOT NULL,

    PRIMARY KEY (field, "interval")
);

CREATE INDEX IF NOT EXISTS idx_interpolated_maps_field_interval ON interpolated_maps(field, "interval" DESC);
"#;
