//! Run orchestration: one station query per run, then every field in turn.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use field_processor::{FieldOutcome, FieldPipeline, FieldStage, MapFeatureCollection};
use map_common::sample::samples_for_field;
use map_common::{time_bucket, FieldConfig, StationReading, TimeBucket};
use storage::{InterpolatedMapDocument, MapSink, StationSource, StorageResult};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument, warn};

use crate::config::MapperConfig;

/// What happened to one field in a run.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldResult {
    Persisted { features: usize },
    Skipped { stage: FieldStage, reason: String },
    Failed { error: String },
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub bucket: TimeBucket,
    pub stations: usize,
    /// Per-field results in processing order
    pub fields: Vec<(String, FieldResult)>,
}

impl RunReport {
    pub fn persisted(&self) -> usize {
        self.count(|r| matches!(r, FieldResult::Persisted { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|r| matches!(r, FieldResult::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|r| matches!(r, FieldResult::Failed { .. }))
    }

    pub fn result(&self, field: &str) -> Option<&FieldResult> {
        self.fields.iter().find(|(f, _)| f == field).map(|(_, r)| r)
    }

    fn count(&self, pred: impl Fn(&FieldResult) -> bool) -> usize {
        self.fields.iter().filter(|(_, r)| pred(r)).count()
    }
}

/// Drives contour runs against a station source and a map sink.
pub struct Scheduler {
    source: Arc<dyn StationSource>,
    sink: Arc<dyn MapSink>,
    pipeline: Arc<FieldPipeline>,
    config: MapperConfig,
    fields: Vec<String>,
}

impl Scheduler {
    /// Create a scheduler for `fields`. Fields without a configuration entry
    /// are reported as skipped on every run.
    pub fn new(
        source: Arc<dyn StationSource>,
        sink: Arc<dyn MapSink>,
        pipeline: FieldPipeline,
        config: MapperConfig,
        fields: Vec<String>,
    ) -> Self {
        Self {
            source,
            sink,
            pipeline: Arc::new(pipeline),
            config,
            fields,
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Run every field once for the timestamp `now`.
    ///
    /// Only a failed station query aborts the run. A field that fails to
    /// process or persist is logged and the remaining fields still run;
    /// documents already written are kept.
    #[instrument(skip(self), fields(fields = self.fields.len()))]
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let bucket = time_bucket(now, self.pipeline.settings().bucket_minutes)?;
        let readings = self
            .source
            .online_stations(&self.fields, now)
            .await
            .context("Station query failed")?;
        info!(stations = readings.len(), bucket = %bucket, "Starting contour run");

        let readings = Arc::new(readings);
        let mut results = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let result = self.run_field(field, &readings, now).await;
            match &result {
                FieldResult::Persisted { features } => {
                    info!(field = %field, features, stage = %FieldStage::Persisted, "Field persisted");
                }
                FieldResult::Skipped { stage, reason } => {
                    warn!(field = %field, stage = %stage, reason = %reason, "Field skipped");
                }
                FieldResult::Failed { error } => {
                    error!(field = %field, error = %error, "Field failed");
                }
            }
            results.push((field.clone(), result));
        }

        let report = RunReport {
            started_at: now,
            bucket,
            stations: readings.len(),
            fields: results,
        };
        info!(
            persisted = report.persisted(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Contour run complete"
        );
        Ok(report)
    }

    async fn run_field(
        &self,
        field: &str,
        readings: &Arc<Vec<StationReading>>,
        now: DateTime<Utc>,
    ) -> FieldResult {
        let Some(config) = self.config.field(field) else {
            return FieldResult::Skipped {
                stage: FieldStage::Idle,
                reason: "no configuration entry".to_string(),
            };
        };

        let outcome = match self.process_blocking(config.clone(), readings.clone()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                return FieldResult::Failed {
                    error: format!("{:#}", e),
                }
            }
        };

        let collection = match outcome {
            FieldOutcome::Assembled(collection) => collection,
            FieldOutcome::Skipped { stage, reason } => {
                return FieldResult::Skipped {
                    stage,
                    reason: reason.to_string(),
                }
            }
        };

        let features = collection.features.len();
        match self.persist(field, &collection, now).await {
            Ok(()) => FieldResult::Persisted { features },
            Err(e) => FieldResult::Failed {
                error: e.to_string(),
            },
        }
    }

    async fn persist(
        &self,
        field: &str,
        collection: &MapFeatureCollection,
        now: DateTime<Utc>,
    ) -> StorageResult<()> {
        let document = InterpolatedMapDocument::new(
            field,
            collection,
            now,
            self.pipeline.settings().bucket_minutes,
        )?;
        self.sink.upsert_map(&document).await
    }

    /// The numeric work runs on the blocking pool so the runtime stays
    /// responsive to shutdown.
    async fn process_blocking(
        &self,
        config: FieldConfig,
        readings: Arc<Vec<StationReading>>,
    ) -> Result<FieldOutcome> {
        let pipeline = self.pipeline.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let samples = samples_for_field(&readings, &config.field_name);
            pipeline.process(&config, &samples)
        })
        .await
        .context("Field processing task panicked")??;
        Ok(outcome)
    }

    /// Run on a fixed period until a shutdown signal arrives.
    ///
    /// The first run starts immediately and later runs fire every `period`
    /// from it. Runs never overlap: a run that overruns its slot delays the
    /// next tick instead of queueing a burst of catch-up runs.
    pub async fn run_forever(
        &self,
        period: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    info!("Shutting down scheduler");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once(Utc::now()).await {
                        error!(error = %format!("{:#}", e), "Contour run failed");
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use field_processor::Boundary;
    use storage::{MemoryMapSink, StaticStationSource, StorageError};

    const CONFIG: &str = r##"
fields:
  latestTemperature:
    levels:
      - { limit: 0, color: "#0000ff" }
      - { limit: 10, color: "#00ff00" }
      - { limit: 20, color: "#ff0000" }
      - { limit: 30 }
"##;

    struct FailingSource;

    #[async_trait]
    impl StationSource for FailingSource {
        async fn online_stations(
            &self,
            _fields: &[String],
            _now: DateTime<Utc>,
        ) -> StorageResult<Vec<StationReading>> {
            Err(StorageError::InvalidDocument("connection refused".to_string()))
        }
    }

    fn readings() -> Vec<StationReading> {
        let mut readings = Vec::new();
        for row in 0..4 {
            for col in 0..4 {
                let lon = col as f64 * 0.5;
                let lat = row as f64 * 0.5;
                readings.push(
                    StationReading::new(format!("st-{}-{}", row, col), lon, lat)
                        .with_value("latestTemperature", 5.0 + 10.0 * lon + 2.0 * lat),
                );
            }
        }
        readings
    }

    fn scheduler(source: Arc<dyn StationSource>, sink: Arc<MemoryMapSink>, fields: &[&str]) -> Scheduler {
        let config = MapperConfig::from_yaml_str(CONFIG).unwrap();
        let boundary = Boundary::from_geojson_str(
            r#"{"type":"Polygon","coordinates":[[[-0.5,-0.5],[2.5,-0.5],[2.5,2.5],[-0.5,2.5],[-0.5,-0.5]]]}"#,
            0.01,
        )
        .unwrap();
        let mut settings = config.settings.clone();
        settings.grid_nx = 40;
        settings.grid_ny = 40;
        Scheduler::new(
            source,
            sink,
            FieldPipeline::new(settings, boundary),
            config,
            fields.iter().map(|f| f.to_string()).collect(),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 14, 27, 12).unwrap()
    }

    #[tokio::test]
    async fn test_run_once_persists_field() {
        let sink = Arc::new(MemoryMapSink::new());
        let source = Arc::new(StaticStationSource::new(readings()));
        let report = scheduler(source, sink.clone(), &["latestTemperature"])
            .run_once(now())
            .await
            .unwrap();

        assert_eq!(report.bucket, Utc.with_ymd_and_hms(2025, 6, 1, 14, 20, 0).unwrap());
        assert_eq!(report.stations, 16);
        assert_eq!(report.persisted(), 1);
        assert!(matches!(
            report.result("latestTemperature"),
            Some(FieldResult::Persisted { features }) if *features > 0
        ));
        assert_eq!(sink.len().await, 1);
    }

    #[tokio::test]
    async fn test_unconfigured_field_skipped() {
        let sink = Arc::new(MemoryMapSink::new());
        let source = Arc::new(StaticStationSource::new(readings()));
        let report = scheduler(source, sink.clone(), &["latestPressure", "latestTemperature"])
            .run_once(now())
            .await
            .unwrap();

        assert!(matches!(
            report.result("latestPressure"),
            Some(FieldResult::Skipped { stage: FieldStage::Idle, .. })
        ));
        assert_eq!(report.persisted(), 1);
        assert_eq!(report.skipped(), 1);
    }

    #[tokio::test]
    async fn test_field_without_samples_skipped() {
        let sink = Arc::new(MemoryMapSink::new());
        let source = Arc::new(StaticStationSource::new(Vec::new()));
        let report = scheduler(source, sink.clone(), &["latestTemperature"])
            .run_once(now())
            .await
            .unwrap();

        assert_eq!(report.skipped(), 1);
        assert!(sink.is_empty().await);
    }

    #[test]
    fn test_source_failure_aborts_run() {
        let sink = Arc::new(MemoryMapSink::new());
        let scheduler = scheduler(Arc::new(FailingSource), sink.clone(), &["latestTemperature"]);

        let err = tokio_test::block_on(scheduler.run_once(now())).unwrap_err();
        assert!(err.to_string().contains("Station query failed"));
        assert!(tokio_test::block_on(sink.is_empty()));
    }

    #[tokio::test]
    async fn test_run_forever_runs_once_per_period_until_shutdown() {
        let sink = Arc::new(MemoryMapSink::new());
        let source = Arc::new(StaticStationSource::new(readings()));
        let scheduler = scheduler(source, sink.clone(), &["latestTemperature"]);

        let (tx, rx) = broadcast::channel(1);
        let stop = async {
            while sink.is_empty().await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            tx.send(()).unwrap();
        };
        let (result, ()) = tokio::join!(scheduler.run_forever(Duration::from_secs(3600), rx), stop);

        result.unwrap();
        assert_eq!(sink.len().await, 1);
    }

    #[tokio::test]
    async fn test_run_forever_honours_pending_shutdown() {
        let sink = Arc::new(MemoryMapSink::new());
        let source = Arc::new(StaticStationSource::new(readings()));
        let scheduler = scheduler(source, sink.clone(), &["latestTemperature"]);

        let (tx, rx) = broadcast::channel(1);
        tx.send(()).unwrap();
        scheduler.run_forever(Duration::from_secs(3600), rx).await.unwrap();
        assert!(sink.is_empty().await);
    }
}
