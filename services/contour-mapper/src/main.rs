//! Station contour mapper service.
//!
//! Every interval, reads the latest station metrics, interpolates each
//! configured field over the study area, traces filled contour bands and
//! stores the result as a compressed GeoJSON FeatureCollection keyed by
//! field and time bucket.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use contour_mapper::{MapperConfig, Scheduler};
use field_processor::{Boundary, FieldPipeline};
use storage::{FileMapSink, MapSink, PgMapStore, StationSource, StationsFile};
use tokio::sync::broadcast;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "contour-mapper")]
#[command(about = "Interpolated contour maps from weather station readings")]
struct Args {
    /// Run once and exit (vs continuous scheduling)
    #[arg(long)]
    once: bool,

    /// Minutes between runs
    #[arg(long, default_value = "10")]
    interval_minutes: u64,

    /// Field configuration file (YAML or JSON)
    #[arg(long, env = "CONTOUR_CONFIG", default_value = "config/fields.yaml")]
    config: PathBuf,

    /// Study-area boundary (GeoJSON)
    #[arg(long, env = "BOUNDARY_PATH", default_value = "config/boundary.geojson")]
    boundary: PathBuf,

    /// PostgreSQL connection string for stations and stored maps
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Write maps as GeoJSON files here instead of the database
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Read stations from a JSON file instead of the database
    #[arg(long)]
    stations_file: Option<PathBuf>,

    /// Comma-separated fields to process (default: all configured)
    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting contour mapper");

    let config = MapperConfig::load(&args.config)?;
    if config.is_empty() {
        warn!(path = %args.config.display(), "No fields configured");
    }

    let boundary = Boundary::from_file(&args.boundary, config.settings.boundary_tolerance)
        .with_context(|| format!("Failed to load boundary: {}", args.boundary.display()))?;
    let pipeline = FieldPipeline::new(config.settings.clone(), boundary);

    // Only connect when something actually needs the database
    let needs_db = args.stations_file.is_none() || args.output_dir.is_none();
    let store = if needs_db {
        let Some(url) = args.database_url.as_deref() else {
            bail!("DATABASE_URL is required unless both --stations-file and --output-dir are given");
        };
        let store = Arc::new(PgMapStore::connect(url).await?);
        store.migrate().await?;
        Some(store)
    } else {
        None
    };

    let source: Arc<dyn StationSource> = match (&args.stations_file, &store) {
        (Some(path), _) => Arc::new(StationsFile::new(path.clone())),
        (None, Some(store)) => store.clone(),
        (None, None) => bail!("No station source configured"),
    };

    let sink: Arc<dyn MapSink> = match (&args.output_dir, &store) {
        (Some(dir), _) => Arc::new(FileMapSink::new(dir.clone()).await?),
        (None, Some(store)) => store.clone(),
        (None, None) => bail!("No map sink configured"),
    };

    let fields = if args.fields.is_empty() {
        config.field_names()
    } else {
        args.fields.clone()
    };
    info!(fields = ?fields, "Fields selected");

    let scheduler = Scheduler::new(source, sink, pipeline, config, fields);

    if args.once {
        info!("Running single contour cycle");
        let report = scheduler.run_once(Utc::now()).await?;
        info!(
            bucket = %report.bucket,
            persisted = report.persisted(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Run finished"
        );
    } else {
        info!(interval_minutes = args.interval_minutes, "Starting continuous scheduling");

        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        // Handle Ctrl+C
        let shutdown_tx_clone = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
            shutdown_tx_clone.send(()).ok();
        });

        let period = Duration::from_secs(args.interval_minutes.max(1) * 60);
        scheduler.run_forever(period, shutdown_tx.subscribe()).await?;
    }

    info!("Contour mapper stopped");
    Ok(())
}
