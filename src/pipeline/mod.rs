use std::path::PathBuf;

use futures::future::try_join_all;
use sqlx::SqlitePool;
use tokio::task;

use crate::aggregate;
use crate::config::AppConfig;
use crate::discover;
use crate::join;
use crate::sinks::SqliteSink;
use crate::sources::{self, LoadFrame, WeatherFrame};

/// All failure modes of an import run. Every variant is fatal: the run
/// either produces a complete joined table or leaves the destination as it
/// was.
#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    #[error("parse failure in {}: {detail}", .path.display())]
    Parse { path: PathBuf, detail: String },

    #[error("no usable source files in {}", .dir.display())]
    MissingData { dir: PathBuf },

    #[error("duplicate timestamp {timestamp} while aggregating {}", .path.display())]
    DuplicateTimestamp { timestamp: String, path: PathBuf },

    #[error("persistence failure: {detail}")]
    Persistence {
        detail: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    #[error("I/O failure on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive failure on {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("worker task failed: {0}")]
    Task(String),
}

#[derive(Debug)]
pub struct ImportSummary {
    pub load_files: usize,
    pub weather_files: usize,
    pub load_rows: usize,
    pub weather_rows: usize,
    pub joined_rows: usize,
}

fn task_failed(e: tokio::task::JoinError) -> ImportError {
    ImportError::Task(e.to_string())
}

/// Run the whole import: discover, parse, aggregate, join, persist.
///
/// The stages compose as plain functions; per-file parsing fans out onto
/// blocking worker threads and everything is collected before aggregation,
/// so no stage mutates shared state. Any failure aborts the run before the
/// sink transaction commits.
pub async fn run_import(cfg: &AppConfig, pool: &SqlitePool) -> Result<ImportSummary, ImportError> {
    let load_dir = cfg.sources.load_dir.clone();
    let load_files =
        task::spawn_blocking(move || discover::discover_load_files(&load_dir))
            .await
            .map_err(task_failed)??;
    tracing::info!(files = load_files.len(), "discovered load files");

    let weather_dir = cfg.sources.weather_dir.clone();
    let stations = cfg.stations.clone();
    let weather_groups =
        task::spawn_blocking(move || discover::discover_weather_files(&weather_dir, &stations))
            .await
            .map_err(task_failed)??;
    let weather_file_count: usize = weather_groups.values().map(Vec::len).sum();
    tracing::info!(
        stations = weather_groups.len(),
        files = weather_file_count,
        "discovered weather files"
    );

    let load_tasks: Vec<_> = load_files
        .iter()
        .cloned()
        .map(|path| task::spawn_blocking(move || sources::read_load_csv(&path)))
        .collect();
    let load_frames: Vec<LoadFrame> = try_join_all(load_tasks)
        .await
        .map_err(task_failed)?
        .into_iter()
        .collect::<Result<_, _>>()?;

    // Task order mirrors (station, file) sort order; the aggregator's
    // keep-last rule depends on it.
    let mut weather_tasks = Vec::new();
    for (station, paths) in &weather_groups {
        for path in paths {
            let path = path.clone();
            let station = station.clone();
            weather_tasks
                .push(task::spawn_blocking(move || sources::read_weather_csv(&path, &station)));
        }
    }
    let weather_frames: Vec<WeatherFrame> = try_join_all(weather_tasks)
        .await
        .map_err(task_failed)?
        .into_iter()
        .collect::<Result<_, _>>()?;

    let load_table = aggregate::aggregate_load(load_frames)?;
    let weather_table = aggregate::aggregate_weather(weather_frames);
    tracing::info!(
        load_rows = load_table.rows.len(),
        weather_rows = weather_table.rows.len(),
        "aggregated source tables"
    );

    let result = join::join_tables(&load_table, &weather_table);
    tracing::info!(rows = result.rows.len(), "joined load and weather tables");

    let sink = SqliteSink::new(pool.clone(), cfg.sink.batch_rows);
    sink.write(&result).await?;

    Ok(ImportSummary {
        load_files: load_files.len(),
        weather_files: weather_file_count,
        load_rows: load_table.rows.len(),
        weather_rows: weather_table.rows.len(),
        joined_rows: result.rows.len(),
    })
}
