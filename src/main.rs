use anyhow::{bail, Result};
use load_weather_ingest::{config::AppConfig, observability, pipeline, sinks};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: load-weather-ingest <sqlite_db_path>");
    }
    let db_path = &args[1];

    // Source directories and the station registry come from the config
    // file (or its defaults); the destination comes from the command line.
    let cfg = AppConfig::load()?;

    let pool = sinks::sqlite::connect(db_path).await?;

    let summary = pipeline::run_import(&cfg, &pool).await?;
    tracing::info!(
        load_files = summary.load_files,
        weather_files = summary.weather_files,
        rows = summary.joined_rows,
        db = %db_path,
        "import complete"
    );

    Ok(())
}
