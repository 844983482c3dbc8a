use std::fs::File;
use std::path::{Path, PathBuf};

use crate::pipeline::ImportError;
use crate::timestamp;

/// UTC instant column in weather exports.
const DATE_COLUMN: &str = "DateUTC";
/// Temperature column in weather exports.
const TEMPERATURE_COLUMN: &str = "TemperatureF";

/// One station's weather file, normalized: UTC instants rounded up to the
/// hour grid, everything but the temperature discarded. Row order follows
/// file order, which aggregation relies on for its keep-last rule.
#[derive(Debug)]
pub struct WeatherFrame {
    pub path: PathBuf,
    pub station: String,
    pub rows: Vec<(String, Option<f64>)>,
}

fn parse_error(path: &Path, detail: impl Into<String>) -> ImportError {
    ImportError::Parse {
        path: path.to_path_buf(),
        detail: detail.into(),
    }
}

/// Parse one station's weather CSV.
///
/// Only `DateUTC` and `TemperatureF` are read; other columns are ignored.
/// An empty temperature field is an explicit missing reading, not zero.
/// Sub-hourly rows are kept as-is here; collapsing onto the hourly grid is
/// the aggregator's job.
pub fn read_weather_csv(path: &Path, station: &str) -> Result<WeatherFrame, ImportError> {
    let file = File::open(path)
        .map_err(|e| parse_error(path, format!("failed to open weather CSV: {e}")))?;
    let mut rdr = csv::Reader::from_reader(file);
    let headers = rdr
        .headers()
        .map_err(|e| parse_error(path, format!("failed to read CSV headers: {e}")))?
        .clone();

    let date_idx = headers
        .iter()
        .position(|h| h.trim() == DATE_COLUMN)
        .ok_or_else(|| parse_error(path, format!("missing column '{DATE_COLUMN}'")))?;
    let temp_idx = headers
        .iter()
        .position(|h| h.trim() == TEMPERATURE_COLUMN)
        .ok_or_else(|| parse_error(path, format!("missing column '{TEMPERATURE_COLUMN}'")))?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record =
            result.map_err(|e| parse_error(path, format!("failed to read CSV record: {e}")))?;

        let raw_ts = record
            .get(date_idx)
            .ok_or_else(|| parse_error(path, format!("short record, no '{DATE_COLUMN}' field")))?;
        let ts = timestamp::round_utc_hour_up(raw_ts)
            .map_err(|e| parse_error(path, e.to_string()))?;

        let raw_temp = record
            .get(temp_idx)
            .ok_or_else(|| {
                parse_error(path, format!("short record, no '{TEMPERATURE_COLUMN}' field"))
            })?
            .trim();
        let temperature = if raw_temp.is_empty() {
            None
        } else {
            Some(raw_temp.parse::<f64>().map_err(|_| {
                parse_error(
                    path,
                    format!("invalid value '{raw_temp}' in column '{TEMPERATURE_COLUMN}'"),
                )
            })?)
        };

        rows.push((ts, temperature));
    }

    Ok(WeatherFrame {
        path: path.to_path_buf(),
        station: station.to_string(),
        rows,
    })
}
