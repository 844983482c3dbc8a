use std::fs::File;
use std::path::{Path, PathBuf};

use crate::config::is_safe_identifier;
use crate::pipeline::ImportError;
use crate::timestamp;

/// Calendar-date column in load exports.
const DATE_COLUMN: &str = "OperDay";
/// Hour-ending label column in load exports.
const HOUR_COLUMN: &str = "HourEnding";
/// Columns that are metadata or derived, not part of the normalized schema.
const DROP_COLUMNS: &[&str] = &["TOTAL", "DSTFlag"];

/// One load file, normalized: the date and hour-ending columns collapsed
/// into a canonical timestamp, one value per region per row.
#[derive(Debug)]
pub struct LoadFrame {
    pub path: PathBuf,
    pub regions: Vec<String>,
    pub rows: Vec<(String, Vec<f64>)>,
}

fn parse_error(path: &Path, detail: impl Into<String>) -> ImportError {
    ImportError::Parse {
        path: path.to_path_buf(),
        detail: detail.into(),
    }
}

/// Parse one region-load CSV.
///
/// Expected header columns (by name): `OperDay` (MM/DD/YYYY), `HourEnding`
/// (`1:00`..`24:00`), one numeric column per region, plus `TOTAL` and
/// `DSTFlag` which are discarded. Every remaining column becomes a region
/// column in the output schema, so its name must be a usable identifier.
pub fn read_load_csv(path: &Path) -> Result<LoadFrame, ImportError> {
    let file = File::open(path)
        .map_err(|e| parse_error(path, format!("failed to open load CSV: {e}")))?;
    let mut rdr = csv::Reader::from_reader(file);
    let headers = rdr
        .headers()
        .map_err(|e| parse_error(path, format!("failed to read CSV headers: {e}")))?
        .clone();

    let date_idx = headers
        .iter()
        .position(|h| h == DATE_COLUMN)
        .ok_or_else(|| parse_error(path, format!("missing column '{DATE_COLUMN}'")))?;
    let hour_idx = headers
        .iter()
        .position(|h| h == HOUR_COLUMN)
        .ok_or_else(|| parse_error(path, format!("missing column '{HOUR_COLUMN}'")))?;

    let mut regions: Vec<String> = Vec::new();
    let mut region_indices: Vec<usize> = Vec::new();
    for (idx, name) in headers.iter().enumerate() {
        let name = name.trim();
        if idx == date_idx || idx == hour_idx || DROP_COLUMNS.contains(&name) {
            continue;
        }
        if !is_safe_identifier(name) {
            return Err(parse_error(path, format!("region column '{name}' is not a valid identifier")));
        }
        regions.push(name.to_string());
        region_indices.push(idx);
    }
    if regions.is_empty() {
        return Err(parse_error(path, "no region columns found"));
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record =
            result.map_err(|e| parse_error(path, format!("failed to read CSV record: {e}")))?;

        let date = record
            .get(date_idx)
            .ok_or_else(|| parse_error(path, format!("short record, no '{DATE_COLUMN}' field")))?;
        let hour = record
            .get(hour_idx)
            .ok_or_else(|| parse_error(path, format!("short record, no '{HOUR_COLUMN}' field")))?;
        let ts = timestamp::hour_ending_to_canonical(date, hour)
            .map_err(|e| parse_error(path, e.to_string()))?;

        let mut values = Vec::with_capacity(region_indices.len());
        for (&idx, region) in region_indices.iter().zip(&regions) {
            let raw = record
                .get(idx)
                .ok_or_else(|| parse_error(path, format!("short record, no '{region}' field")))?;
            let value: f64 = raw.trim().parse().map_err(|_| {
                parse_error(path, format!("invalid load value '{raw}' in column '{region}'"))
            })?;
            values.push(value);
        }
        rows.push((ts, values));
    }

    Ok(LoadFrame {
        path: path.to_path_buf(),
        regions,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parses_and_normalizes_a_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "load.csv",
            "OperDay,HourEnding,COAST,EAST,TOTAL,DSTFlag\n\
             01/02/2014,1:00,7659.4,1214.2,8873.6,N\n\
             01/02/2014,24:00,7000.0,1100.5,8100.5,N\n",
        );

        let frame = read_load_csv(&path).unwrap();
        assert_eq!(frame.regions, vec!["COAST", "EAST"]);
        assert_eq!(frame.rows.len(), 2);
        assert_eq!(frame.rows[0].0, "2014-01-02 00:00:00");
        assert_eq!(frame.rows[0].1, vec![7659.4, 1214.2]);
        assert_eq!(frame.rows[1].0, "2014-01-02 23:00:00");
    }

    #[test]
    fn fails_without_required_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "load.csv", "Day,HourEnding,COAST\n01/02/2014,1:00,1.0\n");
        let err = read_load_csv(&path).unwrap_err();
        assert!(matches!(err, ImportError::Parse { .. }));
        assert!(err.to_string().contains("OperDay"));
    }

    #[test]
    fn fails_on_non_numeric_load_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "load.csv",
            "OperDay,HourEnding,COAST\n01/02/2014,1:00,n/a\n",
        );
        let err = read_load_csv(&path).unwrap_err();
        assert!(err.to_string().contains("COAST"));
    }

    #[test]
    fn fails_on_unsafe_region_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "load.csv",
            "OperDay,HourEnding,bad region\n01/02/2014,1:00,1.0\n",
        );
        assert!(read_load_csv(&path).is_err());
    }
}
