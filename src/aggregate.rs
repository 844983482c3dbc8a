use std::collections::{BTreeMap, BTreeSet};

use crate::pipeline::ImportError;
use crate::sources::{LoadFrame, WeatherFrame};

/// All load files folded into one table: at most one row per canonical
/// timestamp. Keys are canonical timestamp strings, so iteration order is
/// chronological.
#[derive(Debug)]
pub struct LoadTable {
    pub regions: Vec<String>,
    pub rows: BTreeMap<String, Vec<f64>>,
}

/// All weather files folded into one table, stations outer-joined on
/// timestamp. `columns[i]` names `rows[ts][i]`; a station with no reading
/// for an hour holds `None` there.
#[derive(Debug)]
pub struct WeatherTable {
    pub columns: Vec<String>,
    pub rows: BTreeMap<String, Vec<Option<f64>>>,
}

/// Fold per-file load frames into a single deduplicated table.
///
/// Region column sets must agree across files. A timestamp appearing twice
/// means overlapping or duplicated exports; that input is corrupt and the
/// run is rejected rather than silently merged.
pub fn aggregate_load(frames: Vec<LoadFrame>) -> Result<LoadTable, ImportError> {
    let Some(first) = frames.first() else {
        return Ok(LoadTable {
            regions: Vec::new(),
            rows: BTreeMap::new(),
        });
    };
    let regions = first.regions.clone();

    let mut rows: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for frame in frames {
        if frame.regions != regions {
            return Err(ImportError::Parse {
                path: frame.path,
                detail: format!(
                    "region columns {:?} do not match {:?} from the first file",
                    frame.regions, regions
                ),
            });
        }
        for (ts, values) in frame.rows {
            if rows.contains_key(&ts) {
                return Err(ImportError::DuplicateTimestamp {
                    timestamp: ts,
                    path: frame.path.clone(),
                });
            }
            rows.insert(ts, values);
        }
    }

    Ok(LoadTable { regions, rows })
}

/// Fold per-station weather frames into one table, outer-joined on
/// timestamp.
///
/// Sub-hourly readings collapse onto the hourly grid with a keep-last rule:
/// frames arrive in sorted file order and rows in file order, so the
/// surviving reading is the one closest to the hour boundary. Stations are
/// ordered by code; each contributes a `<code>_TemperatureF` column.
pub fn aggregate_weather(frames: Vec<WeatherFrame>) -> WeatherTable {
    let station_set: BTreeSet<&str> = frames.iter().map(|f| f.station.as_str()).collect();
    let stations: Vec<String> = station_set.into_iter().map(String::from).collect();
    let index: BTreeMap<&str, usize> = stations
        .iter()
        .enumerate()
        .map(|(i, s)| (s.as_str(), i))
        .collect();

    let mut rows: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
    for frame in &frames {
        let idx = index[frame.station.as_str()];
        for (ts, temperature) in &frame.rows {
            let slot = rows
                .entry(ts.clone())
                .or_insert_with(|| vec![None; stations.len()]);
            slot[idx] = *temperature;
        }
    }

    WeatherTable {
        columns: stations
            .iter()
            .map(|code| format!("{code}_TemperatureF"))
            .collect(),
        rows,
    }
}
