use crate::aggregate::{LoadTable, WeatherTable};

/// The joined output: one row per timestamp present in BOTH tables.
#[derive(Debug)]
pub struct ResultTable {
    /// Region load column names, as found in the load files.
    pub load_columns: Vec<String>,
    /// `<station>_TemperatureF` column names, one per station.
    pub weather_columns: Vec<String>,
    /// Rows in ascending timestamp order.
    pub rows: Vec<ResultRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub timestamp: String,
    pub loads: Vec<f64>,
    pub temperatures: Vec<Option<f64>>,
}

/// Inner equi-join on canonical timestamp.
///
/// Both inputs are keyed maps, so each side holds at most one row per
/// timestamp and the join can never fan out. Timestamps present on only
/// one side are dropped; the downstream analysis needs paired
/// temperature/load observations.
pub fn join_tables(load: &LoadTable, weather: &WeatherTable) -> ResultTable {
    let mut rows = Vec::new();
    for (ts, loads) in &load.rows {
        if let Some(temperatures) = weather.rows.get(ts) {
            rows.push(ResultRow {
                timestamp: ts.clone(),
                loads: loads.clone(),
                temperatures: temperatures.clone(),
            });
        }
    }

    ResultTable {
        load_columns: load.regions.clone(),
        weather_columns: weather.columns.clone(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn load_table(stamps: &[&str]) -> LoadTable {
        LoadTable {
            regions: vec!["COAST".to_string()],
            rows: stamps
                .iter()
                .map(|ts| (ts.to_string(), vec![100.0]))
                .collect(),
        }
    }

    fn weather_table(stamps: &[&str]) -> WeatherTable {
        WeatherTable {
            columns: vec!["KDAL_TemperatureF".to_string()],
            rows: stamps
                .iter()
                .map(|ts| (ts.to_string(), vec![Some(46.9)]))
                .collect(),
        }
    }

    #[test]
    fn keeps_only_timestamps_present_on_both_sides() {
        let t1 = "2014-01-01 00:00:00";
        let t2 = "2014-01-01 01:00:00";
        let t3 = "2014-01-01 02:00:00";
        let t4 = "2014-01-01 03:00:00";

        let joined = join_tables(&load_table(&[t1, t2, t3]), &weather_table(&[t2, t3, t4]));
        let stamps: Vec<&str> = joined.rows.iter().map(|r| r.timestamp.as_str()).collect();
        assert_eq!(stamps, vec![t2, t3]);
        for row in &joined.rows {
            assert_eq!(row.loads, vec![100.0]);
            assert_eq!(row.temperatures, vec![Some(46.9)]);
        }
    }

    #[test]
    fn row_count_bounded_by_smaller_side() {
        let joined = join_tables(
            &load_table(&["2014-01-01 00:00:00", "2014-01-01 01:00:00"]),
            &weather_table(&["2014-06-01 00:00:00"]),
        );
        assert!(joined.rows.is_empty());
    }

    #[test]
    fn missing_temperature_does_not_drop_a_joined_row() {
        let ts = "2014-01-01 00:00:00";
        let mut weather = weather_table(&[ts]);
        weather.rows.insert(ts.to_string(), vec![None]);

        let joined = join_tables(&load_table(&[ts]), &weather);
        assert_eq!(joined.rows.len(), 1);
        assert_eq!(joined.rows[0].temperatures, vec![None]);
    }

    #[test]
    fn rows_come_out_in_ascending_timestamp_order() {
        let stamps = ["2014-03-01 05:00:00", "2014-01-01 00:00:00", "2014-02-01 12:00:00"];
        let joined = join_tables(&load_table(&stamps), &weather_table(&stamps));
        let got: Vec<&str> = joined.rows.iter().map(|r| r.timestamp.as_str()).collect();
        assert_eq!(
            got,
            vec![
                "2014-01-01 00:00:00",
                "2014-02-01 12:00:00",
                "2014-03-01 05:00:00"
            ]
        );
    }

    #[test]
    fn empty_weather_side_joins_to_nothing() {
        let joined = join_tables(
            &load_table(&["2014-01-01 00:00:00"]),
            &WeatherTable {
                columns: Vec::new(),
                rows: BTreeMap::new(),
            },
        );
        assert!(joined.rows.is_empty());
        assert_eq!(joined.load_columns, vec!["COAST"]);
    }
}
