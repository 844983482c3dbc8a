use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::config::StationConfig;
use crate::pipeline::ImportError;

fn io_error(path: &Path, source: io::Error) -> ImportError {
    ImportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

fn scan(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, ImportError> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_error(dir, e))? {
        let entry = entry.map_err(|e| io_error(dir, e))?;
        let path = entry.path();
        if path.is_file() && has_extension(&path, ext) {
            out.push(path);
        }
    }
    // Sorted for deterministic processing order; weather file names embed
    // dates, so this is also chronological order within a station.
    out.sort();
    Ok(out)
}

/// Extract every CSV entry of every zip archive in `dir` into `dir` itself,
/// flattening any internal directory structure. Returns the number of
/// entries written.
fn extract_archives(dir: &Path) -> Result<usize, ImportError> {
    let mut extracted = 0;
    for zip_path in scan(dir, "zip")? {
        let file = File::open(&zip_path).map_err(|e| io_error(&zip_path, e))?;
        let mut archive = ZipArchive::new(file).map_err(|e| ImportError::Archive {
            path: zip_path.clone(),
            source: e,
        })?;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| ImportError::Archive {
                path: zip_path.clone(),
                source: e,
            })?;
            if !entry.is_file() || !entry.name().to_ascii_lowercase().ends_with(".csv") {
                continue;
            }
            let Some(file_name) = Path::new(entry.name()).file_name().map(PathBuf::from) else {
                continue;
            };
            let dest = dir.join(file_name);
            let mut out = File::create(&dest).map_err(|e| io_error(&dest, e))?;
            io::copy(&mut entry, &mut out).map_err(|e| io_error(&dest, e))?;
            extracted += 1;
        }
    }
    Ok(extracted)
}

/// List the CSV files in `dir`. An empty directory gets exactly one shot at
/// recovery: expand any bundled zip archives in place and rescan. Still
/// empty after that is a hard `MissingData` failure.
pub fn discover_csvs(dir: &Path) -> Result<Vec<PathBuf>, ImportError> {
    let mut files = scan(dir, "csv")?;
    if files.is_empty() {
        let extracted = extract_archives(dir)?;
        if extracted > 0 {
            tracing::info!(dir = %dir.display(), extracted, "expanded bundled archives");
        }
        files = scan(dir, "csv")?;
    }
    if files.is_empty() {
        return Err(ImportError::MissingData {
            dir: dir.to_path_buf(),
        });
    }
    Ok(files)
}

/// All region-load files in `dir`. Every file carries the full set of
/// region columns, so the load family is a single group.
pub fn discover_load_files(dir: &Path) -> Result<Vec<PathBuf>, ImportError> {
    discover_csvs(dir)
}

/// Weather files in `dir`, grouped by registered station code.
///
/// The station code is matched against the leading `_`-separated segment of
/// the file name (`KDAL_20140101.csv` -> `KDAL`). Files matching no
/// registered station are skipped; a directory where nothing matches at all
/// yields `MissingData`.
pub fn discover_weather_files(
    dir: &Path,
    stations: &[StationConfig],
) -> Result<BTreeMap<String, Vec<PathBuf>>, ImportError> {
    let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in discover_csvs(dir)? {
        match classify_station(&path, stations) {
            Some(code) => groups.entry(code).or_default().push(path),
            None => {
                tracing::debug!(path = %path.display(), "file matches no registered station, skipping")
            }
        }
    }
    if groups.is_empty() {
        return Err(ImportError::MissingData {
            dir: dir.to_path_buf(),
        });
    }
    Ok(groups)
}

fn classify_station(path: &Path, stations: &[StationConfig]) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let segment = stem.split('_').next()?;
    stations
        .iter()
        .find(|s| segment.contains(s.code.as_str()))
        .map(|s| s.code.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn station(code: &str) -> StationConfig {
        StationConfig {
            code: code.to_string(),
            name: code.to_string(),
        }
    }

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name))
            .unwrap()
            .write_all(b"stub\n")
            .unwrap();
    }

    #[test]
    fn empty_directory_is_missing_data() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_csvs(dir.path()).unwrap_err();
        assert!(matches!(err, ImportError::MissingData { .. }));
    }

    #[test]
    fn finds_csv_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.csv");
        touch(dir.path(), "a.CSV");
        touch(dir.path(), "notes.txt");
        let files = discover_csvs(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|p| p.file_name().unwrap()).collect();
        assert_eq!(names, vec!["a.CSV", "b.csv"]);
    }

    #[test]
    fn falls_back_to_archive_expansion() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("bundle.zip");
        let mut zip = zip::ZipWriter::new(File::create(&zip_path).unwrap());
        let opts = zip::write::SimpleFileOptions::default();
        zip.start_file("nested/KDAL_20140101.csv", opts).unwrap();
        zip.write_all(b"TemperatureF,DateUTC\n46.9,2014-01-01 05:53:00\n")
            .unwrap();
        zip.start_file("readme.txt", opts).unwrap();
        zip.write_all(b"ignored").unwrap();
        zip.finish().unwrap();

        let files = discover_csvs(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name().unwrap(), "KDAL_20140101.csv");
    }

    #[test]
    fn groups_weather_files_by_station_code() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "KDAL_20140101.csv");
        touch(dir.path(), "KDAL_20140102.csv");
        touch(dir.path(), "KSAT_20140101.csv");
        touch(dir.path(), "KELP_20140101.csv");

        let stations = [station("KDAL"), station("SAT")];
        let groups = discover_weather_files(dir.path(), &stations).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["KDAL"].len(), 2);
        // "SAT" is registered without the ICAO prefix; substring match on
        // the leading segment still classifies KSAT files.
        assert_eq!(groups["SAT"].len(), 1);
        assert!(!groups.contains_key("KELP"));
    }

    #[test]
    fn all_files_unmatched_is_missing_data() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "KELP_20140101.csv");
        let err = discover_weather_files(dir.path(), &[station("KDAL")]).unwrap_err();
        assert!(matches!(err, ImportError::MissingData { .. }));
    }
}
