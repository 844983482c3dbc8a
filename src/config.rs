use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// A known weather station, mapped explicitly rather than discovered from
/// file names at runtime. Files whose name matches no registered code are
/// skipped during discovery.
#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    /// Short station code embedded in weather file names (e.g. "KHOU").
    pub code: String,
    /// Human-readable station name, for logs only.
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Directory of per-region system load CSV exports.
    pub load_dir: PathBuf,
    /// Directory of per-station weather observation CSV exports.
    pub weather_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    /// Upper bound on rows per INSERT batch. The sink further caps each
    /// batch by the SQLite bind-parameter limit.
    pub batch_rows: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub sources: SourcesConfig,
    pub stations: Vec<StationConfig>,
    pub sink: SinkConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            sources: SourcesConfig {
                load_dir: PathBuf::from("./system_load_by_region"),
                weather_dir: PathBuf::from("./weather_data"),
            },
            stations: [("KHOU", "Houston Hobby"), ("KDAL", "Dallas Love Field"), ("SAT", "San Antonio")]
                .iter()
                .map(|(code, name)| StationConfig {
                    code: code.to_string(),
                    name: name.to_string(),
                })
                .collect(),
            sink: SinkConfig { batch_rows: 500 },
        }
    }
}

/// True when `s` is usable verbatim as a SQL column identifier. Region and
/// station codes become column names in the output table, so anything else
/// is rejected up front.
pub fn is_safe_identifier(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with(|c: char| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl AppConfig {
    /// Load configuration from the file named by `INGEST_CONFIG`, falling
    /// back to `ingest-config.toml`, falling back to built-in defaults that
    /// match the conventional data layout relative to the project root.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("INGEST_CONFIG").unwrap_or_else(|_| "ingest-config.toml".to_string());
        let cfg = match fs::read_to_string(&path) {
            Ok(contents) => toml::from_str::<AppConfig>(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path, "no config file found, using default layout");
                AppConfig::default()
            }
            Err(e) => return Err(e.into()),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Startup validation of the station registry: codes must be non-empty,
    /// unique, and usable as column-name segments.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.stations.is_empty() {
            anyhow::bail!("station registry is empty");
        }
        for station in &self.stations {
            if !is_safe_identifier(&station.code) {
                anyhow::bail!("invalid station code '{}'", station.code);
            }
        }
        let mut codes: Vec<&str> = self.stations.iter().map(|s| s.code.as_str()).collect();
        codes.sort_unstable();
        codes.dedup();
        if codes.len() != self.stations.len() {
            anyhow::bail!("duplicate station codes in registry");
        }
        Ok(())
    }
}
