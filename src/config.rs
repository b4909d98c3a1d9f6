//! Application configuration: built-in defaults, an optional YAML file, then
//! `CAPEXEMPT_*` environment overrides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::data::record::DataYear;

pub const DEFAULT_CONFIG_PATH: &str = "capexempt.yaml";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:7860";
/// Rows read from a 2025 source when the main pass produced a single older year.
pub const DEFAULT_DIVERSITY_ROW_LIMIT: usize = 7500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse config '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One data source, tried in list order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceSpec {
    pub file: String,
    pub year: DataYear,
    /// A primary columnar source ends the search for further sources once it loads.
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SourceSpec {
    pub fn new(file: impl Into<String>, year: DataYear) -> Self {
        Self {
            file: file.into(),
            year,
            primary: false,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Relative source paths resolve against this directory.
    pub data_dir: PathBuf,
    pub sources: Vec<SourceSpec>,
    pub diversity_row_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            data_dir: PathBuf::from("."),
            sources: default_sources(),
            diversity_row_limit: DEFAULT_DIVERSITY_ROW_LIMIT,
        }
    }
}

fn default_sources() -> Vec<SourceSpec> {
    vec![
        SourceSpec {
            primary: true,
            ..SourceSpec::new("optimized_employers.parquet", DataYear::Y2024)
        },
        SourceSpec::new("optimized_employers.csv", DataYear::Y2024),
        SourceSpec::new("LCA_2025_dashboard_ready.csv", DataYear::Y2025),
        SourceSpec::new("likely_cap_exempt_employers.csv", DataYear::Y2024),
        SourceSpec::new("cap_exempt_analysis_results.csv", DataYear::Y2024),
    ]
}

impl AppConfig {
    /// Parse a YAML document. Missing keys fall back to defaults.
    pub fn from_yaml(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw, &path.display().to_string())
    }

    /// `CAPEXEMPT_CONFIG` (must exist if set), else `capexempt.yaml` when present,
    /// else defaults; then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var("CAPEXEMPT_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(bind) = env::var("CAPEXEMPT_BIND") {
            self.bind_addr = bind;
        }
        if let Ok(dir) = env::var("CAPEXEMPT_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("at least one source is required".to_string()));
        }
        if self.diversity_row_limit == 0 {
            return Err(ConfigError::Invalid(
                "diversity_row_limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Absolute paths are kept; relative ones are joined onto `data_dir`.
    pub fn resolve(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_put_the_primary_parquet_first() {
        let config = AppConfig::default();
        assert_eq!(config.sources.len(), 5);
        assert!(config.sources[0].primary);
        assert!(config.sources[0].file.ends_with(".parquet"));
        assert_eq!(config.sources[2].year, DataYear::Y2025);
        assert_eq!(config.diversity_row_limit, 7500);
    }

    #[test]
    fn yaml_overrides_only_given_keys() {
        let raw = r#"
data_dir: /srv/data
sources:
  - file: employers.csv
    year: "2025"
    limit: 10
"#;
        let config = AppConfig::from_yaml(raw, "inline").expect("config should parse");
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].year, DataYear::Y2025);
        assert_eq!(config.sources[0].limit, Some(10));
        assert!(!config.sources[0].primary);
        assert_eq!(config.resolve("employers.csv"), PathBuf::from("/srv/data/employers.csv"));
    }

    #[test]
    fn empty_source_list_is_rejected() {
        let err = AppConfig::from_yaml("sources: []", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_year_is_a_parse_error() {
        let raw = "sources:\n  - file: a.csv\n    year: \"2019\"\n";
        let err = AppConfig::from_yaml(raw, "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
