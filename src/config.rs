//! Suite configuration.
//!
//! Defaults describe the `test/compat` layout; a YAML file and CLI flags can
//! override any field.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Model file extensions tried in order for each case directory.
pub const DEFAULT_EXTENSIONS: &[&str] = &["stmx", "itmx", "STMX", "ITMX", "mdl", "MDL", "xmile"];

/// Environment variable overriding the simulator path.
pub const SIMULATOR_ENV: &str = "XMILERUN_BIN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },
    #[error("{field} must be a single character, got {value:?}")]
    Delimiter { field: &'static str, value: String },
}

/// Where cases live, how to run the simulator, and how to read tables.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteConfig {
    /// Directory holding one subdirectory per model.
    pub base_dir: PathBuf,
    /// Model file extensions, first readable wins.
    pub extensions: Vec<String>,
    /// Reference fixture file name inside each case directory.
    pub reference_file: String,
    /// Simulator executable.
    pub simulator: PathBuf,
    /// Field delimiter of reference fixtures.
    pub reference_delimiter: String,
    /// Field delimiter of simulator output.
    pub simulated_delimiter: String,
    /// Wall-clock limit for one simulator run.
    pub timeout_secs: u64,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("test/compat"),
            extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
            reference_file: "data.csv".to_string(),
            simulator: default_simulator(),
            reference_delimiter: ",".to_string(),
            simulated_delimiter: "\t".to_string(),
            timeout_secs: 30,
        }
    }
}

fn default_simulator() -> PathBuf {
    std::env::var_os(SIMULATOR_ENV).map_or_else(|| PathBuf::from("./xmilerun"), PathBuf::from)
}

fn single_char(field: &'static str, value: &str) -> Result<char, ConfigError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ConfigError::Delimiter {
            field,
            value: value.to_string(),
        }),
    }
}

impl SuiteConfig {
    /// Parses a YAML config. Missing fields take their defaults.
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml_ng::from_str(content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content, path)
    }

    /// Checks both delimiters are single characters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reference_delimiter()?;
        self.simulated_delimiter()?;
        Ok(())
    }

    pub fn reference_delimiter(&self) -> Result<char, ConfigError> {
        single_char("reference_delimiter", &self.reference_delimiter)
    }

    pub fn simulated_delimiter(&self) -> Result<char, ConfigError> {
        single_char("simulated_delimiter", &self.simulated_delimiter)
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
