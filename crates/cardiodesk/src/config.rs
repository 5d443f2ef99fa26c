//! Configuration management for cardiodesk.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::analysis::ResultFormat;
use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "cardiodesk";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "patients.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `CARDIODESK_`)
/// 2. TOML config file at `~/.config/cardiodesk/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// External analysis configuration.
    pub analysis: AnalysisConfig,
    /// Locations of files written by the analysis.
    pub results: ResultsConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind: IpAddr,
    /// Port to listen on.
    pub port: u16,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/cardiodesk/patients.db`
    pub database_path: Option<PathBuf>,
}

/// External analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Interpreter or executable to run.
    pub program: String,
    /// Script passed as the first argument; the patient id follows it.
    pub script: String,
    /// Working directory of the analysis process.
    pub working_dir: PathBuf,
    /// Maximum run time in seconds.
    pub timeout_secs: u64,
    /// Layout of the NAD result file.
    pub result_format: ResultFormat,
}

/// Directories the analysis writes into.
///
/// Relative paths are resolved against `analysis.working_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    /// QRS detector plots.
    pub plots_dir: PathBuf,
    /// RR interval plots and summaries.
    pub rr_dir: PathBuf,
    /// QT interval plots and summaries.
    pub qt_dir: PathBuf,
    /// QRS detector log summaries.
    pub logs_dir: PathBuf,
    /// NAD result files.
    pub result_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5000,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            script: "analyse.py".to_string(),
            working_dir: PathBuf::from("."),
            timeout_secs: 300,
            result_format: ResultFormat::Text,
        }
    }
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            plots_dir: PathBuf::from("plots"),
            rr_dir: PathBuf::from("RR"),
            qt_dir: PathBuf::from("QT"),
            logs_dir: PathBuf::from("logs"),
            result_dir: PathBuf::from("RESULT"),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `CARDIODESK_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("CARDIODESK_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::ConfigValidation {
                message: "server.port must be greater than 0".to_string(),
            });
        }

        if self.analysis.program.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "analysis.program must not be empty".to_string(),
            });
        }

        if self.analysis.script.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "analysis.script must not be empty".to_string(),
            });
        }

        if self.analysis.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "analysis.timeout_secs must be greater than 0".to_string(),
            });
        }

        for (name, dir) in self.results.named_dirs() {
            if dir.as_os_str().is_empty() {
                return Err(Error::ConfigValidation {
                    message: format!("results.{name} must not be empty"),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the socket address the HTTP server listens on.
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.bind, self.server.port)
    }

    /// Get the analysis timeout as a Duration.
    #[must_use]
    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis.timeout_secs)
    }

    /// Resolve a results directory against the analysis working directory.
    #[must_use]
    pub fn resolve(&self, dir: &Path) -> PathBuf {
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.analysis.working_dir.join(dir)
        }
    }

    /// Create every results directory that does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn ensure_result_dirs(&self) -> Result<()> {
        for (_, dir) in self.results.named_dirs() {
            let path = self.resolve(dir);
            std::fs::create_dir_all(&path).map_err(|source| Error::DirectoryCreate {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

impl ResultsConfig {
    /// All directories with their configuration key.
    #[must_use]
    pub fn named_dirs(&self) -> [(&'static str, &Path); 5] {
        [
            ("plots_dir", self.plots_dir.as_path()),
            ("rr_dir", self.rr_dir.as_path()),
            ("qt_dir", self.qt_dir.as_path()),
            ("logs_dir", self.logs_dir.as_path()),
            ("result_dir", self.result_dir.as_path()),
        ]
    }
}
