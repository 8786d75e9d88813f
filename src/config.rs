//! Configuration for the file logger

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::logging::Category;

/// Environment variable naming the config file used by the binary
pub const CONFIG_ENV: &str = "FILELOG_CONFIG";

/// Environment variable selecting the execution mode for the binary
pub const MODE_ENV: &str = "FILELOG_MODE";

/// How recorded messages reach the sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Messages are buffered for the unit of work and flushed by `save()`
    #[default]
    Batch,
    /// Every message is written immediately (command-line runs)
    Streaming,
}

impl ExecutionMode {
    /// Read the mode from `FILELOG_MODE` (`streaming` or `cli`), defaulting to batch
    pub fn from_env() -> Self {
        match std::env::var(MODE_ENV) {
            Ok(value) => Self::parse(&value),
            Err(_) => ExecutionMode::Batch,
        }
    }

    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "streaming" | "cli" => ExecutionMode::Streaming,
            _ => ExecutionMode::Batch,
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, ExecutionMode::Streaming)
    }

    /// Suffix appended to file names written in this mode
    pub fn file_suffix(&self) -> &'static str {
        match self {
            ExecutionMode::Batch => "",
            ExecutionMode::Streaming => "_cli",
        }
    }
}

/// Single-file mode: one fixed file name instead of dated files
///
/// Accepts `false`, `true` or a base file name in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SingleSetting", into = "SingleSetting")]
pub enum SingleFile {
    /// Dated files under `{YYYYMM}/{DD}.log`
    #[default]
    Disabled,
    /// One file called `single.log`
    Default,
    /// One file with the given base name
    Named(String),
}

impl SingleFile {
    /// Base name of the single file, if single-file mode is on
    pub fn name(&self) -> Option<&str> {
        match self {
            SingleFile::Disabled => None,
            SingleFile::Default => Some("single"),
            SingleFile::Named(name) => Some(name),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SingleSetting {
    Flag(bool),
    Name(String),
}

impl From<SingleSetting> for SingleFile {
    fn from(setting: SingleSetting) -> Self {
        match setting {
            SingleSetting::Flag(false) => SingleFile::Disabled,
            SingleSetting::Flag(true) => SingleFile::Default,
            SingleSetting::Name(name) if name.is_empty() => SingleFile::Disabled,
            SingleSetting::Name(name) => SingleFile::Named(name),
        }
    }
}

impl From<SingleFile> for SingleSetting {
    fn from(single: SingleFile) -> Self {
        match single {
            SingleFile::Disabled => SingleSetting::Flag(false),
            SingleFile::Default => SingleSetting::Flag(true),
            SingleFile::Named(name) => SingleSetting::Name(name),
        }
    }
}

/// Categories written to their own file instead of the master file
///
/// Accepts `true` (every category), `false`, or a list of names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ApartSetting", into = "ApartSetting")]
pub enum ApartLevels {
    All,
    Only(Vec<Category>),
}

impl Default for ApartLevels {
    fn default() -> Self {
        ApartLevels::Only(Vec::new())
    }
}

impl ApartLevels {
    /// Check whether `category` gets a dedicated file
    pub fn contains(&self, category: &Category) -> bool {
        match self {
            ApartLevels::All => true,
            ApartLevels::Only(categories) => categories.contains(category),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ApartSetting {
    Flag(bool),
    List(Vec<Category>),
}

impl From<ApartSetting> for ApartLevels {
    fn from(setting: ApartSetting) -> Self {
        match setting {
            ApartSetting::Flag(true) => ApartLevels::All,
            ApartSetting::Flag(false) => ApartLevels::Only(Vec::new()),
            ApartSetting::List(categories) => ApartLevels::Only(categories),
        }
    }
}

impl From<ApartLevels> for ApartSetting {
    fn from(levels: ApartLevels) -> Self {
        match levels {
            ApartLevels::All => ApartSetting::Flag(true),
            ApartLevels::Only(categories) => ApartSetting::List(categories),
        }
    }
}

/// Logger and sink settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base directory for log files (required)
    pub path: String,

    /// chrono format string for the timestamp written with each flush
    pub time_format: String,

    /// Single-file mode instead of dated files
    pub single: SingleFile,

    /// Size in bytes at which a file is rotated before the next write (default: 2 MiB)
    pub file_size: u64,

    /// Categories written to their own file
    pub apart_level: ApartLevels,

    /// Write one JSON object per flush instead of text
    pub json: bool,

    /// Categories persisted by the logger; empty means all of them
    pub level: Vec<Category>,

    /// Age in days after which rotated backups are pruned; unset keeps them forever
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u64>,
}

/// ISO-8601 with offset, e.g. `2026-01-21T14:30:45+08:00`
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// 2 MiB
pub const DEFAULT_FILE_SIZE: u64 = 2_097_152;

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            single: SingleFile::Disabled,
            file_size: DEFAULT_FILE_SIZE,
            apart_level: ApartLevels::default(),
            json: false,
            level: Vec::new(),
            retention_days: None,
        }
    }
}

impl LogConfig {
    /// Create a config with the given base directory and default settings
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file, or return defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Check whether the allow-list admits `category`
    pub fn allows(&self, category: &Category) -> bool {
        self.level.is_empty() || self.level.contains(category)
    }
}

/// Default directory for log files (`<data dir>/filelog/logs`)
/// Falls back to ./logs if the data directory cannot be determined
pub fn default_logs_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("filelog").join("logs"))
        .unwrap_or_else(|| {
            tracing::warn!("Could not determine data directory, logging to ./logs");
            PathBuf::from("logs")
        })
}
