//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from an optional TOML file. A missing or
//! unparseable file never stops startup: it is logged and compiled defaults
//! are used instead.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Directory name used under the platform config/data directories
pub const APP_DIR_NAME: &str = "karaoke-queue";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "KQ_ROOT_FOLDER";

/// Queue file name inside the root folder
pub const QUEUE_FILE_NAME: &str = "queue.jsonl";

/// Default Queue Store port
pub const DEFAULT_PORT: u16 = 5780;

/// Bootstrap configuration file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the queue file
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auto_fill: AutoFillConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Queue Store (kq-qs) settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Resolve titles through the oEmbed endpoint
    pub metadata_lookup: bool,
    /// Upper bound on one title lookup
    pub metadata_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            metadata_lookup: true,
            metadata_timeout_ms: 5000,
        }
    }
}

impl ServerConfig {
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }
}

/// Idle auto-fill settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutoFillConfig {
    /// Submitter identity attached to auto-filled entries
    pub submitter_name: String,
    /// Fallback catalog of source links; `None` selects the built-in list
    pub catalog: Option<Vec<String>>,
}

impl Default for AutoFillConfig {
    fn default() -> Self {
        Self {
            submitter_name: "🤖 Auto-DJ".to_string(),
            catalog: None,
        }
    }
}

/// Playback Controller (kq-pc) settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Base URL of the Queue Store
    pub server_url: String,
    pub poll_interval_ms: u64,
    /// Inactivity before an empty queue is auto-filled
    pub idle_timeout_ms: u64,
    pub idle_check_interval_ms: u64,
    /// Follow `GET /events` and re-poll as soon as the queue changes
    pub live_updates: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            server_url: format!("http://127.0.0.1:{}", DEFAULT_PORT),
            poll_interval_ms: 5_000,
            idle_timeout_ms: 180_000,
            idle_check_interval_ms: 10_000,
            live_updates: true,
        }
    }
}

impl DisplayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn idle_check_interval(&self) -> Duration {
        Duration::from_millis(self.idle_check_interval_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse TOML text
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Read and parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
    }

    /// Load configuration with graceful degradation
    ///
    /// Uses `explicit` when given, otherwise the platform config file if one
    /// exists. Any failure logs a warning and yields compiled defaults.
    pub fn load(explicit: Option<&Path>) -> Self {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path(),
        };

        let Some(path) = path else {
            info!("No config file found, using built-in defaults");
            return Self::default();
        };

        match Self::from_file(&path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{} - using built-in defaults", e);
                Self::default()
            }
        }
    }
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `KQ_ROOT_FOLDER` environment variable
/// 3. `root_folder` from the TOML config
/// 4. OS-dependent compiled default
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Path of the queue file inside a root folder
pub fn queue_file_path(root_folder: &Path) -> PathBuf {
    root_folder.join(QUEUE_FILE_NAME)
}

/// Platform config file location, if one exists
///
/// Linux checks `~/.config/karaoke-queue/config.toml`, then
/// `/etc/karaoke-queue/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_DIR_NAME).join("config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/karaoke-queue (or /var/lib/karaoke-queue for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("/var/lib").join(APP_DIR_NAME))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support").join(APP_DIR_NAME))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData").join(APP_DIR_NAME))
    } else {
        PathBuf::from("./karaoke_queue_data")
    }
}
