//! Configuration loading and root folder resolution
//!
//! Settings come from a TOML file; every section is optional and falls back
//! to compiled defaults so a missing or partial file never stops a run.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "FITTRACK_ROOT";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "fittrack.db";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Folder holding the database and record caches
    pub root_folder: Option<PathBuf>,
    /// Explicit database file (overrides `root_folder/fittrack.db`)
    pub database_path: Option<PathBuf>,
    /// Hevy API key
    pub hevy_api_key: Option<String>,
    /// Hevy API base URL (defaults to the public v1 endpoint)
    pub hevy_base_url: Option<String>,
    pub import: ImportSettings,
    pub fallbacks: FallbackLabels,
    pub logging: LoggingConfig,
}

/// What the import driver does when a batch fails to commit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchFailurePolicy {
    /// Record the failed batch and continue with the next one
    #[default]
    Skip,
    /// Stop the run at the first failed batch
    Abort,
}

impl std::str::FromStr for BatchFailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(Error::InvalidInput(format!(
                "unknown batch failure policy '{}' (expected 'skip' or 'abort')",
                other
            ))),
        }
    }
}

/// `[import]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Rows per flush
    pub batch_size: usize,
    /// Records requested per upstream page
    pub page_size: u32,
    /// Minimum delay between upstream requests
    pub page_delay_ms: u64,
    pub on_batch_failure: BatchFailurePolicy,
    pub request_timeout_secs: u64,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            page_size: 100,
            page_delay_ms: 500,
            on_batch_failure: BatchFailurePolicy::Skip,
            request_timeout_secs: 30,
        }
    }
}

/// `[fallbacks]` section: designated category used when a label is missing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackLabels {
    pub muscle_group: String,
    pub equipment: String,
    pub difficulty: String,
}

impl Default for FallbackLabels {
    fn default() -> Self {
        Self {
            muscle_group: "Full Body".to_string(),
            equipment: "None".to_string(),
            difficulty: "Intermediate".to_string(),
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the config from an explicit path or the platform location.
///
/// A missing file yields defaults with a warning; a file that exists but does
/// not parse is an error.
pub fn load_config_or_default(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        return load_toml_config(path);
    }

    match config_file_path() {
        Ok(path) => {
            debug!("Loading configuration from {}", path.display());
            load_toml_config(&path)
        }
        Err(e) => {
            warn!("{} - using default configuration", e);
            Ok(TomlConfig::default())
        }
    }
}

/// Write config atomically (temp file + rename), mode 0600 on Unix since the
/// file may hold the API key
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Database file: CLI override, then `database_path` from TOML, then the root
/// folder default
pub fn resolve_database_path(
    cli_arg: Option<&Path>,
    config: &TomlConfig,
    root_folder: &Path,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Some(path) = &config.database_path {
        return path.clone();
    }
    root_folder.join(DATABASE_FILE_NAME)
}

/// Get default configuration file path for the platform
pub fn config_file_path() -> Result<PathBuf> {
    let config_path = if cfg!(target_os = "linux") {
        // Try ~/.config/fittrack/config.toml first, then /etc/fittrack/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("fittrack").join("config.toml"));
        let system_config = PathBuf::from("/etc/fittrack/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    } else {
        dirs::config_dir()
            .map(|d| d.join("fittrack").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?
    };

    if config_path.exists() {
        Ok(config_path)
    } else {
        Err(Error::Config(format!(
            "Config file not found: {}",
            config_path.display()
        )))
    }
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/fittrack (or /var/lib/fittrack for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("fittrack"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/fittrack"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("fittrack"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/fittrack"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("fittrack"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\fittrack"))
    } else {
        PathBuf::from("./fittrack_data")
    }
}
