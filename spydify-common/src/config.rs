//! Configuration loading and root folder resolution
//!
//! Settings sources, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "SPYDIFY_ROOT_FOLDER";

/// Name of the TOML file looked up inside the root folder
pub const CONFIG_FILE_NAME: &str = "spydify.toml";

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional; whatever is missing falls back to the
/// compiled defaults of the consuming crate.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Root folder holding the database, request log and token files
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub spotify: SpotifyConfig,

    #[serde(default)]
    pub musicbrainz: MusicBrainzConfig,

    #[serde(default)]
    pub sync: SyncConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Provider A (track/album/artist metadata)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SpotifyConfig {
    pub api_base: Option<String>,
    /// File holding the current bearer token (written by the login flow)
    pub token_path: Option<PathBuf>,
    /// Persisted sliding-window request log
    pub request_log_path: Option<PathBuf>,
}

/// Provider B (artist area/genre enrichment)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MusicBrainzConfig {
    pub api_base: Option<String>,
    pub user_agent: Option<String>,
}

/// Synchronization tunables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SyncConfig {
    pub database_path: Option<PathBuf>,
    pub start_stage: Option<String>,
    pub artist_albums: Option<bool>,
    pub enrichment: Option<bool>,
    pub seed_saved_tracks: Option<bool>,
    pub retry_budget: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_item_failures: Option<u32>,
    /// Per-stage overrides, keyed by stage name (`[sync.stages.tracks]`)
    #[serde(default)]
    pub stages: BTreeMap<String, StageTuning>,
}

/// Page size and commit cadence override for one stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StageTuning {
    pub page_size: Option<usize>,
    pub commit_every: Option<usize>,
}

/// Standard user agent for outbound HTTP clients
pub fn get_user_agent() -> String {
    format!(
        "spydify/{} (https://github.com/spydify/spydify)",
        env!("CARGO_PKG_VERSION")
    )
}

/// Resolve the root folder
///
/// Priority: CLI argument, then environment variable, then TOML
/// `root_folder`, then the OS-dependent default.
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: Option<&TomlConfig>,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(root) = toml_config.and_then(|c| c.root_folder.clone()) {
        return root;
    }

    get_default_root_folder()
}

/// Get OS-dependent default root folder path
pub fn get_default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("spydify"))
        .unwrap_or_else(|| PathBuf::from("./spydify_data"))
}

/// Load TOML configuration from `path`
///
/// A missing file is not an error: a warning is logged and defaults are
/// returned. A file that exists but cannot be parsed is a configuration
/// error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}
