//! Configuration loading and resolution
//!
//! Bootstrap configuration comes from a TOML file. Individual values are
//! resolved in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable config file never aborts startup: a warning is
//! logged and compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the TOML config file
pub const ENV_CONFIG_PATH: &str = "REEL_CONFIG";
/// Environment variable naming the database file
pub const ENV_DATABASE_PATH: &str = "REEL_DATABASE";
/// Environment variable holding the catalog API bearer credential
pub const ENV_TMDB_ACCESS_TOKEN: &str = "REEL_TMDB_ACCESS_TOKEN";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// SQLite database file (optional, defaults under the platform data dir)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub tmdb: TmdbConfig,

    #[serde(default)]
    pub browse: BrowseConfig,

    #[serde(default)]
    pub feed: FeedConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            bind_address: default_bind_address(),
            port: default_port(),
            logging: LoggingConfig::default(),
            tmdb: TmdbConfig::default(),
            browse: BrowseConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

/// Movie catalog API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmdbConfig {
    #[serde(default = "default_tmdb_base_url")]
    pub base_url: String,

    /// Bearer credential; usually supplied through the environment instead
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default = "default_language")]
    pub language: String,

    /// Region whose streaming offers are shown on movie pages
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Bound on each upstream request, connection included
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            base_url: default_tmdb_base_url(),
            access_token: None,
            language: default_language(),
            region: default_region(),
            requests_per_second: default_requests_per_second(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Catalog browsing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowseConfig {
    /// Items per presented window
    #[serde(default = "default_window_size")]
    pub window_size: u32,

    /// Hand-picked movies shown on the home page
    #[serde(default = "default_curated_ids")]
    pub curated_ids: Vec<u64>,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            curated_ids: default_curated_ids(),
        }
    }
}

/// How feed entries get their overlay coordinates across updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedPlacement {
    /// Draw fresh coordinates for every entry on every update
    #[default]
    Reshuffle,
    /// Draw once per review id and reuse afterwards
    Sticky,
}

/// Live feed settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Height of the overlay area offsets are drawn from
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,

    /// Start delays are drawn from `[0, max_start_delay_secs)`
    #[serde(default = "default_max_start_delay_secs")]
    pub max_start_delay_secs: f64,

    #[serde(default)]
    pub placement: FeedPlacement,

    /// Review change events buffered per subscriber
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            viewport_height: default_viewport_height(),
            max_start_delay_secs: default_max_start_delay_secs(),
            placement: FeedPlacement::default(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5740
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_language() -> String {
    "ja-JP".to_string()
}

fn default_region() -> String {
    "JP".to_string()
}

fn default_requests_per_second() -> u32 {
    40
}

fn default_timeout_ms() -> u64 {
    8000
}

fn default_window_size() -> u32 {
    24
}

fn default_curated_ids() -> Vec<u64> {
    vec![1891, 11, 238, 155, 278, 122]
}

fn default_viewport_height() -> f64 {
    800.0
}

fn default_max_start_delay_secs() -> f64 {
    5.0
}

fn default_event_capacity() -> usize {
    256
}

impl TomlConfig {
    /// Load configuration, falling back to defaults when no file is usable
    ///
    /// `cli_path` takes priority over `REEL_CONFIG`, which takes priority over
    /// the platform config locations.
    pub fn load(cli_path: Option<&Path>) -> Self {
        let Some(path) = resolve_config_path(cli_path) else {
            warn!("No config file found, using compiled defaults");
            return Self::default();
        };

        match load_toml_config(&path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Write a TOML config file, creating parent directories
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Write to a sibling temp file first so readers never see a partial file
    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;

    Ok(())
}

/// Locate the config file: CLI → ENV → user config dir → /etc
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        return Some(PathBuf::from(path));
    }

    let user_config = dirs::config_dir().map(|d| d.join("reel").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/reel/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Resolve the database file: CLI → ENV → TOML → platform data dir
pub fn resolve_database_path(cli_path: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ENV_DATABASE_PATH) {
        return PathBuf::from(path);
    }

    if let Some(path) = &config.database_path {
        return path.clone();
    }

    default_database_path()
}

/// Resolve the catalog bearer credential: ENV → TOML
///
/// Whitespace-only values count as absent.
pub fn resolve_tmdb_access_token(config: &TomlConfig) -> Result<String> {
    let env_token = std::env::var(ENV_TMDB_ACCESS_TOKEN).ok();
    let toml_token = config.tmdb.access_token.clone();

    if env_token.as_deref().is_some_and(is_valid_token)
        && toml_token.as_deref().is_some_and(is_valid_token)
    {
        warn!("Catalog access token found in environment and TOML. Using environment.");
    }

    if let Some(token) = env_token.filter(|t| is_valid_token(t)) {
        info!("Catalog access token loaded from environment variable");
        return Ok(token);
    }

    if let Some(token) = toml_token.filter(|t| is_valid_token(t)) {
        info!("Catalog access token loaded from TOML config");
        return Ok(token);
    }

    Err(Error::Config(format!(
        "Catalog access token not configured. Set {} or [tmdb] access_token in the config file.",
        ENV_TMDB_ACCESS_TOKEN
    )))
}

fn is_valid_token(token: &str) -> bool {
    !token.trim().is_empty()
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("reel"))
        .unwrap_or_else(|| PathBuf::from("./reel_data"))
        .join("reel.db")
}
