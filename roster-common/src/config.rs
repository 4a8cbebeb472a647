//! Configuration loading and config file resolution
//!
//! The roster checker reads a single TOML bootstrap file. Every field is
//! optional; anything missing falls back to a built-in default, and a
//! missing file is a warning rather than a failure.
//!
//! # Config File Priority
//!
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`ROSTER_CHECK_CONFIG`)
//! 3. `<user config dir>/roster-check/config.toml`
//! 4. Built-in defaults (no file)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ROSTER_CHECK_CONFIG";

/// Application directory name under the user config dir
const APP_DIR: &str = "roster-check";

/// Complete bootstrap configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub reconcile: ReconcileConfig,

    #[serde(default)]
    pub spreadsheet: SpreadsheetConfig,

    #[serde(default)]
    pub lodestone: LodestoneConfig,

    #[serde(default)]
    pub oauth: OAuthConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Options consumed by the reconciliation engine and row normalizer
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReconcileConfig {
    /// Days a member must hold the entry-level rank before being flagged
    #[serde(default = "default_promotion_threshold_days")]
    pub promotion_threshold_days: i64,

    /// Rank label that gates promotion-candidate evaluation
    #[serde(default = "default_entry_level_rank")]
    pub entry_level_rank: String,

    /// Spreadsheet column positions
    #[serde(default)]
    pub columns: ColumnMap,
}

/// Zero-based spreadsheet column indices
///
/// Defaults match the "Members (Condensed)" sheet layout (A..I).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnMap {
    #[serde(default = "default_name_column")]
    pub name: usize,
    #[serde(default = "default_rank_column")]
    pub rank: usize,
    /// Read first; falls back to `join_date_secondary` when empty
    #[serde(default = "default_join_date_primary_column")]
    pub join_date_primary: usize,
    #[serde(default = "default_join_date_secondary_column")]
    pub join_date_secondary: usize,
    #[serde(default = "default_id_column")]
    pub id: usize,
}

/// Google Sheets endpoint
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SpreadsheetConfig {
    #[serde(default = "default_sheets_base_url")]
    pub api_base_url: String,
}

/// xivapi endpoint
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LodestoneConfig {
    #[serde(default = "default_xivapi_base_url")]
    pub api_base_url: String,
}

/// OAuth2 client secrets and token store locations
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OAuthConfig {
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,

    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,

    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_promotion_threshold_days() -> i64 {
    30
}

fn default_entry_level_rank() -> String {
    "New Recruit".to_string()
}

fn default_name_column() -> usize {
    0
}

fn default_rank_column() -> usize {
    2
}

fn default_join_date_primary_column() -> usize {
    5
}

fn default_join_date_secondary_column() -> usize {
    4
}

fn default_id_column() -> usize {
    8
}

fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_xivapi_base_url() -> String {
    "https://xivapi.com".to_string()
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.json")
}

fn default_token_path() -> PathBuf {
    PathBuf::from("token.json")
}

fn default_redirect_uri() -> String {
    "urn:ietf:wg:oauth:2.0:oob".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            promotion_threshold_days: default_promotion_threshold_days(),
            entry_level_rank: default_entry_level_rank(),
            columns: ColumnMap::default(),
        }
    }
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            name: default_name_column(),
            rank: default_rank_column(),
            join_date_primary: default_join_date_primary_column(),
            join_date_secondary: default_join_date_secondary_column(),
            id: default_id_column(),
        }
    }
}

impl Default for SpreadsheetConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_sheets_base_url(),
        }
    }
}

impl Default for LodestoneConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_xivapi_base_url(),
        }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            token_path: default_token_path(),
            redirect_uri: default_redirect_uri(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ReconcileConfig {
    /// Reject option combinations that would make the report meaningless
    pub fn validate(&self) -> Result<()> {
        if self.promotion_threshold_days < 0 {
            return Err(Error::Config(format!(
                "promotion_threshold_days must be non-negative, got {}",
                self.promotion_threshold_days
            )));
        }
        if self.entry_level_rank.trim().is_empty() {
            return Err(Error::Config("entry_level_rank must not be empty".to_string()));
        }
        self.columns.validate()
    }
}

impl ColumnMap {
    pub fn validate(&self) -> Result<()> {
        let core = [("name", self.name), ("rank", self.rank), ("id", self.id)];
        for (i, (a_name, a)) in core.iter().enumerate() {
            for (b_name, b) in core.iter().skip(i + 1) {
                if a == b {
                    return Err(Error::Config(format!(
                        "columns.{} and columns.{} both point at column {}",
                        a_name, b_name, a
                    )));
                }
            }
        }
        for (date_name, date) in [
            ("join_date_primary", self.join_date_primary),
            ("join_date_secondary", self.join_date_secondary),
        ] {
            if date == self.id {
                return Err(Error::Config(format!(
                    "columns.{} must not share column {} with columns.id",
                    date_name, date
                )));
            }
        }
        Ok(())
    }
}

impl TomlConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.reconcile.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`
    ///
    /// A missing file yields defaults with a warning. A file that exists
    /// but cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Resolve which config file to read
///
/// Returns `None` when no CLI argument or environment variable is given and
/// the platform has no user config directory.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config directory
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Configuration plus the file it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    /// `None` when no config file existed and defaults are in effect
    pub source: Option<PathBuf>,
}

/// Resolve and load configuration in one step
pub fn load_config(cli_arg: Option<&Path>) -> Result<LoadedConfig> {
    let Some(path) = resolve_config_path(cli_arg) else {
        warn!("No config directory available, using built-in defaults");
        return Ok(LoadedConfig {
            config: TomlConfig::default(),
            source: None,
        });
    };

    let config = TomlConfig::load(&path).map_err(|e| match e {
        Error::Config(message) => Error::Config(format!("{}: {}", path.display(), message)),
        other => other,
    })?;
    let source = path.exists().then_some(path);
    Ok(LoadedConfig { config, source })
}
