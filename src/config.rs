//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/supplynet/supplynet.toml`
//! 3. Local config: `<ledger_dir>/.supplynet.toml`
//! 4. Environment variables: `SUPPLYNET_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Expand `~`, `$VAR` and `${VAR}`; unknown variables leave the input as is.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Hierarchy maintenance settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HierarchyConfig {
    /// Check the nested-set encoding before every commit
    pub verify_on_commit: bool,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            verify_on_commit: true,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Label printed after debt amounts
    pub currency: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency: "RUB".into(),
        }
    }
}

/// A config file as written: every key optional so layers can be told
/// apart from defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSettings {
    pub base_dir: Option<PathBuf>,
    pub ledger_file: Option<PathBuf>,
    #[serde(default)]
    pub hierarchy: RawHierarchyConfig,
    #[serde(default)]
    pub display: RawDisplayConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHierarchyConfig {
    pub verify_on_commit: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDisplayConfig {
    pub currency: Option<String>,
}

/// Unified configuration for supplynet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Base directory (default: ~/.supplynet)
    pub base_dir: PathBuf,
    /// Ledger file, relative to `base_dir` unless absolute
    pub ledger_file: PathBuf,
    pub hierarchy: HierarchyConfig,
    pub display: DisplayConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_dir: dirs_default_base_dir(),
            ledger_file: PathBuf::from("ledger.toml"),
            hierarchy: HierarchyConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

/// Get the default base directory (~/.supplynet).
fn dirs_default_base_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".supplynet"))
        .unwrap_or_else(|| PathBuf::from("~/.supplynet"))
}

/// Get the XDG config directory for supplynet.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "supplynet").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("supplynet.toml"))
}

/// Get the path to the local config file next to a ledger.
pub fn local_config_path(ledger_dir: &Path) -> PathBuf {
    ledger_dir.join(".supplynet.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Resolved ledger location.
    pub fn ledger_path(&self) -> PathBuf {
        if self.ledger_file.is_absolute() {
            self.ledger_file.clone()
        } else {
            self.base_dir.join(&self.ledger_file)
        }
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.base_dir = PathBuf::from(expand_env_vars(&self.base_dir.to_string_lossy()));
        self.ledger_file = PathBuf::from(expand_env_vars(&self.ledger_file.to_string_lossy()));
    }

    /// Overlay the keys a config file sets; absent keys keep `self`.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            base_dir: overlay
                .base_dir
                .clone()
                .unwrap_or_else(|| self.base_dir.clone()),
            ledger_file: overlay
                .ledger_file
                .clone()
                .unwrap_or_else(|| self.ledger_file.clone()),
            hierarchy: HierarchyConfig {
                verify_on_commit: overlay
                    .hierarchy
                    .verify_on_commit
                    .unwrap_or(self.hierarchy.verify_on_commit),
            },
            display: DisplayConfig {
                currency: overlay
                    .display
                    .currency
                    .clone()
                    .unwrap_or_else(|| self.display.currency.clone()),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `ledger_dir` - Directory holding the ledger; when `None`, the
    ///   directory resolved from defaults and global config is used.
    pub fn load(ledger_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        let local_dir = match ledger_dir {
            Some(dir) => dir.to_path_buf(),
            None => {
                let mut expanded = current.clone();
                expanded.expand_paths();
                expanded
                    .ledger_path()
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or(expanded.base_dir)
            }
        };
        let local_path = local_config_path(&local_dir);
        if local_path.exists() {
            let raw = load_raw_settings(&local_path)?;
            current = current.merge_with(&raw);
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply SUPPLYNET_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("SUPPLYNET")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("base_dir") {
            settings.base_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("ledger_file") {
            settings.ledger_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("hierarchy.verify_on_commit") {
            settings.hierarchy.verify_on_commit = val;
        }
        if let Ok(val) = config.get_string("display.currency") {
            settings.display.currency = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# supplynet configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/supplynet/supplynet.toml
#   Local:  <ledger_dir>/.supplynet.toml
#   Env:    SUPPLYNET_* environment variables, "__" separates sections
#           (e.g. SUPPLYNET_HIERARCHY__VERIFY_ON_COMMIT=false)

# Base directory for supplynet data
# base_dir = "~/.supplynet"

# Ledger file, relative to base_dir unless absolute
# ledger_file = "ledger.toml"

[hierarchy]
# Check the tree encoding before every commit
# verify_on_commit = true

[display]
# Currency label printed after debt amounts
# currency = "RUB"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
