//! Tool configuration loaded from `rips.toml`.
//!
//! Lookup order: an explicit `--config` path, then `rips.toml` in the working
//! directory, then the platform config directory
//! (`~/.config/rips/rips.toml` on Linux), then built-in defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use rips_generate::join::{DEFAULT_DATE_COLUMNS, DEFAULT_KEY_COLUMNS};
use rips_generate::{
    ColumnNameJoin, DateFilter, DeclaredJoins, InterpreterOptions, JoinKey, JoinStrategy,
};
use rips_model::ContextMode;

const APP_QUALIFIER: &str = "co";
const APP_ORG: &str = "rips";
const APP_NAME: &str = "rips";
pub const CONFIG_FILENAME: &str = "rips.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RipsConfig {
    /// Root of the mapping/audit/reference store.
    pub store_dir: PathBuf,
    /// Where generated documents are written.
    pub output_dir: PathBuf,
    pub context_mode: ContextMode,
    pub join: JoinConfig,
}

impl Default for RipsConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(".rips"),
            output_dir: PathBuf::from("output"),
            context_mode: ContextMode::default(),
            join: JoinConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JoinConfig {
    /// Candidate date columns for the run's date range, first match wins.
    pub date_columns: Vec<String>,
    /// Columns joined by name between a table and the enclosing rows.
    pub key_columns: Vec<String>,
    /// Explicit `table -> [[column, context_key], ...]` joins. When present,
    /// replaces joining by column name.
    pub declared: BTreeMap<String, Vec<(String, String)>>,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            date_columns: DEFAULT_DATE_COLUMNS.iter().map(ToString::to_string).collect(),
            key_columns: DEFAULT_KEY_COLUMNS.iter().map(ToString::to_string).collect(),
            declared: BTreeMap::new(),
        }
    }
}

impl JoinConfig {
    pub fn strategy(&self) -> Arc<dyn JoinStrategy> {
        if self.declared.is_empty() {
            return Arc::new(ColumnNameJoin::new(self.key_columns.clone()));
        }
        let joins = self
            .declared
            .iter()
            .map(|(table, keys)| {
                let keys = keys
                    .iter()
                    .map(|(column, context_key)| JoinKey::new(column, context_key))
                    .collect();
                (table.clone(), keys)
            })
            .collect();
        Arc::new(DeclaredJoins::new(joins))
    }
}

/// A configuration and the file it came from, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub config: RipsConfig,
    pub source: Option<PathBuf>,
}

impl RipsConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("parse configuration")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("read configuration {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Load following the lookup order, starting the relative search at `cwd`.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<LoadedConfig> {
        if let Some(path) = explicit {
            if !path.is_file() {
                bail!("configuration file not found: {}", path.display());
            }
            return Self::loaded_from(path);
        }

        let local = cwd.join(CONFIG_FILENAME);
        if local.is_file() {
            return Self::loaded_from(&local);
        }
        if let Some(global) = user_config_path().filter(|p| p.is_file()) {
            return Self::loaded_from(&global);
        }

        debug!("no configuration file found, using defaults");
        Ok(LoadedConfig {
            config: Self::default(),
            source: None,
        })
    }

    fn loaded_from(path: &Path) -> Result<LoadedConfig> {
        let config = Self::from_file(path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(LoadedConfig {
            config,
            source: Some(path.to_path_buf()),
        })
    }

    pub fn interpreter_options(&self) -> InterpreterOptions {
        InterpreterOptions {
            context_mode: self.context_mode,
            join: self.join.strategy(),
            date_filter: DateFilter::new(self.join.date_columns.clone()),
        }
    }
}

/// `rips.toml` in the platform config directory, when one can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(RipsConfig::from_toml_str("").unwrap(), RipsConfig::default());
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let text = toml::to_string_pretty(&RipsConfig::default()).unwrap();
        assert_eq!(RipsConfig::from_toml_str(&text).unwrap(), RipsConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(RipsConfig::from_toml_str("stor_dir = \"x\"").is_err());
    }
}
