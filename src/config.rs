//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/schemaview/schemaview.toml`
//! 3. Environment variables: `SCHEMAVIEW_*` prefix
//!
//! Command-line flags override all of this; `--path` entries are appended
//! after the configured ones, `--format` replaces the configured default.

use std::path::PathBuf;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

/// Persistent settings for schemaview.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Search-path directories consulted when resolving module names.
    pub path: Vec<String>,
    /// Output format used when `--format` is not given.
    pub format: Option<String>,
}

/// Path of the global config file, if a home directory can be determined.
pub fn global_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "schemaview").map(|dirs| dirs.config_dir().join("schemaview.toml"))
}

impl Settings {
    /// Load settings with layered precedence.
    pub fn load() -> Result<Self, SettingsError> {
        let mut builder = Config::builder();
        if let Some(path) = global_config_path() {
            if path.exists() {
                builder = builder.add_source(File::from(path));
            }
        }
        builder = builder.add_source(
            Environment::with_prefix("SCHEMAVIEW")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("path"),
        );
        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Configured search-path entries with `~` and `$VAR` expanded.
    pub fn search_path(&self) -> Vec<PathBuf> {
        self.path.iter().map(|entry| expand_path(entry)).collect()
    }
}

/// Expand `~` and environment variables; an entry naming an unset variable
/// is kept as written.
pub fn expand_path(raw: &str) -> PathBuf {
    shellexpand::full(raw)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .unwrap_or_else(|_| PathBuf::from(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_empty() {
        let settings = Settings::default();
        assert!(settings.path.is_empty());
        assert!(settings.format.is_none());
    }

    #[test]
    fn test_expand_path_tilde() {
        let home = std::env::var("HOME").expect("HOME should be set");
        let expanded = expand_path("~/schemas");
        assert!(expanded.starts_with(&home));
    }

    #[test]
    fn test_expand_path_env_var() {
        let home = std::env::var("HOME").expect("HOME should be set");
        let expanded = expand_path("$HOME/schemas");
        assert!(expanded.to_string_lossy().starts_with(&home));
    }
}
