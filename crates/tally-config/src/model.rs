use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ConfigError;

pub const DEFAULT_DATA_FILE: &str = "tally.json";
pub const DEFAULT_LOG_FILTER: &str = "tally=info";

/// User-configurable CLI preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_currency")]
    pub currency: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    /// Snapshot file. Relative paths resolve against the Tally home directory.
    pub data_file: Option<PathBuf>,

    #[serde(default = "Config::default_log_filter")]
    pub log_filter: String,

    /// Upper bound on passes made by `catch-up`.
    #[serde(default = "Config::default_catch_up_max_passes")]
    pub catch_up_max_passes: u32,

    #[serde(default = "Config::default_ui_color_enabled")]
    pub ui_color_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency: Self::default_currency(),
            data_file: None,
            log_filter: Self::default_log_filter(),
            catch_up_max_passes: Self::default_catch_up_max_passes(),
            ui_color_enabled: Self::default_ui_color_enabled(),
        }
    }
}

impl Config {
    pub fn default_currency() -> String {
        "USD".into()
    }

    pub fn default_log_filter() -> String {
        DEFAULT_LOG_FILTER.into()
    }

    pub fn default_catch_up_max_passes() -> u32 {
        24
    }

    pub fn default_ui_color_enabled() -> bool {
        true
    }

    pub fn resolve_data_file(&self, home: &Path) -> PathBuf {
        match &self.data_file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => home.join(path),
            None => home.join(DEFAULT_DATA_FILE),
        }
    }

    /// Updates one setting from its textual form, as typed in the CLI.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        match key {
            "currency" => {
                if value.is_empty() {
                    return Err(invalid("currency cannot be empty"));
                }
                self.currency = value.to_ascii_uppercase();
            }
            "data_file" => {
                self.data_file = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            "log_filter" => {
                self.log_filter = if value.is_empty() {
                    Self::default_log_filter()
                } else {
                    value.to_string()
                };
            }
            "catch_up_max_passes" => {
                let passes: u32 = value
                    .parse()
                    .map_err(|_| invalid("expected a whole number"))?;
                if passes == 0 {
                    return Err(invalid("must be at least 1"));
                }
                self.catch_up_max_passes = passes;
            }
            "ui_color_enabled" => {
                self.ui_color_enabled = match value.to_ascii_lowercase().as_str() {
                    "true" | "on" | "yes" | "1" => true,
                    "false" | "off" | "no" | "0" => false,
                    _ => return Err(invalid("expected on or off")),
                };
            }
            _ => return Err(invalid("unknown setting")),
        }
        Ok(())
    }

    /// Settings as `(key, value)` pairs for display.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("currency", self.currency.clone()),
            (
                "data_file",
                self.data_file
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| DEFAULT_DATA_FILE.to_string()),
            ),
            ("log_filter", self.log_filter.clone()),
            ("catch_up_max_passes", self.catch_up_max_passes.to_string()),
            ("ui_color_enabled", self.ui_color_enabled.to_string()),
        ]
    }
}
