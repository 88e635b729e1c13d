//! Locating and persisting [`Config`].

use std::{
    env,
    ffi::OsString,
    fs::{self, File},
    io::{self, Write},
    path::PathBuf,
};

use crate::{Config, ConfigError};

/// Overrides the base directory holding the config and the default snapshot.
pub const HOME_ENV_VAR: &str = "TALLY_HOME";
const CONFIG_FILE: &str = "config.json";

/// Owns the Tally home directory: `config.json` and, unless configured
/// elsewhere, the data file.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    home: PathBuf,
}

impl ConfigManager {
    /// Uses `home` as the Tally home, creating it when missing.
    pub fn with_base_dir(home: PathBuf) -> Result<Self, ConfigError> {
        fs::create_dir_all(&home)?;
        Ok(Self { home })
    }

    /// Uses `TALLY_HOME` when set, otherwise `<platform data dir>/tally`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::with_base_dir(resolve_home(env::var_os(HOME_ENV_VAR)))
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join(CONFIG_FILE)
    }

    /// A missing file yields the defaults; keys absent from the file take theirs.
    pub fn load(&self) -> Result<Config, ConfigError> {
        match fs::read_to_string(self.config_path()) {
            Ok(raw) => {
                serde_json::from_str(&raw).map_err(|err| ConfigError::Serde(err.to_string()))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Config::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes `config.json.tmp`, syncs it and renames it over `config.json`.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let json =
            serde_json::to_vec_pretty(config).map_err(|err| ConfigError::Serde(err.to_string()))?;
        let target = self.config_path();
        let staging = target.with_extension("json.tmp");
        let mut file = File::create(&staging)?;
        file.write_all(&json)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&staging, &target)?;
        Ok(())
    }

    pub fn data_file(&self, config: &Config) -> PathBuf {
        config.resolve_data_file(&self.home)
    }
}

fn resolve_home(custom: Option<OsString>) -> PathBuf {
    match custom.filter(|value| !value.is_empty()) {
        Some(custom) => PathBuf::from(custom),
        None => dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tally"),
    }
}
