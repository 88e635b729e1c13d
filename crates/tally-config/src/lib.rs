//! tally-config
//!
//! Persistent user preferences for the Tally CLI.
//! Owns the Config data structure plus disk persistence helpers.

pub mod error;
pub mod manager;
pub mod model;

pub use error::ConfigError;
pub use manager::{ConfigManager, HOME_ENV_VAR};
pub use model::Config;
