use std::io;

use chrono::{DateTime, Utc};
use tally_core::Clock;
use tracing_subscriber::{fmt, EnvFilter};

pub use tally_config::model::DEFAULT_LOG_FILTER;

/// Installs the global subscriber. Logs go to stderr so command output stays clean.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // A subscriber may already be installed by an embedding application.
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
