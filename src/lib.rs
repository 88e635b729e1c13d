#![doc(test(attr(deny(warnings))))]

//! Tally schedules recurring expenses into a ledger and reports monthly spend
//! against category budgets. This crate wires the workspace crates into the
//! `tally_cli` shell.

pub mod cli;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing with the default filter and emits a startup log.
pub fn init() {
    init_with_filter(utils::DEFAULT_LOG_FILTER);
}

/// Initializes global tracing once. `RUST_LOG` wins over `filter` when set.
pub fn init_with_filter(filter: &str) {
    INIT_TRACING.call_once(|| {
        utils::init_tracing(filter);
        tracing::debug!("Tally tracing initialized.");
    });
}
