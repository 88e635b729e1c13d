//! tally-core
//!
//! Scheduling and reporting services for Tally: the recurrence engine, the
//! budget aggregator and the write paths that guard their invariants.
//! Depends on tally-domain. No CLI, no terminal I/O, no direct file access;
//! persistence is reached through the collaborator traits in [`storage`].

pub mod budget_aggregator;
pub mod budget_service;
pub mod error;
pub mod recurrence_engine;
pub mod recurrence_service;
pub mod storage;
pub mod time;

pub use budget_aggregator::*;
pub use budget_service::*;
pub use error::CoreError;
pub use recurrence_engine::*;
pub use recurrence_service::*;
pub use storage::*;
pub use time::{Clock, FixedClock};
