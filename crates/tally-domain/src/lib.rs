//! tally-domain
//!
//! Pure domain models (Category, RecurrenceDefinition, LedgerEntry, Budget) and calendar math.
//! No I/O, no CLI, no storage. Only data types and core enums.

pub mod budget;
pub mod calendar;
pub mod category;
pub mod common;
pub mod entry;
pub mod recurrence;

pub use budget::*;
pub use category::*;
pub use common::*;
pub use entry::*;
pub use recurrence::*;
