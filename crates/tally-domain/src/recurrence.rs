//! Recurrence definitions: templates that periodically produce ledger entries.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{entry::LedgerEntry, Interval};

const GENERATED_DESCRIPTION_PREFIX: &str = "Auto-generated from recurring: ";

/// A scheduled expense template.
///
/// `next_date` is the only schedule state and is owned by the store of record.
/// `version` is bumped by every committed mutation so concurrent writers can
/// detect that the row moved underneath them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurrenceDefinition {
    pub id: Uuid,
    pub name: String,
    pub amount: Decimal,
    pub category_id: Uuid,
    pub interval: Interval,
    pub next_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub version: u64,
}

impl RecurrenceDefinition {
    pub fn new(
        name: impl Into<String>,
        amount: Decimal,
        category_id: Uuid,
        interval: Interval,
        next_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            amount,
            category_id,
            interval,
            next_date,
            end_date: None,
            version: 0,
        }
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// `true` when the recurrence should produce an entry for `as_of`.
    pub fn is_due(&self, as_of: NaiveDate) -> bool {
        self.next_date <= as_of && self.end_date.map_or(true, |end| self.next_date <= end)
    }

    pub fn status(&self) -> RecurrenceStatus {
        match self.end_date {
            Some(end) if self.next_date > end => RecurrenceStatus::Dormant,
            _ => RecurrenceStatus::Active,
        }
    }

    pub fn generated_description(&self) -> String {
        format!("{GENERATED_DESCRIPTION_PREFIX}{}", self.name)
    }

    /// Builds the ledger entry for the occurrence currently due at `next_date`.
    pub fn occurrence_entry(&self) -> LedgerEntry {
        let mut entry = LedgerEntry::new(self.category_id, self.next_date, self.amount)
            .with_description(self.generated_description());
        entry.source_recurrence = Some(self.id);
        entry
    }
}

/// Lifecycle state derived from the schedule.
///
/// A dormant recurrence has been advanced past its end date. It is kept for
/// reference but is never due again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecurrenceStatus {
    Active,
    Dormant,
}

impl fmt::Display for RecurrenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecurrenceStatus::Active => "Active",
            RecurrenceStatus::Dormant => "Dormant",
        };
        f.write_str(label)
    }
}
