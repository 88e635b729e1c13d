//! Ledger entries: single recorded expenses, user-entered or generated.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    /// Recurrence that produced this entry; `None` for entries recorded by hand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_recurrence: Option<Uuid>,
}

impl LedgerEntry {
    pub fn new(category_id: Uuid, date: NaiveDate, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount,
            date,
            description: None,
            category_id,
            account_id: None,
            source_recurrence: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_generated(&self) -> bool {
        self.source_recurrence.is_some()
    }
}

