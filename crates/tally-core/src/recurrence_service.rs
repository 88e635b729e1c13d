//! Services related to recurrence definition maintenance.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use tally_domain::{Interval, RecurrenceDefinition};

use crate::{CategoryLookup, CoreError, RecurrenceStore};

#[derive(Debug, Clone)]
pub struct NewRecurrence {
    pub name: String,
    pub amount: Decimal,
    pub category_id: Uuid,
    pub interval: Interval,
    pub next_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Partial edit. `None` leaves a field untouched; `end_date: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct RecurrenceChanges {
    pub name: Option<String>,
    pub amount: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub interval: Option<Interval>,
    pub next_date: Option<NaiveDate>,
    pub end_date: Option<Option<NaiveDate>>,
}

/// Provides safe helpers for creating and editing recurrence definitions.
pub struct RecurrenceService;

impl RecurrenceService {
    pub fn create<S>(store: &S, request: NewRecurrence) -> Result<RecurrenceDefinition, CoreError>
    where
        S: RecurrenceStore + CategoryLookup + ?Sized,
    {
        Self::validate_fields(&request.name, request.amount)?;
        Self::ensure_category(store, request.category_id)?;
        let mut definition = RecurrenceDefinition::new(
            request.name.trim(),
            request.amount,
            request.category_id,
            request.interval,
            request.next_date,
        );
        definition.end_date = request.end_date;
        let stored = store.insert_recurrence(definition)?;
        info!(
            recurrence = %stored.id,
            interval = %stored.interval,
            next_date = %stored.next_date,
            "recurrence created"
        );
        Ok(stored)
    }

    /// Applies `changes` against the version that was read, so an edit racing a
    /// run fails with [`CoreError::Conflict`] instead of overwriting the advance.
    pub fn update<S>(
        store: &S,
        id: Uuid,
        changes: RecurrenceChanges,
    ) -> Result<RecurrenceDefinition, CoreError>
    where
        S: RecurrenceStore + CategoryLookup + ?Sized,
    {
        let mut definition = store
            .get_recurrence(id)?
            .ok_or(CoreError::RecurrenceNotFound(id))?;
        let expected_version = definition.version;

        if let Some(category_id) = changes.category_id {
            Self::ensure_category(store, category_id)?;
            definition.category_id = category_id;
        }
        if let Some(name) = changes.name {
            definition.name = name.trim().to_string();
        }
        if let Some(amount) = changes.amount {
            definition.amount = amount;
        }
        if let Some(interval) = changes.interval {
            definition.interval = interval;
        }
        if let Some(next_date) = changes.next_date {
            definition.next_date = next_date;
        }
        if let Some(end_date) = changes.end_date {
            definition.end_date = end_date;
        }
        Self::validate_fields(&definition.name, definition.amount)?;

        let stored = store.save_recurrence(definition, expected_version)?;
        info!(recurrence = %stored.id, version = stored.version, "recurrence updated");
        Ok(stored)
    }

    pub fn delete<S>(store: &S, id: Uuid) -> Result<(), CoreError>
    where
        S: RecurrenceStore + ?Sized,
    {
        if store.get_recurrence(id)?.is_none() {
            return Err(CoreError::RecurrenceNotFound(id));
        }
        store.delete_recurrence(id)?;
        info!(recurrence = %id, "recurrence deleted");
        Ok(())
    }

    fn ensure_category<S>(store: &S, category_id: Uuid) -> Result<(), CoreError>
    where
        S: CategoryLookup + ?Sized,
    {
        if store.category_exists(category_id)? {
            Ok(())
        } else {
            Err(CoreError::CategoryNotFound(category_id))
        }
    }

    fn validate_fields(name: &str, amount: Decimal) -> Result<(), CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::Validation(
                "recurrence name cannot be empty".into(),
            ));
        }
        if amount <= Decimal::ZERO {
            return Err(CoreError::Validation(
                "recurrence amount must be positive".into(),
            ));
        }
        Ok(())
    }
}
