//! Collaborator contracts the services consume.
//!
//! Implementations own all persistent state. Services never cache schedule
//! state between calls; every decision is made against what the store returns.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use tally_domain::{
    BudgetDefinition, BudgetWithCategory, LedgerEntry, RecurrenceDefinition, RecurrenceStatus,
};

use crate::CoreError;

/// Read-only view over categories.
pub trait CategoryLookup: Send + Sync {
    fn category_exists(&self, id: Uuid) -> Result<bool, CoreError>;
    fn category_name(&self, id: Uuid) -> Result<Option<String>, CoreError>;
}

pub trait LedgerStore: Send + Sync {
    fn insert_entry(&self, entry: LedgerEntry) -> Result<Uuid, CoreError>;

    /// Sum of entry amounts for a category within one calendar month. Zero when
    /// nothing matches.
    fn sum_amount(&self, category_id: Uuid, year: i32, month: u32) -> Result<Decimal, CoreError>;

    fn entries(&self) -> Result<Vec<LedgerEntry>, CoreError>;
}

/// The per-definition unit of work applied by [`RecurrenceStore::commit_occurrence`].
///
/// `expected_version` and `expected_next_date` are the values read during the
/// due-scan. A store must reject the commit with [`CoreError::Conflict`] when
/// either has moved, and must apply the entry insert and the schedule update
/// together or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceCommit {
    pub recurrence_id: Uuid,
    pub expected_version: u64,
    pub expected_next_date: NaiveDate,
    pub entry: LedgerEntry,
    pub next_date: NaiveDate,
}

pub trait RecurrenceStore: Send + Sync {
    /// Definitions due on `as_of`, ordered by id ascending.
    fn find_due(&self, as_of: NaiveDate) -> Result<Vec<RecurrenceDefinition>, CoreError>;
    fn get_recurrence(&self, id: Uuid) -> Result<Option<RecurrenceDefinition>, CoreError>;
    fn list_recurrences(&self) -> Result<Vec<RecurrenceDefinition>, CoreError>;
    fn insert_recurrence(
        &self,
        definition: RecurrenceDefinition,
    ) -> Result<RecurrenceDefinition, CoreError>;

    /// Replaces a definition if its stored version still equals `expected_version`.
    /// Returns the stored row with its bumped version.
    fn save_recurrence(
        &self,
        definition: RecurrenceDefinition,
        expected_version: u64,
    ) -> Result<RecurrenceDefinition, CoreError>;

    fn delete_recurrence(&self, id: Uuid) -> Result<(), CoreError>;

    /// Inserts the occurrence's entry and advances the schedule atomically.
    fn commit_occurrence(&self, commit: OccurrenceCommit) -> Result<LedgerEntry, CoreError>;
}

pub trait BudgetStore: Send + Sync {
    /// Budgets for the month joined with their category name.
    fn find_by_month(&self, year: i32, month: u32)
        -> Result<Vec<BudgetWithCategory>, CoreError>;

    fn find_budget(
        &self,
        category_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<Option<BudgetDefinition>, CoreError>;

    fn get_budget(&self, id: Uuid) -> Result<Option<BudgetDefinition>, CoreError>;

    /// All budgets, newest period first.
    fn list_budgets(&self) -> Result<Vec<BudgetDefinition>, CoreError>;

    /// Must reject a second budget for the same category and month with
    /// [`CoreError::DuplicateBudget`], independently of any caller pre-check.
    fn insert_budget(&self, budget: BudgetDefinition) -> Result<BudgetDefinition, CoreError>;

    /// Replaces the budget with the same id. The uniqueness rule of
    /// [`BudgetStore::insert_budget`] applies against every other budget.
    fn save_budget(&self, budget: BudgetDefinition) -> Result<BudgetDefinition, CoreError>;

    fn delete_budget(&self, id: Uuid) -> Result<(), CoreError>;
}

/// Budgets whose category no longer exists. They never appear in a status report.
pub fn budget_warnings<S>(store: &S) -> Result<Vec<String>, CoreError>
where
    S: BudgetStore + CategoryLookup + ?Sized,
{
    let mut warnings = Vec::new();
    for budget in store.list_budgets()? {
        if !store.category_exists(budget.category_id)? {
            warnings.push(format!(
                "budget {} for {} references missing category {}",
                budget.id,
                budget.period(),
                budget.category_id
            ));
        }
    }
    Ok(warnings)
}

/// Detects dangling references and other anomalies in the recurrence table.
pub fn recurrence_warnings<S>(store: &S) -> Result<Vec<String>, CoreError>
where
    S: RecurrenceStore + CategoryLookup + ?Sized,
{
    let mut warnings = Vec::new();
    for definition in store.list_recurrences()? {
        if !store.category_exists(definition.category_id)? {
            warnings.push(format!(
                "recurrence {} references missing category {}",
                definition.id, definition.category_id
            ));
        }
        if definition.amount <= Decimal::ZERO {
            warnings.push(format!(
                "recurrence {} has non-positive amount {}",
                definition.id, definition.amount
            ));
        }
        if definition.status() == RecurrenceStatus::Dormant {
            warnings.push(format!(
                "recurrence {} is dormant since {}",
                definition.id,
                definition
                    .end_date
                    .map(|end| end.to_string())
                    .unwrap_or_default()
            ));
        }
    }
    Ok(warnings)
}
