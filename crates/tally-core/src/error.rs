use tally_domain::BudgetMonth;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Category not found: {0}")]
    CategoryNotFound(Uuid),
    #[error("Recurrence not found: {0}")]
    RecurrenceNotFound(Uuid),
    #[error("Budget not found: {0}")]
    BudgetNotFound(Uuid),
    #[error("Month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),
    #[error("Recurrence {id} changed concurrently (expected version {expected_version})")]
    Conflict { id: Uuid, expected_version: u64 },
    #[error("Budget for category {category_id} in {period} already exists")]
    DuplicateBudget { category_id: Uuid, period: BudgetMonth },
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Concurrency conflicts are skipped by the engine instead of reported as failures.
    pub fn is_conflict(&self) -> bool {
        matches!(self, CoreError::Conflict { .. })
    }
}
