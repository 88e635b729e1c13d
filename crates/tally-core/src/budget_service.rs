//! Write path for monthly budgets.

use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use tally_domain::BudgetDefinition;

use crate::{BudgetStore, CategoryLookup, CoreError};

#[derive(Debug, Clone)]
pub struct NewBudget {
    pub category_id: Uuid,
    pub year: i32,
    pub month: u32,
    pub amount: Decimal,
}

/// Partial edit. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct BudgetChanges {
    pub category_id: Option<Uuid>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub amount: Option<Decimal>,
}

impl BudgetChanges {
    fn moves_period(&self) -> bool {
        self.category_id.is_some() || self.year.is_some() || self.month.is_some()
    }
}

pub struct BudgetService;

impl BudgetService {
    /// Validates and stores a budget. The duplicate pre-check gives a clear
    /// error in the common case; the store enforces uniqueness again on insert.
    pub fn create<S>(store: &S, budget: NewBudget) -> Result<BudgetDefinition, CoreError>
    where
        S: BudgetStore + CategoryLookup + ?Sized,
    {
        Self::validate_fields(budget.month, budget.amount)?;
        Self::ensure_category(store, budget.category_id)?;
        let definition =
            BudgetDefinition::new(budget.category_id, budget.year, budget.month, budget.amount);
        Self::ensure_unclaimed(store, &definition)?;
        let stored = store.insert_budget(definition)?;
        info!(
            budget = %stored.id,
            category = %stored.category_id,
            period = %stored.period(),
            "budget created"
        );
        Ok(stored)
    }

    /// Applies `changes` to an existing budget. Moving it onto a category and
    /// month that another budget already claims fails with
    /// [`CoreError::DuplicateBudget`]; the budget never collides with itself.
    pub fn update<S>(
        store: &S,
        id: Uuid,
        changes: BudgetChanges,
    ) -> Result<BudgetDefinition, CoreError>
    where
        S: BudgetStore + CategoryLookup + ?Sized,
    {
        let mut budget = store.get_budget(id)?.ok_or(CoreError::BudgetNotFound(id))?;
        let moves_period = changes.moves_period();

        if let Some(category_id) = changes.category_id {
            Self::ensure_category(store, category_id)?;
            budget.category_id = category_id;
        }
        if let Some(year) = changes.year {
            budget.year = year;
        }
        if let Some(month) = changes.month {
            budget.month = month;
        }
        if let Some(amount) = changes.amount {
            budget.amount = amount;
        }
        Self::validate_fields(budget.month, budget.amount)?;
        if moves_period {
            Self::ensure_unclaimed(store, &budget)?;
        }

        let stored = store.save_budget(budget)?;
        info!(budget = %stored.id, period = %stored.period(), "budget updated");
        Ok(stored)
    }

    pub fn delete<S>(store: &S, id: Uuid) -> Result<(), CoreError>
    where
        S: BudgetStore + ?Sized,
    {
        if store.get_budget(id)?.is_none() {
            return Err(CoreError::BudgetNotFound(id));
        }
        store.delete_budget(id)?;
        info!(budget = %id, "budget deleted");
        Ok(())
    }

    fn ensure_unclaimed<S>(store: &S, budget: &BudgetDefinition) -> Result<(), CoreError>
    where
        S: BudgetStore + ?Sized,
    {
        match store.find_budget(budget.category_id, budget.year, budget.month)? {
            Some(existing) if existing.id != budget.id => Err(CoreError::DuplicateBudget {
                category_id: budget.category_id,
                period: budget.period(),
            }),
            _ => Ok(()),
        }
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

    fn validate_fields(month: u32, amount: Decimal) -> Result<(), CoreError> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::InvalidMonth(month));
        }
        if amount <= Decimal::ZERO {
            return Err(CoreError::Validation(
                "budget amount must be positive".into(),
            ));
        }
        Ok(())
    }
}
