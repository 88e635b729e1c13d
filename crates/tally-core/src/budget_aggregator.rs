//! Read-only roll-up of monthly spend against category budgets.

use tracing::debug;

use tally_domain::BudgetStatus;

use crate::{BudgetStore, CoreError, LedgerStore};

pub struct BudgetAggregator<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> BudgetAggregator<'a, S>
where
    S: BudgetStore + LedgerStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// One status per budget configured for the month. Categories without a
    /// budget are omitted. A month outside 1-12 is rejected before any query.
    pub fn status(&self, year: i32, month: u32) -> Result<Vec<BudgetStatus>, CoreError> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::InvalidMonth(month));
        }
        let budgets = self.store.find_by_month(year, month)?;
        let mut statuses = Vec::with_capacity(budgets.len());
        for row in budgets {
            let spent = self.store.sum_amount(row.budget.category_id, year, month)?;
            statuses.push(BudgetStatus::new(
                row.budget.category_id,
                row.category_name,
                row.budget.amount,
                spent,
            ));
        }
        debug!(year, month, budgets = statuses.len(), "budget status computed");
        Ok(statuses)
    }
}
