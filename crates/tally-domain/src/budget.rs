//! Monthly category budgets and the derived spend report.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Spending limit for one category in one calendar month.
///
/// At most one budget exists per `(category_id, year, month)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BudgetDefinition {
    pub id: Uuid,
    pub category_id: Uuid,
    pub year: i32,
    pub month: u32,
    pub amount: Decimal,
}

impl BudgetDefinition {
    pub fn new(category_id: Uuid, year: i32, month: u32, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            category_id,
            year,
            month,
            amount,
        }
    }

    pub fn period(&self) -> BudgetMonth {
        BudgetMonth {
            year: self.year,
            month: self.month,
        }
    }

    /// `true` when both budgets claim the same category and month.
    pub fn collides_with(&self, other: &BudgetDefinition) -> bool {
        self.category_id == other.category_id && self.period() == other.period()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BudgetMonth {
    pub year: i32,
    pub month: u32,
}

impl fmt::Display for BudgetMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A budget joined with the name of its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetWithCategory {
    pub budget: BudgetDefinition,
    pub category_name: String,
}

/// Derived, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BudgetStatus {
    pub category_id: Uuid,
    pub category_name: String,
    pub budget_amount: Decimal,
    pub total_spent: Decimal,
    pub percent: Decimal,
}

impl BudgetStatus {
    pub fn new(
        category_id: Uuid,
        category_name: impl Into<String>,
        budget_amount: Decimal,
        total_spent: Decimal,
    ) -> Self {
        Self {
            category_id,
            category_name: category_name.into(),
            budget_amount,
            total_spent,
            percent: spend_percent(total_spent, budget_amount),
        }
    }

    pub fn remaining(&self) -> Decimal {
        self.budget_amount - self.total_spent
    }

    pub fn is_over_budget(&self) -> bool {
        self.total_spent > self.budget_amount
    }
}

/// `spent / budget * 100`, rounded to two places.
///
/// A budget of zero or less yields zero. Results too large for `Decimal`
/// saturate at [`Decimal::MAX`].
pub fn spend_percent(spent: Decimal, budget: Decimal) -> Decimal {
    if budget <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    spent
        .checked_div(budget)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|percent| percent.round_dp(2))
        .unwrap_or(Decimal::MAX)
}
