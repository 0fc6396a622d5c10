//! Spending figures derived from the expense ledger.
//!
//! Nothing here is stored: every figure is recomputed from the budgets and
//! the expenses currently loaded. All functions are pure and total over
//! well-formed input.

use serde::Serialize;
use uuid::Uuid;

use crate::{Budget, Expense, MoneyCents, Month};

/// Sum of the amounts of `expenses` attributed to `budget_id`.
///
/// `expenses` is expected to be already scoped to the reporting period (the
/// month window the ledger was queried with).
pub fn spent_for_budget(budget_id: Uuid, expenses: &[Expense]) -> MoneyCents {
    expenses
        .iter()
        .filter(|expense| expense.budget_id == budget_id)
        .map(|expense| expense.amount)
        .sum()
}

/// Like [`spent_for_budget`], but only counts expenses dated in `month`.
pub fn spent_for_budget_in(budget_id: Uuid, expenses: &[Expense], month: Month) -> MoneyCents {
    expenses
        .iter()
        .filter(|expense| expense.budget_id == budget_id && month.contains(expense.date))
        .map(|expense| expense.amount)
        .sum()
}

/// Sum of all budget caps.
pub fn total_budget(budgets: &[Budget]) -> MoneyCents {
    budgets.iter().map(|budget| budget.amount).sum()
}

/// Sum spent across `budgets`. Expenses of budgets not in the list are
/// ignored.
pub fn total_spent(budgets: &[Budget], expenses: &[Expense]) -> MoneyCents {
    budgets
        .iter()
        .map(|budget| spent_for_budget(budget.id, expenses))
        .sum()
}

/// Per-budget view for display.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BudgetSummary {
    pub budget_id: Uuid,
    pub name: String,
    pub amount: MoneyCents,
    pub spent: MoneyCents,
    /// `amount - spent`; negative when over budget.
    pub remaining: MoneyCents,
    pub percent_used: f64,
    /// `spent > amount` (spending exactly the cap is not over budget).
    pub over_budget: bool,
}

impl BudgetSummary {
    pub fn new(budget: &Budget, expenses: &[Expense]) -> Self {
        let spent = spent_for_budget(budget.id, expenses);
        Self {
            budget_id: budget.id,
            name: budget.name.clone(),
            amount: budget.amount,
            spent,
            remaining: budget.amount - spent,
            percent_used: budget.amount.percent_of(spent),
            over_budget: spent > budget.amount,
        }
    }
}

/// One summary per budget, in the order of `budgets`.
pub fn summarize(budgets: &[Budget], expenses: &[Expense]) -> Vec<BudgetSummary> {
    budgets
        .iter()
        .map(|budget| BudgetSummary::new(budget, expenses))
        .collect()
}
