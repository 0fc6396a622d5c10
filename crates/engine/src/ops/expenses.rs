use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{DateRange, EngineError, Expense, ExpenseNew, ResultEngine, budgets, expenses};

use super::{Engine, with_tx};

impl Engine {
    /// Expenses of `user_id` dated inside `range` (both ends inclusive),
    /// newest first.
    pub async fn list_expenses(&self, user_id: &str, range: DateRange) -> ResultEngine<Vec<Expense>> {
        let models = expenses::Entity::find()
            .filter(expenses::Column::UserId.eq(user_id))
            .filter(expenses::Column::Date.gte(range.from))
            .filter(expenses::Column::Date.lte(range.to))
            .order_by_desc(expenses::Column::Date)
            .order_by_desc(expenses::Column::CreatedAt)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Expense::from).collect())
    }

    /// Insert a batch of expenses atomically.
    ///
    /// Every row must reference a budget of `user_id` that exists at write
    /// time; a vanished budget yields [`EngineError::Constraint`] and nothing
    /// from the batch is written.
    pub async fn insert_expenses(
        &self,
        user_id: &str,
        rows: Vec<ExpenseNew>,
    ) -> ResultEngine<Vec<Expense>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        for row in &rows {
            row.validate()?;
        }

        with_tx!(self, |db_tx| {
            let budget_ids: HashSet<Uuid> = rows.iter().map(|row| row.budget_id).collect();
            for budget_id in &budget_ids {
                let exists = budgets::Entity::find_by_id(*budget_id)
                    .filter(budgets::Column::UserId.eq(user_id))
                    .one(&db_tx)
                    .await?
                    .is_some();
                if !exists {
                    return Err(EngineError::Constraint(format!(
                        "budget {budget_id} no longer exists"
                    )));
                }
            }

            let created_at = Utc::now();
            let mut inserted = Vec::with_capacity(rows.len());
            for row in rows {
                let expense = row.into_expense(user_id, created_at);
                expenses::ActiveModel::from(&expense).insert(&db_tx).await?;
                inserted.push(expense);
            }
            tracing::debug!(count = inserted.len(), "expenses inserted");
            Ok(inserted)
        })
    }

    /// Delete one expense. A missing (or foreign) id is `KeyNotFound`.
    pub async fn delete_expense(&self, user_id: &str, expense_id: Uuid) -> ResultEngine<()> {
        let result = expenses::Entity::delete_many()
            .filter(expenses::Column::Id.eq(expense_id))
            .filter(expenses::Column::UserId.eq(user_id))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound(format!("expense {expense_id}")));
        }
        Ok(())
    }
}
