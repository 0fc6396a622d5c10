use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Budget, EngineError, MoneyCents, ResultEngine,
    budgets::{self, ensure_storable},
    expenses,
};

use super::{Engine, with_tx};

impl Engine {
    /// All budgets of `user_id`, newest first.
    pub async fn list_budgets(&self, user_id: &str) -> ResultEngine<Vec<Budget>> {
        let models = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .order_by_desc(budgets::Column::CreatedAt)
            .order_by_asc(budgets::Column::Name)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Budget::from).collect())
    }

    /// Create a budget. The name is trimmed; blank names and non-positive
    /// amounts are rejected before touching the database.
    pub async fn insert_budget(
        &self,
        user_id: &str,
        name: &str,
        amount: MoneyCents,
    ) -> ResultEngine<Budget> {
        let budget = Budget::new(user_id, name, amount)?;
        budgets::ActiveModel::from(&budget)
            .insert(&self.database)
            .await?;
        tracing::debug!(budget_id = %budget.id, "budget created");
        Ok(budget)
    }

    /// Change the cap of a budget. Concurrent edits are last-write-wins.
    pub async fn update_budget_amount(
        &self,
        user_id: &str,
        budget_id: Uuid,
        amount: MoneyCents,
    ) -> ResultEngine<Budget> {
        ensure_storable(amount)?;
        with_tx!(self, |db_tx| {
            let model = Self::require_budget(&db_tx, user_id, budget_id).await?;
            let mut active: budgets::ActiveModel = model.into();
            active.amount_minor = ActiveValue::Set(amount.cents());
            let updated = active.update(&db_tx).await?;
            Ok(Budget::from(updated))
        })
    }

    /// Delete a budget together with its expenses.
    ///
    /// Dependents are removed explicitly in the same DB transaction, so the
    /// outcome does not depend on the backend enforcing the cascade.
    pub async fn delete_budget(&self, user_id: &str, budget_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            Self::require_budget(&db_tx, user_id, budget_id).await?;
            let removed = expenses::Entity::delete_many()
                .filter(expenses::Column::BudgetId.eq(budget_id))
                .exec(&db_tx)
                .await?;
            budgets::Entity::delete_by_id(budget_id).exec(&db_tx).await?;
            tracing::debug!(
                %budget_id,
                expenses = removed.rows_affected,
                "budget deleted"
            );
            Ok(())
        })
    }

    pub(super) async fn require_budget(
        db_tx: &DatabaseTransaction,
        user_id: &str,
        budget_id: Uuid,
    ) -> ResultEngine<budgets::Model> {
        budgets::Entity::find_by_id(budget_id)
            .filter(budgets::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("budget {budget_id}")))
    }
}
