//! Expenses: dated spend events attributed to a budget.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine};

/// A persisted expense. Expenses are immutable; they can only be deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: String,
    pub budget_id: Uuid,
    pub description: String,
    /// Always > 0.
    pub amount: MoneyCents,
    pub date: NaiveDate,
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for [`crate::Engine::insert_expenses`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpenseNew {
    pub description: String,
    pub amount: MoneyCents,
    pub budget_id: Uuid,
    pub date: NaiveDate,
    pub receipt_url: Option<String>,
}

impl ExpenseNew {
    /// Checks the row-local invariants (the budget reference is checked by
    /// the store at write time).
    pub(crate) fn validate(&self) -> ResultEngine<()> {
        if self.description.trim().is_empty() {
            return Err(EngineError::InvalidName(
                "expense description must not be empty".to_string(),
            ));
        }
        if !self.amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "expense amount must be > 0".to_string(),
            ));
        }
        if !self.amount.is_storable() {
            return Err(EngineError::InvalidAmount(format!(
                "expense amount must not exceed {}",
                MoneyCents::MAX_AMOUNT
            )));
        }
        Ok(())
    }

    pub(crate) fn into_expense(self, user_id: &str, created_at: DateTime<Utc>) -> Expense {
        Expense {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            budget_id: self.budget_id,
            description: self.description.trim().to_string(),
            amount: self.amount,
            date: self.date,
            receipt_url: self
                .receipt_url
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub budget_id: Uuid,
    pub description: String,
    pub amount_minor: i64,
    pub date: Date,
    pub receipt_url: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::budgets::Entity",
        from = "Column::BudgetId",
        to = "super::budgets::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Budget,
}

impl Related<super::budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budget.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id),
            user_id: ActiveValue::Set(expense.user_id.clone()),
            budget_id: ActiveValue::Set(expense.budget_id),
            description: ActiveValue::Set(expense.description.clone()),
            amount_minor: ActiveValue::Set(expense.amount.cents()),
            date: ActiveValue::Set(expense.date),
            receipt_url: ActiveValue::Set(expense.receipt_url.clone()),
            created_at: ActiveValue::Set(expense.created_at),
        }
    }
}

impl From<Model> for Expense {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            budget_id: model.budget_id,
            description: model.description,
            amount: MoneyCents::new(model.amount_minor),
            date: model.date,
            receipt_url: model.receipt_url,
            created_at: model.created_at,
        }
    }
}
