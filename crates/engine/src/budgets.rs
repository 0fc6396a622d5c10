//! Budgets: named monthly spending caps.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine};

/// A named spending cap.
///
/// The cap applies to the current calendar month; what was spent is never
/// stored here, it is derived from the expenses (see [`crate::aggregate`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    /// Stable identifier, generated once and never reused.
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    /// Always > 0.
    pub amount: MoneyCents,
    pub created_at: DateTime<Utc>,
}

impl Budget {
    pub fn new(user_id: &str, name: &str, amount: MoneyCents) -> ResultEngine<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidName(
                "budget name must not be empty".to_string(),
            ));
        }
        ensure_storable(amount)?;
        Ok(Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            amount,
            created_at: Utc::now(),
        })
    }
}

pub(crate) fn ensure_storable(amount: MoneyCents) -> ResultEngine<()> {
    if !amount.is_positive() {
        return Err(EngineError::InvalidAmount(
            "budget amount must be > 0".to_string(),
        ));
    }
    if !amount.is_storable() {
        return Err(EngineError::InvalidAmount(format!(
            "budget amount must not exceed {}",
            MoneyCents::MAX_AMOUNT
        )));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub amount_minor: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Username",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::expenses::Entity")]
    Expenses,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Budget> for ActiveModel {
    fn from(budget: &Budget) -> Self {
        Self {
            id: ActiveValue::Set(budget.id),
            user_id: ActiveValue::Set(budget.user_id.clone()),
            name: ActiveValue::Set(budget.name.clone()),
            amount_minor: ActiveValue::Set(budget.amount.cents()),
            created_at: ActiveValue::Set(budget.created_at),
        }
    }
}

impl From<Model> for Budget {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            amount: MoneyCents::new(model.amount_minor),
            created_at: model.created_at,
        }
    }
}
