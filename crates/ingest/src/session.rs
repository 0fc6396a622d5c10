//! Per-user session: the signed-in identity plus the cached budgets and
//! current-month expenses every figure is computed from.

use chrono::NaiveDate;
use engine::{
    Budget, Engine, Expense, MoneyCents, Month,
    aggregate::{self, BudgetSummary},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{IngestError, error::ErrorKind, parser::CatalogEntry};

/// State of the last submission.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    InFlight,
    Succeeded {
        message: String,
    },
    Failed {
        kind: ErrorKind,
        message: String,
    },
}

#[derive(Debug)]
pub struct Session {
    engine: Engine,
    user_id: String,
    month: Month,
    budgets: Vec<Budget>,
    expenses: Vec<Expense>,
    phase: Phase,
}

impl Session {
    /// Checks the credentials and loads the user's budgets and the expenses
    /// of the month `today` falls in.
    pub async fn sign_in(
        engine: Engine,
        username: &str,
        password: &str,
        today: NaiveDate,
    ) -> Result<Self, IngestError> {
        engine.authenticate(username, password).await?;
        Self::open(engine, username, today).await
    }

    /// Opens a session for an already authenticated user.
    pub async fn open(engine: Engine, user_id: &str, today: NaiveDate) -> Result<Self, IngestError> {
        let mut session = Self {
            engine,
            user_id: user_id.to_string(),
            month: Month::of(today),
            budgets: Vec::new(),
            expenses: Vec::new(),
            phase: Phase::Idle,
        };
        session.refresh_budgets().await?;
        session.refresh_expenses().await?;
        tracing::info!(user = %session.user_id, month = %session.month, "session opened");
        Ok(session)
    }

    pub fn sign_out(self) {
        tracing::info!(user = %self.user_id, "session closed");
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn budgets(&self) -> &[Budget] {
        &self.budgets
    }

    /// Expenses of [`month`](Self::month), newest first.
    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.budgets.iter().map(CatalogEntry::from).collect()
    }

    pub fn budget_summaries(&self) -> Vec<BudgetSummary> {
        aggregate::summarize(&self.budgets, &self.expenses)
    }

    pub fn total_budget(&self) -> MoneyCents {
        aggregate::total_budget(&self.budgets)
    }

    pub fn total_spent(&self) -> MoneyCents {
        aggregate::total_spent(&self.budgets, &self.expenses)
    }

    pub async fn refresh_budgets(&mut self) -> Result<(), IngestError> {
        self.budgets = self.engine.list_budgets(&self.user_id).await?;
        Ok(())
    }

    pub async fn refresh_expenses(&mut self) -> Result<(), IngestError> {
        self.expenses = self
            .engine
            .list_expenses(&self.user_id, self.month.range())
            .await?;
        Ok(())
    }

    /// Moves the reporting month to the one `today` falls in, reloading the
    /// expenses when it changed.
    pub async fn roll_to(&mut self, today: NaiveDate) -> Result<(), IngestError> {
        let month = Month::of(today);
        if month != self.month {
            tracing::debug!(from = %self.month, to = %month, "reporting month changed");
            self.month = month;
            self.refresh_expenses().await?;
        }
        Ok(())
    }

    pub async fn add_budget(&mut self, name: &str, amount: MoneyCents) -> Result<Budget, IngestError> {
        let budget = self.engine.insert_budget(&self.user_id, name, amount).await?;
        self.refresh_budgets().await?;
        Ok(budget)
    }

    pub async fn update_budget_amount(
        &mut self,
        budget_id: Uuid,
        amount: MoneyCents,
    ) -> Result<Budget, IngestError> {
        let budget = self
            .engine
            .update_budget_amount(&self.user_id, budget_id, amount)
            .await?;
        self.refresh_budgets().await?;
        Ok(budget)
    }

    /// Deletes a budget and its expenses.
    pub async fn delete_budget(&mut self, budget_id: Uuid) -> Result<(), IngestError> {
        self.engine.delete_budget(&self.user_id, budget_id).await?;
        self.refresh_budgets().await?;
        self.refresh_expenses().await
    }

    pub async fn delete_expense(&mut self, expense_id: Uuid) -> Result<(), IngestError> {
        self.engine.delete_expense(&self.user_id, expense_id).await?;
        self.refresh_expenses().await
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }

    /// A submission holds `&mut Session` for its whole run, so two can never
    /// overlap on one session. Shared owners report [`IngestError::Busy`]
    /// when the session is locked.
    pub(crate) fn begin_submission(&mut self) {
        self.phase = Phase::InFlight;
    }

    pub(crate) fn finish_submission(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// Adds freshly written expenses to the cache without a reload.
    pub(crate) fn remember(&mut self, inserted: &[Expense]) {
        for expense in inserted {
            if self.month.contains(expense.date)
                && !self.expenses.iter().any(|cached| cached.id == expense.id)
            {
                self.expenses.push(expense.clone());
            }
        }
        self.expenses
            .sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
    }
}
