//! Budget API endpoints

use api_types::budget::{BudgetNew, BudgetUpdate, BudgetView, BudgetsResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Budget, MoneyCents, aggregate::BudgetSummary};
use ingest::Session;
use uuid::Uuid;

use crate::{
    ServerError,
    server::{CurrentUser, ServerState},
};

fn view(budget: &Budget, session: &Session) -> BudgetView {
    let summary = BudgetSummary::new(budget, session.expenses());
    BudgetView {
        id: budget.id,
        name: budget.name.clone(),
        amount_minor: summary.amount.cents(),
        spent_minor: summary.spent.cents(),
        remaining_minor: summary.remaining.cents(),
        percent_used: summary.percent_used,
        over_budget: summary.over_budget,
        created_at: budget.created_at,
    }
}

/// Handle requests for listing the user's budgets with this month's spending
pub async fn list(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
) -> Result<Json<BudgetsResponse>, ServerError> {
    let handle = state.session(&user).await?;
    let mut session = handle.lock().await;
    session.roll_to(state.ingestor.today()).await?;
    session.refresh_budgets().await?;
    session.refresh_expenses().await?;

    Ok(Json(BudgetsResponse {
        month: session.month().to_string(),
        total_budget_minor: session.total_budget().cents(),
        total_spent_minor: session.total_spent().cents(),
        budgets: session
            .budgets()
            .iter()
            .map(|budget| view(budget, &session))
            .collect(),
    }))
}

/// Handle requests for creating a new budget
pub async fn create(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetNew>,
) -> Result<(StatusCode, Json<BudgetView>), ServerError> {
    let handle = state.session(&user).await?;
    let mut session = handle.lock().await;
    let budget = session
        .add_budget(&payload.name, MoneyCents::new(payload.amount_minor))
        .await?;

    Ok((StatusCode::CREATED, Json(view(&budget, &session))))
}

/// Handle requests for changing a budget cap
pub async fn update_amount(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BudgetUpdate>,
) -> Result<Json<BudgetView>, ServerError> {
    let handle = state.session(&user).await?;
    let mut session = handle.lock().await;
    let budget = session
        .update_budget_amount(id, MoneyCents::new(payload.amount_minor))
        .await?;

    Ok(Json(view(&budget, &session)))
}

/// Handle requests for deleting a budget and its expenses
pub async fn remove(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    let handle = state.session(&user).await?;
    let mut session = handle.lock().await;
    session.delete_budget(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
