//! Expense API endpoints

use std::sync::Arc;

use api_types::expense::{
    ExpenseSubmit, ExpenseView, ExpensesResponse, OutcomeLine, QuickExpense, SubmissionResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use base64::Engine as _;
use engine::Expense;
use ingest::{IngestError, RawInput, SubmissionOutcome};
use uuid::Uuid;

use crate::{
    ServerError,
    server::{CurrentUser, ServerState},
};

fn view(expense: &Expense) -> ExpenseView {
    ExpenseView {
        id: expense.id,
        budget_id: expense.budget_id,
        description: expense.description.clone(),
        amount_minor: expense.amount.cents(),
        date: expense.date,
        receipt_url: expense.receipt_url.clone(),
        created_at: expense.created_at,
    }
}

fn submission_response(outcome: &SubmissionOutcome) -> SubmissionResponse {
    SubmissionResponse {
        message: outcome.message(),
        total_added_minor: outcome.total_added.cents(),
        lines: outcome
            .lines
            .iter()
            .map(|line| OutcomeLine {
                budget_id: line.budget_id,
                budget_name: line.budget_name.clone(),
                added_minor: line.added.cents(),
                remaining_minor: line.remaining.cents(),
            })
            .collect(),
        expenses: outcome.expenses.iter().map(view).collect(),
    }
}

fn raw_input(payload: ExpenseSubmit) -> Result<RawInput, ServerError> {
    match (payload.text, payload.receipt_url, payload.image) {
        (Some(text), None, None) => Ok(RawInput::Text(text)),
        (None, Some(url), None) => Ok(RawInput::ReceiptUrl(url)),
        (None, None, Some(image)) => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(image.data_base64.trim())
                .map_err(|err| ServerError::Generic(format!("invalid image data: {err}")))?;
            Ok(RawInput::ReceiptImage {
                bytes,
                mime_type: image.mime_type,
            })
        }
        _ => Err(ServerError::Generic(
            "exactly one of text, receipt_url or image is required".to_string(),
        )),
    }
}

/// Handle requests for listing this month's expenses
pub async fn list(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
) -> Result<Json<ExpensesResponse>, ServerError> {
    let handle = state.session(&user).await?;
    let mut session = handle.lock().await;
    session.roll_to(state.ingestor.today()).await?;
    session.refresh_expenses().await?;

    Ok(Json(ExpensesResponse {
        month: session.month().to_string(),
        expenses: session.expenses().iter().map(view).collect(),
    }))
}

/// Handle requests for deleting an expense
pub async fn remove(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    let handle = state.session(&user).await?;
    let mut session = handle.lock().await;
    session.delete_expense(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handle requests for adding expenses from text or a receipt
pub async fn submit(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseSubmit>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ServerError> {
    let input = raw_input(payload)?;
    let handle = state.session(&user).await?;
    let mut session = handle.try_lock().map_err(|_| IngestError::Busy)?;
    let outcome = state.ingestor.submit_expense(&mut session, input).await?;

    Ok((StatusCode::CREATED, Json(submission_response(&outcome))))
}

/// Handle requests for adding a `12.99 coffee` style expense
pub async fn quick(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Json(payload): Json<QuickExpense>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ServerError> {
    let handle = state.session(&user).await?;
    let mut session = handle.try_lock().map_err(|_| IngestError::Busy)?;
    let outcome = state
        .ingestor
        .submit_quick_expense(&mut session, payload.budget_id, &payload.text)
        .await?;

    Ok((StatusCode::CREATED, Json(submission_response(&outcome))))
}

/// Handle requests for dropping the caller's session
pub async fn sign_out(
    Extension(user): Extension<CurrentUser>,
    State(state): State<ServerState>,
) -> StatusCode {
    if let Some(handle) = state.close_session(&user) {
        // Wait for an in-flight submission to finish.
        drop(handle.lock().await);
        match Arc::try_unwrap(handle) {
            Ok(session) => session.into_inner().sign_out(),
            Err(_) => tracing::debug!(user = %user.username, "session still referenced"),
        }
    }
    StatusCode::NO_CONTENT
}
