use api_types::ErrorResponse;
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;
use ingest::{ErrorKind, IngestError};

pub use server::{ServerState, run, run_with_listener, spawn_with_listener};

mod budgets;
mod expenses;
mod server;
mod sessions;

pub mod types {
    pub mod budget {
        pub use api_types::budget::{BudgetNew, BudgetUpdate, BudgetView, BudgetsResponse};
    }

    pub mod expense {
        pub use api_types::expense::{
            ExpenseSubmit, ExpenseView, ExpensesResponse, OutcomeLine, QuickExpense, ReceiptImage,
            SubmissionResponse,
        };
    }
}

#[derive(Debug)]
pub enum ServerError {
    Ingest(IngestError),
    Unauthorized,
    /// Malformed request body that the extractors accepted.
    Generic(String),
}

fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::Input | ErrorKind::Format | ErrorKind::Attribution => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorKind::Configuration => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Upstream | ErrorKind::Transport => StatusCode::BAD_GATEWAY,
        ErrorKind::Constraint | ErrorKind::Busy => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
    }
}

fn message_for_ingest_error(err: &IngestError) -> String {
    match err {
        IngestError::Store(EngineError::Database(db_err))
        | IngestError::Persist(EngineError::Database(db_err)) => {
            tracing::error!("database error: {db_err}");
            "storage unavailable".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error, kind) = match self {
            ServerError::Ingest(err) => (
                status_for_kind(err.kind()),
                message_for_ingest_error(&err),
                err.kind().as_str(),
            ),
            ServerError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "invalid credentials".to_string(),
                ErrorKind::Unauthorized.as_str(),
            ),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err, "bad_request"),
        };

        let body = ErrorResponse {
            error,
            kind: kind.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<IngestError> for ServerError {
    fn from(value: IngestError) -> Self {
        Self::Ingest(value)
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Ingest(IngestError::Store(value))
    }
}
