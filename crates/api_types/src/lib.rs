use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable failure class, e.g. `validation` or `attribution`.
    pub kind: String,
}

pub mod budget {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetNew {
        pub name: String,
        /// Must be > 0.
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetUpdate {
        /// Must be > 0.
        pub amount_minor: i64,
    }

    /// A budget with the spending of the current month.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetView {
        pub id: Uuid,
        pub name: String,
        pub amount_minor: i64,
        pub spent_minor: i64,
        /// Negative when over budget.
        pub remaining_minor: i64,
        pub percent_used: f64,
        pub over_budget: bool,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetsResponse {
        /// `YYYY-MM`.
        pub month: String,
        pub total_budget_minor: i64,
        pub total_spent_minor: i64,
        pub budgets: Vec<BudgetView>,
    }
}

pub mod expense {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub budget_id: Uuid,
        pub description: String,
        pub amount_minor: i64,
        pub date: NaiveDate,
        pub receipt_url: Option<String>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpensesResponse {
        /// `YYYY-MM`.
        pub month: String,
        pub expenses: Vec<ExpenseView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReceiptImage {
        /// `image/jpeg`, `image/png`, `image/gif` or `image/webp`.
        pub mime_type: String,
        /// Standard base64 of the image bytes.
        pub data_base64: String,
    }

    /// Exactly one of the fields must be set.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseSubmit {
        pub text: Option<String>,
        pub receipt_url: Option<String>,
        pub image: Option<ReceiptImage>,
    }

    /// `12.99 coffee` style entry for a known budget.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct QuickExpense {
        pub budget_id: Uuid,
        pub text: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OutcomeLine {
        pub budget_id: Uuid,
        pub budget_name: String,
        pub added_minor: i64,
        pub remaining_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SubmissionResponse {
        /// e.g. `$20.00 was added to Groceries. $480.00 remaining.`
        pub message: String,
        pub total_added_minor: i64,
        pub lines: Vec<OutcomeLine>,
        pub expenses: Vec<ExpenseView>,
    }
}
