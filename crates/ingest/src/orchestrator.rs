//! Ingestion pipeline: raw input → (upload) → parse → persist → refresh.

use std::sync::Arc;

use chrono::NaiveDate;
use engine::{Expense, ExpenseNew, MoneyCents};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    IngestError,
    clock::Clock,
    parser::{ExpenseParser, ParseError, ParsedTransaction, ParserInput},
    quick_add::parse_quick_expense,
    session::{Phase, Session},
    uploader::{ReceiptUploader, StoredReceipt},
};

/// What the user submitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawInput {
    Text(String),
    /// An already hosted receipt image.
    ReceiptUrl(String),
    /// A receipt image to upload first.
    ReceiptImage { bytes: Vec<u8>, mime_type: String },
}

/// Per-budget effect of a submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutcomeLine {
    pub budget_id: Uuid,
    pub budget_name: String,
    pub added: MoneyCents,
    /// Remaining for the reporting month after the submission.
    pub remaining: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubmissionOutcome {
    pub expenses: Vec<Expense>,
    pub lines: Vec<OutcomeLine>,
    pub total_added: MoneyCents,
}

impl SubmissionOutcome {
    fn new(expenses: Vec<Expense>, session: &Session) -> Self {
        let summaries = session.budget_summaries();
        let mut lines: Vec<OutcomeLine> = Vec::new();
        for expense in &expenses {
            if let Some(line) = lines
                .iter_mut()
                .find(|line| line.budget_id == expense.budget_id)
            {
                line.added += expense.amount;
                continue;
            }
            let summary = summaries
                .iter()
                .find(|summary| summary.budget_id == expense.budget_id);
            lines.push(OutcomeLine {
                budget_id: expense.budget_id,
                budget_name: summary
                    .map(|summary| summary.name.clone())
                    .unwrap_or_default(),
                added: expense.amount,
                remaining: summary
                    .map(|summary| summary.remaining)
                    .unwrap_or(MoneyCents::ZERO),
            });
        }
        let total_added = expenses.iter().map(|expense| expense.amount).sum();
        Self {
            expenses,
            lines,
            total_added,
        }
    }

    /// `"$20.00 was added to Groceries. $480.00 remaining."`, one sentence per
    /// budget touched.
    pub fn message(&self) -> String {
        self.lines
            .iter()
            .map(|line| {
                format!(
                    "{} was added to {}. {} remaining.",
                    line.added, line.budget_name, line.remaining
                )
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone)]
pub struct Ingestor {
    parser: ExpenseParser,
    uploader: ReceiptUploader,
    clock: Arc<dyn Clock>,
}

impl Ingestor {
    pub fn new(parser: ExpenseParser, uploader: ReceiptUploader, clock: Arc<dyn Clock>) -> Self {
        Self {
            parser,
            uploader,
            clock,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Runs a submission end to end.
    ///
    /// Either every parsed transaction is stored or none is. On failure the
    /// session state is unchanged apart from its [`Phase`], and an image
    /// uploaded for this submission is removed again.
    pub async fn submit_expense(
        &self,
        session: &mut Session,
        input: RawInput,
    ) -> Result<SubmissionOutcome, IngestError> {
        session.begin_submission();
        let result = self.run(session, input).await;
        Self::finish(session, &result);
        result
    }

    /// Adds a single expense to `budget_id` from a `12.99 coffee` style line,
    /// without calling the language model.
    pub async fn submit_quick_expense(
        &self,
        session: &mut Session,
        budget_id: Uuid,
        text: &str,
    ) -> Result<SubmissionOutcome, IngestError> {
        session.begin_submission();
        let result = self.run_quick(session, budget_id, text).await;
        Self::finish(session, &result);
        result
    }

    fn finish(session: &mut Session, result: &Result<SubmissionOutcome, IngestError>) {
        let phase = match result {
            Ok(outcome) => {
                tracing::info!(
                    user = %session.user_id(),
                    count = outcome.expenses.len(),
                    total = %outcome.total_added,
                    "expenses added"
                );
                Phase::Succeeded {
                    message: outcome.message(),
                }
            }
            Err(err) => {
                tracing::warn!(user = %session.user_id(), kind = %err.kind(), "submission failed: {err}");
                Phase::Failed {
                    kind: err.kind(),
                    message: err.to_string(),
                }
            }
        };
        session.finish_submission(phase);
    }

    async fn run(
        &self,
        session: &mut Session,
        input: RawInput,
    ) -> Result<SubmissionOutcome, IngestError> {
        let today = self.clock.today();
        session.roll_to(today).await?;
        if session.budgets().is_empty() {
            return Err(ParseError::Configuration(
                "create a budget before adding expenses".to_string(),
            )
            .into());
        }

        let (parser_input, uploaded) = match input {
            RawInput::Text(text) => (ParserInput::Text(text), None),
            RawInput::ReceiptUrl(url) => (ParserInput::ImageUrl(url), None),
            RawInput::ReceiptImage { bytes, mime_type } => {
                let receipt = self.uploader.upload(bytes, &mime_type).await?;
                (ParserInput::ImageUrl(receipt.url.clone()), Some(receipt))
            }
        };
        let receipt_url = match &parser_input {
            ParserInput::ImageUrl(url) => Some(url.trim().to_string()),
            ParserInput::Text(_) => None,
        };

        let result = self
            .parse_and_store(session, &parser_input, receipt_url, today)
            .await;
        if result.is_err()
            && let Some(receipt) = uploaded
        {
            self.discard(&receipt).await;
        }
        result
    }

    async fn parse_and_store(
        &self,
        session: &mut Session,
        input: &ParserInput,
        receipt_url: Option<String>,
        today: NaiveDate,
    ) -> Result<SubmissionOutcome, IngestError> {
        let catalog = session.catalog();
        let parsed = self.parser.parse(input, &catalog, today).await?;
        let rows = parsed
            .into_iter()
            .map(|tx| to_row(tx, receipt_url.clone()))
            .collect();
        Self::store(session, rows).await
    }

    async fn run_quick(
        &self,
        session: &mut Session,
        budget_id: Uuid,
        text: &str,
    ) -> Result<SubmissionOutcome, IngestError> {
        let today = self.clock.today();
        session.roll_to(today).await?;
        let quick = parse_quick_expense(text)?;
        let row = ExpenseNew {
            description: quick.description,
            amount: quick.amount,
            budget_id,
            date: today,
            receipt_url: None,
        };
        Self::store(session, vec![row]).await
    }

    async fn store(
        session: &mut Session,
        rows: Vec<ExpenseNew>,
    ) -> Result<SubmissionOutcome, IngestError> {
        let inserted = session
            .engine()
            .insert_expenses(session.user_id(), rows)
            .await
            .map_err(IngestError::Persist)?;

        // Rows are committed from here on.
        if let Err(err) = session.refresh_expenses().await {
            tracing::warn!("expense reload failed after insert: {err}");
            session.remember(&inserted);
        }
        Ok(SubmissionOutcome::new(inserted, session))
    }

    async fn discard(&self, receipt: &StoredReceipt) {
        if let Err(err) = self.uploader.discard(receipt).await {
            tracing::warn!(key = %receipt.key, "could not remove orphaned receipt: {err}");
        }
    }
}

fn to_row(tx: ParsedTransaction, receipt_url: Option<String>) -> ExpenseNew {
    ExpenseNew {
        description: tx.description,
        amount: tx.amount,
        budget_id: tx.budget_id,
        date: tx.date,
        receipt_url,
    }
}
