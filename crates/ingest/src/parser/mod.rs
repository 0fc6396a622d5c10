//! AI expense parser: turns free text or a receipt image into validated
//! transactions attributed to the user's budgets.

use std::{sync::Arc, time::Duration};

use chrono::NaiveDate;
use engine::{Budget, MoneyCents};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::llm::{CompletionRequest, LanguageModel, LlmError};

mod prompt;
mod schema;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParserInput {
    Text(String),
    /// Publicly reachable receipt image.
    ImageUrl(String),
}

/// A budget as offered to the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: Uuid,
    pub name: String,
}

impl From<&Budget> for CatalogEntry {
    fn from(budget: &Budget) -> Self {
        Self {
            id: budget.id,
            name: budget.name.clone(),
        }
    }
}

/// A transaction that passed validation. `budget_id` is always one of the
/// catalog ids the parser was called with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedTransaction {
    pub description: String,
    pub amount: MoneyCents,
    pub date: NaiveDate,
    pub budget_id: Uuid,
    pub budget_name: String,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("parser is not configured: {0}")]
    Configuration(String),
    #[error("nothing to parse: {0}")]
    Input(String),
    #[error("language model request failed: {0}")]
    Upstream(String),
    #[error("unexpected model reply: {0}")]
    Format(String),
    #[error("transaction {index}: {message}")]
    Validation { index: usize, message: String },
    #[error("transaction {index}: {message}")]
    Attribution { index: usize, message: String },
}

impl From<LlmError> for ParseError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingApiKey => Self::Configuration(err.to_string()),
            LlmError::EmptyResponse => Self::Format(err.to_string()),
            LlmError::Network(_) | LlmError::Server { .. } => Self::Upstream(err.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct ExpenseParser {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl ExpenseParser {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Asks the model to parse `input` and validates every transaction of the
    /// reply. Either all transactions are returned or none.
    pub async fn parse(
        &self,
        input: &ParserInput,
        catalog: &[CatalogEntry],
        today: NaiveDate,
    ) -> Result<Vec<ParsedTransaction>, ParseError> {
        if catalog.is_empty() {
            return Err(ParseError::Configuration(
                "create a budget before adding expenses".to_string(),
            ));
        }
        match input {
            ParserInput::Text(text) if text.trim().is_empty() => {
                return Err(ParseError::Input("expense text is empty".to_string()));
            }
            ParserInput::ImageUrl(url) if url.trim().is_empty() => {
                return Err(ParseError::Input("receipt url is empty".to_string()));
            }
            _ => {}
        }

        let request = CompletionRequest {
            system: prompt::system_prompt(catalog, today),
            user: prompt::user_content(input),
        };

        let raw = tokio::time::timeout(self.timeout, self.model.complete(&request))
            .await
            .map_err(|_| {
                ParseError::Upstream(format!(
                    "no reply within {} seconds",
                    self.timeout.as_secs()
                ))
            })??;

        let transactions = schema::validate_reply(&raw, catalog)?;
        tracing::debug!(count = transactions.len(), "model reply validated");
        Ok(transactions)
    }
}
