//! Prompt construction for the expense parser.

use chrono::NaiveDate;
use serde::Serialize;

use super::{CatalogEntry, ParserInput};
use crate::llm::UserContent;

pub(super) const RECEIPT_INSTRUCTION: &str =
    "Please analyze this receipt and extract the relevant information.";

#[derive(Serialize)]
struct PromptBudget<'a> {
    name: &'a str,
    id: String,
}

pub(super) fn system_prompt(catalog: &[CatalogEntry], today: NaiveDate) -> String {
    let budgets: Vec<PromptBudget<'_>> = catalog
        .iter()
        .map(|entry| PromptBudget {
            name: &entry.name,
            id: entry.id.to_string(),
        })
        .collect();
    // Serializing a Vec of plain structs cannot fail.
    let budgets_json = serde_json::to_string_pretty(&budgets).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"You are an expense parser. Extract the expenses described by the user and assign each one to exactly one of these budgets:
{budgets_json}

Respond with a JSON object of this exact shape:
{{
  "transactions": [
    {{
      "Description": "short description of the expense",
      "Amount": 12.34,
      "Date": "YYYY-MM-DD",
      "Budget": "budget name",
      "BudgetID": "budget id"
    }}
  ]
}}

Rules:
- Today is {today}. Use it when no date is given.
- Use the exact BudgetID from the list above.
- Amounts must be numbers, not strings."#,
        today = today.format("%Y-%m-%d"),
    )
}

pub(super) fn user_content(input: &ParserInput) -> UserContent {
    match input {
        ParserInput::Text(text) => UserContent::Text(format!("Parse this expense: {}", text.trim())),
        ParserInput::ImageUrl(url) => UserContent::Image {
            instruction: RECEIPT_INSTRUCTION.to_string(),
            url: url.trim().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn system_prompt_lists_catalog_and_today() {
        let id = Uuid::new_v4();
        let catalog = vec![CatalogEntry {
            id,
            name: "Groceries".to_string(),
        }];
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let prompt = system_prompt(&catalog, today);
        assert!(prompt.contains(&id.to_string()));
        assert!(prompt.contains("\"name\": \"Groceries\""));
        assert!(prompt.contains("Today is 2026-10-18"));
        assert!(prompt.contains("\"BudgetID\""));
    }

    #[test]
    fn text_is_prefixed() {
        let content = user_content(&ParserInput::Text(" 20 milk ".to_string()));
        assert_eq!(content, UserContent::Text("Parse this expense: 20 milk".to_string()));
    }
}
