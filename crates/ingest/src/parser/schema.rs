//! Validation of the model reply.
//!
//! The reply is read as loose JSON and every field is checked explicitly, so
//! a string amount or a missing budget id is reported as such instead of as a
//! generic deserialization failure.

use chrono::NaiveDate;
use engine::MoneyCents;
use serde_json::{Map, Value};

use super::{CatalogEntry, ParseError, ParsedTransaction};

pub(super) fn validate_reply(
    raw: &str,
    catalog: &[CatalogEntry],
) -> Result<Vec<ParsedTransaction>, ParseError> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|err| ParseError::Format(format!("reply is not JSON: {err}")))?;
    let Some(object) = value.as_object() else {
        return Err(ParseError::Format("reply is not a JSON object".to_string()));
    };
    let Some(transactions) = object.get("transactions") else {
        return Err(ParseError::Format("missing \"transactions\"".to_string()));
    };
    let Some(transactions) = transactions.as_array() else {
        return Err(ParseError::Format("\"transactions\" is not an array".to_string()));
    };
    if transactions.is_empty() {
        return Err(ParseError::Format("no transactions in reply".to_string()));
    }

    transactions
        .iter()
        .enumerate()
        .map(|(index, tx)| validate_transaction(index, tx, catalog))
        .collect()
}

fn validate_transaction(
    index: usize,
    value: &Value,
    catalog: &[CatalogEntry],
) -> Result<ParsedTransaction, ParseError> {
    let invalid = |message: &str| ParseError::Validation {
        index,
        message: message.to_string(),
    };
    let Some(tx) = value.as_object() else {
        return Err(invalid("transaction is not an object"));
    };

    let description = non_blank(tx, "Description").ok_or_else(|| invalid("missing Description"))?;

    let amount = match tx.get("Amount") {
        Some(Value::Number(number)) => number
            .as_f64()
            .ok_or_else(|| invalid("Amount is not representable"))?,
        Some(_) => return Err(invalid("Amount must be a number")),
        None => return Err(invalid("missing Amount")),
    };
    let amount = MoneyCents::from_major_f64(amount).map_err(|err| invalid(&err.to_string()))?;
    if !amount.is_positive() {
        return Err(invalid("Amount must be greater than zero"));
    }

    let date = non_blank(tx, "Date").ok_or_else(|| invalid("missing Date"))?;
    let date = parse_date(date).ok_or_else(|| invalid("Date must be a YYYY-MM-DD calendar date"))?;

    let budget_name = non_blank(tx, "Budget").ok_or_else(|| invalid("missing Budget"))?;

    let Some(budget_id) = non_blank(tx, "BudgetID") else {
        return Err(ParseError::Attribution {
            index,
            message: "missing BudgetID".to_string(),
        });
    };
    let Some(entry) = catalog
        .iter()
        .find(|entry| entry.id.to_string() == budget_id)
    else {
        return Err(ParseError::Attribution {
            index,
            message: format!("BudgetID {budget_id} is not one of your budgets"),
        });
    };
    if entry.name != budget_name {
        tracing::debug!(
            budget_id,
            model_name = %budget_name,
            catalog_name = %entry.name,
            "budget name differs from catalog"
        );
    }

    Ok(ParsedTransaction {
        description: description.to_string(),
        amount,
        date,
        budget_id: entry.id,
        budget_name: entry.name.clone(),
    })
}

fn non_blank<'a>(tx: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    tx.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Strict `YYYY-MM-DD`: four-digit year, two-digit month and day.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}
