use engine::MoneyCents;

/// A quick-add line split into its amount and description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuickExpense {
    pub amount: MoneyCents,
    pub description: String,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum QuickAddError {
    #[error("empty text")]
    Empty,
    #[error("no amount found")]
    MissingAmount,
    #[error("invalid amount")]
    InvalidAmount,
    #[error("no description found")]
    MissingDescription,
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn looks_numeric(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '$' | '+' | '-'))
}

/// Parses a quick-add line into an amount and a description.
///
/// Rules:
/// - `12.99 coffee` and `coffee 12.99` are both accepted
/// - the amount may carry a `$` and at most 2 decimals
/// - the amount must be > 0 and a description is required
pub fn parse_quick_expense(input: &str) -> Result<QuickExpense, QuickAddError> {
    let collapsed = collapse_whitespace(input);
    if collapsed.is_empty() {
        return Err(QuickAddError::Empty);
    }

    let tokens: Vec<&str> = collapsed.split(' ').collect();
    let amount_in = |at: usize| {
        tokens
            .get(at)
            .and_then(|token| token.parse::<MoneyCents>().ok())
            .map(|amount| (at, amount))
    };
    let (amount_at, amount) = match amount_in(0).or_else(|| amount_in(tokens.len() - 1)) {
        Some(found) => found,
        None if tokens.iter().any(|token| looks_numeric(token)) => {
            return Err(QuickAddError::InvalidAmount);
        }
        None => return Err(QuickAddError::MissingAmount),
    };
    if !amount.is_positive() {
        return Err(QuickAddError::InvalidAmount);
    }

    let description = tokens
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != amount_at)
        .map(|(_, token)| *token)
        .collect::<Vec<_>>()
        .join(" ");
    if description.is_empty() {
        return Err(QuickAddError::MissingDescription);
    }

    Ok(QuickExpense {
        amount,
        description,
    })
}
