//! Ledger Store and spending aggregation for the budgeting application.
//!
//! - [`Engine`] persists budgets and expenses (sea-orm) and checks user
//!   credentials.
//! - [`aggregate`] derives spent/remaining figures from loaded expenses.
//! - [`MoneyCents`] is the single monetary representation (integer cents).
//! - [`Month`] and [`DateRange`] scope queries to a reporting period.

pub use budgets::Budget;
pub use error::EngineError;
pub use expenses::{Expense, ExpenseNew};
pub use money::MoneyCents;
pub use ops::{Engine, EngineBuilder};
pub use period::{DateRange, Month};

pub mod aggregate;
mod budgets;
mod error;
mod expenses;
mod money;
mod ops;
mod period;
mod users;

type ResultEngine<T> = Result<T, EngineError>;
