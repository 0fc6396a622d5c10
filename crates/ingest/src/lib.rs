//! Expense ingestion for the budgeting application.
//!
//! - [`ExpenseParser`] asks a [`LanguageModel`] to turn free text or a
//!   receipt image into transactions and validates the reply against the
//!   user's budget catalog.
//! - [`ReceiptUploader`] validates receipt images and stores them in a
//!   [`BlobStore`].
//! - [`Ingestor`] runs a submission end to end against a [`Session`].

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ErrorKind, IngestError};
pub use llm::{CompletionRequest, LanguageModel, LlmError, OpenAiClient, UserContent};
pub use orchestrator::{Ingestor, OutcomeLine, RawInput, SubmissionOutcome};
pub use parser::{CatalogEntry, ExpenseParser, ParseError, ParsedTransaction, ParserInput};
pub use quick_add::{QuickAddError, QuickExpense, parse_quick_expense};
pub use session::{Phase, Session};
pub use storage::{BlobError, BlobStore, HttpBlobStore};
pub use uploader::{MAX_RECEIPT_BYTES, ReceiptUploader, StoredReceipt, UploadError};

mod clock;
mod error;
pub mod llm;
mod orchestrator;
pub mod parser;
mod quick_add;
mod session;
pub mod storage;
pub mod uploader;
