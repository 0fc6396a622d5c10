//! Failure taxonomy of the ingestion pipeline.
//!
//! Every stage has its own error enum ([`ParseError`], [`UploadError`],
//! [`EngineError`], [`QuickAddError`]); [`IngestError`] wraps them and
//! [`IngestError::kind`] flattens them into the [`ErrorKind`] callers branch
//! on (the HTTP layer maps kinds to status codes).

use std::fmt;

use engine::EngineError;
use serde::Serialize;
use thiserror::Error;

use crate::{parser::ParseError, quick_add::QuickAddError, uploader::UploadError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad user input or an invalid model transaction.
    Validation,
    /// Missing credentials or an empty budget catalog.
    Configuration,
    /// Nothing usable to parse.
    Input,
    /// The language model or the blob store failed.
    Upstream,
    /// The model reply was not the expected JSON shape.
    Format,
    /// The model attributed spend to an unknown budget.
    Attribution,
    /// The ledger store could not be reached.
    Transport,
    /// A write referenced a row that no longer exists.
    Constraint,
    NotFound,
    Unauthorized,
    /// Another submission is still in flight for this session.
    Busy,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Configuration => "configuration",
            Self::Input => "input",
            Self::Upstream => "upstream",
            Self::Format => "format",
            Self::Attribution => "attribution",
            Self::Transport => "transport",
            Self::Constraint => "constraint",
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::Busy => "busy",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("receipt upload failed: {0}")]
    Upload(#[from] UploadError),
    #[error(transparent)]
    QuickAdd(#[from] QuickAddError),
    /// Ledger failure outside of a submission (budget management, refresh).
    #[error(transparent)]
    Store(#[from] EngineError),
    /// The expense rows could not be written.
    #[error("could not save the expense: {0}")]
    Persist(#[source] EngineError),
    #[error("a submission is already in progress")]
    Busy,
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(err) => match err {
                ParseError::Configuration(_) => ErrorKind::Configuration,
                ParseError::Input(_) => ErrorKind::Input,
                ParseError::Upstream(_) => ErrorKind::Upstream,
                ParseError::Format(_) => ErrorKind::Format,
                ParseError::Validation { .. } => ErrorKind::Validation,
                ParseError::Attribution { .. } => ErrorKind::Attribution,
            },
            Self::Upload(err) => match err {
                UploadError::UnsupportedType(_) | UploadError::TooLarge { .. } => {
                    ErrorKind::Validation
                }
                UploadError::Upstream(_) | UploadError::MissingUrl => ErrorKind::Upstream,
            },
            Self::QuickAdd(_) => ErrorKind::Validation,
            Self::Store(err) | Self::Persist(err) => engine_kind(err),
            Self::Busy => ErrorKind::Busy,
        }
    }
}

fn engine_kind(err: &EngineError) -> ErrorKind {
    match err {
        EngineError::InvalidAmount(_) | EngineError::InvalidName(_) | EngineError::InvalidDate(_) => {
            ErrorKind::Validation
        }
        EngineError::KeyNotFound(_) => ErrorKind::NotFound,
        EngineError::ExistingKey(_) | EngineError::Constraint(_) => ErrorKind::Constraint,
        EngineError::Unauthorized(_) => ErrorKind::Unauthorized,
        EngineError::Database(_) => ErrorKind::Transport,
    }
}
