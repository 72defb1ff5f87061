//! Error types for the retrieval core.
//!
//! Out-of-vocabulary terms and empty corpora are not errors: they evaluate to
//! empty sets or zero weights. Only malformed queries and persistence failures
//! surface here.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::boolean::Operator;

#[derive(Error, Debug)]
pub enum Error {
    /// A boolean query that cannot be compiled or evaluated.
    #[error("malformed query: {0}")]
    MalformedQuery(#[from] MalformedQuery),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A line of a text listing that does not follow its format.
    #[error("invalid listing {path}:{line}: {reason}")]
    Listing {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("snapshot encoding error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a boolean query is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedQuery {
    #[error("query is empty")]
    Empty,

    #[error("closing bracket without a matching opening bracket")]
    UnmatchedClose,

    #[error("opening bracket is never closed")]
    UnclosedOpen,

    #[error("operator {0} is missing an operand")]
    MissingOperand(Operator),

    #[error("operands are not joined by an operator")]
    MissingOperator,
}

impl Error {
    pub fn listing<P: Into<PathBuf>, S: Into<String>>(path: P, line: usize, reason: S) -> Self {
        Error::Listing {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    pub fn is_malformed_query(&self) -> bool {
        matches!(self, Error::MalformedQuery(_))
    }
}
