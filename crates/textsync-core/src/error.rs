//! Error types for operation validation.

use thiserror::Error;

/// Reasons an operation is rejected before it touches the document.
///
/// `StaleEdit` and `ForeignEdit` come from misusing [`crate::DocumentGuard::commit`],
/// not from anything a submitter sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("invalid position: {position} (document length: {len})")]
    InvalidPosition { position: i64, len: usize },

    #[error("invalid length: {length} at position {position} (document length: {len})")]
    InvalidLength { position: i64, length: i64, len: usize },

    #[error("unrecognized operation kind")]
    UnknownKind,

    #[error("staged edit is stale: staged at revision {staged}, document is at {current}")]
    StaleEdit { staged: u64, current: u64 },

    #[error("staged edit belongs to a different document")]
    ForeignEdit,
}

pub type Result<T> = std::result::Result<T, OperationError>;
