//! Engine error taxonomy.
//!
//! Empty undo/redo are not errors: those operations report `Ok(false)`.

use retrace_core::ChangeError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// An edit's bounds are invalid against its target text. Rejected
    /// before any mutation.
    #[error(transparent)]
    MalformedChange(#[from] ChangeError),
    /// A portable record failed structural or bounds validation. The live
    /// session is left untouched.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    /// History inconsistent with the document it is paired with; possible
    /// only after installing hand-built session parts. The attempted step
    /// mutates nothing.
    #[error("corrupt history: {0}")]
    CorruptHistory(String),
}
