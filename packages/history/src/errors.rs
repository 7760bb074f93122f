//! Error types for the operation recorder

use crate::OperationHandle;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("An undo or redo is already in progress")]
    Winding,

    #[error("Cannot undo or redo while a history group is open")]
    Grouped,

    #[error("Cannot open a history group while recording is paused")]
    Paused,

    #[error("No history group is open")]
    NotGrouped,

    #[error("Recording is not paused")]
    NotPaused,

    #[error("No undo or redo is in progress")]
    NotWinding,

    #[error("Operation not found: {0}")]
    UnknownOperation(OperationHandle),
}
