//! Error types for the editor

use crate::id::ItemId;
use crate::policy::DocumentKind;
use crate::runtime::{InstanceError, InstanceId};
use crate::value::ValueKind;
use atelier_history::HistoryError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    #[error("Unknown property: {0}")]
    Unknown(String),

    #[error("Property '{0}' is read-only")]
    ReadOnly(String),

    #[error("Property '{property}' expects {expected}, got {found}")]
    KindMismatch {
        property: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error(transparent)]
    Instance(#[from] InstanceError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("Invalid type: {0}")]
    InvalidType(String),

    #[error("Item not found: {0}")]
    NotFound(ItemId),

    #[error("Parent not found: {0}")]
    ParentNotFound(ItemId),

    #[error("Duplicate item id: {0}")]
    DuplicateId(ItemId),

    #[error("Cycle detected: cannot move {item} under {parent}")]
    CycleDetected { item: ItemId, parent: ItemId },

    #[error("Root violation: {0}")]
    RootViolation(String),

    #[error("Instance {0} is already bound")]
    InstanceAlreadyBound(InstanceId),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Property error: {0}")]
    Property(#[from] PropertyError),

    #[error("Instance error: {0}")]
    Instance(#[from] InstanceError),
}

#[derive(Error, Debug)]
pub enum SaveDocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum LoadDocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Expected a {expected} document, found {found}")]
    KindMismatch { expected: DocumentKind, found: DocumentKind },

    #[error("Unsupported document format version: {0}")]
    UnsupportedVersion(u32),

    #[error("Invalid document: {0}")]
    Invalid(String),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Type name must not be empty")]
    EmptyTypeName,

    #[error("Type already registered: {0}")]
    DuplicateType(String),

    #[error("Type name is reserved: {0}")]
    ReservedType(String),

    #[error("Type '{type_name}' declares reserved property '{property}'")]
    ReservedProperty { type_name: String, property: String },

    #[error("Type '{type_name}' declares property '{property}' twice")]
    DuplicateProperty { type_name: String, property: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Save failed: {0}")]
    Save(#[from] SaveDocumentError),

    #[error("Load failed: {0}")]
    Load(#[from] LoadDocumentError),
}

pub type DocumentResult<T> = Result<T, DocumentError>;
pub type EditorResult<T> = Result<T, EditorError>;
