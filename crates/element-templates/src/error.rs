//! Error types for the element templates engine

use bpmn_document::{DocumentError, NodeId};
use thiserror::Error;

/// Result type alias using TemplateError
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Errors that can occur while looking up or applying templates
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Registry filter of an unsupported kind
    #[error("argument must be of type {{string|element|undefined}}")]
    InvalidFilter,

    /// An operation needed a template but got none
    #[error("template is missing")]
    MissingTemplate,

    /// Two templates share the same id and version
    #[error("Duplicate template: {id} (version {version})")]
    DuplicateTemplate { id: String, version: String },

    /// Template cannot be used for the requested operation
    #[error("Invalid template '{id}': {reason}")]
    InvalidTemplate { id: String, reason: String },

    /// Element is not part of the document
    #[error("Unknown element: {0}")]
    UnknownElement(String),

    /// Document mutation failed
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TemplateError {
    pub fn unknown_element(element: NodeId) -> Self {
        Self::UnknownElement(element.to_string())
    }
}
