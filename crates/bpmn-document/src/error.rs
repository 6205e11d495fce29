//! Error types for the process document

use thiserror::Error;

use crate::types::NodeId;

/// Result type alias using DocumentError
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Errors that can occur while reading or mutating a document
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Node is not part of the document arena
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Attribute holds something other than a list
    #[error("Attribute '{key}' on node {node} is not a list")]
    NotAList { node: NodeId, key: String },

    /// Import payload could not be mapped onto the document model
    #[error("Invalid document: {0}")]
    InvalidImport(String),

    /// A `$ref` in an imported document points nowhere
    #[error("Unresolved reference: {0}")]
    UnresolvedRef(String),

    /// A command was aborted by its body
    #[error("Command aborted: {0}")]
    Aborted(String),
}
