//! Process document model
//!
//! A typed tree of BPMN business objects and their extension elements,
//! stored in an arena with containment and reverse-reference indices.
//!
//! # Core Concepts
//!
//! - **Document**: the arena, rooted at a `bpmn:Definitions` node
//! - **Transaction**: a recorded mutation scope over a document
//! - **CommandStack**: committed transactions with undo/redo

pub mod command;
pub mod document;
pub mod error;
pub mod model;
pub mod types;

pub use command::{Change, Command, CommandStack, Transaction, DEFAULT_MAX_COMMANDS};
pub use document::Document;
pub use error::{DocumentError, Result};
pub use types::{NodeData, NodeId, Value};
