//! Element Templates - reusable configurations for process elements
//!
//! A template describes a set of properties, each bound to one location in
//! the process document (an attribute, an extension element, a message).
//! Applying a template materializes those properties on an element;
//! updating moves the element to another version while keeping user edits.
//!
//! # Architecture
//!
//! - `TemplateRegistry`: catalog of template families
//! - `binding`: reads and writes the document location behind a binding
//! - `condition`: decides which properties are currently active
//! - `engine`: applies, updates and removes templates inside a transaction
//! - `projection`: properties-panel groups and entries
//! - `ElementTemplates`: the service tying it together, one undoable
//!   command and one `TemplateEvent` per operation
//!
//! # Example
//!
//! ```ignore
//! use element_templates::{ElementTemplates, ElementTemplate};
//!
//! let mut templates = ElementTemplates::new(document);
//! templates.load_catalog(&catalog_json)?;
//! let rest = templates.get("io.example.rest", Some(2)).unwrap();
//! let task = templates.apply_template(task, Some(&rest))?;
//! ```

pub mod binding;
pub mod condition;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod marker;
pub mod projection;
pub mod registry;
pub mod replace;
pub mod service;
pub mod template;
pub mod validation;

#[cfg(test)]
mod fixtures;

pub use binding::{get_property_value, resolve, ValueHandle};
pub use condition::{active_indices, apply_conditions, is_active, Overrides};
pub use config::EngineConfig;
pub use error::{Result, TemplateError};
pub use events::{EventSink, NullEventSink, TemplateEvent, VecEventSink};
pub use marker::AppliedTemplateRef;
pub use projection::{CustomGroup, EntryKind, PropertyEntry, TemplateGroup, TemplateState};
pub use registry::{LatestOptions, TemplateFilter, TemplateRegistry};
pub use service::ElementTemplates;
pub use template::{Binding, ElementTemplate, PropertyDescriptor};
pub use validation::{validate_property, ValidationError};

// The document model consumers need alongside
pub use bpmn_document::{Document, NodeId, Value};
