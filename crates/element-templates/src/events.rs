//! Template lifecycle events
//!
//! One event is emitted per top-level operation, after its command has
//! been committed. Failed operations emit nothing.

use bpmn_document::NodeId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::marker::AppliedTemplateRef;

/// Trait for receiving template events
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered
    fn send(&self, event: TemplateEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone, thiserror::Error)]
#[error("Event error: {message}")]
pub struct EventError {
    pub message: String,
}

/// Events emitted by the element templates service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TemplateEvent {
    /// A template was applied (or, with no template, the element was detached)
    #[serde(rename = "elementTemplates.apply", rename_all = "camelCase")]
    Apply {
        element: NodeId,
        new_template: Option<AppliedTemplateRef>,
    },

    /// An element moved to another version of the same template family
    #[serde(rename = "elementTemplates.update", rename_all = "camelCase")]
    Update {
        element: NodeId,
        new_template: Option<AppliedTemplateRef>,
    },

    #[serde(rename = "elementTemplates.unlink")]
    Unlink { element: NodeId },

    #[serde(rename = "elementTemplates.remove")]
    Remove { element: NodeId },

    #[serde(rename = "elementTemplates.select")]
    Select { element: NodeId },
}

impl TemplateEvent {
    /// Element the event is about
    pub fn element(&self) -> NodeId {
        match self {
            TemplateEvent::Apply { element, .. }
            | TemplateEvent::Update { element, .. }
            | TemplateEvent::Unlink { element }
            | TemplateEvent::Remove { element }
            | TemplateEvent::Select { element } => *element,
        }
    }

    /// Event name as seen by listeners
    pub fn name(&self) -> &'static str {
        match self {
            TemplateEvent::Apply { .. } => "elementTemplates.apply",
            TemplateEvent::Update { .. } => "elementTemplates.update",
            TemplateEvent::Unlink { .. } => "elementTemplates.unlink",
            TemplateEvent::Remove { .. } => "elementTemplates.remove",
            TemplateEvent::Select { .. } => "elementTemplates.select",
        }
    }
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: TemplateEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
#[derive(Default)]
pub struct VecEventSink {
    events: Mutex<Vec<TemplateEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<TemplateEvent> {
        self.events.lock().clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: TemplateEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}
