//! Applied-template marker.
//!
//! Which template an element uses is persisted as two attributes on its
//! business object. Both are read and written together through
//! [`AppliedTemplateRef`], never individually.

use bpmn_document::{Document, NodeId, Transaction, Value};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::template::ElementTemplate;

/// Attribute holding the applied template id
pub const TEMPLATE_ID_ATTR: &str = "zeebe:modelerTemplate";
/// Attribute holding the applied template version
pub const TEMPLATE_VERSION_ATTR: &str = "zeebe:modelerTemplateVersion";
/// Attribute holding the applied template icon
pub const TEMPLATE_ICON_ATTR: &str = "zeebe:modelerTemplateIcon";

/// Identity of the template applied to an element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppliedTemplateRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl AppliedTemplateRef {
    pub fn new(id: impl Into<String>, version: Option<u32>) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }

    pub fn of(template: &ElementTemplate) -> Self {
        Self::new(template.id.clone(), template.version)
    }

    /// Read the marker of an element. A version without an id is ignored.
    pub fn read(doc: &Document, element: NodeId) -> Option<Self> {
        let id = doc.get_str(element, TEMPLATE_ID_ATTR)?;
        let version = doc
            .get(element, TEMPLATE_VERSION_ATTR)
            .and_then(|value| match value {
                Value::Integer(v) => u32::try_from(*v).ok(),
                Value::String(s) => s.parse().ok(),
                _ => None,
            });
        Some(Self::new(id, version))
    }
}

/// Write (or clear, on `None`) the marker of an element
pub fn write_marker(
    tx: &mut Transaction<'_>,
    element: NodeId,
    applied: Option<&AppliedTemplateRef>,
) -> Result<()> {
    let id = applied.map(|a| Value::from(a.id.as_str()));
    let version = applied
        .and_then(|a| a.version)
        .map(|v| Value::Integer(i64::from(v)));
    tx.write(element, TEMPLATE_ID_ATTR, id)?;
    tx.write(element, TEMPLATE_VERSION_ATTR, version)?;
    Ok(())
}

/// Write (or clear) the template icon of an element
pub fn write_icon(tx: &mut Transaction<'_>, element: NodeId, template: Option<&ElementTemplate>) -> Result<()> {
    let icon = template
        .and_then(|t| t.icon.as_ref())
        .map(|icon| Value::from(icon.contents.as_str()));
    tx.write(element, TEMPLATE_ICON_ATTR, icon)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpmn_document::CommandStack;
    use serde_json::json;

    fn doc_with_task() -> (Document, NodeId) {
        let doc = Document::from_json(&json!({
            "$type": "bpmn:Definitions",
            "rootElements": [{
                "$type": "bpmn:Process",
                "flowElements": [{
                    "$type": "bpmn:Task",
                    "id": "Task_1",
                    "zeebe:modelerTemplate": "foo",
                    "zeebe:modelerTemplateVersion": 3
                }]
            }]
        }))
        .unwrap();
        let task = doc.element("Task_1").unwrap();
        (doc, task)
    }

    #[test]
    fn test_read_marker() {
        let (doc, task) = doc_with_task();
        assert_eq!(
            AppliedTemplateRef::read(&doc, task),
            Some(AppliedTemplateRef::new("foo", Some(3)))
        );
    }

    #[test]
    fn test_write_and_clear_marker_together() {
        let (mut doc, task) = doc_with_task();
        let mut stack = CommandStack::default();

        stack
            .execute(&mut doc, "marker", |tx| {
                write_marker(tx, task, Some(&AppliedTemplateRef::new("bar", None)))
            })
            .unwrap();
        assert_eq!(doc.get_str(task, TEMPLATE_ID_ATTR), Some("bar"));
        assert!(doc.get(task, TEMPLATE_VERSION_ATTR).is_none());

        stack
            .execute(&mut doc, "clear", |tx| write_marker(tx, task, None))
            .unwrap();
        assert_eq!(AppliedTemplateRef::read(&doc, task), None);
        assert!(doc.get(task, TEMPLATE_VERSION_ATTR).is_none());
    }
}
