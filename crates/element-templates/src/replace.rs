//! Element type replacement
//!
//! Changing an element's business object type cannot happen in place: a new
//! node of the target type takes over every attribute of the old one, its
//! slot in the owning list and every reference pointing at it.

use bpmn_document::{model, NodeId, Transaction, Value};

use crate::binding::{remove_if_unreferenced, short_id};
use crate::error::Result;
use crate::template::ElementType;

/// Whether the element already has the type (and event definition) the
/// template asks for
pub fn matches_element_type(doc: &bpmn_document::Document, element: NodeId, target: &ElementType) -> bool {
    if doc.node_type(element) != Some(target.value.as_str()) {
        return false;
    }
    match &target.event_definition {
        None => true,
        Some(definition) => doc
            .get_list(element, "eventDefinitions")
            .first()
            .is_some_and(|first| doc.is(*first, definition)),
    }
}

/// Replace `element` with a new node of the target type, returning the new
/// node. The old node is left detached and empty.
pub fn replace_element(tx: &mut Transaction<'_>, element: NodeId, target: &ElementType) -> Result<NodeId> {
    let container = tx.parent(element).map(|(owner, key)| (owner, key.to_string()));
    let referrers: Vec<(NodeId, String)> = tx
        .referrers(element)
        .map(|(from, key)| (from, key.to_string()))
        .collect();
    let attrs: Vec<(String, Value)> = tx
        .node(element)
        .map(|node| node.attrs.clone().into_iter().collect())
        .unwrap_or_default();
    let old_definitions = tx.get_list(element, "eventDefinitions").to_vec();

    let replacement = tx.create(&target.value, Vec::new());
    for (key, value) in attrs {
        if key == "eventDefinitions" {
            continue;
        }
        tx.unset(element, &key)?;
        tx.write(replacement, &key, Some(value))?;
    }
    tx.unset(element, "eventDefinitions")?;

    let definitions = migrate_event_definitions(tx, &old_definitions, target)?;
    if !definitions.is_empty() {
        tx.write(replacement, "eventDefinitions", Some(Value::Nodes(definitions)))?;
    }

    if let Some((owner, key)) = container {
        tx.replace_in(owner, &key, element, replacement)?;
    }
    for (from, key) in referrers {
        tx.replace_in(from, &key, element, replacement)?;
    }

    log::debug!(
        "Replaced {} with {} ({})",
        element,
        replacement,
        target.value
    );
    Ok(replacement)
}

/// Event definitions of the replacement. A matching existing definition is
/// reused as-is; all others are dropped, releasing their messages.
fn migrate_event_definitions(
    tx: &mut Transaction<'_>,
    old_definitions: &[NodeId],
    target: &ElementType,
) -> Result<Vec<NodeId>> {
    let wanted = target
        .event_definition
        .as_deref()
        .filter(|_| model::is_a(&target.value, "bpmn:Event"));

    let reused = wanted.and_then(|definition| {
        old_definitions
            .iter()
            .copied()
            .find(|old| tx.is(*old, definition))
    });

    for old in old_definitions.iter().copied().filter(|old| Some(*old) != reused) {
        if let Some(message) = tx.get_ref(old, "messageRef") {
            tx.unset(old, "messageRef")?;
            remove_if_unreferenced(tx, message)?;
        }
    }

    Ok(match (wanted, reused) {
        (_, Some(reused)) => vec![reused],
        (Some(definition), None) => {
            let id = format!("{}_{}", model::local_name(definition), short_id());
            vec![tx.create(definition, vec![("id", Value::from(id))])]
        }
        (None, None) => Vec::new(),
    })
}
