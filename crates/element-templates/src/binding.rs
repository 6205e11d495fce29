//! Binding resolution
//!
//! Maps a property [`Binding`] onto the document location it controls. The
//! read path never mutates; the write path creates missing containers
//! (extension elements, I/O mappings, messages, ...) on demand and removes
//! them again once they run empty.

use bpmn_document::{Document, NodeId, Transaction, Value};

use crate::error::Result;
use crate::marker::TEMPLATE_ID_ATTR;
use crate::template::{Binding, PropertyDescriptor};

pub const EXTENSION_ELEMENTS: &str = "bpmn:ExtensionElements";
pub const MESSAGE: &str = "bpmn:Message";
pub const MESSAGE_EVENT_DEFINITION: &str = "bpmn:MessageEventDefinition";

pub const TASK_DEFINITION: &str = "zeebe:TaskDefinition";
pub const IO_MAPPING: &str = "zeebe:IoMapping";
pub const INPUT: &str = "zeebe:Input";
pub const OUTPUT: &str = "zeebe:Output";
pub const PROPERTIES: &str = "zeebe:Properties";
pub const PROPERTY: &str = "zeebe:Property";
pub const TASK_HEADERS: &str = "zeebe:TaskHeaders";
pub const HEADER: &str = "zeebe:Header";
pub const CALLED_ELEMENT: &str = "zeebe:CalledElement";
pub const SUBSCRIPTION: &str = "zeebe:Subscription";

/// Short random suffix for generated diagram ids
pub(crate) fn short_id() -> String {
    let simple = uuid::Uuid::new_v4().simple().to_string();
    simple[..7].to_string()
}

/// Extension of the given type under the node's `extensionElements`
pub fn find_extension(doc: &Document, owner: NodeId, ext_type: &str) -> Option<NodeId> {
    let container = doc.get_node(owner, "extensionElements")?;
    doc.get_list(container, "values")
        .iter()
        .copied()
        .find(|value| doc.is(*value, ext_type))
}

/// Entry of a keyed list, e.g. the input parameter whose `target` is `name`
fn find_entry(doc: &Document, owner: NodeId, list: &str, key_attr: &str, key: &str) -> Option<NodeId> {
    doc.get_list(owner, list)
        .iter()
        .copied()
        .find(|entry| doc.get_str(*entry, key_attr) == Some(key))
}

pub fn find_input_parameter(doc: &Document, io_mapping: NodeId, name: &str) -> Option<NodeId> {
    find_entry(doc, io_mapping, "inputParameters", "target", name)
}

pub fn find_output_parameter(doc: &Document, io_mapping: NodeId, source: &str) -> Option<NodeId> {
    find_entry(doc, io_mapping, "outputParameters", "source", source)
}

pub fn find_zeebe_property(doc: &Document, properties: NodeId, name: &str) -> Option<NodeId> {
    find_entry(doc, properties, "properties", "name", name)
}

pub fn find_task_header(doc: &Document, headers: NodeId, key: &str) -> Option<NodeId> {
    find_entry(doc, headers, "values", "key", key)
}

/// The node carrying `messageRef` for an element: the first (message) event
/// definition of an event, or the business object of a send/receive task.
pub fn find_message_host(doc: &Document, element: NodeId) -> Option<NodeId> {
    if doc.is(element, "bpmn:Event") {
        let definition = *doc.get_list(element, "eventDefinitions").first()?;
        return doc
            .is(definition, MESSAGE_EVENT_DEFINITION)
            .then_some(definition);
    }
    doc.is_any(element, &["bpmn:ReceiveTask", "bpmn:SendTask"])
        .then_some(element)
}

pub fn find_message(doc: &Document, element: NodeId) -> Option<NodeId> {
    let host = find_message_host(doc, element)?;
    doc.get_ref(host, "messageRef")
}

/// Resolve a binding against an element.
///
/// Returns `None` when the binding cannot apply to this kind of element.
pub fn resolve<'b>(doc: &Document, element: NodeId, binding: &'b Binding) -> Option<ValueHandle<'b>> {
    if !doc.contains(element) || doc.is(element, "bpmn:Definitions") {
        return None;
    }
    let applicable = match binding {
        Binding::CalledElement { .. } => doc.is(element, "bpmn:CallActivity"),
        Binding::MessageProperty { .. } | Binding::MessageSubscriptionProperty { .. } => {
            find_message_host(doc, element).is_some()
        }
        Binding::Property { .. }
        | Binding::TaskDefinitionType
        | Binding::TaskDefinition { .. }
        | Binding::Input { .. }
        | Binding::Output { .. }
        | Binding::ZeebeProperty { .. }
        | Binding::TaskHeader { .. } => true,
    };
    if !applicable {
        log::warn!("Binding {:?} does not apply to element {}", binding, element);
        return None;
    }
    Some(ValueHandle { element, binding })
}

/// Current document value of a property, if its binding applies and is set
pub fn get_property_value(doc: &Document, element: NodeId, property: &PropertyDescriptor) -> Option<Value> {
    resolve(doc, element, &property.binding)?.get(doc)
}

/// A resolved binding on one element
#[derive(Debug, Clone, Copy)]
pub struct ValueHandle<'b> {
    element: NodeId,
    binding: &'b Binding,
}

impl ValueHandle<'_> {
    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn binding(&self) -> &Binding {
        self.binding
    }

    pub fn get(&self, doc: &Document) -> Option<Value> {
        let scalar = |node: NodeId, key: &str| doc.get(node, key).filter(|v| v.is_scalar()).cloned();
        let element = self.element;
        match self.binding {
            Binding::Property { name } => scalar(element, name),
            Binding::TaskDefinitionType => {
                scalar(find_extension(doc, element, TASK_DEFINITION)?, "type")
            }
            Binding::TaskDefinition { property } => {
                scalar(find_extension(doc, element, TASK_DEFINITION)?, property)
            }
            Binding::Input { name } => {
                let io = find_extension(doc, element, IO_MAPPING)?;
                scalar(find_input_parameter(doc, io, name)?, "source")
            }
            Binding::Output { source } => {
                let io = find_extension(doc, element, IO_MAPPING)?;
                scalar(find_output_parameter(doc, io, source)?, "target")
            }
            Binding::ZeebeProperty { name } => {
                let properties = find_extension(doc, element, PROPERTIES)?;
                scalar(find_zeebe_property(doc, properties, name)?, "value")
            }
            Binding::TaskHeader { key } => {
                let headers = find_extension(doc, element, TASK_HEADERS)?;
                scalar(find_task_header(doc, headers, key)?, "value")
            }
            Binding::CalledElement { property } => {
                scalar(find_extension(doc, element, CALLED_ELEMENT)?, property)
            }
            Binding::MessageProperty { name } => scalar(find_message(doc, element)?, name),
            Binding::MessageSubscriptionProperty { name } => {
                let message = find_message(doc, element)?;
                scalar(find_extension(doc, message, SUBSCRIPTION)?, name)
            }
        }
    }

    /// Write a value, creating the containers the binding needs.
    ///
    /// `message_stamp` marks a message created on the way with the id of
    /// the template that needed it.
    pub fn set(&self, tx: &mut Transaction<'_>, value: Value, message_stamp: Option<&str>) -> Result<()> {
        let element = self.element;
        log::debug!("Setting {:?} on {} to {}", self.binding, element, value);
        match self.binding {
            Binding::Property { name } => {
                if tx.get(element, name).is_some_and(|v| !v.is_scalar()) {
                    log::warn!("Refusing to overwrite structural attribute '{}' on {}", name, element);
                    return Ok(());
                }
                tx.write(element, name, Some(value))?;
            }
            Binding::TaskDefinitionType => {
                let definition = ensure_extension(tx, element, TASK_DEFINITION)?;
                tx.write(definition, "type", Some(value))?;
            }
            Binding::TaskDefinition { property } => {
                let definition = ensure_extension(tx, element, TASK_DEFINITION)?;
                tx.write(definition, property, Some(value))?;
            }
            Binding::Input { name } => {
                let io = ensure_extension(tx, element, IO_MAPPING)?;
                let parameter = ensure_entry(tx, io, "inputParameters", INPUT, "target", name)?;
                tx.write(parameter, "source", Some(value))?;
            }
            Binding::Output { source } => {
                let io = ensure_extension(tx, element, IO_MAPPING)?;
                let parameter = ensure_entry(tx, io, "outputParameters", OUTPUT, "source", source)?;
                tx.write(parameter, "target", Some(value))?;
            }
            Binding::ZeebeProperty { name } => {
                let properties = ensure_extension(tx, element, PROPERTIES)?;
                let entry = ensure_entry(tx, properties, "properties", PROPERTY, "name", name)?;
                tx.write(entry, "value", Some(value))?;
            }
            Binding::TaskHeader { key } => {
                let headers = ensure_extension(tx, element, TASK_HEADERS)?;
                let header = ensure_entry(tx, headers, "values", HEADER, "key", key)?;
                tx.write(header, "value", Some(value))?;
            }
            Binding::CalledElement { property } => {
                let called = ensure_extension(tx, element, CALLED_ELEMENT)?;
                tx.write(called, property, Some(value))?;
            }
            Binding::MessageProperty { name } => {
                if let Some(message) = ensure_message(tx, element, message_stamp)? {
                    tx.write(message, name, Some(value))?;
                }
            }
            Binding::MessageSubscriptionProperty { name } => {
                if let Some(message) = ensure_message(tx, element, message_stamp)? {
                    let subscription = ensure_extension(tx, message, SUBSCRIPTION)?;
                    tx.write(subscription, name, Some(value))?;
                }
            }
        }
        Ok(())
    }

    /// Remove the value and every container left empty by its removal.
    ///
    /// Message attributes are cleared on the message itself; dropping the
    /// reference to the message is [`release_message`]'s job.
    pub fn clear(&self, tx: &mut Transaction<'_>) -> Result<()> {
        let element = self.element;
        log::debug!("Clearing {:?} on {}", self.binding, element);
        match self.binding {
            Binding::Property { name } => {
                if tx.get(element, name).is_some_and(Value::is_scalar) {
                    tx.unset(element, name)?;
                }
            }
            Binding::TaskDefinitionType => clear_field(tx, element, element, TASK_DEFINITION, "type")?,
            Binding::TaskDefinition { property } => {
                clear_field(tx, element, element, TASK_DEFINITION, property)?
            }
            Binding::Input { name } => {
                if let Some(io) = find_extension(tx, element, IO_MAPPING) {
                    if let Some(parameter) = find_input_parameter(tx, io, name) {
                        tx.remove_from(io, "inputParameters", parameter)?;
                    }
                    prune_io_mapping(tx, element, io)?;
                }
            }
            Binding::Output { source } => {
                if let Some(io) = find_extension(tx, element, IO_MAPPING) {
                    if let Some(parameter) = find_output_parameter(tx, io, source) {
                        tx.remove_from(io, "outputParameters", parameter)?;
                    }
                    prune_io_mapping(tx, element, io)?;
                }
            }
            Binding::ZeebeProperty { name } => {
                if let Some(properties) = find_extension(tx, element, PROPERTIES) {
                    if let Some(entry) = find_zeebe_property(tx, properties, name) {
                        tx.remove_from(properties, "properties", entry)?;
                    }
                    prune_list_extension(tx, element, properties, "properties")?;
                }
            }
            Binding::TaskHeader { key } => {
                if let Some(headers) = find_extension(tx, element, TASK_HEADERS) {
                    if let Some(header) = find_task_header(tx, headers, key) {
                        tx.remove_from(headers, "values", header)?;
                    }
                    prune_list_extension(tx, element, headers, "values")?;
                }
            }
            Binding::CalledElement { property } => {
                clear_field(tx, element, element, CALLED_ELEMENT, property)?
            }
            Binding::MessageProperty { name } => {
                if let Some(message) = find_message(tx, element) {
                    tx.unset(message, name)?;
                }
            }
            Binding::MessageSubscriptionProperty { name } => {
                if let Some(message) = find_message(tx, element) {
                    clear_field(tx, element, message, SUBSCRIPTION, name)?;
                }
            }
        }
        Ok(())
    }
}

/// Drop the element's reference to its message; the message itself is
/// removed from the document once nothing references it any more.
pub fn release_message(tx: &mut Transaction<'_>, element: NodeId) -> Result<()> {
    let Some(host) = find_message_host(tx, element) else {
        return Ok(());
    };
    let Some(message) = tx.get_ref(host, "messageRef") else {
        return Ok(());
    };
    tx.unset(host, "messageRef")?;
    remove_if_unreferenced(tx, message)
}

/// Remove a message from its container when its last reference is gone
pub(crate) fn remove_if_unreferenced(tx: &mut Transaction<'_>, message: NodeId) -> Result<()> {
    if tx.reference_count(message) > 0 {
        log::debug!(
            "Message {} still referenced {} time(s), keeping it",
            message,
            tx.reference_count(message)
        );
        return Ok(());
    }
    let owner = tx.parent(message).map(|(owner, key)| (owner, key.to_string()));
    if let Some((owner, key)) = owner {
        tx.remove_from(owner, &key, message)?;
        log::debug!("Removed unreferenced message {}", message);
    }
    Ok(())
}

fn ensure_extension_elements(tx: &mut Transaction<'_>, owner: NodeId) -> Result<NodeId> {
    if let Some(container) = tx.get_node(owner, "extensionElements") {
        return Ok(container);
    }
    let container = tx.create(EXTENSION_ELEMENTS, vec![("values", Value::Nodes(Vec::new()))]);
    tx.write(owner, "extensionElements", Some(Value::Node(container)))?;
    Ok(container)
}

fn ensure_extension(tx: &mut Transaction<'_>, owner: NodeId, ext_type: &str) -> Result<NodeId> {
    if let Some(extension) = find_extension(tx, owner, ext_type) {
        return Ok(extension);
    }
    let container = ensure_extension_elements(tx, owner)?;
    let extension = tx.create(ext_type, Vec::new());
    tx.push(container, "values", extension)?;
    log::debug!("Created {} on {}", ext_type, owner);
    Ok(extension)
}

fn ensure_entry(
    tx: &mut Transaction<'_>,
    owner: NodeId,
    list: &str,
    entry_type: &str,
    key_attr: &str,
    key: &str,
) -> Result<NodeId> {
    if let Some(entry) = find_entry(tx, owner, list, key_attr, key) {
        return Ok(entry);
    }
    let entry = tx.create(entry_type, vec![(key_attr, Value::from(key))]);
    tx.push(owner, list, entry)?;
    Ok(entry)
}

fn ensure_message(tx: &mut Transaction<'_>, element: NodeId, stamp: Option<&str>) -> Result<Option<NodeId>> {
    let Some(host) = find_message_host(tx, element) else {
        return Ok(None);
    };
    if let Some(message) = tx.get_ref(host, "messageRef") {
        return Ok(Some(message));
    }
    let mut attrs = vec![("id", Value::from(format!("Message_{}", short_id())))];
    if let Some(template_id) = stamp {
        attrs.push((TEMPLATE_ID_ATTR, Value::from(template_id)));
    }
    let message = tx.create(MESSAGE, attrs);
    let definitions = tx.definitions();
    tx.push(definitions, "rootElements", message)?;
    tx.write(host, "messageRef", Some(Value::Ref(message)))?;
    log::debug!("Created message {} for {}", message, element);
    Ok(Some(message))
}

fn remove_extension(tx: &mut Transaction<'_>, owner: NodeId, extension: NodeId) -> Result<()> {
    let Some(container) = tx.get_node(owner, "extensionElements") else {
        return Ok(());
    };
    tx.remove_from(container, "values", extension)?;
    if tx.get_list(container, "values").is_empty() {
        tx.unset(owner, "extensionElements")?;
    }
    log::debug!("Removed empty extension {} from {}", extension, owner);
    Ok(())
}

fn is_blank(doc: &Document, node: NodeId) -> bool {
    doc.node(node).map(|n| n.attrs.is_empty()).unwrap_or(true)
}

/// Unset a field of a single-valued extension, dropping the extension when
/// nothing is left on it
fn clear_field(
    tx: &mut Transaction<'_>,
    element: NodeId,
    owner: NodeId,
    ext_type: &str,
    field: &str,
) -> Result<()> {
    let Some(extension) = find_extension(tx, owner, ext_type) else {
        return Ok(());
    };
    tx.unset(extension, field)?;
    if is_blank(tx, extension) {
        log::trace!("{} on {} ran empty", ext_type, element);
        remove_extension(tx, owner, extension)?;
    }
    Ok(())
}

fn prune_list_extension(tx: &mut Transaction<'_>, owner: NodeId, extension: NodeId, list: &str) -> Result<()> {
    if tx.get_list(extension, list).is_empty() {
        tx.unset(extension, list)?;
    }
    if is_blank(tx, extension) {
        remove_extension(tx, owner, extension)?;
    }
    Ok(())
}

fn prune_io_mapping(tx: &mut Transaction<'_>, owner: NodeId, io: NodeId) -> Result<()> {
    for list in ["inputParameters", "outputParameters"] {
        if tx.get(io, list).is_some() && tx.get_list(io, list).is_empty() {
            tx.unset(io, list)?;
        }
    }
    if is_blank(tx, io) {
        remove_extension(tx, owner, io)?;
    }
    Ok(())
}
