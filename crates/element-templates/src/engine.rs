//! Template application
//!
//! Everything here runs inside an open [`Transaction`]; the caller decides
//! which command the changes belong to. The central step is
//! [`change_template`], which moves an element from one (condition
//! filtered) template to another:
//!
//! 1. replace the element if the new template asks for another type
//! 2. write the applied-template marker and icon
//! 3. materialize each new property, keeping or overwriting the current
//!    value (see [`decide`])
//! 4. clear bindings only the old template had, then release the message
//!    if no message binding is left

use std::collections::HashSet;

use bpmn_document::{model, NodeId, Transaction, Value};

use crate::binding::{release_message, resolve, short_id};
use crate::condition::{active_indices, unconditional_indices, Overrides};
use crate::config::EngineConfig;
use crate::error::{Result, TemplateError};
use crate::marker::{write_icon, write_marker, AppliedTemplateRef};
use crate::replace::{matches_element_type, replace_element};
use crate::template::{Binding, BindingKey, ElementTemplate, PropertyDescriptor};

/// What to do with one property's document value
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Keep,
    Write(Value),
}

/// Keep-or-overwrite precedence for a property present in the new template.
///
/// In order:
/// - nothing set yet: materialize the new default
/// - generated values are never regenerated
/// - without a declared default there is nothing to overwrite with
/// - hidden or read-only properties always take the new default
/// - a dropdown value that is no longer a choice takes the new default
/// - a value equal to the old template's default counts as unset
/// - anything else is a user edit and is kept
pub fn decide(current: Option<&Value>, old: Option<&PropertyDescriptor>, new: &PropertyDescriptor) -> Decision {
    let Some(current) = current else {
        return match new.default_value() {
            Some(value) => Decision::Write(value),
            None => Decision::Keep,
        };
    };
    if new.is_generated() {
        return Decision::Keep;
    }
    let Some(default) = new.declared_value() else {
        return Decision::Keep;
    };
    if new.is_hidden() || !new.editable {
        return Decision::Write(default);
    }
    if new.is_dropdown() && !new.allows(current) {
        return Decision::Write(default);
    }
    let old_default = old.and_then(PropertyDescriptor::declared_value);
    if old_default.as_ref() == Some(current) {
        return Decision::Write(default);
    }
    Decision::Keep
}

/// Apply `new` to an element currently governed by `old`, honouring the
/// conditions of both. Returns the (possibly replaced) element.
pub fn apply_template(
    tx: &mut Transaction<'_>,
    element: NodeId,
    new: Option<&ElementTemplate>,
    old: Option<&ElementTemplate>,
    config: &EngineConfig,
) -> Result<NodeId> {
    let overrides = Overrides::new();
    let old_active = match old {
        Some(old) => Some(old.with_properties(&active_indices(tx, element, old, &overrides))),
        None => None,
    };

    let Some(new) = new else {
        return change_template(tx, element, None, old_active.as_ref(), config);
    };

    log::info!(
        "Applying template '{}' (version {:?}) to {}",
        new.id,
        new.version,
        element
    );
    let active = active_indices(tx, element, new, &overrides);
    let element = change_template(
        tx,
        element,
        Some(&new.with_properties(&active)),
        old_active.as_ref(),
        config,
    )?;
    reapply_conditions(tx, element, new, active, config)
}

/// Re-evaluate the template's conditions until the active set settles,
/// moving the element between the filtered templates on every change.
pub fn reapply_conditions(
    tx: &mut Transaction<'_>,
    mut element: NodeId,
    template: &ElementTemplate,
    mut active: Vec<usize>,
    config: &EngineConfig,
) -> Result<NodeId> {
    let overrides = Overrides::new();
    for _ in 0..config.max_condition_passes {
        let next = active_indices(tx, element, template, &overrides);
        if next == active {
            return Ok(element);
        }
        log::debug!(
            "Active properties of '{}' on {} changed: {:?} -> {:?}",
            template.id,
            element,
            active,
            next
        );
        element = change_template(
            tx,
            element,
            Some(&template.with_properties(&next)),
            Some(&template.with_properties(&active)),
            config,
        )?;
        active = next;
    }
    log::warn!(
        "Conditions of template '{}' did not settle after {} passes",
        template.id,
        config.max_condition_passes
    );
    Ok(element)
}

/// Move an element from `old` to `new`; with no `new` template only the
/// marker and icon are cleared.
pub fn change_template(
    tx: &mut Transaction<'_>,
    element: NodeId,
    new: Option<&ElementTemplate>,
    old: Option<&ElementTemplate>,
    config: &EngineConfig,
) -> Result<NodeId> {
    let Some(new) = new else {
        write_marker(tx, element, None)?;
        write_icon(tx, element, None)?;
        return Ok(element);
    };

    let element = update_element_type(tx, element, new, old)?;
    write_marker(tx, element, Some(&AppliedTemplateRef::of(new)))?;
    write_icon(tx, element, Some(new))?;
    update_bindings(tx, element, new, old, config)?;
    Ok(element)
}

fn update_element_type(
    tx: &mut Transaction<'_>,
    element: NodeId,
    new: &ElementTemplate,
    old: Option<&ElementTemplate>,
) -> Result<NodeId> {
    let Some(target) = &new.element_type else {
        return Ok(element);
    };
    if old.is_some_and(|old| old.element_type.as_ref() == Some(target)) {
        return Ok(element);
    }
    if matches_element_type(tx, element, target) {
        return Ok(element);
    }
    replace_element(tx, element, target)
}

fn update_bindings(
    tx: &mut Transaction<'_>,
    element: NodeId,
    new: &ElementTemplate,
    old: Option<&ElementTemplate>,
    config: &EngineConfig,
) -> Result<()> {
    let stamp = config.stamp_messages.then_some(new.id.as_str());

    for property in &new.properties {
        let key = property.binding.key();
        let Some(handle) = resolve(tx, element, &property.binding) else {
            continue;
        };
        let current = handle.get(tx);
        let old_property = old.and_then(|old| old.property_by_key(&key));
        match decide(current.as_ref(), old_property, property) {
            Decision::Keep => log::trace!("Keeping {:?} on {}", key, element),
            Decision::Write(value) => handle.set(tx, value, stamp)?,
        }
    }

    let Some(old) = old else {
        return Ok(());
    };
    let new_keys: HashSet<BindingKey> = new.properties.iter().map(|p| p.binding.key()).collect();
    let keeps_message = new.has_message_bindings();

    for property in &old.properties {
        if new_keys.contains(&property.binding.key()) {
            continue;
        }
        if property.binding.is_message() && !keeps_message {
            continue;
        }
        if let Some(handle) = resolve(tx, element, &property.binding) {
            handle.clear(tx)?;
        }
    }
    if old.has_message_bindings() && !keeps_message {
        release_message(tx, element)?;
    }
    Ok(())
}

/// Build a new, detached element from a template.
///
/// Only unconditional properties are materialized.
pub fn create_element(tx: &mut Transaction<'_>, template: &ElementTemplate, config: &EngineConfig) -> Result<NodeId> {
    let node_type = template
        .element_type
        .as_ref()
        .map(|t| t.value.clone())
        .or_else(|| template.applies_to.first().cloned())
        .ok_or_else(|| TemplateError::InvalidTemplate {
            id: template.id.clone(),
            reason: "neither elementType nor appliesTo is set".into(),
        })?;

    let id = format!("{}_{}", model::local_name(&node_type), short_id());
    let element = tx.create(&node_type, vec![("id", Value::from(id))]);

    let definition = template
        .element_type
        .as_ref()
        .and_then(|t| t.event_definition.as_deref())
        .filter(|_| model::is_a(&node_type, "bpmn:Event"));
    if let Some(definition) = definition {
        let id = format!("{}_{}", model::local_name(definition), short_id());
        let node = tx.create(definition, vec![("id", Value::from(id))]);
        tx.push(element, "eventDefinitions", node)?;
    }

    let unconditional = template.with_properties(&unconditional_indices(template));
    write_marker(tx, element, Some(&AppliedTemplateRef::of(template)))?;
    write_icon(tx, element, Some(template))?;
    update_bindings(tx, element, &unconditional, None, config)?;

    log::info!("Created {} from template '{}'", element, template.id);
    Ok(element)
}

/// Attribute holding an element's user-facing label
fn label_attribute(tx: &Transaction<'_>, element: NodeId) -> &'static str {
    if tx.is(element, "bpmn:TextAnnotation") {
        "text"
    } else {
        "name"
    }
}

/// Strip template-controlled data and the marker from an element.
///
/// With a known template every one of its bindings is cleared except the
/// label. Without one, nothing tells template data from user data, so the
/// whole `extensionElements` container goes.
pub fn remove_template(tx: &mut Transaction<'_>, element: NodeId, template: Option<&ElementTemplate>) -> Result<NodeId> {
    match template {
        Some(template) => {
            let label = label_attribute(tx, element);
            for property in &template.properties {
                if matches!(&property.binding, Binding::Property { name } if name == label) {
                    continue;
                }
                if property.binding.is_message() {
                    continue;
                }
                if let Some(handle) = resolve(tx, element, &property.binding) {
                    handle.clear(tx)?;
                }
            }
            if template.has_message_bindings() {
                release_message(tx, element)?;
            }
        }
        None => {
            log::warn!("Removing unknown template from {}, dropping all extension elements", element);
            tx.unset(element, "extensionElements")?;
        }
    }
    write_marker(tx, element, None)?;
    write_icon(tx, element, None)?;
    Ok(element)
}
