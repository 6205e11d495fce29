//! Condition evaluation
//!
//! A property with a condition is only active while the condition holds
//! against the current values of the other properties on the same element.
//! Evaluation is side-effect free; values not yet committed can be supplied
//! as overrides keyed by property id.

use std::collections::HashMap;

use bpmn_document::{Document, NodeId, Value};

use crate::binding::get_property_value;
use crate::template::{Condition, ElementTemplate, PropertyDescriptor};

/// Not-yet-committed values keyed by property id
pub type Overrides = HashMap<String, serde_json::Value>;

const MAX_DEPTH: usize = 16;

struct Scope<'a> {
    doc: &'a Document,
    element: NodeId,
    template: &'a ElementTemplate,
    overrides: &'a Overrides,
}

/// Whether a property of `template` is active on `element`
pub fn is_active(
    doc: &Document,
    element: NodeId,
    template: &ElementTemplate,
    property: &PropertyDescriptor,
    overrides: &Overrides,
) -> bool {
    let scope = Scope {
        doc,
        element,
        template,
        overrides,
    };
    scope.property_active(property, 0)
}

/// Indices of the template's active properties, in declaration order
pub fn active_indices(
    doc: &Document,
    element: NodeId,
    template: &ElementTemplate,
    overrides: &Overrides,
) -> Vec<usize> {
    let scope = Scope {
        doc,
        element,
        template,
        overrides,
    };
    template
        .properties
        .iter()
        .enumerate()
        .filter(|(_, property)| scope.property_active(property, 0))
        .map(|(index, _)| index)
        .collect()
}

/// The template reduced to its currently active properties
pub fn apply_conditions(
    doc: &Document,
    element: NodeId,
    template: &ElementTemplate,
    overrides: &Overrides,
) -> ElementTemplate {
    template.with_properties(&active_indices(doc, element, template, overrides))
}

/// Indices of the properties that carry no condition at all
pub fn unconditional_indices(template: &ElementTemplate) -> Vec<usize> {
    template
        .properties
        .iter()
        .enumerate()
        .filter(|(_, property)| property.condition.is_none())
        .map(|(index, _)| index)
        .collect()
}

impl Scope<'_> {
    fn property_active(&self, property: &PropertyDescriptor, depth: usize) -> bool {
        match &property.condition {
            None => true,
            Some(condition) => self.holds(condition, depth),
        }
    }

    fn holds(&self, condition: &Condition, depth: usize) -> bool {
        if depth > MAX_DEPTH {
            log::warn!("Condition nesting too deep in template '{}'", self.template.id);
            return false;
        }
        match condition {
            Condition::AllMatch { all_match: items } | Condition::All(items) => {
                items.iter().all(|item| self.holds(item, depth + 1))
            }
            Condition::Equals { property, equals } => self
                .value_of(property, depth)
                .is_some_and(|actual| values_match(&actual, equals)),
            Condition::OneOf { property, one_of } => self
                .value_of(property, depth)
                .is_some_and(|actual| one_of.iter().any(|candidate| values_match(&actual, candidate))),
            Condition::IsActive { property, is_active } => match self.referenced(property) {
                Some(referenced) => self.property_active(referenced, depth + 1) == *is_active,
                None => false,
            },
        }
    }

    fn referenced(&self, id: &str) -> Option<&PropertyDescriptor> {
        let property = self.template.property_by_id(id);
        if property.is_none() {
            log::warn!(
                "Condition in template '{}' references unknown property '{}'",
                self.template.id,
                id
            );
        }
        property
    }

    /// Value of the property with the given id. An inactive property has
    /// no value.
    fn value_of(&self, id: &str, depth: usize) -> Option<serde_json::Value> {
        if let Some(value) = self.overrides.get(id) {
            return Some(value.clone());
        }
        let property = self.referenced(id)?;
        if !self.property_active(property, depth + 1) {
            return None;
        }
        get_property_value(self.doc, self.element, property).and_then(|v| v.to_json())
    }
}

/// String-exact comparison: values match when equal or when their string
/// renderings are equal.
fn values_match(actual: &serde_json::Value, expected: &serde_json::Value) -> bool {
    if actual == expected {
        return true;
    }
    match (Value::from_json(actual), Value::from_json(expected)) {
        (Some(a), Some(b)) => a.to_string() == b.to_string(),
        _ => false,
    }
}
