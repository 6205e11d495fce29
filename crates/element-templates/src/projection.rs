//! Properties-panel projection
//!
//! Turns an element and its template into the groups and entries a
//! properties panel renders. Everything here is a pure function of the
//! document state (plus in-flight overrides), so recomputing with unchanged
//! inputs yields an identical result.

use bpmn_document::{Document, NodeId};
use serde::Serialize;

use crate::binding::get_property_value;
use crate::condition::{active_indices, Overrides};
use crate::marker::AppliedTemplateRef;
use crate::registry::{LatestOptions, TemplateFilter, TemplateRegistry};
use crate::template::{Choice, Deprecation, ElementTemplate, Feel, PropertyDescriptor, PropertyType};
use crate::validation::validate_property;

pub const TEMPLATE_GROUP_ID: &str = "ElementTemplates__Template";
pub const CUSTOM_PROPERTIES_GROUP_ID: &str = "ElementTemplates__CustomProperties";
pub const CUSTOM_PROPERTIES_LABEL: &str = "Custom properties";

/// Widget used to edit a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryKind {
    TextField,
    TextArea,
    Checkbox,
    Select,
    NumberField,
}

impl EntryKind {
    /// Entry kind for a property type; hidden and unknown properties get none
    pub fn for_property(property: &PropertyDescriptor) -> Option<Self> {
        match property.property_type {
            None | Some(PropertyType::String) => Some(Self::TextField),
            Some(PropertyType::Text) => Some(Self::TextArea),
            Some(PropertyType::Boolean) => Some(Self::Checkbox),
            Some(PropertyType::Dropdown) => Some(Self::Select),
            Some(PropertyType::Number) => Some(Self::NumberField),
            Some(PropertyType::Hidden) | Some(PropertyType::Unknown) => None,
        }
    }
}

/// One editable template property
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyEntry {
    /// Stable across recomputation: template id, group id and property index
    pub id: String,
    pub kind: EntryKind,
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    pub disabled: bool,
    pub optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feel: Option<Feel>,
    /// Index of the property in the full template
    pub property_index: usize,
    pub value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    /// Message of the first violated constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
}

/// A group of custom property entries
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomGroup {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    pub open_by_default: bool,
    pub entries: Vec<PropertyEntry>,
}

/// The "Template" group of an element
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateGroup {
    pub id: &'static str,
    pub label: String,
    pub state: TemplateState,
}

/// Summary of a template offered for selection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateOption {
    pub id: String,
    pub version: Option<u32>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum TemplateState {
    /// No template applied; these could be
    Select { available: Vec<TemplateOption> },
    /// The applied template is not in the catalog
    Unknown { applied: AppliedTemplateRef },
    Deprecated {
        name: String,
        version: Option<u32>,
        deprecation: Deprecation,
    },
    UpdateAvailable {
        name: String,
        version: Option<u32>,
        latest: u32,
    },
    UpToDate { name: String, version: Option<u32> },
}

/// Describe the element's template status, or `None` when no template is
/// applied and none applies.
pub fn template_group(doc: &Document, registry: &TemplateRegistry, element: NodeId) -> Option<TemplateGroup> {
    let state = match AppliedTemplateRef::read(doc, element) {
        None => {
            let available: Vec<TemplateOption> = registry
                .get_latest(doc, TemplateFilter::Element(element), LatestOptions::default())
                .iter()
                .map(|t| TemplateOption {
                    id: t.id.clone(),
                    version: t.version,
                    name: t.name.clone(),
                    description: t.description.clone(),
                })
                .collect();
            if available.is_empty() {
                return None;
            }
            TemplateState::Select { available }
        }
        Some(applied) => match registry.get_ref(&applied) {
            None => TemplateState::Unknown { applied },
            Some(template) => applied_state(registry, &template),
        },
    };
    Some(TemplateGroup {
        id: TEMPLATE_GROUP_ID,
        label: "Template".into(),
        state,
    })
}

fn applied_state(registry: &TemplateRegistry, template: &ElementTemplate) -> TemplateState {
    let name = template.name.clone();
    let version = template.version;
    if let Some(deprecation) = template.deprecation() {
        return TemplateState::Deprecated {
            name,
            version,
            deprecation,
        };
    }
    let newer = registry
        .latest_of(&template.id)
        .and_then(|latest| latest.version)
        .filter(|latest| version.is_some_and(|current| *latest > current));
    match newer {
        Some(latest) => TemplateState::UpdateAvailable {
            name,
            version,
            latest,
        },
        None => TemplateState::UpToDate { name, version },
    }
}

fn custom_group_id(group: &str) -> String {
    format!("{}-{}", CUSTOM_PROPERTIES_GROUP_ID, group)
}

fn entry_id(template: &ElementTemplate, group: Option<&str>, index: usize) -> String {
    match group {
        Some(group) => format!("custom-entry-{}-{}-{}", template.id, group, index),
        None => format!("custom-entry-{}-{}", template.id, index),
    }
}

fn render(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Entries of the template's active, visible properties grouped for display.
///
/// Properties without a group, or naming a group the template does not
/// declare, land in the default group, which comes first. Groups without
/// entries are dropped.
pub fn custom_groups(
    doc: &Document,
    element: NodeId,
    template: &ElementTemplate,
    overrides: &Overrides,
) -> Vec<CustomGroup> {
    let mut default_group = CustomGroup {
        id: CUSTOM_PROPERTIES_GROUP_ID.into(),
        label: CUSTOM_PROPERTIES_LABEL.into(),
        tooltip: None,
        open_by_default: false,
        entries: Vec::new(),
    };
    let mut groups: Vec<CustomGroup> = template
        .groups
        .iter()
        .map(|group| CustomGroup {
            id: custom_group_id(&group.id),
            label: group.label.clone(),
            tooltip: group.tooltip.clone(),
            open_by_default: group.open_by_default,
            entries: Vec::new(),
        })
        .collect();

    for index in active_indices(doc, element, template, overrides) {
        let property = &template.properties[index];
        let Some(kind) = EntryKind::for_property(property) else {
            continue;
        };
        let group = property
            .group
            .as_deref()
            .and_then(|id| template.groups.iter().position(|g| g.id == id));
        let group_id = group.map(|position| template.groups[position].id.as_str());

        let value = property
            .id
            .as_ref()
            .and_then(|id| overrides.get(id).cloned())
            .or_else(|| get_property_value(doc, element, property).and_then(|v| v.to_json()));
        let rendered = value.as_ref().map(render);

        let entry = PropertyEntry {
            id: entry_id(template, group_id, index),
            kind,
            label: property.label.clone(),
            description: property.description.clone(),
            tooltip: property.tooltip.clone(),
            disabled: !property.editable,
            optional: property.optional,
            feel: property.feel.clone(),
            property_index: index,
            value,
            choices: property.choices.clone(),
            validation: validate_property(rendered.as_deref(), property).map(|e| e.to_string()),
        };
        match group {
            Some(position) => groups[position].entries.push(entry),
            None => default_group.entries.push(entry),
        }
    }

    std::iter::once(default_group)
        .chain(groups)
        .filter(|group| !group.entries.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use serde_json::json;

    fn registry() -> TemplateRegistry {
        let mut registry = TemplateRegistry::new();
        registry.set(fixtures::simple_templates()).unwrap();
        registry
    }

    fn entry_ids(groups: &[CustomGroup]) -> Vec<(String, Vec<String>)> {
        groups
            .iter()
            .map(|g| (g.id.clone(), g.entries.iter().map(|e| e.id.clone()).collect()))
            .collect()
    }

    #[test]
    fn test_groups_and_entry_ids() {
        let doc = fixtures::diagram();
        let task = doc.element("Task_3").unwrap();
        let template = fixtures::template("grouped", None);

        let groups = custom_groups(&doc, task, &template, &Overrides::new());
        assert_eq!(
            entry_ids(&groups),
            vec![
                (
                    "ElementTemplates__CustomProperties".to_string(),
                    vec!["custom-entry-grouped-0".to_string(), "custom-entry-grouped-4".to_string()]
                ),
                (
                    "ElementTemplates__CustomProperties-connection".to_string(),
                    vec![
                        "custom-entry-grouped-connection-2".to_string(),
                        "custom-entry-grouped-connection-3".to_string()
                    ]
                ),
            ]
        );
        assert_eq!(groups[0].label, "Custom properties");
        assert!(groups[1].open_by_default);
    }

    #[test]
    fn test_entry_details() {
        let doc = fixtures::diagram();
        let task = doc.element("Task_3").unwrap();
        let template = fixtures::template("grouped", None);

        let groups = custom_groups(&doc, task, &template, &Overrides::new());
        let name = &groups[0].entries[0];
        assert_eq!(name.kind, EntryKind::TextField);
        assert_eq!(name.value, Some(json!("Task 3")));

        assert_eq!(groups[0].entries[1].kind, EntryKind::NumberField);

        let url = &groups[1].entries[0];
        assert_eq!(url.validation.as_deref(), Some("Must not be empty."));
        assert_eq!(groups[1].entries[1].kind, EntryKind::Checkbox);
    }

    #[test]
    fn test_overrides_activate_entries() {
        let doc = fixtures::diagram();
        let task = doc.element("Task_3").unwrap();
        let template = fixtures::template("grouped", None);
        let mut overrides = Overrides::new();
        overrides.insert("url".into(), json!("https://a"));

        let groups = custom_groups(&doc, task, &template, &overrides);
        let connection = &groups[1].entries;
        assert_eq!(connection.len(), 3);
        assert_eq!(connection[0].value, Some(json!("https://a")));
        assert_eq!(connection[0].validation, None);
        let body = &connection[2];
        assert_eq!(body.id, "custom-entry-grouped-connection-5");
        assert_eq!(body.kind, EntryKind::TextArea);
        assert!(body.disabled);
    }

    #[test]
    fn test_projection_is_stable() {
        let doc = fixtures::diagram();
        let task = doc.element("Task_3").unwrap();
        let template = fixtures::template("grouped", None);
        let first = custom_groups(&doc, task, &template, &Overrides::new());
        let second = custom_groups(&doc, task, &template, &Overrides::new());
        assert_eq!(first, second);
    }

    #[test]
    fn test_template_group_states() {
        let doc = fixtures::diagram();
        let registry = registry();

        let state = |id: &str| {
            template_group(&doc, &registry, doc.element(id).unwrap()).map(|g| g.state)
        };

        assert!(matches!(
            state("Task_2"),
            Some(TemplateState::UpdateAvailable { version: Some(1), latest: 3, .. })
        ));
        assert!(matches!(state("Task_1"), Some(TemplateState::UpToDate { version: None, .. })));
        assert!(matches!(state("ServiceTask"), Some(TemplateState::UpToDate { version: Some(1), .. })));
        assert!(matches!(
            state("UnknownTemplateTask"),
            Some(TemplateState::Unknown { ref applied }) if applied.id == "not-in-catalog"
        ));
        match state("Task_3") {
            Some(TemplateState::Select { available }) => {
                assert!(available.iter().any(|t| t.id == "foo" && t.version == Some(3)));
                assert!(!available.iter().any(|t| t.id == "deprecated"));
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert!(state("StartEvent_1").is_none());
    }

    #[test]
    fn test_deprecated_state() {
        let mut doc = fixtures::diagram();
        let registry = registry();
        let task = doc.element("Task_3").unwrap();
        bpmn_document::CommandStack::default()
            .execute(&mut doc, "mark", |tx| {
                crate::marker::write_marker(tx, task, Some(&AppliedTemplateRef::new("deprecated", Some(1))))
            })
            .unwrap();

        match template_group(&doc, &registry, task).map(|g| g.state) {
            Some(TemplateState::Deprecated { deprecation, .. }) => {
                assert_eq!(deprecation.message.as_deref(), Some("Use foo instead"));
            }
            other => panic!("unexpected state {:?}", other),
        }
    }
}
