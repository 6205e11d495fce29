//! Template descriptor types
//!
//! Templates are supplied as JSON and immutable once loaded. A template
//! declares its identity (`id` + optional `version`), which elements it
//! applies to, and an ordered list of properties, each bound to one
//! location in the process document.

use bpmn_document::Value;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A versioned, reusable element configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementTemplate {
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub id: String,
    /// Absent means unversioned, which is distinct from version 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<TemplateIcon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default)]
    pub applies_to: Vec<String>,
    /// Element type the template turns its target into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<ElementType>,
    #[serde(default)]
    pub properties: Vec<PropertyDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<Deprecated>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateIcon {
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementType {
    /// Target business object type, e.g. `bpmn:ServiceTask`
    pub value: String,
    /// Event definition the target event must carry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_definition: Option<String>,
}

/// `deprecated` is either a flag or a description of the deprecation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Deprecated {
    Flag(bool),
    Info(Deprecation),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deprecation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_ref: Option<String>,
}

/// Custom group metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDescriptor {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(default)]
    pub open_by_default: bool,
}

/// A single configurable property of a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    /// Identifier other properties' conditions refer to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    /// Default value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default = "default_editable")]
    pub editable: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feel: Option<Feel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_value: Option<GeneratedValue>,
    pub binding: Binding,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
}

fn default_editable() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    String,
    Text,
    Boolean,
    Dropdown,
    Hidden,
    Number,
    #[serde(other)]
    Unknown,
}

/// FEEL support: a plain flag or `"optional"` / `"required"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Feel {
    Flag(bool),
    Mode(FeelMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeelMode {
    Optional,
    Required,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedValue {
    #[serde(rename = "type")]
    pub kind: GeneratedValueKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratedValueKind {
    Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(default)]
    pub not_empty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,
}

/// Either a bare regular expression or one with a custom message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pattern {
    Plain(String),
    WithMessage {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

/// Predicate over other properties' current values.
///
/// Variant order matters for untagged matching: the keyed forms are tried
/// before `Equals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    AllMatch {
        #[serde(rename = "allMatch")]
        all_match: Vec<Condition>,
    },
    OneOf {
        property: String,
        #[serde(rename = "oneOf")]
        one_of: Vec<serde_json::Value>,
    },
    IsActive {
        property: String,
        #[serde(rename = "isActive")]
        is_active: bool,
    },
    Equals {
        property: String,
        equals: serde_json::Value,
    },
    All(Vec<Condition>),
}

/// Where in the document a property's value lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Binding {
    /// Attribute on the element's business object
    #[serde(rename = "property")]
    Property { name: String },
    #[serde(rename = "zeebe:taskDefinition:type", alias = "zeebe:taskDefinitionType")]
    TaskDefinitionType,
    /// `type` or `retries` of the task definition
    #[serde(rename = "zeebe:taskDefinition")]
    TaskDefinition { property: String },
    /// Input parameter, identified by its `target`
    #[serde(rename = "zeebe:input")]
    Input { name: String },
    /// Output parameter, identified by its `source`
    #[serde(rename = "zeebe:output")]
    Output { source: String },
    #[serde(rename = "zeebe:property")]
    ZeebeProperty { name: String },
    #[serde(rename = "zeebe:taskHeader")]
    TaskHeader { key: String },
    #[serde(rename = "zeebe:calledElement")]
    CalledElement { property: String },
    #[serde(rename = "bpmn:Message#property", alias = "message:property")]
    MessageProperty { name: String },
    #[serde(
        rename = "bpmn:Message#zeebe:subscription#property",
        alias = "message:zeebeSubscription:property"
    )]
    MessageSubscriptionProperty { name: String },
}

/// Identity of a binding, used to pair old and new template properties
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindingKey {
    Property(String),
    TaskDefinition(String),
    Input(String),
    Output(String),
    ZeebeProperty(String),
    TaskHeader(String),
    CalledElement(String),
    Message(String),
    MessageSubscription(String),
}

impl Binding {
    pub fn key(&self) -> BindingKey {
        match self {
            Binding::Property { name } => BindingKey::Property(name.clone()),
            Binding::TaskDefinitionType => BindingKey::TaskDefinition("type".into()),
            Binding::TaskDefinition { property } => BindingKey::TaskDefinition(property.clone()),
            Binding::Input { name } => BindingKey::Input(name.clone()),
            Binding::Output { source } => BindingKey::Output(source.clone()),
            Binding::ZeebeProperty { name } => BindingKey::ZeebeProperty(name.clone()),
            Binding::TaskHeader { key } => BindingKey::TaskHeader(key.clone()),
            Binding::CalledElement { property } => BindingKey::CalledElement(property.clone()),
            Binding::MessageProperty { name } => BindingKey::Message(name.clone()),
            Binding::MessageSubscriptionProperty { name } => {
                BindingKey::MessageSubscription(name.clone())
            }
        }
    }

    /// Whether the value lives on (or under) the element's message
    pub fn is_message(&self) -> bool {
        matches!(
            self,
            Binding::MessageProperty { .. } | Binding::MessageSubscriptionProperty { .. }
        )
    }

    /// Convert a template value into the value stored by this binding.
    ///
    /// Attributes on the business object keep their JSON type; extension
    /// fields are always strings.
    pub fn to_document_value(&self, value: &serde_json::Value) -> Option<Value> {
        let converted = Value::from_json(value)?;
        match self {
            Binding::Property { .. } => Some(converted),
            _ => Some(match converted {
                Value::String(s) => Value::String(s),
                other => Value::String(other.to_string()),
            }),
        }
    }
}

impl PropertyDescriptor {
    pub fn is_hidden(&self) -> bool {
        self.property_type == Some(PropertyType::Hidden)
    }

    pub fn is_dropdown(&self) -> bool {
        self.property_type == Some(PropertyType::Dropdown)
    }

    /// The declared default, converted for this property's binding
    pub fn declared_value(&self) -> Option<Value> {
        self.value
            .as_ref()
            .and_then(|v| self.binding.to_document_value(v))
    }

    /// Whether the value is produced by a generator rather than declared
    pub fn is_generated(&self) -> bool {
        self.value.is_none() && self.generated_value.is_some()
    }

    /// Value to materialize: the declared default, or a fresh generated one.
    pub fn default_value(&self) -> Option<Value> {
        if let Some(value) = self.declared_value() {
            return Some(value);
        }
        match &self.generated_value {
            Some(GeneratedValue {
                kind: GeneratedValueKind::Uuid,
            }) => Some(Value::String(uuid::Uuid::new_v4().to_string())),
            None => None,
        }
    }

    /// Whether `value` is one of the dropdown's choices. Non-dropdowns accept
    /// everything.
    pub fn allows(&self, value: &Value) -> bool {
        if !self.is_dropdown() {
            return true;
        }
        let rendered = value.to_string();
        self.choices.iter().any(|choice| choice.value == rendered)
    }
}

impl ElementTemplate {
    /// Parse a single template from JSON
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Parse a catalog: either a single template object or an array of them
    pub fn parse_catalog(json: &str) -> Result<Vec<Self>> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Ok(match value {
            serde_json::Value::Array(_) => serde_json::from_value(value)?,
            other => vec![serde_json::from_value(other)?],
        })
    }

    pub fn is_deprecated(&self) -> bool {
        match &self.deprecated {
            Some(Deprecated::Flag(flag)) => *flag,
            Some(Deprecated::Info(_)) => true,
            None => false,
        }
    }

    pub fn deprecation(&self) -> Option<Deprecation> {
        match &self.deprecated {
            Some(Deprecated::Flag(true)) => Some(Deprecation::default()),
            Some(Deprecated::Info(info)) => Some(info.clone()),
            _ => None,
        }
    }

    pub fn group(&self, id: &str) -> Option<&GroupDescriptor> {
        self.groups.iter().find(|group| group.id == id)
    }

    /// First property whose `id` matches
    pub fn property_by_id(&self, id: &str) -> Option<&PropertyDescriptor> {
        self.properties
            .iter()
            .find(|property| property.id.as_deref() == Some(id))
    }

    /// First property bound to `key`
    pub fn property_by_key(&self, key: &BindingKey) -> Option<&PropertyDescriptor> {
        self.properties
            .iter()
            .find(|property| &property.binding.key() == key)
    }

    pub fn has_message_bindings(&self) -> bool {
        self.properties.iter().any(|p| p.binding.is_message())
    }

    /// A copy keeping only the properties at `indices`, in their original order
    pub fn with_properties(&self, indices: &[usize]) -> Self {
        let properties = self
            .properties
            .iter()
            .enumerate()
            .filter(|(index, _)| indices.contains(index))
            .map(|(_, property)| property.clone())
            .collect();
        Self {
            properties,
            ..self.clone()
        }
    }
}
