//! Core value types stored in the document arena

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable handle of a node in the document arena.
///
/// Handles are never reused, so a handle taken before an undo stays valid
/// after the matching redo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An attribute value.
///
/// `Node`/`Nodes` express containment, `Ref`/`Refs` express references to
/// nodes owned elsewhere. Both are tracked by the document indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Value {
    String(String),
    Integer(i64),
    Boolean(bool),
    Ref(NodeId),
    Refs(Vec<NodeId>),
    Node(NodeId),
    Nodes(Vec<NodeId>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether this is a plain string/integer/boolean value
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::String(_) | Value::Integer(_) | Value::Boolean(_)
        )
    }

    /// Nodes owned through this value
    pub fn children(&self) -> &[NodeId] {
        match self {
            Value::Node(id) => std::slice::from_ref(id),
            Value::Nodes(ids) => ids,
            _ => &[],
        }
    }

    /// Nodes referenced (not owned) through this value
    pub fn targets(&self) -> &[NodeId] {
        match self {
            Value::Ref(id) => std::slice::from_ref(id),
            Value::Refs(ids) => ids,
            _ => &[],
        }
    }

    /// Convert a scalar into JSON. Node-valued attributes have no scalar
    /// representation and yield `None`.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Value::String(s) => Some(serde_json::Value::String(s.clone())),
            Value::Integer(i) => Some(serde_json::Value::from(*i)),
            Value::Boolean(b) => Some(serde_json::Value::Bool(*b)),
            _ => None,
        }
    }

    /// Build a scalar from JSON; `null`, arrays and objects yield `None`.
    ///
    /// Non-integral numbers are kept as their string rendering.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Bool(b) => Some(Value::Boolean(*b)),
            serde_json::Value::Number(n) => Some(
                n.as_i64()
                    .map(Value::Integer)
                    .unwrap_or_else(|| Value::String(n.to_string())),
            ),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Ref(id) | Value::Node(id) => write!(f, "{}", id),
            Value::Refs(ids) | Value::Nodes(ids) => {
                let parts: Vec<String> = ids.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

/// A typed node: its model type name plus attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Qualified model type, e.g. `bpmn:ServiceTask` or `zeebe:IoMapping`
    pub node_type: String,
    pub attrs: BTreeMap<String, Value>,
}

impl NodeData {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }
}
