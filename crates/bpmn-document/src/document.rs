//! The document arena.
//!
//! Nodes live in a flat map keyed by [`NodeId`]. Two indices are kept in
//! sync with every attribute write:
//!
//! - containment: child -> (owner, attribute)
//! - references: target -> set of (referrer, attribute)
//!
//! plus a lookup from diagram `id` strings to nodes. All mutation goes
//! through [`crate::Transaction`], which records each write for undo.

use std::collections::{BTreeSet, HashMap};

use serde_json::Map;

use crate::error::{DocumentError, Result};
use crate::model;
use crate::types::{NodeData, NodeId, Value};

const DEFINITIONS_TYPE: &str = "bpmn:Definitions";
const REF_KEY: &str = "$ref";
const TYPE_KEY: &str = "$type";

/// A process document rooted at a `bpmn:Definitions` node.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: HashMap<NodeId, NodeData>,
    next_id: u64,
    definitions: NodeId,
    parents: HashMap<NodeId, (NodeId, String)>,
    referrers: HashMap<NodeId, BTreeSet<(NodeId, String)>>,
    ids: HashMap<String, NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only its definitions root.
    pub fn new() -> Self {
        let definitions = NodeId(0);
        let mut doc = Self {
            nodes: HashMap::new(),
            next_id: 1,
            definitions,
            parents: HashMap::new(),
            referrers: HashMap::new(),
            ids: HashMap::new(),
        };
        doc.insert_node(
            definitions,
            NodeData::new(DEFINITIONS_TYPE).with_attr("id", "Definitions_1"),
        );
        doc
    }

    /// Root node of the document
    pub fn definitions(&self) -> NodeId {
        self.definitions
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn node(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(&node)
    }

    pub fn node_type(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.node_type.as_str())
    }

    pub fn get(&self, node: NodeId, key: &str) -> Option<&Value> {
        self.nodes.get(&node).and_then(|n| n.attrs.get(key))
    }

    pub fn get_str(&self, node: NodeId, key: &str) -> Option<&str> {
        self.get(node, key).and_then(Value::as_str)
    }

    /// Single contained child stored under `key`
    pub fn get_node(&self, node: NodeId, key: &str) -> Option<NodeId> {
        match self.get(node, key) {
            Some(Value::Node(child)) => Some(*child),
            _ => None,
        }
    }

    /// Single reference stored under `key`
    pub fn get_ref(&self, node: NodeId, key: &str) -> Option<NodeId> {
        match self.get(node, key) {
            Some(Value::Ref(target)) => Some(*target),
            _ => None,
        }
    }

    /// Contained or referenced list under `key`; empty if absent.
    pub fn get_list(&self, node: NodeId, key: &str) -> &[NodeId] {
        match self.get(node, key) {
            Some(Value::Nodes(ids)) | Some(Value::Refs(ids)) => ids,
            _ => &[],
        }
    }

    /// Whether the node's type is `node_type` or a subtype of it
    pub fn is(&self, node: NodeId, node_type: &str) -> bool {
        self.node_type(node)
            .map(|ty| model::is_a(ty, node_type))
            .unwrap_or(false)
    }

    pub fn is_any(&self, node: NodeId, node_types: &[&str]) -> bool {
        node_types.iter().any(|ty| self.is(node, ty))
    }

    /// Owner of a contained node together with the owning attribute
    pub fn parent(&self, node: NodeId) -> Option<(NodeId, &str)> {
        self.parents
            .get(&node)
            .map(|(owner, key)| (*owner, key.as_str()))
    }

    /// Nodes referencing `node`, with the referencing attribute
    pub fn referrers(&self, node: NodeId) -> impl Iterator<Item = (NodeId, &str)> + '_ {
        self.referrers
            .get(&node)
            .into_iter()
            .flat_map(|set| set.iter().map(|(from, key)| (*from, key.as_str())))
    }

    pub fn reference_count(&self, node: NodeId) -> usize {
        self.referrers.get(&node).map(BTreeSet::len).unwrap_or(0)
    }

    /// Look up a node by its diagram `id` attribute
    pub fn element(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }

    /// Whether the node is reachable from the definitions root
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.definitions {
                return true;
            }
            match self.parents.get(&current) {
                Some((owner, _)) => current = *owner,
                None => return false,
            }
        }
    }

    pub(crate) fn allocate_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn insert_node(&mut self, id: NodeId, data: NodeData) {
        for (key, value) in &data.attrs {
            self.index(id, key, value);
        }
        self.next_id = self.next_id.max(id.0 + 1);
        self.nodes.insert(id, data);
    }

    pub(crate) fn remove_node(&mut self, id: NodeId) -> Option<NodeData> {
        let data = self.nodes.remove(&id)?;
        for (key, value) in &data.attrs {
            self.unindex(id, key, value);
        }
        Some(data)
    }

    /// Write (or remove, on `None`) an attribute, returning the previous value.
    pub(crate) fn write_attr(
        &mut self,
        node: NodeId,
        key: &str,
        value: Option<Value>,
    ) -> Result<Option<Value>> {
        let data = self
            .nodes
            .get_mut(&node)
            .ok_or(DocumentError::UnknownNode(node))?;
        let previous = match value.clone() {
            Some(v) => data.attrs.insert(key.to_string(), v),
            None => data.attrs.remove(key),
        };
        if let Some(old) = &previous {
            self.unindex(node, key, old);
        }
        if let Some(new) = &value {
            self.index(node, key, new);
        }
        Ok(previous)
    }

    fn index(&mut self, node: NodeId, key: &str, value: &Value) {
        for child in value.children() {
            self.parents.insert(*child, (node, key.to_string()));
        }
        for target in value.targets() {
            self.referrers
                .entry(*target)
                .or_default()
                .insert((node, key.to_string()));
        }
        if key == "id" {
            if let Some(id) = value.as_str() {
                self.ids.insert(id.to_string(), node);
            }
        }
    }

    fn unindex(&mut self, node: NodeId, key: &str, value: &Value) {
        for child in value.children() {
            let owned_here = self
                .parents
                .get(child)
                .map(|(owner, k)| *owner == node && k == key)
                .unwrap_or(false);
            if owned_here {
                self.parents.remove(child);
            }
        }
        for target in value.targets() {
            if let Some(set) = self.referrers.get_mut(target) {
                set.remove(&(node, key.to_string()));
                if set.is_empty() {
                    self.referrers.remove(target);
                }
            }
        }
        if key == "id" {
            if let Some(id) = value.as_str() {
                if self.ids.get(id) == Some(&node) {
                    self.ids.remove(id);
                }
            }
        }
    }

    /// Build a document from its JSON form.
    ///
    /// Objects carry their type under `$type`; nested objects and arrays of
    /// objects become contained nodes; `{"$ref": "<id>"}` (or an array of
    /// them) becomes a reference resolved by diagram id once the whole tree
    /// has been read.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let root = json
            .as_object()
            .ok_or_else(|| DocumentError::InvalidImport("root must be an object".into()))?;
        let root_type = root.get(TYPE_KEY).and_then(|t| t.as_str());
        if root_type != Some(DEFINITIONS_TYPE) {
            return Err(DocumentError::InvalidImport(format!(
                "root must be of type {}",
                DEFINITIONS_TYPE
            )));
        }

        let mut doc = Self {
            nodes: HashMap::new(),
            next_id: 0,
            definitions: NodeId(0),
            parents: HashMap::new(),
            referrers: HashMap::new(),
            ids: HashMap::new(),
        };
        let mut pending = Vec::new();
        doc.definitions = doc.import_node(root, &mut pending)?;

        for (node, key, refs) in pending {
            let resolved = refs
                .targets
                .iter()
                .map(|id| {
                    doc.element(id)
                        .ok_or_else(|| DocumentError::UnresolvedRef(id.clone()))
                })
                .collect::<Result<Vec<_>>>()?;
            let value = if refs.many {
                Value::Refs(resolved)
            } else {
                match resolved.first() {
                    Some(target) => Value::Ref(*target),
                    None => continue,
                }
            };
            doc.write_attr(node, &key, Some(value))?;
        }

        log::debug!("Imported document with {} nodes", doc.len());
        Ok(doc)
    }

    fn import_node(
        &mut self,
        object: &Map<String, serde_json::Value>,
        pending: &mut Vec<(NodeId, String, PendingRefs)>,
    ) -> Result<NodeId> {
        let node_type = object
            .get(TYPE_KEY)
            .and_then(|t| t.as_str())
            .ok_or_else(|| DocumentError::InvalidImport("node without $type".into()))?;
        let id = self.allocate_id();
        let mut data = NodeData::new(node_type);

        for (key, raw) in object {
            if key == TYPE_KEY {
                continue;
            }
            if let Some(value) = Value::from_json(raw) {
                data.attrs.insert(key.clone(), value);
                continue;
            }
            match raw {
                serde_json::Value::Object(inner) => {
                    if let Some(target) = ref_target(inner) {
                        pending.push((id, key.clone(), PendingRefs::one(target)));
                    } else {
                        let child = self.import_node(inner, pending)?;
                        data.attrs.insert(key.clone(), Value::Node(child));
                    }
                }
                serde_json::Value::Array(items) => {
                    let targets: Option<Vec<String>> = items
                        .iter()
                        .map(|item| item.as_object().and_then(ref_target))
                        .collect();
                    match targets {
                        Some(targets) if !items.is_empty() => {
                            pending.push((id, key.clone(), PendingRefs::many(targets)));
                        }
                        _ => {
                            let mut children = Vec::with_capacity(items.len());
                            for item in items {
                                let inner = item.as_object().ok_or_else(|| {
                                    DocumentError::InvalidImport(format!(
                                        "list '{}' must hold objects",
                                        key
                                    ))
                                })?;
                                children.push(self.import_node(inner, pending)?);
                            }
                            data.attrs.insert(key.clone(), Value::Nodes(children));
                        }
                    }
                }
                _ => {}
            }
        }

        self.insert_node(id, data);
        Ok(id)
    }

    /// Export the attached tree as JSON, the inverse of [`Document::from_json`].
    pub fn to_json(&self) -> serde_json::Value {
        self.export_node(self.definitions)
    }

    /// Export a single subtree as JSON
    pub fn export_node(&self, node: NodeId) -> serde_json::Value {
        let Some(data) = self.nodes.get(&node) else {
            return serde_json::Value::Null;
        };
        let mut object = Map::new();
        object.insert(TYPE_KEY.into(), data.node_type.clone().into());
        for (key, value) in &data.attrs {
            let exported = match value {
                Value::Node(child) => self.export_node(*child),
                Value::Nodes(children) => children.iter().map(|c| self.export_node(*c)).collect(),
                Value::Ref(target) => self.export_ref(*target),
                Value::Refs(targets) => targets.iter().map(|t| self.export_ref(*t)).collect(),
                scalar => scalar.to_json().unwrap_or(serde_json::Value::Null),
            };
            object.insert(key.clone(), exported);
        }
        serde_json::Value::Object(object)
    }

    fn export_ref(&self, target: NodeId) -> serde_json::Value {
        let id = self
            .get_str(target, "id")
            .map(str::to_string)
            .unwrap_or_else(|| target.to_string());
        let mut object = Map::new();
        object.insert(REF_KEY.into(), id.into());
        serde_json::Value::Object(object)
    }
}

struct PendingRefs {
    targets: Vec<String>,
    many: bool,
}

impl PendingRefs {
    fn one(target: String) -> Self {
        Self {
            targets: vec![target],
            many: false,
        }
    }

    fn many(targets: Vec<String>) -> Self {
        Self {
            targets,
            many: true,
        }
    }
}

fn ref_target(object: &Map<String, serde_json::Value>) -> Option<String> {
    if object.len() != 1 {
        return None;
    }
    object
        .get(REF_KEY)
        .and_then(|r| r.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Document {
        let _ = env_logger::builder().is_test(true).try_init();
        Document::from_json(&json!({
            "$type": "bpmn:Definitions",
            "id": "Definitions_1",
            "rootElements": [
                { "$type": "bpmn:Message", "id": "Message_1", "name": "hello" },
                {
                    "$type": "bpmn:Process",
                    "id": "Process_1",
                    "flowElements": [
                        { "$type": "bpmn:ReceiveTask", "id": "Task_1", "messageRef": { "$ref": "Message_1" } },
                        { "$type": "bpmn:ServiceTask", "id": "Task_2", "name": "Send" }
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_new_document_has_definitions() {
        let doc = Document::new();
        assert_eq!(doc.len(), 1);
        assert!(doc.is(doc.definitions(), "bpmn:Definitions"));
        assert_eq!(doc.element("Definitions_1"), Some(doc.definitions()));
    }

    #[test]
    fn test_import_builds_indices() {
        let doc = sample();
        let task = doc.element("Task_1").unwrap();
        let message = doc.element("Message_1").unwrap();
        let process = doc.element("Process_1").unwrap();

        assert_eq!(doc.get_ref(task, "messageRef"), Some(message));
        assert_eq!(doc.parent(task), Some((process, "flowElements")));
        assert_eq!(
            doc.referrers(message).collect::<Vec<_>>(),
            vec![(task, "messageRef")]
        );
        assert!(doc.is_attached(task));
        assert!(doc.is(task, "bpmn:Task"));
        assert!(doc.is_any(task, &["bpmn:Event", "bpmn:Activity"]));
    }

    #[test]
    fn test_import_rejects_unresolved_reference() {
        let result = Document::from_json(&json!({
            "$type": "bpmn:Definitions",
            "rootElements": [
                { "$type": "bpmn:ReceiveTask", "id": "Task_1", "messageRef": { "$ref": "Nope" } }
            ]
        }));
        assert!(matches!(result, Err(DocumentError::UnresolvedRef(id)) if id == "Nope"));
    }

    #[test]
    fn test_import_requires_definitions_root() {
        let result = Document::from_json(&json!({ "$type": "bpmn:Process" }));
        assert!(matches!(result, Err(DocumentError::InvalidImport(_))));
    }

    #[test]
    fn test_export_round_trips() {
        let doc = sample();
        let exported = doc.to_json();
        let reimported = Document::from_json(&exported).unwrap();
        assert_eq!(reimported.to_json(), exported);
        assert_eq!(
            exported["rootElements"][1]["flowElements"][0]["messageRef"],
            json!({ "$ref": "Message_1" })
        );
    }
}
