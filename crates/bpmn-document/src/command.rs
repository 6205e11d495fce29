//! Transactional mutation and undo/redo
//!
//! Every mutation runs inside a [`Transaction`] that records the inverse
//! information for each write. A transaction whose body fails is rolled
//! back, one that succeeds becomes a [`Command`] on the [`CommandStack`].
//!
//! Nested commands started from inside a transaction (see
//! [`Transaction::execute`]) fold into the outer command, so a single undo
//! reverts the whole operation.

use std::collections::VecDeque;
use std::ops::Deref;

use crate::document::Document;
use crate::error::{DocumentError, Result};
use crate::types::{NodeData, NodeId, Value};

/// Default number of commands kept for undo
pub const DEFAULT_MAX_COMMANDS: usize = 100;

/// A single recorded mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// A node was added to the arena with these initial attributes
    Create { node: NodeId, data: NodeData },
    /// An attribute went from `old` to `new` (`None` = absent)
    SetAttr {
        node: NodeId,
        key: String,
        old: Option<Value>,
        new: Option<Value>,
    },
}

impl Change {
    fn revert(&self, doc: &mut Document) -> Result<()> {
        match self {
            Change::Create { node, .. } => {
                doc.remove_node(*node);
            }
            Change::SetAttr { node, key, old, .. } => {
                doc.write_attr(*node, key, old.clone())?;
            }
        }
        Ok(())
    }

    fn replay(&self, doc: &mut Document) -> Result<()> {
        match self {
            Change::Create { node, data } => doc.insert_node(*node, data.clone()),
            Change::SetAttr { node, key, new, .. } => {
                doc.write_attr(*node, key, new.clone())?;
            }
        }
        Ok(())
    }
}

/// A named, committed group of changes
#[derive(Debug, Clone)]
pub struct Command {
    pub name: String,
    changes: Vec<Change>,
}

impl Command {
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }
}

/// An open mutation scope over a document.
///
/// Reads go through `Deref<Target = Document>`.
pub struct Transaction<'d> {
    doc: &'d mut Document,
    changes: Vec<Change>,
}

impl Deref for Transaction<'_> {
    type Target = Document;

    fn deref(&self) -> &Document {
        self.doc
    }
}

impl<'d> Transaction<'d> {
    fn new(doc: &'d mut Document) -> Self {
        Self {
            doc,
            changes: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        self.doc
    }

    /// Changes recorded so far
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Create a detached node with the given attributes
    pub fn create(&mut self, node_type: &str, attrs: Vec<(&str, Value)>) -> NodeId {
        let node = self.doc.allocate_id();
        let mut data = NodeData::new(node_type);
        for (key, value) in attrs {
            data.attrs.insert(key.to_string(), value);
        }
        self.doc.insert_node(node, data.clone());
        self.changes.push(Change::Create { node, data });
        node
    }

    /// Write or remove an attribute. Writing the current value records nothing.
    pub fn write(&mut self, node: NodeId, key: &str, value: Option<Value>) -> Result<()> {
        if !self.doc.contains(node) {
            return Err(DocumentError::UnknownNode(node));
        }
        if self.doc.get(node, key) == value.as_ref() {
            return Ok(());
        }
        let old = self.doc.write_attr(node, key, value.clone())?;
        self.changes.push(Change::SetAttr {
            node,
            key: key.to_string(),
            old,
            new: value,
        });
        Ok(())
    }

    pub fn set(&mut self, node: NodeId, key: &str, value: impl Into<Value>) -> Result<()> {
        self.write(node, key, Some(value.into()))
    }

    pub fn unset(&mut self, node: NodeId, key: &str) -> Result<()> {
        self.write(node, key, None)
    }

    /// Append a child to the contained list under `key`, creating the list
    /// if it does not exist yet.
    pub fn push(&mut self, owner: NodeId, key: &str, child: NodeId) -> Result<()> {
        let mut items = self.list(owner, key)?;
        items.push(child);
        self.write(owner, key, Some(Value::Nodes(items)))
    }

    /// Insert a child at `index` (clamped to the list length)
    pub fn insert_at(&mut self, owner: NodeId, key: &str, index: usize, child: NodeId) -> Result<()> {
        let mut items = self.list(owner, key)?;
        let index = index.min(items.len());
        items.insert(index, child);
        self.write(owner, key, Some(Value::Nodes(items)))
    }

    /// Remove an entry from a list attribute, returning whether it was present.
    ///
    /// Works for both contained and referenced lists; the list kind is kept.
    pub fn remove_from(&mut self, owner: NodeId, key: &str, item: NodeId) -> Result<bool> {
        let rebuilt = match self.doc.get(owner, key) {
            None => return Ok(false),
            Some(Value::Nodes(items)) if items.contains(&item) => {
                Value::Nodes(items.iter().copied().filter(|i| *i != item).collect())
            }
            Some(Value::Refs(items)) if items.contains(&item) => {
                Value::Refs(items.iter().copied().filter(|i| *i != item).collect())
            }
            Some(Value::Nodes(_)) | Some(Value::Refs(_)) => return Ok(false),
            Some(_) => {
                return Err(DocumentError::NotAList {
                    node: owner,
                    key: key.to_string(),
                })
            }
        };
        self.write(owner, key, Some(rebuilt))?;
        Ok(true)
    }

    /// Swap `old` for `new` wherever `old` occurs in the attribute.
    pub fn replace_in(&mut self, owner: NodeId, key: &str, old: NodeId, new: NodeId) -> Result<()> {
        let swap = |id: &NodeId| if *id == old { new } else { *id };
        let rebuilt = match self.doc.get(owner, key) {
            Some(Value::Node(id)) => Value::Node(swap(id)),
            Some(Value::Ref(id)) => Value::Ref(swap(id)),
            Some(Value::Nodes(ids)) => Value::Nodes(ids.iter().map(swap).collect()),
            Some(Value::Refs(ids)) => Value::Refs(ids.iter().map(swap).collect()),
            _ => return Ok(()),
        };
        self.write(owner, key, Some(rebuilt))
    }

    /// Run a nested command. Its changes become part of this transaction;
    /// on failure only the nested changes are rolled back.
    pub fn execute<T, E, F>(&mut self, name: &str, body: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Transaction<'d>) -> std::result::Result<T, E>,
        E: From<DocumentError>,
    {
        let mark = self.changes.len();
        log::trace!("Nested command '{}'", name);
        match body(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.rollback_to(mark)?;
                Err(err)
            }
        }
    }

    fn list(&self, owner: NodeId, key: &str) -> Result<Vec<NodeId>> {
        match self.doc.get(owner, key) {
            None => Ok(Vec::new()),
            Some(Value::Nodes(items)) => Ok(items.clone()),
            Some(_) => Err(DocumentError::NotAList {
                node: owner,
                key: key.to_string(),
            }),
        }
    }

    fn rollback_to(&mut self, mark: usize) -> Result<()> {
        while self.changes.len() > mark {
            if let Some(change) = self.changes.pop() {
                change.revert(self.doc)?;
            }
        }
        Ok(())
    }
}

/// Undo/redo stack of committed commands
#[derive(Debug)]
pub struct CommandStack {
    undo: VecDeque<Command>,
    redo: Vec<Command>,
    max_commands: usize,
}

impl CommandStack {
    /// Create a command stack keeping at most `max_commands` for undo
    pub fn new(max_commands: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_commands: max_commands.max(1),
        }
    }

    /// Run `body` as one undoable command.
    ///
    /// On error every change made by the body is reverted and the stack is
    /// left untouched. A body that changes nothing leaves no command behind.
    pub fn execute<T, E, F>(&mut self, doc: &mut Document, name: &str, body: F) -> std::result::Result<T, E>
    where
        F: for<'d> FnOnce(&mut Transaction<'d>) -> std::result::Result<T, E>,
        E: From<DocumentError>,
    {
        let mut tx = Transaction::new(doc);
        let value = match body(&mut tx) {
            Ok(value) => value,
            Err(err) => {
                log::debug!(
                    "Command '{}' failed, reverting {} changes",
                    name,
                    tx.changes.len()
                );
                tx.rollback_to(0)?;
                return Err(err);
            }
        };

        let changes = tx.changes;
        if changes.is_empty() {
            log::trace!("Command '{}' changed nothing", name);
            return Ok(value);
        }

        log::debug!("Executed '{}' ({} changes)", name, changes.len());
        self.redo.clear();
        self.undo.push_back(Command {
            name: name.to_string(),
            changes,
        });
        while self.undo.len() > self.max_commands {
            self.undo.pop_front();
        }
        Ok(value)
    }

    /// Revert the last command, returning its name
    pub fn undo(&mut self, doc: &mut Document) -> Result<Option<String>> {
        let Some(command) = self.undo.pop_back() else {
            return Ok(None);
        };
        for change in command.changes.iter().rev() {
            change.revert(doc)?;
        }
        log::debug!("Undid '{}'", command.name);
        let name = command.name.clone();
        self.redo.push(command);
        Ok(Some(name))
    }

    /// Re-apply the last undone command, returning its name
    pub fn redo(&mut self, doc: &mut Document) -> Result<Option<String>> {
        let Some(command) = self.redo.pop() else {
            return Ok(None);
        };
        for change in &command.changes {
            change.replay(doc)?;
        }
        log::debug!("Redid '{}'", command.name);
        let name = command.name.clone();
        self.undo.push_back(command);
        Ok(Some(name))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of commands available for undo
    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    /// Name of the command the next undo would revert
    pub fn last(&self) -> Option<&Command> {
        self.undo.back()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_COMMANDS)
    }
}
