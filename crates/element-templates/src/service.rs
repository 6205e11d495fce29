//! Element templates service
//!
//! [`ElementTemplates`] owns the process document, its command stack and the
//! template catalog, and exposes the registry, application and editing
//! operations. Every mutating call runs as exactly one undoable command and,
//! once that command is committed, emits exactly one [`TemplateEvent`].

use std::sync::Arc;

use bpmn_document::{CommandStack, Document, NodeId, Transaction, Value};

use crate::binding::{get_property_value, resolve};
use crate::condition::{active_indices, Overrides};
use crate::config::EngineConfig;
use crate::engine;
use crate::error::{Result, TemplateError};
use crate::events::{EventSink, NullEventSink, TemplateEvent};
use crate::marker::{write_icon, write_marker, AppliedTemplateRef};
use crate::projection::{self, CustomGroup, TemplateGroup};
use crate::registry::{LatestOptions, TemplateFilter, TemplateRegistry};
use crate::template::{ElementTemplate, PropertyDescriptor};

/// Facade over document, command stack and template catalog
pub struct ElementTemplates {
    document: Document,
    commands: CommandStack,
    registry: TemplateRegistry,
    events: Arc<dyn EventSink>,
    config: EngineConfig,
}

impl ElementTemplates {
    pub fn new(document: Document) -> Self {
        Self::with_config(document, EngineConfig::default())
    }

    pub fn with_config(document: Document, config: EngineConfig) -> Self {
        Self {
            document,
            commands: CommandStack::new(config.max_undo),
            registry: TemplateRegistry::new(),
            events: Arc::new(NullEventSink),
            config,
        }
    }

    /// Route events to `sink` instead of discarding them
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn command_stack(&self) -> &CommandStack {
        &self.commands
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---- registry ----

    /// Replace the template catalog
    pub fn set(&mut self, templates: Vec<ElementTemplate>) -> Result<()> {
        self.registry.set(templates)
    }

    /// Parse a JSON catalog (one template or an array) and install it
    pub fn load_catalog(&mut self, json: &str) -> Result<()> {
        let templates = ElementTemplate::parse_catalog(json)?;
        self.set(templates)
    }

    pub fn get(&self, id: &str, version: Option<u32>) -> Option<Arc<ElementTemplate>> {
        self.registry.get(id, version)
    }

    /// Template applied to an element, if it is in the catalog
    pub fn get_for_element(&self, element: NodeId) -> Option<Arc<ElementTemplate>> {
        self.registry.get_applied(&self.document, element)
    }

    pub fn get_all(&self, filter: TemplateFilter<'_>) -> Vec<Arc<ElementTemplate>> {
        self.registry.get_all(&self.document, filter)
    }

    pub fn get_latest(&self, filter: TemplateFilter<'_>, options: LatestOptions) -> Vec<Arc<ElementTemplate>> {
        self.registry.get_latest(&self.document, filter, options)
    }

    /// [`Self::get_all`] with a loosely typed filter argument
    pub fn get_all_json(&self, filter: &serde_json::Value) -> Result<Vec<Arc<ElementTemplate>>> {
        let filter = TemplateFilter::from_json(&self.document, filter)?;
        Ok(self.get_all(filter))
    }

    /// [`Self::get_latest`] with a loosely typed filter argument
    pub fn get_latest_json(
        &self,
        filter: &serde_json::Value,
        options: LatestOptions,
    ) -> Result<Vec<Arc<ElementTemplate>>> {
        let filter = TemplateFilter::from_json(&self.document, filter)?;
        Ok(self.get_latest(filter, options))
    }

    // ---- application ----

    /// Build a detached element from a template. Place it with
    /// [`Self::place_element`].
    pub fn create_element(&mut self, template: Option<&ElementTemplate>) -> Result<NodeId> {
        let template = template.ok_or(TemplateError::MissingTemplate)?;
        let config = &self.config;
        self.commands
            .execute(&mut self.document, "elementTemplates.createElement", |tx| {
                engine::create_element(tx, template, config)
            })
    }

    /// Apply a template (or, with `None`, detach the current one) and return
    /// the possibly replaced element.
    pub fn apply_template(&mut self, element: NodeId, template: Option<&ElementTemplate>) -> Result<NodeId> {
        self.ensure_element(element)?;
        let old = self.registry.get_applied(&self.document, element);
        if old.is_none() && AppliedTemplateRef::read(&self.document, element).is_some() {
            log::warn!("Replacing unknown template on {}", element);
        }

        let config = &self.config;
        let updated = self
            .commands
            .execute(&mut self.document, "propertiesPanel.zeebe.changeTemplate", |tx| {
                engine::apply_template(tx, element, template, old.as_deref(), config)
            })?;

        let new_template = template.map(AppliedTemplateRef::of);
        let same_family = matches!((old.as_deref(), template), (Some(old), Some(new)) if old.id == new.id);
        self.emit(if same_family {
            TemplateEvent::Update {
                element: updated,
                new_template,
            }
        } else {
            TemplateEvent::Apply {
                element: updated,
                new_template,
            }
        });
        Ok(updated)
    }

    /// Move an element to the latest version of its template family.
    ///
    /// Elements already on the latest version, on an unversioned template,
    /// or using a template that is not in the catalog are left unchanged.
    pub fn update_template(&mut self, element: NodeId) -> Result<NodeId> {
        self.ensure_element(element)?;
        let latest = self
            .registry
            .get_applied(&self.document, element)
            .and_then(|current| {
                let latest = self.registry.latest_of(&current.id)?;
                let newer = matches!((current.version, latest.version), (Some(c), Some(l)) if l > c);
                newer.then_some(latest)
            });
        match latest {
            Some(latest) => self.apply_template(element, Some(&latest)),
            None => {
                log::debug!("No newer template for {}", element);
                let new_template = AppliedTemplateRef::read(&self.document, element);
                self.emit(TemplateEvent::Update {
                    element,
                    new_template,
                });
                Ok(element)
            }
        }
    }

    /// Detach the template, keeping every value it produced
    pub fn unlink_template(&mut self, element: NodeId) -> Result<NodeId> {
        self.ensure_element(element)?;
        self.commands
            .execute(&mut self.document, "elementTemplates.unlinkTemplate", |tx| {
                write_marker(tx, element, None)?;
                write_icon(tx, element, None)
            })?;
        self.emit(TemplateEvent::Unlink { element });
        Ok(element)
    }

    /// Detach the template and strip what it produced, keeping the label
    pub fn remove_template(&mut self, element: NodeId) -> Result<NodeId> {
        self.ensure_element(element)?;
        if AppliedTemplateRef::read(&self.document, element).is_some() {
            let template = self.registry.get_applied(&self.document, element);
            self.commands
                .execute(&mut self.document, "elementTemplates.removeTemplate", |tx| {
                    engine::remove_template(tx, element, template.as_deref())
                })?;
        } else {
            log::debug!("No template to remove from {}", element);
        }
        self.emit(TemplateEvent::Remove { element });
        Ok(element)
    }

    /// Announce that the template chooser should open for an element
    pub fn select(&mut self, element: NodeId) -> Result<()> {
        self.ensure_element(element)?;
        self.emit(TemplateEvent::Select { element });
        Ok(())
    }

    /// Attach a (created) element to a process or sub-process
    pub fn place_element(&mut self, element: NodeId, parent: NodeId) -> Result<()> {
        self.ensure_element(element)?;
        self.ensure_element(parent)?;
        let key = if self.document.is(element, "bpmn:Artifact") {
            "artifacts"
        } else {
            "flowElements"
        };
        self.commands
            .execute(&mut self.document, "shape.create", |tx| tx.push(parent, key, element))
            .map_err(TemplateError::from)
    }

    // ---- editing ----

    pub fn get_property_value(&self, element: NodeId, property: &PropertyDescriptor) -> Option<Value> {
        get_property_value(&self.document, element, property)
    }

    /// Write one property through its binding
    pub fn set_property_value(
        &mut self,
        element: NodeId,
        property: &PropertyDescriptor,
        value: Value,
    ) -> Result<NodeId> {
        let stamp = self
            .config
            .stamp_messages
            .then(|| AppliedTemplateRef::read(&self.document, element).map(|a| a.id))
            .flatten();
        self.edit(element, "propertiesPanel.zeebe.setPropertyValue", |tx| {
            match resolve(tx, element, &property.binding) {
                Some(handle) => handle.set(tx, value, stamp.as_deref()),
                None => Ok(()),
            }
        })
    }

    /// Set (or, with `None`, unset) attributes of an element
    pub fn update_properties(&mut self, element: NodeId, attrs: Vec<(String, Option<Value>)>) -> Result<NodeId> {
        self.update_node_properties(element, element, attrs)
    }

    /// Set attributes of a node belonging to an element, e.g. one of its
    /// extension elements
    pub fn update_node_properties(
        &mut self,
        element: NodeId,
        node: NodeId,
        attrs: Vec<(String, Option<Value>)>,
    ) -> Result<NodeId> {
        self.ensure_element(node)?;
        self.edit(element, "element.updateProperties", |tx| {
            for (key, value) in attrs {
                tx.write(node, &key, value)?;
            }
            Ok(())
        })
    }

    /// Run an edit and, in the same command, bring the element in line with
    /// the template properties the edit (de)activated.
    fn edit<F>(&mut self, element: NodeId, name: &str, body: F) -> Result<NodeId>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<()>,
    {
        self.ensure_element(element)?;
        let template = self.registry.get_applied(&self.document, element);
        let config = &self.config;
        self.commands.execute(&mut self.document, name, |tx| {
            let before = match template.as_deref() {
                Some(template) => Some(active_indices(tx, element, template, &Overrides::new())),
                None => None,
            };
            body(tx)?;
            match (template.as_deref(), before) {
                (Some(template), Some(before)) => engine::reapply_conditions(tx, element, template, before, config),
                _ => Ok(element),
            }
        })
    }

    pub fn undo(&mut self) -> Result<Option<String>> {
        Ok(self.commands.undo(&mut self.document)?)
    }

    pub fn redo(&mut self) -> Result<Option<String>> {
        Ok(self.commands.redo(&mut self.document)?)
    }

    // ---- projection ----

    pub fn template_group(&self, element: NodeId) -> Option<TemplateGroup> {
        projection::template_group(&self.document, &self.registry, element)
    }

    /// Custom property groups of the element's template; empty without one
    pub fn custom_groups(&self, element: NodeId, overrides: &Overrides) -> Vec<CustomGroup> {
        match self.get_for_element(element) {
            Some(template) => projection::custom_groups(&self.document, element, &template, overrides),
            None => Vec::new(),
        }
    }

    fn ensure_element(&self, element: NodeId) -> Result<()> {
        if self.document.contains(element) {
            Ok(())
        } else {
            Err(TemplateError::unknown_element(element))
        }
    }

    fn emit(&self, event: TemplateEvent) {
        log::trace!("Emitting {} for {}", event.name(), event.element());
        if let Err(e) = self.events.send(event) {
            log::warn!("Failed to deliver template event: {}", e);
        }
    }
}
