//! Template registry
//!
//! In-memory catalog of template descriptors grouped into version families
//! (templates sharing an `id`). Iteration order is deterministic: families by
//! id, members by version with the unversioned member first.

use std::collections::BTreeMap;
use std::sync::Arc;

use bpmn_document::{Document, NodeId};

use crate::error::{Result, TemplateError};
use crate::marker::AppliedTemplateRef;
use crate::template::ElementTemplate;

/// Query scope of [`TemplateRegistry::get_all`] and
/// [`TemplateRegistry::get_latest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFilter<'a> {
    /// The whole catalog
    All,
    /// One version family
    Id(&'a str),
    /// Templates applicable to an element
    Element(NodeId),
}

impl<'a> From<&'a str> for TemplateFilter<'a> {
    fn from(id: &'a str) -> Self {
        TemplateFilter::Id(id)
    }
}

impl From<NodeId> for TemplateFilter<'_> {
    fn from(element: NodeId) -> Self {
        TemplateFilter::Element(element)
    }
}

impl<'a> TemplateFilter<'a> {
    /// Interpret a loosely typed filter argument: `null` for everything, a
    /// string for a family id, or `{"element": "<diagram id>"}`.
    pub fn from_json(doc: &Document, value: &'a serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Null => Ok(TemplateFilter::All),
            serde_json::Value::String(id) => Ok(TemplateFilter::Id(id)),
            serde_json::Value::Object(object) => {
                let id = object
                    .get("element")
                    .and_then(|e| e.as_str())
                    .ok_or(TemplateError::InvalidFilter)?;
                doc.element(id)
                    .map(TemplateFilter::Element)
                    .ok_or_else(|| TemplateError::UnknownElement(id.to_string()))
            }
            _ => Err(TemplateError::InvalidFilter),
        }
    }
}

/// Options of [`TemplateRegistry::get_latest`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatestOptions {
    /// Also consider deprecated templates
    pub deprecated: bool,
}

type Family = BTreeMap<Option<u32>, Arc<ElementTemplate>>;

/// Catalog of element templates indexed by id and version
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    families: BTreeMap<String, Family>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole catalog.
    ///
    /// Fails on a duplicate `(id, version)` pair, leaving the previous
    /// catalog in place.
    pub fn set(&mut self, templates: Vec<ElementTemplate>) -> Result<()> {
        let mut families: BTreeMap<String, Family> = BTreeMap::new();
        let count = templates.len();
        for template in templates {
            let family = families.entry(template.id.clone()).or_default();
            if family.contains_key(&template.version) {
                return Err(TemplateError::DuplicateTemplate {
                    version: template
                        .version
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "none".into()),
                    id: template.id,
                });
            }
            family.insert(template.version, Arc::new(template));
        }
        log::info!(
            "Loaded {} element templates in {} families",
            count,
            families.len()
        );
        self.families = families;
        Ok(())
    }

    /// Number of templates in the catalog
    pub fn len(&self) -> usize {
        self.families.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Template with exactly this id and version (`None` = unversioned)
    pub fn get(&self, id: &str, version: Option<u32>) -> Option<Arc<ElementTemplate>> {
        self.families.get(id)?.get(&version).cloned()
    }

    pub fn get_ref(&self, applied: &AppliedTemplateRef) -> Option<Arc<ElementTemplate>> {
        self.get(&applied.id, applied.version)
    }

    /// Template currently applied to an element, per its marker
    pub fn get_applied(&self, doc: &Document, element: NodeId) -> Option<Arc<ElementTemplate>> {
        let applied = AppliedTemplateRef::read(doc, element)?;
        let template = self.get_ref(&applied);
        if template.is_none() {
            log::debug!(
                "Element {} uses template '{}' which is not in the catalog",
                element,
                applied.id
            );
        }
        template
    }

    /// Every template in scope, in catalog order
    pub fn get_all(&self, doc: &Document, filter: TemplateFilter<'_>) -> Vec<Arc<ElementTemplate>> {
        self.families_in_scope(filter)
            .flat_map(|family| family.values())
            .filter(|template| Self::matches(doc, filter, template))
            .cloned()
            .collect()
    }

    /// The latest member of each family in scope.
    ///
    /// Deprecated members are skipped unless requested, so a family whose
    /// members are all deprecated contributes nothing.
    pub fn get_latest(
        &self,
        doc: &Document,
        filter: TemplateFilter<'_>,
        options: LatestOptions,
    ) -> Vec<Arc<ElementTemplate>> {
        self.families_in_scope(filter)
            .filter_map(|family| {
                family
                    .values()
                    .filter(|template| options.deprecated || !template.is_deprecated())
                    .filter(|template| Self::matches(doc, filter, template))
                    .next_back()
                    .cloned()
            })
            .collect()
    }

    /// Latest non-deprecated member of one family
    pub fn latest_of(&self, id: &str) -> Option<Arc<ElementTemplate>> {
        self.families
            .get(id)?
            .values()
            .filter(|template| !template.is_deprecated())
            .next_back()
            .cloned()
    }

    /// Whether `template` declares itself applicable to the element's type
    pub fn applies_to(doc: &Document, element: NodeId, template: &ElementTemplate) -> bool {
        template
            .applies_to
            .iter()
            .any(|node_type| doc.is(element, node_type))
    }

    fn families_in_scope<'s>(&'s self, filter: TemplateFilter<'_>) -> Box<dyn Iterator<Item = &'s Family> + 's> {
        match filter {
            TemplateFilter::Id(id) => Box::new(self.families.get(id).into_iter()),
            TemplateFilter::All | TemplateFilter::Element(_) => Box::new(self.families.values()),
        }
    }

    fn matches(doc: &Document, filter: TemplateFilter<'_>, template: &ElementTemplate) -> bool {
        match filter {
            TemplateFilter::Element(element) => Self::applies_to(doc, element, template),
            TemplateFilter::All | TemplateFilter::Id(_) => true,
        }
    }
}
