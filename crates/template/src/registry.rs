//! Registry: ordered collection of compiled templates.
//!
//! Templates registered before [`TemplateRegistry::mark_builtin_boundary`]
//! are built-ins and live until [`TemplateRegistry::destroy_all`]. Everything
//! after the boundary comes from configuration and is dropped as a unit by
//! [`TemplateRegistry::purge_after_boundary`] when configuration is reloaded.
//!
//! Templates are held as `Arc<Template>`, so a render that looked a template
//! up keeps it alive even if the registry drops it meanwhile.
//! [`SharedRegistry`] builds on that with generation swapping: renders read an
//! immutable snapshot while a reload prepares and publishes the next one.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::Template;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Refusing to register a disabled template")]
    Disabled,

    #[error("Built-in boundary already set after {0} templates")]
    BoundaryAlreadySet(usize),
}

#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: Vec<Arc<Template>>,
    /// Index of the first template registered under each name.
    by_name: HashMap<String, usize>,
    /// Number of built-in templates, once marked.
    boundary: Option<usize>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `template`. Disabled templates are rejected; a later duplicate
    /// name is kept but shadowed by the earlier one.
    pub fn register(&mut self, template: Template) -> Result<Arc<Template>, RegistryError> {
        if template.is_disabled() {
            return Err(RegistryError::Disabled);
        }
        match self.by_name.entry(template.name().to_string()) {
            Entry::Occupied(_) => warn!(
                template = template.name(),
                "duplicate template name, earlier definition wins"
            ),
            Entry::Vacant(slot) => {
                slot.insert(self.templates.len());
            }
        }
        let template = Arc::new(template);
        self.templates.push(Arc::clone(&template));
        Ok(template)
    }

    /// Exact, case-sensitive lookup. The first registered match wins.
    pub fn find_by_name(&self, name: &str) -> Option<Arc<Template>> {
        self.by_name
            .get(name)
            .map(|&idx| Arc::clone(&self.templates[idx]))
    }

    /// Declare everything registered so far permanent.
    pub fn mark_builtin_boundary(&mut self) -> Result<(), RegistryError> {
        if let Some(count) = self.boundary {
            return Err(RegistryError::BoundaryAlreadySet(count));
        }
        self.boundary = Some(self.templates.len());
        debug!(builtins = self.templates.len(), "built-in template boundary set");
        Ok(())
    }

    /// Drop every template registered after the boundary. Without a boundary
    /// nothing is dropped.
    pub fn purge_after_boundary(&mut self) -> usize {
        let Some(boundary) = self.boundary else {
            debug!("no built-in boundary set, nothing to purge");
            return 0;
        };
        let purged = self.templates.len().saturating_sub(boundary);
        self.templates.truncate(boundary);
        self.by_name.retain(|_, idx| *idx < boundary);
        debug!(purged, "configuration templates purged");
        purged
    }

    /// Drop all templates, built-ins included, and forget the boundary.
    pub fn destroy_all(&mut self) {
        self.templates.clear();
        self.by_name.clear();
        self.boundary = None;
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn builtin_count(&self) -> Option<usize> {
        self.boundary
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Template>> {
        self.templates.iter()
    }
}

impl fmt::Display for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for template in &self.templates {
            write!(f, "{}", template)?;
        }
        Ok(())
    }
}

/// A registry shared between the control thread and render threads.
#[derive(Debug, Default)]
pub struct SharedRegistry {
    current: RwLock<Arc<TemplateRegistry>>,
}

impl SharedRegistry {
    pub fn new(registry: TemplateRegistry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    /// The current generation. Stays valid across later reloads.
    pub fn snapshot(&self) -> Arc<TemplateRegistry> {
        Arc::clone(&self.current.read())
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<Template>> {
        self.current.read().find_by_name(name)
    }

    /// Build the next generation: purge configuration templates from a copy
    /// of the current one, let `f` register new ones, then publish it.
    pub fn reload<T>(&self, f: impl FnOnce(&mut TemplateRegistry) -> T) -> T {
        let mut guard = self.current.write();
        let mut next = TemplateRegistry::clone(&guard);
        next.purge_after_boundary();
        let out = f(&mut next);
        *guard = Arc::new(next);
        out
    }

    /// Publish an empty generation.
    pub fn destroy_all(&self) {
        *self.current.write() = Arc::new(TemplateRegistry::new());
    }
}
