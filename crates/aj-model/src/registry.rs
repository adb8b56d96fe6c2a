//! Attribute registries.
//!
//! A [`Registry`] is an immutable, insertion-ordered set of
//! [`AttributeDefinition`]s with two invariants:
//!
//! - attribute names are unique
//! - store keys are unique within each container
//!
//! Registries are never modified in place. [`Registry::with`] and
//! [`Registry::merge`] return a new registry, leaving the original untouched,
//! which is how inheritance is expressed: a child starts from a copy of its
//! parent's registry.
//!
//! # Usage
//!
//! ```
//! use aj_model::{AttributeDefinition, Registry, ScalarKind};
//!
//! let base = Registry::new()
//!     .with([AttributeDefinition::builder("title", ScalarKind::String).build()?])?;
//! let extended = base.with([AttributeDefinition::builder("count", ScalarKind::Integer).build()?])?;
//!
//! assert!(!base.contains("count"));
//! assert_eq!(extended.attribute_names().collect::<Vec<_>>(), ["title", "count"]);
//! # Ok::<(), aj_core::DefinitionError>(())
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use aj_core::{AttributeError, DefinitionError, FxHashMap};

use crate::definition::AttributeDefinition;

/// Index key for definitions without a container (nested models).
const NO_CONTAINER: &str = "";

/// An immutable collection of attribute definitions.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Definitions by attribute name, in declaration order.
    definitions: IndexMap<String, Arc<AttributeDefinition>>,

    /// Attribute name by container, then store key.
    store_keys: FxHashMap<String, FxHashMap<String, String>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a definition by attribute name.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::NotFound`] if no attribute has this name.
    pub fn fetch(&self, name: &str) -> Result<&Arc<AttributeDefinition>, AttributeError> {
        self.get(name)
            .ok_or_else(|| AttributeError::NotFound(name.to_owned()))
    }

    /// Looks up a definition by attribute name.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<AttributeDefinition>> {
        self.definitions.get(name)
    }

    /// Returns the declaration index of an attribute.
    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.definitions.get_index_of(name)
    }

    /// Looks up the definition stored under `store_key` in `container`.
    #[must_use]
    pub fn store_key_lookup(
        &self,
        container: Option<&str>,
        store_key: &str,
    ) -> Option<&Arc<AttributeDefinition>> {
        self.store_keys
            .get(container.unwrap_or(NO_CONTAINER))
            .and_then(|keys| keys.get(store_key))
            .and_then(|name| self.definitions.get(name))
    }

    /// Returns a new registry with `definitions` added.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::DuplicateAttribute`] or
    /// [`DefinitionError::DuplicateStoreKey`] if any definition collides
    /// with an existing one or with an earlier one in the same batch.
    pub fn with(
        &self,
        definitions: impl IntoIterator<Item = AttributeDefinition>,
    ) -> Result<Self, DefinitionError> {
        self.extend(definitions.into_iter().map(Arc::new))
    }

    /// Returns a new registry with a single definition added.
    ///
    /// # Errors
    ///
    /// See [`Registry::with`].
    pub fn with_definition(&self, definition: AttributeDefinition) -> Result<Self, DefinitionError> {
        self.with([definition])
    }

    /// Returns a new registry containing the definitions of both registries.
    ///
    /// # Errors
    ///
    /// See [`Registry::with`].
    pub fn merge(&self, other: &Self) -> Result<Self, DefinitionError> {
        self.extend(other.definitions.values().cloned())
    }

    fn extend(
        &self,
        definitions: impl IntoIterator<Item = Arc<AttributeDefinition>>,
    ) -> Result<Self, DefinitionError> {
        let mut next = self.clone();
        let mut added = 0usize;
        for definition in definitions {
            next.insert(definition)?;
            added += 1;
        }

        debug!(added, total = next.len(), "Registry extended");
        Ok(next)
    }

    fn insert(&mut self, definition: Arc<AttributeDefinition>) -> Result<(), DefinitionError> {
        if self.definitions.contains_key(definition.name()) {
            return Err(DefinitionError::duplicate_attribute(definition.name()));
        }

        let container = definition.container().unwrap_or(NO_CONTAINER);
        let keys = self.store_keys.entry(container.to_owned()).or_default();
        if let Some(existing) = keys.get(definition.store_key()) {
            return Err(DefinitionError::DuplicateStoreKey {
                container: definition.container().unwrap_or("-").to_owned(),
                store_key: definition.store_key().to_owned(),
                existing: existing.clone(),
            });
        }

        keys.insert(definition.store_key().to_owned(), definition.name().to_owned());
        self.definitions
            .insert(definition.name().to_owned(), definition);
        Ok(())
    }

    /// Iterates over definitions in declaration order.
    pub fn definitions(&self) -> impl Iterator<Item = &Arc<AttributeDefinition>> {
        self.definitions.values()
    }

    /// Iterates over attribute names in declaration order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Returns the distinct containers referenced, in first-use order.
    #[must_use]
    pub fn containers(&self) -> Vec<&str> {
        let mut containers: Vec<&str> = Vec::new();
        for container in self.definitions.values().filter_map(|def| def.container()) {
            if !containers.contains(&container) {
                containers.push(container);
            }
        }
        containers
    }

    /// Iterates over the definitions placed in `container`.
    pub fn definitions_in<'a>(
        &'a self,
        container: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Arc<AttributeDefinition>> + 'a {
        self.definitions
            .values()
            .filter(move |def| def.container() == container)
    }

    /// Returns the number of definitions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns `true` if there are no definitions.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns `true` if an attribute with this name exists.
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }
}
