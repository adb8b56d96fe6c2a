//! Typed objects backed by a registry.
//!
//! A [`ModelClass`] is an immutable schema (name, registry, unknown-key
//! policy) built once and shared through an [`Arc`]. A [`Model`] is an
//! instance of a class: an attribute map whose every write goes through the
//! class registry.
//!
//! # Write path
//!
//! All writes funnel through one place. A declared attribute is cast by its
//! definition; an undeclared one is handled by the class policy:
//!
//! | Policy | Undeclared write |
//! |--------|------------------|
//! | `raise` | [`AttributeError::Unknown`] |
//! | `strip` | dropped |
//! | `allow` | stored verbatim, serialized as-is unless it shadows a declared key |
//!
//! # Example
//!
//! ```
//! use aj_model::{AttributeDefinition, Model, ModelClass, ScalarKind, Value};
//!
//! let book = ModelClass::builder("Book")
//!     .attribute(AttributeDefinition::builder("title", ScalarKind::String).build()?)
//!     .attribute(
//!         AttributeDefinition::builder("pages", ScalarKind::Integer)
//!             .store_key("p")
//!             .default(0)
//!             .build()?,
//!     )
//!     .build()?;
//!
//! let mut model = Model::new(&book)?;
//! model.set("title", "Dune")?;
//! assert_eq!(model.get("pages")?, &Value::Integer(0));
//! // Defaults are filled first, later writes follow in order
//! assert_eq!(model.to_json()?.to_string(), r#"{"p":0,"title":"Dune"}"#);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map as JsonMap, Value as Json};
use tracing::debug;

use aj_core::{AttributeError, CastError, DefinitionError, ModelConfig, UnknownKeyPolicy};

use crate::container::ContainerCodec;
use crate::definition::AttributeDefinition;
use crate::registry::Registry;
use crate::types::Type;
use crate::value::{Value, ValueMap};

/// The schema of a typed object.
#[derive(Debug)]
pub struct ModelClass {
    name: String,
    registry: Registry,
    unknown_key: UnknownKeyPolicy,
}

impl ModelClass {
    /// Starts building a class named `name`.
    ///
    /// The name is the stable identifier written as a union discriminator.
    pub fn builder(name: impl Into<String>) -> ModelClassBuilder {
        ModelClassBuilder {
            name: name.into(),
            base: Registry::new(),
            attributes: Vec::new(),
            unknown_key: UnknownKeyPolicy::default(),
        }
    }

    /// Returns the class name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the attribute registry.
    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the unknown-key policy.
    #[inline]
    #[must_use]
    pub const fn unknown_key(&self) -> UnknownKeyPolicy {
        self.unknown_key
    }

    /// Returns the codec for this class's (container-less) attributes.
    #[must_use]
    pub const fn codec(&self) -> ContainerCodec<'_> {
        ContainerCodec::new(&self.registry, None)
    }

    /// Returns the model type for this class.
    #[must_use]
    pub fn to_type(self: &Arc<Self>) -> Type {
        Type::from(self)
    }

    /// Returns an array-of-model type for this class.
    #[must_use]
    pub fn array_type(self: &Arc<Self>) -> Type {
        self.to_type().array_of()
    }
}

/// Builder for [`ModelClass`].
#[derive(Debug)]
#[must_use]
pub struct ModelClassBuilder {
    name: String,
    base: Registry,
    attributes: Vec<AttributeDefinition>,
    unknown_key: UnknownKeyPolicy,
}

impl ModelClassBuilder {
    /// Declares an attribute.
    pub fn attribute(mut self, definition: AttributeDefinition) -> Self {
        self.attributes.push(definition);
        self
    }

    /// Starts from a copy of `parent`'s attributes.
    ///
    /// The parent registry is copied, not referenced. The parent's
    /// unknown-key policy is inherited unless overridden.
    pub fn extends(mut self, parent: &ModelClass) -> Self {
        self.base = parent.registry.clone();
        self.unknown_key = parent.unknown_key;
        self
    }

    /// Sets the unknown-key policy.
    pub const fn unknown_key(mut self, policy: UnknownKeyPolicy) -> Self {
        self.unknown_key = policy;
        self
    }

    /// Applies model configuration.
    pub const fn config(self, config: &ModelConfig) -> Self {
        self.unknown_key(config.unknown_key)
    }

    /// Validates and builds the class.
    ///
    /// # Errors
    ///
    /// Returns a [`DefinitionError`] for an empty name, name or store-key
    /// collisions, or an attribute that names a container.
    pub fn build(self) -> Result<Arc<ModelClass>, DefinitionError> {
        if self.name.is_empty() {
            return Err(DefinitionError::invalid_option(
                "<model>",
                "name",
                "must not be empty",
            ));
        }
        if let Some(def) = self.attributes.iter().find(|def| def.container().is_some()) {
            return Err(DefinitionError::invalid_option(
                def.name(),
                "container",
                format!("attributes of model '{}' cannot name a container", self.name),
            ));
        }

        let registry = self.base.with(self.attributes)?;
        debug!(
            model = %self.name,
            attributes = registry.len(),
            unknown_key = self.unknown_key.label(),
            "Model class built"
        );

        Ok(Arc::new(ModelClass {
            name: self.name,
            registry,
            unknown_key: self.unknown_key,
        }))
    }
}

/// Applies an unknown-key policy to one undeclared write, returning the
/// entry to keep, if any.
///
/// A stored key that matches a declared attribute's name (rather than its
/// store key) is never kept: it would overwrite the cast value.
pub(crate) fn admit_unknown(
    policy: UnknownKeyPolicy,
    owner: &str,
    registry: &Registry,
    name: String,
    value: Value,
) -> Result<Option<(String, Value)>, CastError> {
    if policy == UnknownKeyPolicy::Raise {
        return Err(CastError::UnknownAttribute {
            owner: owner.to_owned(),
            name,
        });
    }
    if !policy.keeps_value() {
        debug!(owner, attribute = %name, "Stripping unknown attribute");
        return Ok(None);
    }
    if registry.contains(&name) {
        debug!(owner, attribute = %name, "Skipping stored key that shadows a declared attribute");
        return Ok(None);
    }
    Ok(Some((name, value)))
}

/// Placeholder for declared attributes that have no value yet.
pub(crate) static NULL: Value = Value::Null;

/// An instance of a [`ModelClass`].
///
/// Two models are equal when they belong to classes of the same name and hold
/// equal attributes.
#[derive(Clone)]
pub struct Model {
    class: Arc<ModelClass>,
    attributes: ValueMap,
}

impl Model {
    /// Creates an instance with defaults filled in.
    ///
    /// # Errors
    ///
    /// Returns a [`CastError`] if a default fails to cast.
    pub fn new(class: &Arc<ModelClass>) -> Result<Self, CastError> {
        Self::from_attributes(class, ValueMap::new())
    }

    /// Creates an instance from attribute-name keyed input (the cast path).
    ///
    /// Declared attributes are cast, missing ones take their default, and
    /// undeclared ones follow the class policy.
    ///
    /// # Errors
    ///
    /// Returns a [`CastError`] if an attribute fails to cast, or
    /// [`CastError::UnknownAttribute`] for undeclared input under `raise`.
    pub fn from_attributes(class: &Arc<ModelClass>, mut input: ValueMap) -> Result<Self, CastError> {
        let mut attributes = ValueMap::with_capacity(class.registry.len());
        for def in class.registry.definitions() {
            if let Some(value) = input.shift_remove(def.name()) {
                attributes.insert(def.name().to_owned(), def.cast(value)?);
            } else if def.has_default() {
                attributes.insert(def.name().to_owned(), def.provide_default()?);
            }
        }

        for (name, value) in input {
            attributes.extend(admit_unknown(
                class.unknown_key,
                &class.name,
                &class.registry,
                name,
                value,
            )?);
        }

        Ok(Self {
            class: Arc::clone(class),
            attributes,
        })
    }

    /// Creates an instance from its stored, store-key keyed form (the
    /// deserialize path).
    ///
    /// # Errors
    ///
    /// Returns a [`CastError`] if an attribute fails to deserialize, or
    /// [`CastError::UnknownAttribute`] for undeclared keys under `raise`.
    pub fn from_serializable(
        class: &Arc<ModelClass>,
        stored: JsonMap<String, Json>,
    ) -> Result<Self, CastError> {
        let (mut attributes, unknown) = class.codec().deserialize_parts(stored)?;
        for (key, json) in unknown {
            attributes.extend(admit_unknown(
                class.unknown_key,
                &class.name,
                &class.registry,
                key,
                Value::from(json),
            )?);
        }

        // Stored key order is not meaningful; keep declaration order
        let position = |name: &str| class.registry.position(name).unwrap_or(usize::MAX);
        attributes.sort_by(|a, _, b, _| position(a).cmp(&position(b)));

        Ok(Self {
            class: Arc::clone(class),
            attributes,
        })
    }

    /// Returns the class of this instance.
    #[inline]
    #[must_use]
    pub const fn class(&self) -> &Arc<ModelClass> {
        &self.class
    }

    /// Returns `true` if the class declares `name`.
    #[inline]
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.class.registry.contains(name)
    }

    /// Reads an attribute.
    ///
    /// Declared attributes without a value read as [`Value::Null`];
    /// undeclared ones are only readable if stored under the `allow` policy.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::Unknown`] for an undeclared, unset name.
    pub fn get(&self, name: &str) -> Result<&Value, AttributeError> {
        match self.attributes.get(name) {
            Some(value) => Ok(value),
            None if self.has_attribute(name) => Ok(&NULL),
            None => Err(AttributeError::unknown(self.class.name(), name)),
        }
    }

    /// Writes an attribute through the class registry.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::Unknown`] for an undeclared name under
    /// `raise`, or [`AttributeError::Cast`] if the value fails to cast.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), AttributeError> {
        let value = value.into();
        match self.class.registry.get(name) {
            Some(def) => {
                let cast = def.cast(value)?;
                self.attributes.insert(name.to_owned(), cast);
                Ok(())
            }
            None => {
                let kept = admit_unknown(
                    self.class.unknown_key,
                    &self.class.name,
                    &self.class.registry,
                    name.to_owned(),
                    value,
                )?;
                self.attributes.extend(kept);
                Ok(())
            }
        }
    }

    /// Returns the attribute map, keyed by attribute name.
    #[inline]
    #[must_use]
    pub const fn attributes(&self) -> &ValueMap {
        &self.attributes
    }

    /// Consumes the model, returning its attribute map.
    #[must_use]
    pub fn into_attributes(self) -> ValueMap {
        self.attributes
    }

    /// Serializes to a store-key keyed JSON object.
    ///
    /// # Errors
    ///
    /// Returns the first failing attribute's [`CastError`].
    pub fn serialize(&self) -> Result<JsonMap<String, Json>, CastError> {
        self.class.codec().serialize_container(&self.attributes)
    }

    /// Serializes to a JSON value (always an object).
    ///
    /// # Errors
    ///
    /// See [`Model::serialize`].
    pub fn to_json(&self) -> Result<Json, CastError> {
        self.serialize().map(Json::Object)
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.class.name == other.class.name && self.attributes == other.attributes
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("class", &self.class.name)
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Self::serialize(self)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}
