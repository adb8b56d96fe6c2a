//! Per-container encoding of attribute sets.
//!
//! A container is one JSON object (typically a database column) holding the
//! attributes that share it. [`ContainerCodec`] moves an attribute set in
//! and out of that object:
//!
//! | Operation | Input keys | Output keys |
//! |-----------|------------|-------------|
//! | [`cast_container`](ContainerCodec::cast_container) | store key | store key |
//! | [`serialize_container`](ContainerCodec::serialize_container) | attribute name | store key |
//! | [`deserialize_container`](ContainerCodec::deserialize_container) | store key | attribute name |
//!
//! Missing attributes with a default are filled in; keys that match no
//! definition pass through untouched.

use serde_json::{Map as JsonMap, Value as Json};
use tracing::debug;

use aj_core::CastError;

use crate::registry::Registry;
use crate::value::{Value, ValueMap};

/// Encodes and decodes one container of a registry.
#[derive(Debug, Clone, Copy)]
pub struct ContainerCodec<'a> {
    registry: &'a Registry,
    container: Option<&'a str>,
}

impl<'a> ContainerCodec<'a> {
    /// Creates a codec for `container` (`None` for nested models).
    #[must_use]
    pub const fn new(registry: &'a Registry, container: Option<&'a str>) -> Self {
        Self {
            registry,
            container,
        }
    }

    /// Returns the container handled by this codec.
    #[inline]
    #[must_use]
    pub const fn container(&self) -> Option<&'a str> {
        self.container
    }

    /// Casts every known entry of a store-keyed mapping and fills defaults.
    ///
    /// # Errors
    ///
    /// Returns the first failing attribute's [`CastError`].
    pub fn cast_container(&self, raw: ValueMap) -> Result<ValueMap, CastError> {
        let mut cast = ValueMap::with_capacity(raw.len());
        for (key, value) in raw {
            let value = match self.registry.store_key_lookup(self.container, &key) {
                Some(def) => def.cast(value)?,
                None => value,
            };
            cast.insert(key, value);
        }

        for def in self.registry.definitions_in(self.container) {
            if def.has_default() && !cast.contains_key(def.store_key()) {
                cast.insert(def.store_key().to_owned(), def.provide_default()?);
            }
        }
        Ok(cast)
    }

    /// Serializes an attribute-name keyed mapping into a store-keyed object.
    ///
    /// Undeclared entries pass through under their own name, unless that
    /// name is a store key of this container; those are dropped.
    ///
    /// # Errors
    ///
    /// Returns the first failing attribute's [`CastError`].
    pub fn serialize_container(&self, mapping: &ValueMap) -> Result<JsonMap<String, Json>, CastError> {
        let mut object = JsonMap::new();
        for (name, value) in mapping {
            match self
                .registry
                .get(name)
                .filter(|def| def.container() == self.container)
            {
                Some(def) => {
                    object.insert(def.store_key().to_owned(), def.serialize(value)?);
                }
                None if self.registry.store_key_lookup(self.container, name).is_some() => {
                    debug!(key = %name, "Skipping undeclared value that shadows a store key");
                }
                None => {
                    object.insert(name.clone(), value.to_json()?);
                }
            }
        }
        Ok(object)
    }

    /// Deserializes a store-keyed object into an attribute-name keyed
    /// mapping and fills defaults.
    ///
    /// # Errors
    ///
    /// Returns the first failing attribute's [`CastError`].
    pub fn deserialize_container(&self, raw: JsonMap<String, Json>) -> Result<ValueMap, CastError> {
        let (mut known, unknown) = self.deserialize_parts(raw)?;
        for (key, json) in unknown {
            known.entry(key).or_insert_with(|| Value::from(json));
        }
        Ok(known)
    }

    /// Like [`deserialize_container`](Self::deserialize_container), but
    /// returns unmatched entries separately so callers can apply an
    /// unknown-key policy.
    pub(crate) fn deserialize_parts(
        &self,
        raw: JsonMap<String, Json>,
    ) -> Result<(ValueMap, JsonMap<String, Json>), CastError> {
        let mut known = ValueMap::with_capacity(raw.len());
        let mut unknown = JsonMap::new();

        for (key, json) in raw {
            match self.registry.store_key_lookup(self.container, &key) {
                Some(def) => {
                    known.insert(def.name().to_owned(), def.deserialize(json)?);
                }
                None => {
                    unknown.insert(key, json);
                }
            }
        }

        for def in self.registry.definitions_in(self.container) {
            if def.has_default() && !known.contains_key(def.name()) {
                known.insert(def.name().to_owned(), def.provide_default()?);
            }
        }
        Ok((known, unknown))
    }
}
