//! Typed attributes spread over the JSON columns of a host record.
//!
//! A [`RecordSchema`] is the record-side counterpart of a
//! [`ModelClass`](crate::ModelClass): its attributes live in named
//! containers (JSON columns), with `json_attributes` as the default. A
//! [`Record`] holds the attribute values of one row and converts to and from
//! the column objects.
//!
//! ```
//! use aj_model::{AttributeDefinition, Record, RecordSchema, ScalarKind, Value};
//! use serde_json::json;
//!
//! let schema = RecordSchema::builder()
//!     .attribute(AttributeDefinition::builder("title", ScalarKind::String).build()?)
//!     .attribute(
//!         AttributeDefinition::builder("theme", ScalarKind::String)
//!             .container("settings")
//!             .default("dark")
//!             .build()?,
//!     )
//!     .build()?;
//!
//! let mut record = Record::new(&schema)?;
//! record.set("title", 42)?;
//! assert_eq!(record.get("title")?, &Value::from("42"));
//!
//! let columns = record.to_columns()?;
//! assert_eq!(columns["json_attributes"], json!({"title": "42"}));
//! assert_eq!(columns["settings"], json!({"theme": "dark"}));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::{Map as JsonMap, Value as Json};
use tracing::debug;

use aj_core::{
    AttributeError, CastError, DefinitionError, FxHashMap, RecordConfig, UnknownKeyPolicy,
};

use crate::container::ContainerCodec;
use crate::definition::AttributeDefinition;
use crate::model::{NULL, admit_unknown};
use crate::registry::Registry;
use crate::value::{Value, ValueMap};

/// The typed attributes declared on a record type.
#[derive(Debug)]
pub struct RecordSchema {
    registry: Registry,
    default_container: String,
    unknown_key: UnknownKeyPolicy,
}

impl RecordSchema {
    /// Starts building a schema with default settings.
    pub fn builder() -> RecordSchemaBuilder {
        RecordSchemaBuilder::from_config(&RecordConfig::default())
    }

    /// Starts building a schema that inherits this schema's attributes.
    pub fn extend(&self) -> RecordSchemaBuilder {
        RecordSchemaBuilder {
            base: self.registry.clone(),
            attributes: Vec::new(),
            default_container: self.default_container.clone(),
            unknown_key: self.unknown_key,
        }
    }

    /// Returns the attribute registry.
    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the container used by attributes that do not name one.
    #[inline]
    #[must_use]
    pub fn default_container(&self) -> &str {
        &self.default_container
    }

    /// Returns the unknown-key policy.
    #[inline]
    #[must_use]
    pub const fn unknown_key(&self) -> UnknownKeyPolicy {
        self.unknown_key
    }

    /// Returns every column this schema writes: the containers referenced by
    /// attributes, plus the default container.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        let mut columns = self.registry.containers();
        if !columns.contains(&self.default_container.as_str()) {
            columns.push(&self.default_container);
        }
        columns
    }

    /// Returns the codec for one container.
    #[must_use]
    pub const fn codec<'a>(&'a self, container: &'a str) -> ContainerCodec<'a> {
        ContainerCodec::new(&self.registry, Some(container))
    }
}

/// Builder for [`RecordSchema`].
#[derive(Debug)]
#[must_use]
pub struct RecordSchemaBuilder {
    base: Registry,
    attributes: Vec<AttributeDefinition>,
    default_container: String,
    unknown_key: UnknownKeyPolicy,
}

impl RecordSchemaBuilder {
    /// Starts an empty builder from record configuration.
    pub fn from_config(config: &RecordConfig) -> Self {
        Self {
            base: Registry::new(),
            attributes: Vec::new(),
            default_container: config.default_container.clone(),
            unknown_key: config.unknown_key,
        }
    }

    /// Sets the default container.
    pub fn default_container(mut self, container: impl Into<String>) -> Self {
        self.default_container = container.into();
        self
    }

    /// Sets the unknown-key policy.
    pub const fn unknown_key(mut self, policy: UnknownKeyPolicy) -> Self {
        self.unknown_key = policy;
        self
    }

    /// Declares an attribute.
    pub fn attribute(mut self, definition: AttributeDefinition) -> Self {
        self.attributes.push(definition);
        self
    }

    /// Validates and builds the schema.
    ///
    /// # Errors
    ///
    /// Returns a [`DefinitionError`] for an empty default container or for
    /// name and store-key collisions.
    pub fn build(self) -> Result<Arc<RecordSchema>, DefinitionError> {
        if self.default_container.is_empty() {
            return Err(DefinitionError::invalid_option(
                "<record>",
                "default_container",
                "must not be empty",
            ));
        }

        let attributes = self.attributes.into_iter().map(|def| {
            if def.container().is_some() {
                def
            } else {
                def.in_container(&self.default_container)
            }
        });
        let registry = self.base.with(attributes)?;
        debug!(
            attributes = registry.len(),
            default_container = %self.default_container,
            "Record schema built"
        );

        Ok(Arc::new(RecordSchema {
            registry,
            default_container: self.default_container,
            unknown_key: self.unknown_key,
        }))
    }
}

/// The typed attribute values of one record.
///
/// Undeclared values kept under the `allow` policy are held per column, so
/// they are written back to the column they were loaded from.
#[derive(Clone)]
pub struct Record {
    schema: Arc<RecordSchema>,
    attributes: ValueMap,
    unknown: FxHashMap<String, ValueMap>,
}

impl Record {
    /// Creates a record with defaults filled in.
    ///
    /// # Errors
    ///
    /// Returns a [`CastError`] if a default fails to cast.
    pub fn new(schema: &Arc<RecordSchema>) -> Result<Self, CastError> {
        let mut attributes = ValueMap::with_capacity(schema.registry.len());
        for def in schema.registry.definitions() {
            if def.has_default() {
                attributes.insert(def.name().to_owned(), def.provide_default()?);
            }
        }
        Ok(Self {
            schema: Arc::clone(schema),
            attributes,
            unknown: FxHashMap::default(),
        })
    }

    /// Loads a record from its column objects.
    ///
    /// Missing or `null` columns are treated as empty objects. Keys that
    /// match no attribute follow the schema's unknown-key policy.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::Unknown`] for undeclared keys under `raise`,
    /// or [`AttributeError::Cast`] if a stored value fails to deserialize.
    pub fn load(
        schema: &Arc<RecordSchema>,
        columns: &JsonMap<String, Json>,
    ) -> Result<Self, AttributeError> {
        let mut attributes = ValueMap::new();
        let mut unknown: FxHashMap<String, ValueMap> = FxHashMap::default();

        for column in schema.columns() {
            let stored = match columns.get(column) {
                Some(Json::Object(object)) => object.clone(),
                Some(Json::Null) | None => JsonMap::new(),
                Some(other) => {
                    debug!(column, found = %other, "Ignoring non-object container column");
                    JsonMap::new()
                }
            };

            let (known, undeclared) = schema.codec(column).deserialize_parts(stored)?;
            attributes.extend(known);

            let mut kept = ValueMap::new();
            for (key, json) in undeclared {
                kept.extend(admit_unknown(
                    schema.unknown_key,
                    "record",
                    &schema.registry,
                    key,
                    Value::from(json),
                )?);
            }
            if !kept.is_empty() {
                unknown.insert(column.to_owned(), kept);
            }
        }

        Ok(Self {
            schema: Arc::clone(schema),
            attributes,
            unknown,
        })
    }

    /// Returns the schema of this record.
    #[inline]
    #[must_use]
    pub const fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Returns the declared attribute values, keyed by attribute name.
    #[inline]
    #[must_use]
    pub const fn attributes(&self) -> &ValueMap {
        &self.attributes
    }

    /// Returns the undeclared values kept for one column.
    #[must_use]
    pub fn unknown_in(&self, container: &str) -> Option<&ValueMap> {
        self.unknown.get(container)
    }

    /// Returns the column holding the undeclared value `name`, searching
    /// columns in schema order.
    fn unknown_column(&self, name: &str) -> Option<&str> {
        self.schema.columns().into_iter().find(|column| {
            self.unknown
                .get(*column)
                .is_some_and(|values| values.contains_key(name))
        })
    }

    /// Reads an attribute.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::Unknown`] for an undeclared, unset name.
    pub fn get(&self, name: &str) -> Result<&Value, AttributeError> {
        if let Some(value) = self.attributes.get(name) {
            return Ok(value);
        }
        if self.schema.registry.contains(name) {
            return Ok(&NULL);
        }
        self.unknown_column(name)
            .and_then(|column| self.unknown.get(column))
            .and_then(|values| values.get(name))
            .ok_or_else(|| AttributeError::unknown("record", name))
    }

    /// Writes an attribute through the schema registry.
    ///
    /// An undeclared value kept under `allow` replaces the one already held
    /// in its column, or goes to the default container if it is new.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::Unknown`] for an undeclared name under
    /// `raise`, or [`AttributeError::Cast`] if the value fails to cast.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), AttributeError> {
        let value = value.into();
        if let Some(def) = self.schema.registry.get(name) {
            let cast = def.cast(value)?;
            self.attributes.insert(name.to_owned(), cast);
            return Ok(());
        }

        let kept = admit_unknown(
            self.schema.unknown_key,
            "record",
            &self.schema.registry,
            name.to_owned(),
            value,
        )?;
        if let Some((name, value)) = kept {
            let column = self
                .unknown_column(&name)
                .unwrap_or(&self.schema.default_container)
                .to_owned();
            self.unknown.entry(column).or_default().insert(name, value);
        }
        Ok(())
    }

    /// Serializes the attributes stored in one container.
    ///
    /// # Errors
    ///
    /// Returns the first failing attribute's [`CastError`].
    pub fn container_json(&self, container: &str) -> Result<JsonMap<String, Json>, CastError> {
        let registry = &self.schema.registry;

        let mut in_container: ValueMap = self
            .attributes
            .iter()
            .filter(|(name, _)| {
                registry
                    .get(name)
                    .is_some_and(|def| def.container() == Some(container))
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        if let Some(values) = self.unknown.get(container) {
            in_container.extend(values.iter().map(|(name, value)| (name.clone(), value.clone())));
        }

        self.schema.codec(container).serialize_container(&in_container)
    }

    /// Serializes every column, keyed by column name.
    ///
    /// # Errors
    ///
    /// Returns the first failing attribute's [`CastError`].
    pub fn to_columns(&self) -> Result<JsonMap<String, Json>, CastError> {
        self.schema
            .columns()
            .into_iter()
            .map(|column| Ok((column.to_owned(), Json::Object(self.container_json(column)?))))
            .collect()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema)
            && self.attributes == other.attributes
            && self.unknown == other.unknown
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("attributes", &self.attributes)
            .field("unknown", &self.unknown)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelClass;
    use crate::types::ScalarKind;
    use serde_json::json;

    fn columns(json: Json) -> JsonMap<String, Json> {
        match json {
            Json::Object(object) => object,
            _ => panic!("expected an object"),
        }
    }

    fn schema(policy: UnknownKeyPolicy) -> Arc<RecordSchema> {
        RecordSchema::builder()
            .unknown_key(policy)
            .attribute(
                AttributeDefinition::builder("title", ScalarKind::String)
                    .build()
                    .unwrap(),
            )
            .attribute(
                AttributeDefinition::builder("count", ScalarKind::Integer)
                    .default(0)
                    .build()
                    .unwrap(),
            )
            .attribute(
                AttributeDefinition::builder("theme", ScalarKind::String)
                    .container("settings")
                    .store_key("t")
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_attributes_land_in_default_container() {
        let schema = schema(UnknownKeyPolicy::Raise);
        let title = schema.registry().fetch("title").unwrap();
        assert_eq!(title.container(), Some("json_attributes"));
        assert_eq!(schema.columns(), ["json_attributes", "settings"]);
    }

    #[test]
    fn test_load_and_write_columns() {
        let schema = schema(UnknownKeyPolicy::Raise);
        let record = Record::load(
            &schema,
            &columns(json!({
                "json_attributes": {"title": "hi", "count": "3"},
                "settings": {"t": "light"},
            })),
        )
        .unwrap();

        assert_eq!(record.get("count").unwrap(), &Value::Integer(3));
        assert_eq!(record.get("theme").unwrap(), &Value::from("light"));
        insta::assert_snapshot!(
            Json::Object(record.to_columns().unwrap()).to_string(),
            @r#"{"json_attributes":{"title":"hi","count":3},"settings":{"t":"light"}}"#
        );
    }

    #[test]
    fn test_load_missing_columns_uses_defaults() {
        let schema = schema(UnknownKeyPolicy::Raise);
        let record = Record::load(&schema, &columns(json!({"settings": null}))).unwrap();
        assert_eq!(record.get("count").unwrap(), &Value::Integer(0));
        assert_eq!(record.get("title").unwrap(), &Value::Null);
        assert_eq!(record, Record::new(&schema).unwrap());
    }

    #[test]
    fn test_unknown_keys_follow_policy() {
        let stored = columns(json!({"json_attributes": {"legacy": true}}));

        let err = Record::load(&schema(UnknownKeyPolicy::Raise), &stored).unwrap_err();
        assert_eq!(err, AttributeError::unknown("record", "legacy"));

        let stripped = Record::load(&schema(UnknownKeyPolicy::Strip), &stored).unwrap();
        assert!(stripped.get("legacy").is_err());

        let allowed = Record::load(&schema(UnknownKeyPolicy::Allow), &stored).unwrap();
        assert_eq!(allowed.get("legacy").unwrap(), &Value::Bool(true));
        assert_eq!(
            Json::Object(allowed.container_json("json_attributes").unwrap()),
            json!({"count": 0, "legacy": true})
        );
    }

    #[test]
    fn test_allowed_keys_stay_in_their_column() {
        let schema = schema(UnknownKeyPolicy::Allow);
        let mut record = Record::load(
            &schema,
            &columns(json!({"settings": {"t": "dark", "legacy": 1}})),
        )
        .unwrap();
        assert_eq!(record.get("legacy").unwrap(), &Value::Integer(1));
        assert!(record.unknown_in("json_attributes").is_none());

        record.set("legacy", 2).unwrap();
        record.set("added", "x").unwrap();
        insta::assert_snapshot!(
            Json::Object(record.to_columns().unwrap()).to_string(),
            @r#"{"json_attributes":{"count":0,"added":"x"},"settings":{"t":"dark","legacy":2}}"#
        );

        let reloaded = Record::load(&schema, &record.to_columns().unwrap()).unwrap();
        assert_eq!(reloaded, record);
    }

    #[test]
    fn test_allowed_key_cannot_shadow_declared_name() {
        let schema = schema(UnknownKeyPolicy::Allow);
        let record = Record::load(
            &schema,
            &columns(json!({"settings": {"t": "dark", "theme": 5}})),
        )
        .unwrap();

        assert_eq!(record.get("theme").unwrap(), &Value::from("dark"));
        assert!(record.unknown_in("settings").is_none());
    }

    #[test]
    fn test_set_rejects_unknown() {
        let mut record = Record::new(&schema(UnknownKeyPolicy::Raise)).unwrap();
        assert!(matches!(
            record.set("missing", 1).unwrap_err(),
            AttributeError::Unknown { .. }
        ));
    }

    #[test]
    fn test_extend_inherits_attributes() {
        let base = schema(UnknownKeyPolicy::Raise);
        let child = base
            .extend()
            .attribute(
                AttributeDefinition::builder("slug", ScalarKind::String)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        assert_eq!(child.registry().len(), 4);
        assert!(!base.registry().contains("slug"));

        let err = base
            .extend()
            .attribute(
                AttributeDefinition::builder("t", ScalarKind::String)
                    .container("settings")
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_nested_model_in_record() {
        let author = ModelClass::builder("Author")
            .attribute(
                AttributeDefinition::builder("name", ScalarKind::String)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let schema = RecordSchema::builder()
            .default_container("data")
            .attribute(AttributeDefinition::builder("author", &author).build().unwrap())
            .build()
            .unwrap();

        let mut record = Record::new(&schema).unwrap();
        record.set("author", Value::from(json!({"name": "Le Guin"}))).unwrap();
        assert_eq!(
            Json::Object(record.to_columns().unwrap()),
            json!({"data": {"author": {"name": "Le Guin"}}})
        );
    }
}
