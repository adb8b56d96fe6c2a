//! Declarative schema documents.
//!
//! A schema document declares model classes (in dependency order) and an
//! optional record schema as JSON:
//!
//! ```json
//! {
//!   "models": [
//!     {"name": "Circle", "attributes": {"radius": "float"}},
//!     {"name": "Square", "attributes": {"side": "float"}},
//!     {
//!       "name": "Drawing",
//!       "unknown_key": "strip",
//!       "attributes": {
//!         "title": {"type": "string", "default": "untitled"},
//!         "shapes": {"type": ["Circle", "Square"], "array": true}
//!       }
//!     }
//!   ],
//!   "record": {
//!     "default_container": "json_attributes",
//!     "attributes": {
//!       "drawing": "Drawing",
//!       "tags": {"type": "string", "array": true, "container": "meta"}
//!     }
//!   }
//! }
//! ```
//!
//! An attribute is either a bare type reference or an object with a `type`
//! plus [attribute options](crate::AttributeOptions). A type reference is:
//!
//! - a scalar tag (`"integer"`, `"datetime"`, ...)
//! - the name of a model declared earlier in the document
//! - an array of model names, a union discriminated by the configured key
//! - `{"union": [...], "type_key": "kind"}`, a union with its own key

use std::sync::Arc;

use camino::Utf8Path;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map as JsonMap, Value as Json};
use tracing::{debug, info};

use aj_core::{Config, ConfigError, DefinitionError, UnknownKeyPolicy};

use crate::definition::{AttributeDefinition, AttributeOptions};
use crate::model::ModelClass;
use crate::record::{RecordSchema, RecordSchemaBuilder};
use crate::types::{PolymorphicType, Type};

/// Errors raised while loading a schema document.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The document could not be read or parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A declaration in the document is invalid.
    #[error("in {context}: {source}")]
    Definition {
        /// The model (or `record`) being declared.
        context: String,
        /// The underlying failure.
        #[source]
        source: DefinitionError,
    },
}

impl SchemaError {
    fn definition(context: impl Into<String>) -> impl FnOnce(DefinitionError) -> Self {
        let context = context.into();
        move |source| Self::Definition { context, source }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaDocument {
    #[serde(default)]
    models: Vec<ModelDocument>,
    #[serde(default)]
    record: Option<RecordDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelDocument {
    name: String,
    #[serde(default)]
    extends: Option<String>,
    #[serde(default)]
    unknown_key: Option<UnknownKeyPolicy>,
    #[serde(default)]
    attributes: JsonMap<String, Json>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordDocument {
    #[serde(default)]
    default_container: Option<String>,
    #[serde(default)]
    unknown_key: Option<UnknownKeyPolicy>,
    #[serde(default)]
    attributes: JsonMap<String, Json>,
}

/// The model classes and record schema declared by a document.
#[derive(Debug, Default)]
pub struct Schema {
    models: IndexMap<String, Arc<ModelClass>>,
    record: Option<Arc<RecordSchema>>,
}

impl Schema {
    /// Parses a schema document.
    ///
    /// `config` supplies the defaults for unknown-key policies, the record
    /// container, and union discriminators.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Config`] for malformed JSON or unknown
    /// document keys and [`SchemaError::Definition`] for invalid
    /// declarations.
    pub fn from_json_str(text: &str, config: &Config) -> Result<Self, SchemaError> {
        let document: SchemaDocument = serde_json::from_str(text).map_err(ConfigError::from)?;
        let mut schema = Self::default();

        for model in document.models {
            let context = format!("model '{}'", model.name);
            let class = schema
                .build_model(model, config)
                .map_err(SchemaError::definition(context))?;
            schema.models.insert(class.name().to_owned(), class);
        }

        if let Some(record) = document.record {
            let built = schema
                .build_record(record, config)
                .map_err(SchemaError::definition("record"))?;
            schema.record = Some(built);
        }

        debug!(
            models = schema.models.len(),
            record = schema.record.is_some(),
            "Schema parsed"
        );
        Ok(schema)
    }

    /// Reads and parses a schema file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] (wrapped) if the file cannot be read,
    /// otherwise the errors of [`Schema::from_json_str`].
    pub fn load(path: &Utf8Path, config: &Config) -> Result<Self, SchemaError> {
        let text = std::fs::read_to_string(path.as_std_path())
            .map_err(|source| ConfigError::io(path, source))?;
        let schema = Self::from_json_str(&text, config)?;
        info!(
            path = %path,
            models = schema.models.len(),
            "Schema loaded"
        );
        Ok(schema)
    }

    /// Looks up a model class by name.
    #[must_use]
    pub fn model(&self, name: &str) -> Option<&Arc<ModelClass>> {
        self.models.get(name)
    }

    /// Iterates over model classes in declaration order.
    pub fn models(&self) -> impl Iterator<Item = &Arc<ModelClass>> {
        self.models.values()
    }

    /// Returns the record schema, if one is declared.
    #[must_use]
    pub const fn record(&self) -> Option<&Arc<RecordSchema>> {
        self.record.as_ref()
    }

    fn build_model(
        &self,
        document: ModelDocument,
        config: &Config,
    ) -> Result<Arc<ModelClass>, DefinitionError> {
        if self.models.contains_key(&document.name) {
            return Err(DefinitionError::invalid_option(
                &document.name,
                "name",
                "a model with this name is already declared",
            ));
        }

        let mut builder = ModelClass::builder(&document.name).config(&config.model);
        if let Some(parent) = &document.extends {
            let parent = self
                .models
                .get(parent)
                .ok_or_else(|| DefinitionError::UnknownType(parent.clone()))?;
            builder = builder.extends(parent);
        }
        if let Some(policy) = document.unknown_key {
            builder = builder.unknown_key(policy);
        }

        for (name, declaration) in document.attributes {
            builder = builder.attribute(self.parse_attribute(name, declaration, config)?);
        }
        builder.build()
    }

    fn build_record(
        &self,
        document: RecordDocument,
        config: &Config,
    ) -> Result<Arc<RecordSchema>, DefinitionError> {
        let mut builder = RecordSchemaBuilder::from_config(&config.record);
        if let Some(container) = document.default_container {
            builder = builder.default_container(container);
        }
        if let Some(policy) = document.unknown_key {
            builder = builder.unknown_key(policy);
        }

        for (name, declaration) in document.attributes {
            builder = builder.attribute(self.parse_attribute(name, declaration, config)?);
        }
        builder.build()
    }

    fn parse_attribute(
        &self,
        name: String,
        declaration: Json,
        config: &Config,
    ) -> Result<AttributeDefinition, DefinitionError> {
        match declaration {
            Json::Object(mut options) => {
                let reference = options.shift_remove("type").ok_or_else(|| {
                    DefinitionError::invalid_option(&name, "type", "is required")
                })?;
                let ty = self.resolve_type(&name, reference, config)?;
                let options = AttributeOptions::from_json(&name, &options)?;
                options.apply(AttributeDefinition::builder(name, ty)).build()
            }
            reference => {
                let ty = self.resolve_type(&name, reference, config)?;
                AttributeDefinition::builder(name, ty).build()
            }
        }
    }

    fn resolve_type(
        &self,
        attribute: &str,
        reference: Json,
        config: &Config,
    ) -> Result<Type, DefinitionError> {
        match reference {
            Json::String(tag) => self.resolve_named(&tag),
            Json::Array(names) => {
                let members = self.resolve_members(attribute, names)?;
                PolymorphicType::with_config(members, &config.union).map(Type::from)
            }
            Json::Object(mut union) => {
                let names = match union.shift_remove("union") {
                    Some(Json::Array(names)) => names,
                    _ => {
                        return Err(DefinitionError::invalid_option(
                            attribute,
                            "type",
                            "expected {\"union\": [...]}",
                        ));
                    }
                };
                let type_key = match union.shift_remove("type_key") {
                    Some(Json::String(key)) => key,
                    Some(_) => {
                        return Err(DefinitionError::invalid_option(
                            attribute,
                            "type_key",
                            "expected a string",
                        ));
                    }
                    None => config.union.type_key.clone(),
                };
                if let Some(option) = union.keys().next() {
                    return Err(DefinitionError::UnknownOption {
                        attribute: attribute.to_owned(),
                        option: option.clone(),
                    });
                }

                let members = self.resolve_members(attribute, names)?;
                PolymorphicType::new(members, type_key).map(Type::from)
            }
            _ => Err(DefinitionError::invalid_option(
                attribute,
                "type",
                "expected a type name, a list of model names, or a union object",
            )),
        }
    }

    fn resolve_named(&self, name: &str) -> Result<Type, DefinitionError> {
        if let Ok(ty) = Type::lookup(name) {
            return Ok(ty);
        }
        self.models
            .get(name)
            .map(Type::from)
            .ok_or_else(|| DefinitionError::UnknownType(name.to_owned()))
    }

    fn resolve_members(
        &self,
        attribute: &str,
        names: Vec<Json>,
    ) -> Result<Vec<Arc<ModelClass>>, DefinitionError> {
        names
            .into_iter()
            .map(|name| match name {
                Json::String(name) => self
                    .models
                    .get(&name)
                    .cloned()
                    .ok_or(DefinitionError::UnknownType(name)),
                _ => Err(DefinitionError::invalid_option(
                    attribute,
                    "type",
                    "union members must be model names",
                )),
            })
            .collect()
    }
}
