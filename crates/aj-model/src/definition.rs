//! Attribute definitions.
//!
//! An [`AttributeDefinition`] binds an attribute name to its [`Type`], the
//! key it is stored under, the container it lives in, and its default. It is
//! immutable once built.
//!
//! # Defaults
//!
//! A default is either a literal or a zero-argument generator. Either way it
//! is passed through [`AttributeDefinition::cast`] when materialised, so a
//! generator returning `"3"` for an integer attribute yields `3`. Array
//! attributes default to `[]` unless [`DefaultValue::None`] is set
//! explicitly.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map as JsonMap, Value as Json};

use aj_core::{CastError, DefinitionError};

use crate::types::Type;
use crate::value::Value;

/// Option keys understood by [`AttributeOptions::from_json`].
pub const OPTION_KEYS: &[&str] = &["store_key", "container", "default", "array"];

/// Generator used for computed defaults.
pub type DefaultGenerator = Arc<dyn Fn() -> Value + Send + Sync>;

/// The default of an attribute.
#[derive(Clone, Default)]
pub enum DefaultValue {
    /// No default: missing attributes stay missing.
    #[default]
    None,
    /// A fixed value.
    Literal(Value),
    /// A generator invoked afresh on every materialisation.
    Generator(DefaultGenerator),
}

impl DefaultValue {
    /// Returns `true` unless this is [`DefaultValue::None`].
    #[inline]
    #[must_use]
    pub const fn is_some(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

/// A named, typed attribute.
///
/// # Examples
///
/// ```
/// use aj_model::{AttributeDefinition, ScalarKind, Value};
///
/// let count = AttributeDefinition::builder("count", ScalarKind::Integer)
///     .store_key("n")
///     .default(0)
///     .build()?;
///
/// assert_eq!(count.store_key(), "n");
/// assert_eq!(count.provide_default()?, Value::Integer(0));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct AttributeDefinition {
    name: String,
    ty: Type,
    store_key: String,
    container: Option<String>,
    default: DefaultValue,
}

impl AttributeDefinition {
    /// Starts building a definition.
    pub fn builder(name: impl Into<String>, ty: impl Into<Type>) -> AttributeDefinitionBuilder {
        AttributeDefinitionBuilder {
            name: name.into(),
            ty: ty.into(),
            store_key: None,
            container: None,
            default: None,
            array: false,
        }
    }

    /// Returns the attribute name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the attribute type.
    #[inline]
    #[must_use]
    pub const fn ty(&self) -> &Type {
        &self.ty
    }

    /// Returns the key used inside the container.
    #[inline]
    #[must_use]
    pub fn store_key(&self) -> &str {
        &self.store_key
    }

    /// Returns the container, if any.
    #[inline]
    #[must_use]
    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    /// Returns the configured default.
    #[inline]
    #[must_use]
    pub const fn default_value(&self) -> &DefaultValue {
        &self.default
    }

    /// Returns `true` if missing values are filled in.
    #[inline]
    #[must_use]
    pub const fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Returns a copy of this definition placed in `container`.
    #[must_use]
    pub fn in_container(&self, container: impl Into<String>) -> Self {
        Self {
            container: Some(container.into()),
            ..self.clone()
        }
    }

    /// Materialises the default and casts it.
    ///
    /// Returns [`Value::Null`] when there is no default.
    ///
    /// # Errors
    ///
    /// Propagates a failure to cast the default value.
    pub fn provide_default(&self) -> Result<Value, CastError> {
        match &self.default {
            DefaultValue::None => Ok(Value::Null),
            DefaultValue::Literal(value) => self.cast(value.clone()),
            DefaultValue::Generator(generator) => self.cast(generator()),
        }
    }

    /// Casts `value` with this attribute's type.
    ///
    /// # Errors
    ///
    /// Returns the type's failure, located at this attribute.
    pub fn cast(&self, value: Value) -> Result<Value, CastError> {
        self.ty.cast(value).map_err(|err| err.in_attribute(&self.name))
    }

    /// Serializes `value` with this attribute's type.
    ///
    /// # Errors
    ///
    /// Returns the type's failure, located at this attribute.
    pub fn serialize(&self, value: &Value) -> Result<Json, CastError> {
        self.ty
            .serialize(value)
            .map_err(|err| err.in_attribute(&self.name))
    }

    /// Deserializes `json` with this attribute's type.
    ///
    /// # Errors
    ///
    /// Returns the type's failure, located at this attribute.
    pub fn deserialize(&self, json: Json) -> Result<Value, CastError> {
        self.ty
            .deserialize(json)
            .map_err(|err| err.in_attribute(&self.name))
    }
}

/// Builder for [`AttributeDefinition`].
#[derive(Debug)]
#[must_use]
pub struct AttributeDefinitionBuilder {
    name: String,
    ty: Type,
    store_key: Option<String>,
    container: Option<String>,
    default: Option<DefaultValue>,
    array: bool,
}

impl AttributeDefinitionBuilder {
    /// Sets the key used inside the container (defaults to the name).
    pub fn store_key(mut self, store_key: impl Into<String>) -> Self {
        self.store_key = Some(store_key.into());
        self
    }

    /// Places the attribute in a named container.
    pub fn container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Sets a literal default.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// Sets a generated default.
    pub fn default_with<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Generator(Arc::new(generator)));
        self
    }

    /// Removes any default, including the implicit `[]` of array types.
    pub fn no_default(mut self) -> Self {
        self.default = Some(DefaultValue::None);
        self
    }

    /// Wraps the type in an array type when `array` is true.
    pub const fn array(mut self, array: bool) -> Self {
        self.array = array;
        self
    }

    /// Validates and builds the definition.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::InvalidOption`] for an empty name, store
    /// key, or container.
    pub fn build(self) -> Result<AttributeDefinition, DefinitionError> {
        if self.name.is_empty() {
            return Err(DefinitionError::invalid_option(
                "<unnamed>",
                "name",
                "must not be empty",
            ));
        }
        if self.store_key.as_deref() == Some("") {
            return Err(DefinitionError::invalid_option(
                &self.name,
                "store_key",
                "must not be empty",
            ));
        }
        if self.container.as_deref() == Some("") {
            return Err(DefinitionError::invalid_option(
                &self.name,
                "container",
                "must not be empty",
            ));
        }

        let ty = if self.array { self.ty.array_of() } else { self.ty };
        let default = match self.default {
            Some(default) => default,
            None if ty.is_array() => DefaultValue::Literal(Value::Array(Vec::new())),
            None => DefaultValue::None,
        };

        Ok(AttributeDefinition {
            store_key: self.store_key.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            ty,
            container: self.container,
            default,
        })
    }
}

/// Declarative attribute options, as found in schema documents.
///
/// # Examples
///
/// ```
/// use aj_model::{AttributeDefinition, AttributeOptions, ScalarKind};
/// use serde_json::json;
///
/// let json = json!({"store_key": "t", "array": true});
/// let options = AttributeOptions::from_json("tags", json.as_object().unwrap())?;
/// let tags = options
///     .apply(AttributeDefinition::builder("tags", ScalarKind::String))
///     .build()?;
///
/// assert_eq!(tags.ty().type_name(), "array<string>");
/// assert_eq!(tags.store_key(), "t");
/// # Ok::<(), aj_core::DefinitionError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeOptions {
    /// Storage key override.
    pub store_key: Option<String>,
    /// Container name.
    pub container: Option<String>,
    /// Default; JSON `null` explicitly disables the default.
    pub default: Option<Json>,
    /// Whether the type is wrapped in an array.
    pub array: bool,
}

impl AttributeOptions {
    /// Parses options for the attribute `attribute`.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::UnknownOption`] for keys outside
    /// [`OPTION_KEYS`] and [`DefinitionError::InvalidOption`] for values of
    /// the wrong shape.
    pub fn from_json(attribute: &str, options: &JsonMap<String, Json>) -> Result<Self, DefinitionError> {
        let mut parsed = Self::default();

        for (key, value) in options {
            match key.as_str() {
                "store_key" => parsed.store_key = Some(expect_string(attribute, key, value)?),
                "container" => parsed.container = Some(expect_string(attribute, key, value)?),
                "default" => parsed.default = Some(value.clone()),
                "array" => {
                    parsed.array = value.as_bool().ok_or_else(|| {
                        DefinitionError::invalid_option(attribute, key, "expected a boolean")
                    })?;
                }
                _ => {
                    return Err(DefinitionError::UnknownOption {
                        attribute: attribute.to_owned(),
                        option: key.clone(),
                    });
                }
            }
        }

        Ok(parsed)
    }

    /// Applies these options to a builder.
    pub fn apply(self, mut builder: AttributeDefinitionBuilder) -> AttributeDefinitionBuilder {
        if let Some(store_key) = self.store_key {
            builder = builder.store_key(store_key);
        }
        if let Some(container) = self.container {
            builder = builder.container(container);
        }
        builder = match self.default {
            Some(Json::Null) => builder.no_default(),
            Some(default) => builder.default(Value::from(default)),
            None => builder,
        };
        builder.array(self.array)
    }
}

fn expect_string(attribute: &str, option: &str, value: &Json) -> Result<String, DefinitionError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| DefinitionError::invalid_option(attribute, option, "expected a string"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScalarKind;
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[test]
    fn test_store_key_defaults_to_name() {
        let def = AttributeDefinition::builder("title", ScalarKind::String)
            .build()
            .unwrap();
        assert_eq!(def.store_key(), "title");
        assert_eq!(def.container(), None);
        assert!(!def.has_default());
        assert_eq!(def.provide_default().unwrap(), Value::Null);
    }

    #[test]
    fn test_literal_default_is_cast() {
        let def = AttributeDefinition::builder("count", ScalarKind::Integer)
            .default("3")
            .build()
            .unwrap();
        assert_eq!(def.provide_default().unwrap(), Value::Integer(3));
    }

    #[test]
    fn test_generator_default_is_fresh() {
        let counter = Arc::new(AtomicI64::new(0));
        let calls = Arc::clone(&counter);
        let def = AttributeDefinition::builder("seq", ScalarKind::Integer)
            .default_with(move || Value::from((calls.fetch_add(1, Ordering::SeqCst) + 1).to_string()))
            .build()
            .unwrap();

        assert_eq!(def.provide_default().unwrap(), Value::Integer(1));
        assert_eq!(def.provide_default().unwrap(), Value::Integer(2));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_array_defaults_to_empty() {
        let tags = AttributeDefinition::builder("tags", ScalarKind::String)
            .array(true)
            .build()
            .unwrap();
        assert!(tags.ty().is_array());
        assert_eq!(tags.provide_default().unwrap(), Value::Array(vec![]));

        let opted_out = AttributeDefinition::builder("tags", ScalarKind::String)
            .array(true)
            .no_default()
            .build()
            .unwrap();
        assert!(!opted_out.has_default());
    }

    #[test]
    fn test_rejects_empty_names() {
        let err = AttributeDefinition::builder("", ScalarKind::String)
            .build()
            .unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidOption { ref option, .. } if option == "name"));

        let err = AttributeDefinition::builder("a", ScalarKind::String)
            .store_key("")
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid option 'store_key' for 'a': must not be empty");
    }

    #[test]
    fn test_errors_name_the_attribute() {
        let class = crate::model::ModelClass::builder("Point").build().unwrap();
        let def = AttributeDefinition::builder("origin", &class).build().unwrap();
        let err = def.cast(Value::from(1)).unwrap_err();
        assert_eq!(err.to_string(), "origin: cannot cast integer to model 'Point'");
    }

    #[test]
    fn test_options_from_json() {
        let json = json!({"store_key": "__a", "container": "extra", "default": 1});
        let options = AttributeOptions::from_json("a", json.as_object().unwrap()).unwrap();
        let def = options
            .apply(AttributeDefinition::builder("a", ScalarKind::Integer))
            .build()
            .unwrap();
        assert_eq!(def.store_key(), "__a");
        assert_eq!(def.container(), Some("extra"));
        assert_eq!(def.provide_default().unwrap(), Value::Integer(1));
    }

    #[test]
    fn test_options_reject_unknown_keys() {
        let json = json!({"store_key": "x", "nullable": true});
        let err = AttributeOptions::from_json("a", json.as_object().unwrap()).unwrap_err();
        assert_eq!(
            err,
            DefinitionError::UnknownOption {
                attribute: "a".to_owned(),
                option: "nullable".to_owned(),
            }
        );
    }

    #[test]
    fn test_options_null_default_disables_array_default() {
        let json = json!({"array": true, "default": null});
        let options = AttributeOptions::from_json("a", json.as_object().unwrap()).unwrap();
        let def = options
            .apply(AttributeDefinition::builder("a", ScalarKind::Integer))
            .build()
            .unwrap();
        assert!(def.ty().is_array());
        assert!(!def.has_default());
    }
}
