//! Attribute types: casting, serialization, and deserialization.
//!
//! Every attribute has a [`Type`], a unit of coercion logic with three
//! operations:
//!
//! - `cast` - arbitrary input to a canonical [`Value`]
//! - `serialize` - canonical value to a JSON-safe value
//! - `deserialize` - JSON-safe value back to a canonical value
//!
//! # Module Organization
//!
//! - [`primitive`] - scalar types (`string`, `integer`, `date`, ...)
//! - [`array`] - typed arrays wrapping another type
//! - [`model`] - nested typed objects
//! - [`polymorphic`] - closed unions of model types with a discriminator
//!
//! Types compose: `Type::from(ScalarKind::Integer).array_of()` is an array
//! of integers, and a model type may contain attributes that are themselves
//! arrays of polymorphic models.
//!
//! # Custom types
//!
//! Anything implementing [`AttributeType`] can be wrapped in
//! [`Type::Custom`] and used like a built-in type.

pub mod array;
pub mod model;
pub mod polymorphic;
pub mod primitive;

use std::fmt;
use std::sync::Arc;

use serde_json::Value as Json;

use aj_core::{CastError, DefinitionError};

use crate::model::ModelClass;
use crate::value::Value;

pub use array::ArrayType;
pub use model::ModelType;
pub use polymorphic::PolymorphicType;
pub use primitive::{PrimitiveType, ScalarKind};

/// The capability shared by every attribute type.
///
/// Implementations must keep two properties:
///
/// - `cast` is idempotent: `cast(cast(x)) == cast(x)`
/// - `deserialize(serialize(x)) == x` for every canonical `x`
pub trait AttributeType: fmt::Debug + Send + Sync {
    /// A human readable name, e.g. `integer` or `array<Address>`.
    fn type_name(&self) -> String;

    /// Casts arbitrary input into this type's canonical form.
    ///
    /// # Errors
    ///
    /// Returns a [`CastError`] for input the type refuses to guess about.
    fn cast(&self, value: Value) -> Result<Value, CastError>;

    /// Converts a canonical value into its JSON-safe form.
    ///
    /// # Errors
    ///
    /// Returns a [`CastError`] if the value is not of this type.
    fn serialize(&self, value: &Value) -> Result<Json, CastError>;

    /// Converts a JSON-safe value back into canonical form.
    ///
    /// # Errors
    ///
    /// Returns a [`CastError`] for input the type refuses to guess about.
    fn deserialize(&self, json: Json) -> Result<Value, CastError>;
}

/// Coarse classification of a [`Type`], exposed to metadata consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// A scalar type.
    Primitive,
    /// An array of another type.
    Array,
    /// A nested model.
    Model,
    /// A union of nested models.
    Polymorphic,
    /// A user supplied type.
    Custom,
}

/// An attribute type.
///
/// # Examples
///
/// ```
/// use aj_model::{ScalarKind, Type, Value};
///
/// let tags = Type::from(ScalarKind::String).array_of();
/// assert_eq!(tags.type_name(), "array<string>");
///
/// // Scalars are wrapped into a one-element array
/// let cast = tags.cast(Value::from("rust")).unwrap();
/// assert_eq!(cast, Value::Array(vec![Value::from("rust")]));
/// ```
#[derive(Debug, Clone)]
pub enum Type {
    /// A scalar type.
    Primitive(PrimitiveType),
    /// An array of another type.
    Array(ArrayType),
    /// A nested model.
    Model(ModelType),
    /// A union of nested models.
    Polymorphic(PolymorphicType),
    /// A user supplied type.
    Custom(Arc<dyn AttributeType>),
}

impl Type {
    /// Resolves a scalar type tag such as `"integer"` or `"datetime"`.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::UnknownType`] for unrecognised tags.
    pub fn lookup(tag: &str) -> Result<Self, DefinitionError> {
        tag.parse::<ScalarKind>().map(Self::from)
    }

    /// Wraps this type in an array type.
    #[must_use]
    pub fn array_of(self) -> Self {
        Self::Array(ArrayType::new(self))
    }

    /// Returns the coarse classification of this type.
    #[must_use]
    pub const fn kind(&self) -> TypeKind {
        match self {
            Self::Primitive(_) => TypeKind::Primitive,
            Self::Array(_) => TypeKind::Array,
            Self::Model(_) => TypeKind::Model,
            Self::Polymorphic(_) => TypeKind::Polymorphic,
            Self::Custom(_) => TypeKind::Custom,
        }
    }

    /// Returns `true` for array types.
    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Returns the element type of an array type.
    #[must_use]
    pub fn element_type(&self) -> Option<&Self> {
        match self {
            Self::Array(array) => Some(array.element()),
            _ => None,
        }
    }

    /// Returns the model class of a model type, looking through arrays.
    #[must_use]
    pub fn model_class(&self) -> Option<&Arc<ModelClass>> {
        match self {
            Self::Model(model) => Some(model.class()),
            Self::Array(array) => array.element().model_class(),
            _ => None,
        }
    }

    fn as_dyn(&self) -> &dyn AttributeType {
        match self {
            Self::Primitive(t) => t,
            Self::Array(t) => t,
            Self::Model(t) => t,
            Self::Polymorphic(t) => t,
            Self::Custom(t) => t.as_ref(),
        }
    }

    /// See [`AttributeType::type_name`].
    #[must_use]
    pub fn type_name(&self) -> String {
        self.as_dyn().type_name()
    }

    /// See [`AttributeType::cast`].
    ///
    /// # Errors
    ///
    /// Propagates the failure of the underlying type.
    pub fn cast(&self, value: Value) -> Result<Value, CastError> {
        self.as_dyn().cast(value)
    }

    /// See [`AttributeType::serialize`].
    ///
    /// # Errors
    ///
    /// Propagates the failure of the underlying type.
    pub fn serialize(&self, value: &Value) -> Result<Json, CastError> {
        self.as_dyn().serialize(value)
    }

    /// See [`AttributeType::deserialize`].
    ///
    /// # Errors
    ///
    /// Propagates the failure of the underlying type.
    pub fn deserialize(&self, json: Json) -> Result<Value, CastError> {
        self.as_dyn().deserialize(json)
    }
}

impl From<ScalarKind> for Type {
    fn from(kind: ScalarKind) -> Self {
        Self::Primitive(PrimitiveType::new(kind))
    }
}

impl From<Arc<ModelClass>> for Type {
    fn from(class: Arc<ModelClass>) -> Self {
        Self::Model(ModelType::new(class))
    }
}

impl From<&Arc<ModelClass>> for Type {
    fn from(class: &Arc<ModelClass>) -> Self {
        Self::Model(ModelType::new(Arc::clone(class)))
    }
}

impl From<PolymorphicType> for Type {
    fn from(union: PolymorphicType) -> Self {
        Self::Polymorphic(union)
    }
}

impl From<Arc<dyn AttributeType>> for Type {
    fn from(custom: Arc<dyn AttributeType>) -> Self {
        Self::Custom(custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Upper-cases strings; exercises the custom type seam.
    #[derive(Debug)]
    struct Shout;

    impl AttributeType for Shout {
        fn type_name(&self) -> String {
            "shout".to_owned()
        }

        fn cast(&self, value: Value) -> Result<Value, CastError> {
            Ok(match value {
                Value::String(s) => Value::String(s.to_uppercase()),
                other => other,
            })
        }

        fn serialize(&self, value: &Value) -> Result<Json, CastError> {
            value.to_json()
        }

        fn deserialize(&self, json: Json) -> Result<Value, CastError> {
            self.cast(Value::from(json))
        }
    }

    #[test]
    fn test_lookup_known_tags() {
        for tag in [
            "string", "integer", "float", "decimal", "boolean", "date", "datetime", "value",
        ] {
            let ty = Type::lookup(tag).unwrap();
            assert_eq!(ty.kind(), TypeKind::Primitive);
            assert_eq!(ty.type_name(), tag);
        }
    }

    #[test]
    fn test_lookup_unknown_tag() {
        let err = Type::lookup("money").unwrap_err();
        assert_eq!(err, DefinitionError::UnknownType("money".to_owned()));
    }

    #[test]
    fn test_array_metadata() {
        let ty = Type::from(ScalarKind::Integer).array_of();
        assert!(ty.is_array());
        assert_eq!(ty.kind(), TypeKind::Array);
        assert_eq!(ty.element_type().map(Type::type_name), Some("integer".to_owned()));
        assert!(ty.model_class().is_none());
    }

    #[test]
    fn test_custom_type_dispatch() {
        let ty = Type::from(Arc::new(Shout) as Arc<dyn AttributeType>);
        assert_eq!(ty.kind(), TypeKind::Custom);
        assert_eq!(ty.cast(Value::from("hi")).unwrap(), Value::from("HI"));
        assert_eq!(ty.deserialize(json!("hey")).unwrap(), Value::from("HEY"));
        assert_eq!(ty.serialize(&Value::from("HI")).unwrap(), json!("HI"));
    }
}
