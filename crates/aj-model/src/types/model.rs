//! Nested typed objects.

use std::fmt;
use std::sync::Arc;

use serde_json::Value as Json;

use aj_core::CastError;

use super::AttributeType;
use crate::model::{Model, ModelClass};
use crate::value::Value;

/// The type of an attribute holding a nested [`Model`].
///
/// Unlike scalars, model casts are strict: input that is neither a model nor
/// a mapping is a [`CastError::BadModelInput`].
#[derive(Clone)]
pub struct ModelType {
    class: Arc<ModelClass>,
}

impl ModelType {
    /// Creates the type for instances of `class`.
    #[must_use]
    pub const fn new(class: Arc<ModelClass>) -> Self {
        Self { class }
    }

    /// Returns the model class.
    #[inline]
    #[must_use]
    pub const fn class(&self) -> &Arc<ModelClass> {
        &self.class
    }

    /// Instances of another class are re-cast even when the names match.
    fn is_instance(&self, model: &Model) -> bool {
        Arc::ptr_eq(model.class(), &self.class)
    }

    fn bad_input(&self, found: &str) -> CastError {
        CastError::BadModelInput {
            model: self.class.name().to_owned(),
            found: found.to_owned(),
        }
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelType").field(&self.class.name()).finish()
    }
}

impl AttributeType for ModelType {
    fn type_name(&self) -> String {
        self.class.name().to_owned()
    }

    fn cast(&self, value: Value) -> Result<Value, CastError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Model(model) if self.is_instance(&model) => Ok(Value::Model(model)),
            other => match other.into_mapping() {
                Ok(map) => Model::from_attributes(&self.class, map).map(Value::Model),
                Err(other) => Err(self.bad_input(other.kind_name())),
            },
        }
    }

    fn serialize(&self, value: &Value) -> Result<Json, CastError> {
        match value {
            Value::Null => Ok(Json::Null),
            Value::Model(model) if self.is_instance(model) => model.to_json(),
            Value::Model(_) | Value::Map(_) => self.serialize(&self.cast(value.clone())?),
            other => Err(self.bad_input(other.kind_name())),
        }
    }

    fn deserialize(&self, json: Json) -> Result<Value, CastError> {
        match json {
            Json::Null => Ok(Value::Null),
            Json::Object(map) => Model::from_serializable(&self.class, map).map(Value::Model),
            other => Err(self.bad_input(Value::from(other).kind_name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::AttributeDefinition;
    use crate::types::{ScalarKind, Type};
    use serde_json::json;

    fn address() -> Arc<ModelClass> {
        ModelClass::builder("Address")
            .attribute(
                AttributeDefinition::builder("street", ScalarKind::String)
                    .build()
                    .unwrap(),
            )
            .attribute(
                AttributeDefinition::builder("zip", ScalarKind::String)
                    .store_key("postal_code")
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_cast_mapping_builds_instance() {
        let ty = ModelType::new(address());
        let cast = ty
            .cast(Value::from(json!({"street": "Main St", "zip": 2000})))
            .unwrap();
        let model = cast.as_model().unwrap();
        assert_eq!(model.get("zip").unwrap(), &Value::from("2000"));
    }

    #[test]
    fn test_cast_instance_is_unchanged() {
        let class = address();
        let ty = ModelType::new(Arc::clone(&class));
        let mut model = Model::new(&class).unwrap();
        model.set("street", "Elm St").unwrap();

        let cast = ty.cast(Value::Model(model.clone())).unwrap();
        assert_eq!(cast, Value::Model(model));
    }

    #[test]
    fn test_same_named_class_is_recast() {
        let counted = ModelClass::builder("X")
            .attribute(
                AttributeDefinition::builder("n", ScalarKind::Integer)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let labelled = ModelClass::builder("X")
            .attribute(
                AttributeDefinition::builder("s", ScalarKind::String)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let ty = ModelType::new(Arc::clone(&counted));

        let mut foreign = Model::new(&labelled).unwrap();
        foreign.set("s", "hello").unwrap();
        let err = ty.cast(Value::Model(foreign)).unwrap_err();
        assert_eq!(err, CastError::UnknownAttribute { owner: "X".to_owned(), name: "s".to_owned() });

        let lookalike = ModelClass::builder("X")
            .attribute(
                AttributeDefinition::builder("n", ScalarKind::String)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let mut foreign = Model::new(&lookalike).unwrap();
        foreign.set("n", "5").unwrap();
        let cast = ty.cast(Value::Model(foreign)).unwrap();
        let model = cast.as_model().unwrap();
        assert!(Arc::ptr_eq(model.class(), &counted));
        assert_eq!(model.get("n").unwrap(), &Value::Integer(5));
    }

    #[test]
    fn test_cast_null_and_bad_input() {
        let ty = ModelType::new(address());
        assert_eq!(ty.cast(Value::Null).unwrap(), Value::Null);

        let err = ty.cast(Value::from(5)).unwrap_err();
        assert_eq!(err.to_string(), "cannot cast integer to model 'Address'");
    }

    #[test]
    fn test_serialize_uses_store_keys() {
        let ty = Type::from(address());
        let cast = ty
            .cast(Value::from(json!({"street": "Main St", "zip": "2000"})))
            .unwrap();
        let json = ty.serialize(&cast).unwrap();
        insta::assert_snapshot!(json.to_string(), @r#"{"street":"Main St","postal_code":"2000"}"#);
        assert_eq!(ty.deserialize(json).unwrap(), cast);
    }

    #[test]
    fn test_deserialize_rejects_scalars() {
        let ty = ModelType::new(address());
        let err = ty.deserialize(json!("Main St")).unwrap_err();
        assert!(matches!(err, CastError::BadModelInput { ref found, .. } if found == "string"));
    }
}
