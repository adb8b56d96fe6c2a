//! Closed unions of model types.
//!
//! A [`PolymorphicType`] holds a fixed set of model classes. Serialized
//! instances carry a discriminator entry (by default `"type"`) naming their
//! class, which is read back first when casting or deserializing:
//!
//! ```json
//! {"x": 1, "type": "A"}
//! ```
//!
//! Members are matched by class name, so stored discriminators stay valid as
//! long as the class names do. Guessing a member is never attempted: missing
//! or unrecognised discriminators are errors.

use std::fmt;
use std::sync::Arc;

use serde_json::Value as Json;
use smallvec::SmallVec;

use aj_core::{CastError, DefinitionError, FxHashSet, UnionConfig};

use super::AttributeType;
use crate::model::{Model, ModelClass};
use crate::value::Value;

/// A closed union of model classes with a discriminator key.
///
/// # Examples
///
/// ```
/// use aj_model::{AttributeDefinition, ModelClass, PolymorphicType, ScalarKind, Type, Value};
/// use serde_json::json;
///
/// let a = ModelClass::builder("A")
///     .attribute(AttributeDefinition::builder("x", ScalarKind::Integer).build()?)
///     .build()?;
/// let b = ModelClass::builder("B")
///     .attribute(AttributeDefinition::builder("y", ScalarKind::Boolean).build()?)
///     .build()?;
///
/// let shape = Type::from(PolymorphicType::new([a, b], "type")?);
/// let value = shape.cast(Value::from(json!({"type": "A", "x": "1"})))?;
/// assert_eq!(shape.serialize(&value)?, json!({"x": 1, "type": "A"}));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone)]
pub struct PolymorphicType {
    members: SmallVec<[Arc<ModelClass>; 4]>,
    type_key: String,
}

impl PolymorphicType {
    /// Creates a union over `members`, discriminated by `type_key`.
    ///
    /// # Errors
    ///
    /// - [`DefinitionError::EmptyUnion`] if `members` is empty
    /// - [`DefinitionError::DuplicateUnionMember`] if two members share a name
    /// - [`DefinitionError::DiscriminatorCollision`] if a member declares an
    ///   attribute or store key equal to `type_key`
    /// - [`DefinitionError::InvalidOption`] if `type_key` is empty
    pub fn new(
        members: impl IntoIterator<Item = Arc<ModelClass>>,
        type_key: impl Into<String>,
    ) -> Result<Self, DefinitionError> {
        let members: SmallVec<[Arc<ModelClass>; 4]> = members.into_iter().collect();
        let type_key = type_key.into();

        if members.is_empty() {
            return Err(DefinitionError::EmptyUnion);
        }
        if type_key.is_empty() {
            return Err(DefinitionError::invalid_option(
                "<union>",
                "type_key",
                "must not be empty",
            ));
        }

        let mut seen = FxHashSet::default();
        for member in &members {
            if !seen.insert(member.name()) {
                return Err(DefinitionError::DuplicateUnionMember(member.name().to_owned()));
            }
            let registry = member.registry();
            if registry.contains(&type_key) || registry.store_key_lookup(None, &type_key).is_some()
            {
                return Err(DefinitionError::DiscriminatorCollision {
                    key: type_key,
                    model: member.name().to_owned(),
                });
            }
        }

        Ok(Self { members, type_key })
    }

    /// Creates a union using the configured discriminator key.
    ///
    /// # Errors
    ///
    /// See [`PolymorphicType::new`].
    pub fn with_config(
        members: impl IntoIterator<Item = Arc<ModelClass>>,
        config: &UnionConfig,
    ) -> Result<Self, DefinitionError> {
        Self::new(members, config.type_key.clone())
    }

    /// Returns the discriminator key.
    #[inline]
    #[must_use]
    pub fn type_key(&self) -> &str {
        &self.type_key
    }

    /// Returns the member classes in declaration order.
    #[inline]
    #[must_use]
    pub fn members(&self) -> &[Arc<ModelClass>] {
        &self.members
    }

    /// Finds a member by class name.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&Arc<ModelClass>> {
        self.members.iter().find(|member| member.name() == name)
    }

    fn expected(&self) -> String {
        self.members
            .iter()
            .map(|member| member.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Resolves the member named by a discriminator value.
    fn dispatch(&self, discriminator: Option<Json>) -> Result<&Arc<ModelClass>, CastError> {
        let found = match discriminator {
            None | Some(Json::Null) => {
                return Err(CastError::MissingDiscriminator {
                    key: self.type_key.clone(),
                    expected: self.expected(),
                });
            }
            Some(Json::String(name)) => name,
            Some(other) => other.to_string(),
        };

        self.member(&found).ok_or_else(|| CastError::UnknownVariant {
            key: self.type_key.clone(),
            found,
            expected: self.expected(),
        })
    }

    fn bad_input(&self, found: &str) -> CastError {
        CastError::BadUnionInput {
            found: found.to_owned(),
            expected: self.expected(),
        }
    }
}

impl fmt::Debug for PolymorphicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolymorphicType")
            .field("members", &self.expected())
            .field("type_key", &self.type_key)
            .finish()
    }
}

impl AttributeType for PolymorphicType {
    fn type_name(&self) -> String {
        let names: Vec<_> = self.members.iter().map(|member| member.name()).collect();
        format!("union<{}>", names.join("|"))
    }

    fn cast(&self, value: Value) -> Result<Value, CastError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Model(model) => {
                if self.member(model.class().name()).is_some() {
                    Ok(Value::Model(model))
                } else {
                    Err(self.bad_input(model.class().name()))
                }
            }
            Value::Map(mut map) => {
                let discriminator = map
                    .shift_remove(&self.type_key)
                    .map(|value| value.to_json())
                    .transpose()?;
                let class = self.dispatch(discriminator)?;
                Model::from_attributes(class, map).map(Value::Model)
            }
            other => Err(self.bad_input(other.kind_name())),
        }
    }

    fn serialize(&self, value: &Value) -> Result<Json, CastError> {
        match value {
            Value::Null => Ok(Json::Null),
            Value::Model(model) if self.member(model.class().name()).is_some() => {
                let mut object = model.serialize()?;
                object.insert(
                    self.type_key.clone(),
                    Json::String(model.class().name().to_owned()),
                );
                Ok(Json::Object(object))
            }
            Value::Map(_) => self.serialize(&self.cast(value.clone())?),
            Value::Model(model) => Err(self.bad_input(model.class().name())),
            other => Err(self.bad_input(other.kind_name())),
        }
    }

    fn deserialize(&self, json: Json) -> Result<Value, CastError> {
        match json {
            Json::Null => Ok(Value::Null),
            Json::Object(mut object) => {
                let discriminator = object.shift_remove(&self.type_key);
                let class = self.dispatch(discriminator)?;
                Model::from_serializable(class, object).map(Value::Model)
            }
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

    fn class(name: &str, attribute: &str, kind: ScalarKind) -> Arc<ModelClass> {
        ModelClass::builder(name)
            .attribute(AttributeDefinition::builder(attribute, kind).build().unwrap())
            .build()
            .unwrap()
    }

    fn shapes() -> PolymorphicType {
        PolymorphicType::new(
            [
                class("A", "x", ScalarKind::Integer),
                class("B", "y", ScalarKind::Boolean),
            ],
            "type",
        )
        .unwrap()
    }

    #[test]
    fn test_round_trip_appends_discriminator() {
        let union = shapes();
        let a = union.member("A").unwrap();
        let mut instance = Model::new(a).unwrap();
        instance.set("x", 1).unwrap();

        let json = union.serialize(&Value::Model(instance.clone())).unwrap();
        insta::assert_snapshot!(json.to_string(), @r#"{"x":1,"type":"A"}"#);

        let back = union.deserialize(json).unwrap();
        assert_eq!(back, Value::Model(instance));
    }

    #[test]
    fn test_cast_dispatches_on_discriminator() {
        let union = shapes();
        let cast = union
            .cast(Value::from(json!({"type": "B", "y": "false"})))
            .unwrap();
        let model = cast.as_model().unwrap();
        assert_eq!(model.class().name(), "B");
        assert_eq!(model.get("y").unwrap(), &Value::Bool(false));
    }

    #[test]
    fn test_unregistered_discriminator() {
        let err = shapes().deserialize(json!({"type": "C", "x": 1})).unwrap_err();
        assert_eq!(
            err,
            CastError::UnknownVariant {
                key: "type".to_owned(),
                found: "C".to_owned(),
                expected: "A, B".to_owned(),
            }
        );
    }

    #[test]
    fn test_missing_discriminator() {
        let err = shapes().cast(Value::from(json!({"x": 1}))).unwrap_err();
        assert!(matches!(err, CastError::MissingDiscriminator { .. }));
    }

    #[test]
    fn test_rejects_scalars_and_foreign_models() {
        let union = shapes();
        assert!(matches!(
            union.cast(Value::from("A")).unwrap_err(),
            CastError::BadUnionInput { .. }
        ));

        let other = class("Other", "z", ScalarKind::String);
        let foreign = Model::new(&other).unwrap();
        let err = union.cast(Value::Model(foreign)).unwrap_err();
        assert_eq!(err.to_string(), "cannot cast Other to one of: A, B");
    }

    #[test]
    fn test_custom_type_key() {
        let union = PolymorphicType::new([class("A", "x", ScalarKind::Integer)], "kind").unwrap();
        let json = union
            .serialize(&union.cast(Value::from(json!({"kind": "A", "x": 2}))).unwrap())
            .unwrap();
        assert_eq!(json, json!({"x": 2, "kind": "A"}));
    }

    #[test]
    fn test_construction_invariants() {
        assert_eq!(
            PolymorphicType::new(Vec::new(), "type").unwrap_err(),
            DefinitionError::EmptyUnion
        );

        let a = class("A", "x", ScalarKind::Integer);
        assert_eq!(
            PolymorphicType::new([Arc::clone(&a), a], "type").unwrap_err(),
            DefinitionError::DuplicateUnionMember("A".to_owned())
        );

        let typed = class("Typed", "type", ScalarKind::String);
        let err = PolymorphicType::new([typed], "type").unwrap_err();
        assert!(matches!(err, DefinitionError::DiscriminatorCollision { ref model, .. } if model == "Typed"));
    }

    #[test]
    fn test_collision_with_store_key() {
        let renamed = ModelClass::builder("Renamed")
            .attribute(
                AttributeDefinition::builder("kind", ScalarKind::String)
                    .store_key("type")
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let err = PolymorphicType::new([renamed], "type").unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_array_of_union() {
        let ty = Type::from(shapes()).array_of();
        let cast = ty
            .cast(Value::from(json!([{"type": "A", "x": 1}, {"type": "B", "y": true}])))
            .unwrap();
        assert_eq!(
            ty.serialize(&cast).unwrap(),
            json!([{"x": 1, "type": "A"}, {"y": true, "type": "B"}])
        );

        let err = ty.cast(Value::from(json!([{"type": "A"}, {"y": true}]))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "[1]: missing discriminator key 'type' (expected one of: A, B)"
        );
    }
}
