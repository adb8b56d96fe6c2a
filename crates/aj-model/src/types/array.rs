//! Typed arrays.

use serde_json::Value as Json;

use aj_core::CastError;

use super::{AttributeType, Type};
use crate::value::Value;

/// An array whose elements all have the same type.
///
/// Arrays are never null: `null` casts to `[]`, and a bare non-array value is
/// wrapped into a one-element array before the element type sees it.
#[derive(Debug, Clone)]
pub struct ArrayType {
    element: Box<Type>,
}

impl ArrayType {
    /// Creates an array type over `element`.
    #[must_use]
    pub fn new(element: Type) -> Self {
        Self {
            element: Box::new(element),
        }
    }

    /// Returns the element type.
    #[inline]
    #[must_use]
    pub fn element(&self) -> &Type {
        &self.element
    }
}

impl AttributeType for ArrayType {
    fn type_name(&self) -> String {
        format!("array<{}>", self.element.type_name())
    }

    fn cast(&self, value: Value) -> Result<Value, CastError> {
        let items = match value {
            Value::Null => return Ok(Value::Array(Vec::new())),
            Value::Array(items) => items,
            single => vec![single],
        };

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                self.element
                    .cast(item)
                    .map_err(|err| err.in_element(index))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn serialize(&self, value: &Value) -> Result<Json, CastError> {
        match value {
            Value::Null => Ok(Json::Array(Vec::new())),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    self.element
                        .serialize(item)
                        .map_err(|err| err.in_element(index))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array),
            single => Ok(Json::Array(vec![self.element.serialize(single)?])),
        }
    }

    fn deserialize(&self, json: Json) -> Result<Value, CastError> {
        let items = match json {
            Json::Null => return Ok(Value::Array(Vec::new())),
            Json::Array(items) => items,
            single => vec![single],
        };

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                self.element
                    .deserialize(item)
                    .map_err(|err| err.in_element(index))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}
