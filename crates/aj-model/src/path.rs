//! Attribute-path metadata for JSON containment queries.
//!
//! A dotted path such as `"author.name"` names an attribute and, through
//! nested model types, attributes of its nested models. [`resolve_path`]
//! turns it into storage terms (container and store keys) and
//! [`ResolvedPath::containment`] builds the JSON fragment a containment
//! query would compare against:
//!
//! ```
//! use aj_model::{resolve_path, AttributeDefinition, ModelClass, RecordSchema, ScalarKind};
//! use serde_json::json;
//!
//! let person = ModelClass::builder("Person")
//!     .attribute(AttributeDefinition::builder("name", ScalarKind::String).store_key("n").build()?)
//!     .build()?;
//! let schema = RecordSchema::builder()
//!     .attribute(AttributeDefinition::builder("authors", person.array_type()).build()?)
//!     .build()?;
//!
//! let path = resolve_path(schema.registry(), "authors.name")?;
//! assert_eq!(path.container(), Some("json_attributes"));
//! assert_eq!(path.containment("Ursula")?, json!({"authors": [{"n": "Ursula"}]}));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::sync::Arc;

use serde_json::{Map as JsonMap, Value as Json};

use aj_core::{AttributeError, CastError};

use crate::definition::AttributeDefinition;
use crate::model::ModelClass;
use crate::registry::Registry;
use crate::value::Value;

/// One resolved segment of an attribute path.
#[derive(Debug, Clone)]
pub struct PathSegment {
    /// The attribute at this segment.
    pub definition: Arc<AttributeDefinition>,
    /// Whether the attribute is array typed.
    pub is_array: bool,
}

/// An attribute path resolved against a registry.
#[derive(Debug, Clone)]
pub struct ResolvedPath {
    path: String,
    segments: Vec<PathSegment>,
}

/// Resolves a dotted attribute path.
///
/// Each segment but the last must be a model attribute (or an array of
/// one); polymorphic and scalar attributes cannot be traversed.
///
/// # Errors
///
/// Returns [`AttributeError::NotFound`] for a segment naming no attribute and
/// [`AttributeError::NotTraversable`] for a path continuing past a
/// non-model attribute.
pub fn resolve_path(registry: &Registry, path: &str) -> Result<ResolvedPath, AttributeError> {
    let mut segments: Vec<PathSegment> = Vec::new();
    let mut nested: Option<Arc<ModelClass>> = None;

    for name in path.split('.') {
        let scope = match (&nested, segments.last()) {
            (Some(class), _) => class.registry(),
            (None, None) => registry,
            (None, Some(previous)) => {
                return Err(AttributeError::NotTraversable {
                    path: path.to_owned(),
                    segment: previous.definition.name().to_owned(),
                });
            }
        };

        let definition = Arc::clone(scope.fetch(name)?);
        nested = definition.ty().model_class().cloned();
        segments.push(PathSegment {
            is_array: definition.ty().is_array(),
            definition,
        });
    }

    Ok(ResolvedPath {
        path: path.to_owned(),
        segments,
    })
}

impl ResolvedPath {
    /// Returns the original dotted path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the container of the first segment.
    #[must_use]
    pub fn container(&self) -> Option<&str> {
        self.segments
            .first()
            .and_then(|segment| segment.definition.container())
    }

    /// Returns the resolved segments.
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns the store keys along the path.
    pub fn store_keys(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .map(|segment| segment.definition.store_key())
    }

    /// Returns the definition at the end of the path.
    #[must_use]
    pub fn leaf(&self) -> &Arc<AttributeDefinition> {
        // Never empty: split yields at least one segment
        &self.segments[self.segments.len() - 1].definition
    }

    /// Builds the JSON containment fragment matching `value` at this path.
    ///
    /// The value is cast and serialized by the leaf attribute. Every
    /// array-typed intermediate segment wraps its object in a one-element
    /// array.
    ///
    /// # Errors
    ///
    /// Returns a [`CastError`] if the value cannot be cast by the leaf type.
    pub fn containment(&self, value: impl Into<Value>) -> Result<Json, CastError> {
        let leaf = self.leaf();
        let mut fragment = leaf.serialize(&leaf.cast(value.into())?)?;

        let last = self.segments.len() - 1;
        for (index, segment) in self.segments.iter().enumerate().rev() {
            if segment.is_array && index != last {
                fragment = Json::Array(vec![fragment]);
            }
            let mut object = JsonMap::new();
            object.insert(segment.definition.store_key().to_owned(), fragment);
            fragment = Json::Object(object);
        }

        Ok(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordSchema;
    use crate::types::{PolymorphicType, ScalarKind};
    use serde_json::json;

    fn registry() -> Registry {
        let city = ModelClass::builder("City")
            .attribute(
                AttributeDefinition::builder("name", ScalarKind::String)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let address = ModelClass::builder("Address")
            .attribute(AttributeDefinition::builder("city", &city).store_key("c").build().unwrap())
            .attribute(
                AttributeDefinition::builder("zip", ScalarKind::Integer)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let schema = RecordSchema::builder()
            .default_container("data")
            .attribute(
                AttributeDefinition::builder("addresses", address.array_type())
                    .build()
                    .unwrap(),
            )
            .attribute(
                AttributeDefinition::builder("tags", ScalarKind::String)
                    .array(true)
                    .build()
                    .unwrap(),
            )
            .attribute(
                AttributeDefinition::builder(
                    "shape",
                    PolymorphicType::new([city], "type").unwrap(),
                )
                .build()
                .unwrap(),
            )
            .build()
            .unwrap();
        schema.registry().clone()
    }

    #[test]
    fn test_resolve_nested_path() {
        let registry = registry();
        let path = resolve_path(&registry, "addresses.city.name").unwrap();

        assert_eq!(path.container(), Some("data"));
        assert_eq!(path.store_keys().collect::<Vec<_>>(), ["addresses", "c", "name"]);
        let arrays: Vec<_> = path.segments().iter().map(|s| s.is_array).collect();
        assert_eq!(arrays, [true, false, false]);
        assert_eq!(path.leaf().name(), "name");
    }

    #[test]
    fn test_containment_wraps_arrays() {
        let registry = registry();
        let path = resolve_path(&registry, "addresses.zip").unwrap();
        insta::assert_snapshot!(
            path.containment("2000").unwrap().to_string(),
            @r#"{"addresses":[{"zip":2000}]}"#
        );
    }

    #[test]
    fn test_containment_of_array_leaf() {
        let registry = registry();
        let path = resolve_path(&registry, "tags").unwrap();
        assert_eq!(path.containment("rust").unwrap(), json!({"tags": ["rust"]}));
    }

    #[test]
    fn test_unknown_segment() {
        let registry = registry();
        let err = resolve_path(&registry, "addresses.street").unwrap_err();
        assert_eq!(err, AttributeError::NotFound("street".to_owned()));
    }

    #[test]
    fn test_cannot_traverse_scalars_or_unions() {
        let registry = registry();

        let err = resolve_path(&registry, "tags.first").unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot traverse 'tags' in path 'tags.first': not a nested model"
        );

        let err = resolve_path(&registry, "shape.name").unwrap_err();
        assert!(matches!(err, AttributeError::NotTraversable { ref segment, .. } if segment == "shape"));
    }
}
