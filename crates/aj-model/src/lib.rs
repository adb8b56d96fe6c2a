//! Typed attributes stored in JSON containers.
//!
//! This crate maps attribute names to typed, defaulted values stored in JSON
//! objects. The building blocks, leaf first:
//!
//! - [`Type`] - cast, serialize, and deserialize one value
//! - [`AttributeDefinition`] - name, type, store key, container, default
//! - [`Registry`] - an immutable set of definitions with collision checks
//! - [`ContainerCodec`] - moves an attribute set in and out of one JSON object
//! - [`Model`] / [`ModelClass`] - typed objects, nestable as attribute types
//! - [`Record`] / [`RecordSchema`] - attributes spread over a row's JSON columns
//!
//! Around them sit [`resolve_path`] for containment-query metadata and
//! [`Schema`] for loading declarations from JSON documents.
//!
//! # Example
//!
//! ```
//! use aj_model::{AttributeDefinition, ContainerCodec, Registry, ScalarKind, Value};
//! use serde_json::json;
//!
//! let registry = Registry::new().with([
//!     AttributeDefinition::builder("title", ScalarKind::String).build()?,
//!     AttributeDefinition::builder("count", ScalarKind::Integer).default(0).build()?,
//! ])?;
//! let codec = ContainerCodec::new(&registry, None);
//!
//! let stored = json!({"title": "hi", "count": "3"});
//! let attributes = codec.deserialize_container(stored.as_object().unwrap().clone())?;
//! assert_eq!(attributes["count"], Value::Integer(3));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod container;
pub mod definition;
pub mod model;
pub mod path;
pub mod record;
pub mod registry;
pub mod schema;
pub mod types;
pub mod value;

pub use container::ContainerCodec;
pub use definition::{
    AttributeDefinition, AttributeDefinitionBuilder, AttributeOptions, DefaultGenerator,
    DefaultValue,
};
pub use model::{Model, ModelClass, ModelClassBuilder};
pub use path::{PathSegment, ResolvedPath, resolve_path};
pub use record::{Record, RecordSchema, RecordSchemaBuilder};
pub use registry::Registry;
pub use schema::{Schema, SchemaError};
pub use types::{
    ArrayType, AttributeType, ModelType, PolymorphicType, PrimitiveType, ScalarKind, Type,
    TypeKind,
};
pub use value::{Value, ValueMap};

// Re-export the shared error and configuration types for convenience
pub use aj_core::{
    AttributeError, CastError, Config, ConfigError, DefinitionError, UnknownKeyPolicy,
};
