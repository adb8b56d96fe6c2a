//! Error types shared across the workspace.
//!
//! The error taxonomy follows the lifecycle of a typed attribute:
//!
//! - [`DefinitionError`] - raised while declaring attributes, registries,
//!   model classes, and unions. Always fatal to that declaration.
//! - [`CastError`] - raised when a model or union type is handed input it
//!   cannot interpret. Primitive scalar casts never produce one.
//! - [`AttributeError`] - raised on the read/write path of a typed object
//!   (unknown attribute under the `raise` policy, lookup misses).
//! - [`ConfigError`] - raised while loading configuration or schema files.

use camino::Utf8PathBuf;

/// Errors raised while declaring attributes and registries.
///
/// These indicate a programming mistake in a schema declaration, not a
/// problem with runtime data, and are never silently recovered.
///
/// # Examples
///
/// ```
/// use aj_core::DefinitionError;
///
/// let error = DefinitionError::duplicate_attribute("title");
/// assert!(error.to_string().contains("title"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    /// An attribute with this name is already registered.
    #[error("attribute '{name}' is already defined")]
    DuplicateAttribute {
        /// The conflicting attribute name.
        name: String,
    },

    /// Another attribute in the same container already uses this store key.
    #[error(
        "store key '{store_key}' in container '{container}' is already used by attribute '{existing}'"
    )]
    DuplicateStoreKey {
        /// The container both attributes live in (`-` for nested models).
        container: String,
        /// The conflicting store key.
        store_key: String,
        /// The attribute that already owns the store key.
        existing: String,
    },

    /// An option key that attribute declarations do not understand.
    #[error("unknown option '{option}' for attribute '{attribute}'")]
    UnknownOption {
        /// The attribute being declared.
        attribute: String,
        /// The unrecognised option key.
        option: String,
    },

    /// An option was given a value it cannot take.
    #[error("invalid option '{option}' for '{attribute}': {reason}")]
    InvalidOption {
        /// The attribute (or model) being declared.
        attribute: String,
        /// The offending option.
        option: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A type tag that does not name a known scalar type or model.
    #[error("unknown type '{0}'")]
    UnknownType(String),

    /// A polymorphic type was declared without any member models.
    #[error("a polymorphic type needs at least one member model")]
    EmptyUnion,

    /// The same model appears twice in a polymorphic type.
    #[error("model '{0}' appears more than once in a polymorphic type")]
    DuplicateUnionMember(String),

    /// The discriminator key shadows an attribute of a member model.
    #[error("discriminator key '{key}' collides with an attribute of model '{model}'")]
    DiscriminatorCollision {
        /// The discriminator key.
        key: String,
        /// The member model declaring an attribute with the same key.
        model: String,
    },
}

impl DefinitionError {
    /// Creates a new [`DefinitionError::DuplicateAttribute`] error.
    #[inline]
    pub fn duplicate_attribute(name: impl Into<String>) -> Self {
        Self::DuplicateAttribute { name: name.into() }
    }

    /// Creates a new [`DefinitionError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(
        attribute: impl Into<String>,
        option: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidOption {
            attribute: attribute.into(),
            option: option.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error reports a name or store-key collision.
    #[inline]
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicateAttribute { .. }
                | Self::DuplicateStoreKey { .. }
                | Self::DuplicateUnionMember(_)
                | Self::DiscriminatorCollision { .. }
        )
    }
}

/// Errors raised when model or union types receive input they cannot cast.
///
/// Primitive scalar types are permissive and fall back to `null` instead;
/// guessing a model or union variant is unsafe, so those types fail loudly.
///
/// Nested failures are wrapped with [`CastError::InAttribute`] and
/// [`CastError::InElement`] so the message names the full location.
///
/// # Examples
///
/// ```
/// use aj_core::CastError;
///
/// let error = CastError::MissingDiscriminator {
///     key: "type".to_owned(),
///     expected: "Cat, Dog".to_owned(),
/// }
/// .in_element(2)
/// .in_attribute("pets");
///
/// assert_eq!(
///     error.to_string(),
///     "pets: [2]: missing discriminator key 'type' (expected one of: Cat, Dog)"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CastError {
    /// The input is neither an instance of the model nor a mapping.
    #[error("cannot cast {found} to model '{model}'")]
    BadModelInput {
        /// The target model class.
        model: String,
        /// The kind of value that was supplied.
        found: String,
    },

    /// The input cannot be interpreted as any union member.
    #[error("cannot cast {found} to one of: {expected}")]
    BadUnionInput {
        /// The kind of value that was supplied.
        found: String,
        /// The member model names, comma separated.
        expected: String,
    },

    /// A mapping was given to a union type without a discriminator.
    #[error("missing discriminator key '{key}' (expected one of: {expected})")]
    MissingDiscriminator {
        /// The discriminator key that was looked for.
        key: String,
        /// The member model names, comma separated.
        expected: String,
    },

    /// The discriminator names a model that is not a member of the union.
    #[error("unrecognized discriminator '{found}' under '{key}' (expected one of: {expected})")]
    UnknownVariant {
        /// The discriminator key.
        key: String,
        /// The discriminator value found in the input.
        found: String,
        /// The member model names, comma separated.
        expected: String,
    },

    /// A nested model was given an undeclared attribute under the `raise`
    /// policy.
    #[error("unknown attribute '{name}' for {owner}")]
    UnknownAttribute {
        /// The model class being constructed.
        owner: String,
        /// The undeclared attribute name.
        name: String,
    },

    /// A nested failure inside a named attribute.
    #[error("{attribute}: {source}")]
    InAttribute {
        /// The attribute whose value failed to cast.
        attribute: String,
        /// The underlying failure.
        #[source]
        source: Box<CastError>,
    },

    /// A nested failure inside an array element.
    #[error("[{index}]: {source}")]
    InElement {
        /// The element position.
        index: usize,
        /// The underlying failure.
        #[source]
        source: Box<CastError>,
    },
}

impl CastError {
    /// Wraps this error with the attribute it occurred in.
    #[must_use]
    pub fn in_attribute(self, attribute: impl Into<String>) -> Self {
        Self::InAttribute {
            attribute: attribute.into(),
            source: Box::new(self),
        }
    }

    /// Wraps this error with the array position it occurred at.
    #[must_use]
    pub fn in_element(self, index: usize) -> Self {
        Self::InElement {
            index,
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping location wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::InAttribute { source, .. } | Self::InElement { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Errors raised on the read/write path of typed objects and records.
///
/// # Examples
///
/// ```
/// use aj_core::AttributeError;
///
/// let error = AttributeError::unknown("Address", "zip");
/// assert_eq!(error.to_string(), "unknown attribute 'zip' for Address");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    /// Writing an attribute that is not declared (policy `raise`).
    #[error("unknown attribute '{name}' for {owner}")]
    Unknown {
        /// The model class or record schema being written.
        owner: String,
        /// The undeclared attribute name.
        name: String,
    },

    /// A lookup by attribute name found nothing.
    #[error("no attribute named '{0}'")]
    NotFound(String),

    /// An attribute path continues past an attribute with no nested model.
    #[error("cannot traverse '{segment}' in path '{path}': not a nested model")]
    NotTraversable {
        /// The full dotted path.
        path: String,
        /// The segment that has no nested attributes.
        segment: String,
    },

    /// The value could not be cast to the attribute's type.
    #[error(transparent)]
    Cast(CastError),
}

impl From<CastError> for AttributeError {
    fn from(error: CastError) -> Self {
        match error {
            CastError::UnknownAttribute { owner, name } => Self::Unknown { owner, name },
            other => Self::Cast(other),
        }
    }
}

impl AttributeError {
    /// Creates a new [`AttributeError::Unknown`] error.
    #[inline]
    pub fn unknown(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Unknown {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

/// Errors that can occur during configuration and schema file loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// Failed to read a configuration or schema file.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file that could not be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration or schema JSON.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::Io`] error.
    #[inline]
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_store_key_display() {
        let error = DefinitionError::DuplicateStoreKey {
            container: "json_attributes".to_owned(),
            store_key: "__a".to_owned(),
            existing: "a".to_owned(),
        };
        let msg = error.to_string();
        assert!(msg.contains("__a"));
        assert!(msg.contains("json_attributes"));
        assert!(msg.contains("'a'"));
        assert!(error.is_conflict());
    }

    #[test]
    fn test_unknown_type_is_not_conflict() {
        let error = DefinitionError::UnknownType("money".to_owned());
        assert!(!error.is_conflict());
        assert_eq!(error.to_string(), "unknown type 'money'");
    }

    #[test]
    fn test_cast_error_context_chain() {
        let error = CastError::UnknownVariant {
            key: "type".to_owned(),
            found: "C".to_owned(),
            expected: "A, B".to_owned(),
        }
        .in_attribute("shape");

        assert_eq!(
            error.to_string(),
            "shape: unrecognized discriminator 'C' under 'type' (expected one of: A, B)"
        );
        assert!(matches!(error.root(), CastError::UnknownVariant { .. }));
    }

    #[test]
    fn test_attribute_error_from_cast() {
        let cast = CastError::BadModelInput {
            model: "Address".to_owned(),
            found: "integer".to_owned(),
        };
        let error: AttributeError = cast.clone().into();
        assert_eq!(error.to_string(), cast.to_string());
    }

    #[test]
    fn test_unknown_attribute_cast_becomes_unknown() {
        let cast = CastError::UnknownAttribute {
            owner: "Address".to_owned(),
            name: "zip".to_owned(),
        };
        let error = AttributeError::from(cast);
        assert_eq!(error, AttributeError::unknown("Address", "zip"));

        // Nested location wrappers stay on the cast path
        let nested = CastError::UnknownAttribute {
            owner: "Address".to_owned(),
            name: "zip".to_owned(),
        }
        .in_attribute("home");
        assert!(matches!(AttributeError::from(nested), AttributeError::Cast(_)));
    }

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::InvalidOption {
            option: "record.default_container".to_owned(),
            reason: "must not be empty".to_owned(),
        };
        let msg = error.to_string();
        assert!(msg.contains("record.default_container"));
        assert!(msg.contains("must not be empty"));
    }

    #[test]
    fn test_io_error_names_path() {
        let error = ConfigError::io(
            "schema.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(error.to_string().contains("schema.json"));
    }
}
