//! Configuration structures for attr-json.
//!
//! This module provides configuration types for each part of the engine:
//!
//! - [`ModelConfig`] - Typed model settings (unknown-key policy)
//! - [`RecordConfig`] - Record settings (default container, unknown-key policy)
//! - [`UnionConfig`] - Polymorphic type settings (discriminator key)
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] and deserialize with
//! `#[serde(default)]`, so a configuration file only needs to name the
//! settings it changes.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What to do when writing an attribute that is not declared.
///
/// Strict by default: permissive behaviour is only available by opting in.
///
/// # Examples
///
/// ```
/// use aj_core::UnknownKeyPolicy;
///
/// assert_eq!(UnknownKeyPolicy::default(), UnknownKeyPolicy::Raise);
/// assert!(UnknownKeyPolicy::Allow.keeps_value());
/// assert!(!UnknownKeyPolicy::Strip.keeps_value());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKeyPolicy {
    /// Signal an unknown-attribute error.
    #[default]
    Raise,
    /// Silently drop the value.
    Strip,
    /// Store the value verbatim and pass it through on serialize.
    Allow,
}

impl UnknownKeyPolicy {
    /// Returns `true` if unknown values are kept under this policy.
    #[inline]
    #[must_use]
    pub const fn keeps_value(self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Returns the lowercase name used in configuration files.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Raise => "raise",
            Self::Strip => "strip",
            Self::Allow => "allow",
        }
    }
}

/// Configuration for typed model classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Policy applied when a model is given an undeclared attribute.
    pub unknown_key: UnknownKeyPolicy,
}

/// Configuration for record schemas.
///
/// # Examples
///
/// ```
/// use aj_core::RecordConfig;
///
/// let config = RecordConfig::default();
/// assert_eq!(config.default_container, "json_attributes");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    /// Container used by attributes that do not name one.
    pub default_container: String,

    /// Policy applied when a record is given an undeclared attribute.
    pub unknown_key: UnknownKeyPolicy,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            default_container: "json_attributes".to_owned(),
            unknown_key: UnknownKeyPolicy::Raise,
        }
    }
}

/// Configuration for polymorphic (union) types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct UnionConfig {
    /// Key under which the discriminator is written.
    pub type_key: String,
}

impl Default for UnionConfig {
    fn default() -> Self {
        Self {
            type_key: "type".to_owned(),
        }
    }
}

/// Root configuration for attr-json.
///
/// # Examples
///
/// ```
/// use aj_core::{Config, UnknownKeyPolicy};
///
/// let config = Config::from_json_str(r#"{"model": {"unknown_key": "strip"}}"#)?;
/// assert_eq!(config.model.unknown_key, UnknownKeyPolicy::Strip);
/// assert_eq!(config.union.type_key, "type");
/// # Ok::<(), aj_core::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Typed model configuration.
    pub model: ModelConfig,

    /// Record configuration.
    pub record: RecordConfig,

    /// Polymorphic type configuration.
    pub union: UnionConfig,
}

impl Config {
    /// Parses and validates a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::InvalidOption`] if validation fails.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// errors of [`Config::from_json_str`].
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_std_path())
            .map_err(|source| ConfigError::io(path, source))?;
        Self::from_json_str(&text)
    }

    /// Checks option values that serde cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] for an empty default container
    /// or an empty discriminator key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.record.default_container.is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "record.default_container".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        if self.union.type_key.is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "union.type_key".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}
