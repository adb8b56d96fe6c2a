//! Core errors, configuration, and utilities for attr-json.
//!
//! This crate provides the foundational pieces shared across the workspace:
//!
//! - Error types for schema declaration, casting, and attribute access
//! - Configuration structures (unknown-key policy, containers, discriminators)
//! - Type aliases for `FxHashMap`/`FxHashSet` (faster than std)
//!
//! The typed attribute engine itself lives in `aj-model`; this crate has no
//! knowledge of values or types beyond the names it reports in errors.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;

pub use config::{Config, ModelConfig, RecordConfig, UnionConfig, UnknownKeyPolicy};
pub use error::{AttributeError, CastError, ConfigError, DefinitionError};
pub use hash::{FxHashMap, FxHashSet};
