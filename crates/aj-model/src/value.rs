//! Canonical in-memory values.
//!
//! A [`Value`] is what an attribute holds after casting: the fully-typed
//! representation, as opposed to raw input or the JSON-safe form written to
//! storage. Conversion between the two worlds goes through
//! [`Value::to_json`] and the [`From<serde_json::Value>`] impl.
//!
//! # JSON mapping
//!
//! | Variant | JSON form |
//! |---------|-----------|
//! | `Decimal` | string (`"12.50"`) |
//! | `Date` | string (`"2024-03-01"`) |
//! | `DateTime` | RFC 3339 string in UTC (`"2024-03-01T10:00:00.250Z"`) |
//! | `Float` | number, or `null` when not finite |
//! | `Model` | object produced by the model's own registry |

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use serde_json::{Map as JsonMap, Number, Value as Json};

use aj_core::CastError;

use crate::model::Model;

/// An insertion-ordered mapping from attribute (or store) key to value.
pub type ValueMap = IndexMap<String, Value>;

/// A canonical attribute value.
///
/// # Examples
///
/// ```
/// use aj_model::Value;
/// use serde_json::json;
///
/// let value = Value::from(json!({"title": "hi", "count": 3}));
/// let map = value.as_map().unwrap();
/// assert_eq!(map["count"], Value::Integer(3));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Absent / null.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed 64-bit integer.
    Integer(i64),
    /// A finite double precision float.
    Float(f64),
    /// An exact decimal number.
    Decimal(Decimal),
    /// A string.
    String(String),
    /// A calendar date.
    Date(NaiveDate),
    /// A point in time, normalised to UTC.
    DateTime(DateTime<Utc>),
    /// An ordered sequence.
    Array(Vec<Value>),
    /// A mapping with string keys.
    Map(ValueMap),
    /// An instance of a typed model.
    Model(Model),
}

impl Value {
    /// Returns a short name for the variant, used in error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Model(_) => "model",
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string slice if this is a [`Value::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer if this is a [`Value::Integer`].
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the boolean if this is a [`Value::Bool`].
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the elements if this is a [`Value::Array`].
    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the entries if this is a [`Value::Map`].
    #[must_use]
    pub const fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the model if this is a [`Value::Model`].
    #[must_use]
    pub const fn as_model(&self) -> Option<&Model> {
        match self {
            Self::Model(model) => Some(model),
            _ => None,
        }
    }

    /// Converts a mapping-like value into its entries.
    ///
    /// Maps are returned as-is and models yield their attribute map. Any
    /// other value is handed back unchanged in the `Err` arm so the caller
    /// can decide how strict to be about it.
    ///
    /// # Errors
    ///
    /// Returns the original value if it is not mapping-like.
    pub fn into_mapping(self) -> Result<ValueMap, Self> {
        match self {
            Self::Map(map) => Ok(map),
            Self::Model(model) => Ok(model.into_attributes()),
            other => Err(other),
        }
    }

    /// Converts this value into its JSON-safe form.
    ///
    /// # Errors
    ///
    /// Only fails for nested models whose own serialization fails.
    pub fn to_json(&self) -> Result<Json, CastError> {
        Ok(match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Integer(i) => Json::from(*i),
            Self::Float(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Self::Decimal(d) => Json::String(d.to_string()),
            Self::String(s) => Json::String(s.clone()),
            Self::Date(d) => Json::String(d.to_string()),
            Self::DateTime(dt) => Json::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Array(items) => Json::Array(
                items
                    .iter()
                    .map(Self::to_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Self::Map(map) => Json::Object(map_to_json(map)?),
            Self::Model(model) => model.to_json()?,
        })
    }
}

/// Converts every entry of a value map to JSON, keeping the key order.
pub(crate) fn map_to_json(map: &ValueMap) -> Result<JsonMap<String, Json>, CastError> {
    map.iter()
        .map(|(key, value)| Ok((key.clone(), value.to_json()?)))
        .collect()
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            Json::String(s) => Self::String(s),
            Json::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Json::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

macro_rules! impl_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i64 => Integer,
    i32 => Integer,
    u32 => Integer,
    f64 => Float,
    Decimal => Decimal,
    String => String,
    &str => String,
    NaiveDate => Date,
    DateTime<Utc> => DateTime,
    Vec<Value> => Array,
    ValueMap => Map,
    Model => Model,
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
