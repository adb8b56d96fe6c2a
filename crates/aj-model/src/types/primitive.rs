//! Scalar attribute types.
//!
//! Primitive casts are permissive: input that cannot be interpreted becomes
//! [`Value::Null`] (or `true`/`false` for booleans) instead of an error. This
//! mirrors the scalar coercion rules of the web frameworks these JSON columns
//! are usually shared with, so data written by either side reads the same.
//!
//! | Tag | Canonical value | Notes |
//! |-----|-----------------|-------|
//! | `string` | `String` | booleans become `"t"`/`"f"` |
//! | `integer` | `Integer` | floats truncate, out-of-range input is null |
//! | `float` | `Float` | non-finite input is null |
//! | `decimal` | `Decimal` | accepts plain and scientific notation |
//! | `boolean` | `Bool` | see [`FALSE_VALUES`]; `""` is null |
//! | `date` | `Date` | ISO dates, or the date part of a timestamp |
//! | `datetime` | `DateTime` | RFC 3339 and common SQL-style layouts, UTC |
//! | `value` | JSON-shaped | raw passthrough (alias `json`) |

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde_json::Value as Json;
use tracing::trace;

use aj_core::{CastError, DefinitionError};

use super::AttributeType;
use crate::value::Value;

/// String inputs that cast to `false` for boolean attributes.
pub const FALSE_VALUES: &[&str] = &["0", "f", "F", "false", "FALSE", "off", "OFF"];

/// Naive layouts accepted for timestamps without an offset (read as UTC).
const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// The scalar kinds available as attribute types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// Text.
    String,
    /// 64-bit signed integer.
    Integer,
    /// Double precision float.
    Float,
    /// Exact decimal.
    Decimal,
    /// Boolean.
    Boolean,
    /// Calendar date.
    Date,
    /// UTC timestamp.
    DateTime,
    /// Raw JSON passthrough.
    Value,
}

impl ScalarKind {
    /// Every scalar kind, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::String,
        Self::Integer,
        Self::Float,
        Self::Decimal,
        Self::Boolean,
        Self::Date,
        Self::DateTime,
        Self::Value,
    ];

    /// Returns the tag used to declare this kind.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Value => "value",
        }
    }
}

impl FromStr for ScalarKind {
    type Err = DefinitionError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "decimal" => Ok(Self::Decimal),
            "boolean" => Ok(Self::Boolean),
            "date" => Ok(Self::Date),
            "datetime" => Ok(Self::DateTime),
            "value" | "json" => Ok(Self::Value),
            other => Err(DefinitionError::UnknownType(other.to_owned())),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A scalar attribute type.
///
/// # Examples
///
/// ```
/// use aj_model::{AttributeType, PrimitiveType, ScalarKind, Value};
///
/// let integer = PrimitiveType::new(ScalarKind::Integer);
/// assert_eq!(integer.cast(Value::from(" 42 ")).unwrap(), Value::Integer(42));
/// assert_eq!(integer.cast(Value::from("n/a")).unwrap(), Value::Null);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveType {
    kind: ScalarKind,
}

impl PrimitiveType {
    /// Creates a primitive type of the given kind.
    #[inline]
    #[must_use]
    pub const fn new(kind: ScalarKind) -> Self {
        Self { kind }
    }

    /// Returns the scalar kind.
    #[inline]
    #[must_use]
    pub const fn kind(self) -> ScalarKind {
        self.kind
    }

    /// Casts without ever failing.
    #[must_use]
    pub fn cast_value(self, value: Value) -> Value {
        let found = value.kind_name();
        let was_null = value.is_null();

        let cast = match self.kind {
            ScalarKind::String => cast_string(value),
            ScalarKind::Integer => cast_integer(value),
            ScalarKind::Float => cast_float(value),
            ScalarKind::Decimal => cast_decimal(value),
            ScalarKind::Boolean => cast_boolean(value),
            ScalarKind::Date => cast_date(value),
            ScalarKind::DateTime => cast_datetime(value),
            ScalarKind::Value => cast_raw(value),
        };

        if cast.is_null() && !was_null {
            trace!(kind = %self.kind, found, "uncastable input, falling back to null");
        }
        cast
    }
}

impl AttributeType for PrimitiveType {
    fn type_name(&self) -> String {
        self.kind.tag().to_owned()
    }

    fn cast(&self, value: Value) -> Result<Value, CastError> {
        Ok(self.cast_value(value))
    }

    fn serialize(&self, value: &Value) -> Result<Json, CastError> {
        value.to_json()
    }

    fn deserialize(&self, json: Json) -> Result<Value, CastError> {
        Ok(self.cast_value(Value::from(json)))
    }
}

fn cast_string(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s),
        Value::Bool(true) => Value::from("t"),
        Value::Bool(false) => Value::from("f"),
        Value::Integer(i) => Value::String(i.to_string()),
        Value::Float(f) => Value::String(f.to_string()),
        Value::Decimal(d) => Value::String(d.to_string()),
        Value::Date(d) => Value::String(d.to_string()),
        scalar @ Value::DateTime(_) => scalar.to_json().map_or(Value::Null, Value::from),
        Value::Null | Value::Array(_) | Value::Map(_) | Value::Model(_) => Value::Null,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_integer(f: f64) -> Value {
    // i64::MAX as f64 rounds up to 2^63, hence the exclusive upper bound
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Value::Integer(f.trunc() as i64)
    } else {
        Value::Null
    }
}

fn cast_integer(value: Value) -> Value {
    match value {
        Value::Integer(i) => Value::Integer(i),
        Value::Bool(b) => Value::Integer(i64::from(b)),
        Value::Float(f) => float_to_integer(f),
        Value::Decimal(d) => d.trunc().to_i64().map_or(Value::Null, Value::Integer),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Value::Integer(i)
            } else {
                s.parse::<f64>().map_or(Value::Null, float_to_integer)
            }
        }
        _ => Value::Null,
    }
}

fn finite(f: f64) -> Value {
    if f.is_finite() {
        Value::Float(f)
    } else {
        Value::Null
    }
}

#[allow(clippy::cast_precision_loss)]
fn cast_float(value: Value) -> Value {
    match value {
        Value::Float(f) => finite(f),
        Value::Integer(i) => Value::Float(i as f64),
        Value::Bool(b) => Value::Float(if b { 1.0 } else { 0.0 }),
        Value::Decimal(d) => d.to_f64().map_or(Value::Null, finite),
        Value::String(s) => s.trim().parse::<f64>().map_or(Value::Null, finite),
        _ => Value::Null,
    }
}

fn cast_decimal(value: Value) -> Value {
    match value {
        Value::Decimal(d) => Value::Decimal(d),
        Value::Integer(i) => Value::Decimal(Decimal::from(i)),
        Value::Bool(b) => Value::Decimal(if b { Decimal::ONE } else { Decimal::ZERO }),
        Value::Float(f) => Decimal::from_f64(f).map_or(Value::Null, Value::Decimal),
        Value::String(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .map_or(Value::Null, Value::Decimal)
        }
        _ => Value::Null,
    }
}

fn cast_boolean(value: Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Bool(b) => Value::Bool(b),
        Value::Integer(i) => Value::Bool(i != 0),
        Value::Float(f) => Value::Bool(f != 0.0),
        Value::Decimal(d) => Value::Bool(!d.is_zero()),
        Value::String(s) if s.is_empty() => Value::Null,
        Value::String(s) => Value::Bool(!FALSE_VALUES.contains(&s.as_str())),
        // Anything outside the false list is truthy
        _ => Value::Bool(true),
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f %z") {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .map(|naive| naive.and_utc())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn cast_date(value: Value) -> Value {
    match value {
        Value::Date(d) => Value::Date(d),
        Value::DateTime(dt) => Value::Date(dt.date_naive()),
        Value::String(s) => {
            let s = s.trim();
            parse_date(s)
                .or_else(|| parse_datetime(s).map(|dt| dt.date_naive()))
                .map_or(Value::Null, Value::Date)
        }
        _ => Value::Null,
    }
}

fn cast_datetime(value: Value) -> Value {
    match value {
        Value::DateTime(dt) => Value::DateTime(dt),
        Value::Date(d) => Value::DateTime(d.and_time(chrono::NaiveTime::MIN).and_utc()),
        Value::String(s) => {
            let s = s.trim();
            parse_datetime(s)
                .or_else(|| parse_date(s).map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc()))
                .map_or(Value::Null, Value::DateTime)
        }
        _ => Value::Null,
    }
}

/// Normalises to the JSON-shaped subset of [`Value`] so raw values survive
/// a trip through storage unchanged.
fn cast_raw(value: Value) -> Value {
    value.to_json().map_or(Value::Null, Value::from)
}
