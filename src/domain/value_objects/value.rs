//! Typed field values.
//!
//! Every column an entity exposes to the query DSL has a [`FieldType`]; raw
//! query-string operands are coerced into a [`Value`] of that type before any
//! storage call is made.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Semantic type of an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Text,
    Boolean,
    Timestamp,
}

impl FieldType {
    /// Human readable name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
        }
    }

    /// Coerce a raw string into a value of this type.
    ///
    /// Returns `None` when the string does not represent a value of the type.
    pub fn coerce(&self, raw: &str) -> Option<Value> {
        let trimmed = raw.trim();
        match self {
            Self::Integer => trimmed.parse::<i64>().ok().map(Value::Int),
            Self::Text => Some(Value::Text(raw.to_string())),
            Self::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            Self::Timestamp => DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|t| Value::Timestamp(t.with_timezone(&Utc))),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single typed field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Compare two values of the same variant. Mixed variants and nulls do
    /// not compare.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order used for sorting, with nulls after every other value.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_coercion() {
        assert_eq!(FieldType::Integer.coerce(" 42 "), Some(Value::Int(42)));
        assert_eq!(FieldType::Integer.coerce("4x2"), None);
    }

    #[test]
    fn test_boolean_coercion() {
        assert_eq!(FieldType::Boolean.coerce("TRUE"), Some(Value::Bool(true)));
        assert_eq!(FieldType::Boolean.coerce("0"), Some(Value::Bool(false)));
        assert_eq!(FieldType::Boolean.coerce("maybe"), None);
    }

    #[test]
    fn test_timestamp_coercion() {
        let value = FieldType::Timestamp.coerce("2024-03-01T10:00:00+09:00").unwrap();
        match value {
            Value::Timestamp(t) => assert_eq!(t.to_rfc3339(), "2024-03-01T01:00:00+00:00"),
            other => panic!("unexpected value {:?}", other),
        }
        assert_eq!(FieldType::Timestamp.coerce("yesterday"), None);
    }

    #[test]
    fn test_nulls_sort_last() {
        assert_eq!(Value::Null.sort_cmp(&Value::Int(1)), Ordering::Greater);
        assert_eq!(Value::Int(1).sort_cmp(&Value::Int(2)), Ordering::Less);
        assert_eq!(Value::Int(1).compare(&Value::Text("1".into())), None);
    }
}
