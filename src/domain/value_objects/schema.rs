//! Static entity schemas and untyped row records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::value::{FieldType, Value};
use crate::shared::error::StorageError;

/// Identity field present on every entity.
pub const ID_FIELD: &str = "id";

/// Creation timestamp present on every entity.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Last-update timestamp, refreshed by every update.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// A column exposed by an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Field name used by the query DSL and by [`Record`]s (camelCase).
    pub field: &'static str,
    /// Column name in the relational store.
    pub column: &'static str,
    pub ty: FieldType,
    /// Filled in by the store on insert.
    pub generated: bool,
}

impl Column {
    pub const fn new(field: &'static str, column: &'static str, ty: FieldType) -> Self {
        Self {
            field,
            column,
            ty,
            generated: false,
        }
    }

    pub const fn generated(field: &'static str, column: &'static str, ty: FieldType) -> Self {
        Self {
            field,
            column,
            ty,
            generated: true,
        }
    }
}

/// Table name plus the columns an entity exposes.
#[derive(Debug)]
pub struct Schema {
    pub table: &'static str,
    pub columns: &'static [Column],
}

impl Schema {
    /// Look up a column by its DSL field name.
    pub fn field(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.field == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Resolve a field name, failing with [`StorageError::UnknownField`].
    pub fn require(&self, name: &str) -> Result<&Column, StorageError> {
        self.field(name).ok_or_else(|| StorageError::UnknownField {
            table: self.table,
            field: name.to_string(),
        })
    }
}

/// An untyped row keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.values.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Value of a field, `Null` when absent.
    pub fn value(&self, field: &str) -> Value {
        self.values.get(field).cloned().unwrap_or(Value::Null)
    }

    pub fn id(&self) -> Option<i64> {
        self.get(ID_FIELD).and_then(Value::as_i64)
    }

    pub fn int(&self, field: &str) -> Result<i64, StorageError> {
        match self.get(field) {
            Some(Value::Int(v)) => Ok(*v),
            other => Err(Self::mismatch(field, "integer", other)),
        }
    }

    pub fn opt_int(&self, field: &str) -> Result<Option<i64>, StorageError> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Int(v)) => Ok(Some(*v)),
            other => Err(Self::mismatch(field, "integer", other)),
        }
    }

    pub fn text(&self, field: &str) -> Result<String, StorageError> {
        match self.get(field) {
            Some(Value::Text(v)) => Ok(v.clone()),
            other => Err(Self::mismatch(field, "text", other)),
        }
    }

    pub fn boolean(&self, field: &str) -> Result<bool, StorageError> {
        match self.get(field) {
            Some(Value::Bool(v)) => Ok(*v),
            other => Err(Self::mismatch(field, "boolean", other)),
        }
    }

    pub fn timestamp(&self, field: &str) -> Result<DateTime<Utc>, StorageError> {
        match self.get(field) {
            Some(Value::Timestamp(v)) => Ok(*v),
            other => Err(Self::mismatch(field, "timestamp", other)),
        }
    }

    fn mismatch(field: &str, expected: &str, found: Option<&Value>) -> StorageError {
        StorageError::Decode(format!(
            "field '{}' expected {} but found {:?}",
            field, expected, found
        ))
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
