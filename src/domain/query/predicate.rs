//! Predicate parser.
//!
//! Turns a single `where__<field>[__<operator>]` or `order__<field>` parameter
//! into a typed [`Predicate`] or [`OrderSpec`]. Parsing is pure: nothing here
//! touches storage.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::FilterError;
use super::operator::{Condition, OperatorRegistry, OperatorTransform, DEFAULT_OPERATORS, EQUAL};
use crate::domain::value_objects::{Column, FieldType, Schema, Value};

/// Separator between filter key tokens.
pub const KEY_SEPARATOR: &str = "__";

/// Prefix token of filter keys.
pub const WHERE_PREFIX: &str = "where";

/// Prefix token of ordering keys.
pub const ORDER_PREFIX: &str = "order";

/// Operand of a predicate as written by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Scalar(Value),
    Range(Value, Value),
    List(Vec<Value>),
}

/// One filter condition against one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: String,
    /// Operator token exactly as it appeared in the key (`equal` for the
    /// 2-token form).
    pub operator: String,
    pub condition: Condition,
}

impl Predicate {
    /// Build an equality predicate directly, bypassing the parser.
    pub fn equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator: EQUAL.to_string(),
            condition: Condition::Equal(value.into()),
        }
    }

    /// Match any of `values`; an empty list matches nothing.
    pub fn one_of<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: "in".to_string(),
            condition: Condition::In(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn operand(&self) -> Operand {
        match &self.condition {
            Condition::Between(low, high) => Operand::Range(low.clone(), high.clone()),
            Condition::In(values) => Operand::List(values.clone()),
            Condition::Equal(v)
            | Condition::NotEqual(v)
            | Condition::MoreThan(v)
            | Condition::MoreThanOrEqual(v)
            | Condition::LessThan(v)
            | Condition::LessThanOrEqual(v)
            | Condition::Like(v)
            | Condition::ILike(v) => Operand::Scalar(v.clone()),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Ordering by one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub field: String,
    pub direction: Direction,
}

impl OrderSpec {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Parses filter and ordering keys against an entity schema.
#[derive(Debug, Clone)]
pub struct FilterParser {
    operators: Arc<OperatorRegistry>,
}

impl Default for FilterParser {
    fn default() -> Self {
        Self::new(Arc::new(DEFAULT_OPERATORS.clone()))
    }
}

impl FilterParser {
    pub fn new(operators: Arc<OperatorRegistry>) -> Self {
        Self { operators }
    }

    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    /// Parse one `where__` parameter.
    pub fn parse(&self, schema: &Schema, key: &str, raw: &str) -> Result<Predicate, FilterError> {
        let tokens = split_key(key, WHERE_PREFIX)?;
        let field = tokens[1];
        let column = resolve_field(schema, key, field)?;
        let operator = tokens.get(2).copied().unwrap_or(EQUAL);

        let transform = self
            .operators
            .get(operator)
            .ok_or_else(|| FilterError::UnknownOperator {
                key: key.to_string(),
                operator: operator.to_string(),
            })?;

        let condition = match transform {
            OperatorTransform::Unary(build) => build(coerce(column, key, raw)?),
            OperatorTransform::Binary(build) => {
                let parts: Vec<&str> = raw.split(',').collect();
                if parts.len() != 2 {
                    return Err(FilterError::malformed_operand(
                        key,
                        raw,
                        format!("'{}' expects exactly two comma-separated values", operator),
                    ));
                }
                build(coerce(column, key, parts[0])?, coerce(column, key, parts[1])?)
            }
        };

        if condition.requires_text() && column.ty != FieldType::Text {
            return Err(FilterError::type_coercion(key, raw, FieldType::Text.as_str()));
        }

        Ok(Predicate {
            field: field.to_string(),
            operator: operator.to_string(),
            condition,
        })
    }

    /// Parse one `order__` parameter.
    pub fn parse_order(&self, schema: &Schema, key: &str, raw: &str) -> Result<OrderSpec, FilterError> {
        let tokens = split_key(key, ORDER_PREFIX)?;
        if tokens.len() != 2 {
            return Err(FilterError::MalformedFilter {
                key: key.to_string(),
            });
        }
        let field = tokens[1];
        resolve_field(schema, key, field)?;

        let direction = Direction::parse(raw)
            .ok_or_else(|| FilterError::malformed_operand(key, raw, "expected ASC or DESC"))?;

        Ok(OrderSpec::new(field, direction))
    }
}

/// Split a key into its 2 or 3 tokens, checking the prefix token.
fn split_key<'k>(key: &'k str, prefix: &str) -> Result<Vec<&'k str>, FilterError> {
    let tokens: Vec<&str> = key.split(KEY_SEPARATOR).collect();
    let well_formed = matches!(tokens.len(), 2 | 3)
        && tokens[0] == prefix
        && tokens[1..].iter().all(|t| !t.is_empty());

    if !well_formed {
        return Err(FilterError::MalformedFilter {
            key: key.to_string(),
        });
    }
    Ok(tokens)
}

fn resolve_field<'s>(schema: &'s Schema, key: &str, field: &str) -> Result<&'s Column, FilterError> {
    schema.field(field).ok_or_else(|| FilterError::UnknownField {
        key: key.to_string(),
        field: field.to_string(),
    })
}

fn coerce(column: &Column, key: &str, raw: &str) -> Result<Value, FilterError> {
    column
        .ty
        .coerce(raw)
        .ok_or_else(|| FilterError::type_coercion(key, raw, column.ty.as_str()))
}
