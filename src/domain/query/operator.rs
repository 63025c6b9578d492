//! Filter operator registry.
//!
//! Maps the operator token of a `where__<field>__<operator>` key to the
//! transform that builds a [`Condition`]. New operators are added with
//! [`OperatorRegistry::register`]; the parser never needs to change.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::domain::value_objects::Value;

/// Operator implied by the 2-token `where__<field>` form.
pub const EQUAL: &str = "equal";

/// A comparison against one field, with its operand(s) already typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Equal(Value),
    NotEqual(Value),
    MoreThan(Value),
    MoreThanOrEqual(Value),
    LessThan(Value),
    LessThanOrEqual(Value),
    /// Inclusive on both ends.
    Between(Value, Value),
    /// Case-sensitive substring match.
    Like(Value),
    /// Case-insensitive substring match.
    ILike(Value),
    /// Equal to any listed value. Only built in code, never from a filter key.
    In(Vec<Value>),
}

impl Condition {
    /// Substring conditions only make sense on text fields.
    pub fn requires_text(&self) -> bool {
        matches!(self, Condition::Like(_) | Condition::ILike(_))
    }

    /// Evaluate the condition against a field value.
    pub fn matches(&self, value: &Value) -> bool {
        use std::cmp::Ordering::*;

        match self {
            Condition::Equal(Value::Null) => value.is_null(),
            Condition::NotEqual(Value::Null) => !value.is_null(),
            Condition::Equal(v) => value.compare(v) == Some(Equal),
            Condition::NotEqual(v) => matches!(value.compare(v), Some(Less | Greater)),
            Condition::MoreThan(v) => value.compare(v) == Some(Greater),
            Condition::MoreThanOrEqual(v) => matches!(value.compare(v), Some(Greater | Equal)),
            Condition::LessThan(v) => value.compare(v) == Some(Less),
            Condition::LessThanOrEqual(v) => matches!(value.compare(v), Some(Less | Equal)),
            Condition::Between(low, high) => {
                matches!(value.compare(low), Some(Greater | Equal))
                    && matches!(value.compare(high), Some(Less | Equal))
            }
            Condition::Like(pattern) => match (value.as_str(), pattern.as_str()) {
                (Some(text), Some(pattern)) => text.contains(pattern),
                _ => false,
            },
            Condition::ILike(pattern) => match (value.as_str(), pattern.as_str()) {
                (Some(text), Some(pattern)) => {
                    text.to_lowercase().contains(&pattern.to_lowercase())
                }
                _ => false,
            },
            Condition::In(values) => values.iter().any(|v| value.compare(v) == Some(Equal)),
        }
    }
}

/// Builds a condition from typed operand(s).
#[derive(Clone, Copy)]
pub enum OperatorTransform {
    /// Takes the whole raw value as one operand.
    Unary(fn(Value) -> Condition),
    /// Takes a `low,high` pair.
    Binary(fn(Value, Value) -> Condition),
}

impl fmt::Debug for OperatorTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorTransform::Unary(_) => f.write_str("Unary"),
            OperatorTransform::Binary(_) => f.write_str("Binary"),
        }
    }
}

/// Name → transform table.
#[derive(Debug, Clone)]
pub struct OperatorRegistry {
    operators: HashMap<String, OperatorTransform>,
}

impl OperatorRegistry {
    /// A registry with no operators at all.
    pub fn empty() -> Self {
        Self {
            operators: HashMap::new(),
        }
    }

    /// The stock operator set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry
            .register(EQUAL, OperatorTransform::Unary(Condition::Equal))
            .register("not", OperatorTransform::Unary(Condition::NotEqual))
            .register("more_than", OperatorTransform::Unary(Condition::MoreThan))
            .register(
                "more_than_or_equal",
                OperatorTransform::Unary(Condition::MoreThanOrEqual),
            )
            .register("less_than", OperatorTransform::Unary(Condition::LessThan))
            .register(
                "less_than_or_equal",
                OperatorTransform::Unary(Condition::LessThanOrEqual),
            )
            .register("between", OperatorTransform::Binary(Condition::Between))
            .register("like", OperatorTransform::Unary(Condition::Like))
            .register("i_like", OperatorTransform::Unary(Condition::ILike));
        registry
    }

    /// Register (or replace) an operator.
    pub fn register(&mut self, name: impl Into<String>, transform: OperatorTransform) -> &mut Self {
        self.operators.insert(name.into(), transform);
        self
    }

    pub fn get(&self, name: &str) -> Option<OperatorTransform> {
        self.operators.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Shared stock registry.
pub static DEFAULT_OPERATORS: Lazy<OperatorRegistry> = Lazy::new(OperatorRegistry::with_defaults);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_contents() {
        for name in [
            "equal",
            "not",
            "more_than",
            "more_than_or_equal",
            "less_than",
            "less_than_or_equal",
            "between",
            "like",
            "i_like",
        ] {
            assert!(DEFAULT_OPERATORS.contains(name), "missing operator {}", name);
        }
        assert!(matches!(
            DEFAULT_OPERATORS.get("between"),
            Some(OperatorTransform::Binary(_))
        ));
    }

    #[test]
    fn test_registering_custom_operator() {
        let mut registry = OperatorRegistry::empty();
        registry.register("at_least", OperatorTransform::Unary(Condition::MoreThanOrEqual));
        assert!(registry.contains("at_least"));
        assert!(!registry.contains("more_than"));
    }

    #[test]
    fn test_condition_matching() {
        assert!(Condition::MoreThan(Value::Int(5)).matches(&Value::Int(6)));
        assert!(!Condition::MoreThan(Value::Int(5)).matches(&Value::Int(5)));
        assert!(Condition::Between(Value::Int(3), Value::Int(9)).matches(&Value::Int(9)));
        assert!(!Condition::Between(Value::Int(3), Value::Int(9)).matches(&Value::Int(10)));
        assert!(Condition::ILike(Value::Text("RUST".into())).matches(&Value::Text("trusty".into())));
        assert!(!Condition::Like(Value::Text("RUST".into())).matches(&Value::Text("trusty".into())));
        assert!(!Condition::Equal(Value::Int(1)).matches(&Value::Null));
        assert!(!Condition::NotEqual(Value::Int(1)).matches(&Value::Null));
        assert!(Condition::In(vec![Value::Int(2), Value::Int(4)]).matches(&Value::Int(4)));
        assert!(!Condition::In(vec![Value::Int(2), Value::Int(4)]).matches(&Value::Int(3)));
        assert!(!Condition::In(Vec::new()).matches(&Value::Int(3)));
    }
}
