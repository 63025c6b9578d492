//! Client-side errors raised while turning query parameters into a query.

/// Query DSL error. Every variant names the offending key so the caller can
/// tell which parameter to fix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("filter key '{key}' must split on '__' into 2 or 3 parts")]
    MalformedFilter { key: String },

    #[error("unknown operator '{operator}' in filter key '{key}'")]
    UnknownOperator { key: String, operator: String },

    #[error("unknown field '{field}' in filter key '{key}'")]
    UnknownField { key: String, field: String },

    #[error("malformed value '{value}' for '{key}': {reason}")]
    MalformedOperand {
        key: String,
        value: String,
        reason: String,
    },

    #[error("ordering '{key}' cannot be used with cursor pagination; order by createdAt or id in one direction, or pass 'page'")]
    CursorOrdering { key: String },

    #[error("value '{value}' for '{key}' is not a valid {expected}")]
    TypeCoercion {
        key: String,
        value: String,
        expected: &'static str,
    },
}

impl FilterError {
    pub(crate) fn malformed_operand(key: &str, value: &str, reason: impl Into<String>) -> Self {
        FilterError::MalformedOperand {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn type_coercion(key: &str, value: &str, expected: &'static str) -> Self {
        FilterError::TypeCoercion {
            key: key.to_string(),
            value: value.to_string(),
            expected,
        }
    }
}
