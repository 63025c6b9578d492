//! # Query DSL
//!
//! Structured query parameters → typed queries.
//!
//! ```text
//! where__<field>              equality
//! where__<field>__<operator>  operator from the registry
//! order__<field>=ASC|DESC     ordering
//! take=<n>                    page size (default 20)
//! page=<n>                    offset pagination, otherwise cursor
//! ```

pub mod composer;
pub mod error;
pub mod find;
pub mod operator;
pub mod predicate;

pub use composer::{PageMode, QueryComposer, QuerySpec, DEFAULT_TAKE, MAX_TAKE, PAGE_PARAM, TAKE_PARAM};
pub use error::FilterError;
pub use find::FindOptions;
pub use operator::{Condition, OperatorRegistry, OperatorTransform, DEFAULT_OPERATORS, EQUAL};
pub use predicate::{Direction, FilterParser, Operand, OrderSpec, Predicate};
