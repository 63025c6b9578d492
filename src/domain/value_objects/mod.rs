//! Value Objects
//!
//! Immutable value types shared across the domain:
//! - **Value / FieldType**: typed field values and their semantic types
//! - **Schema / Column / Record**: static entity schemas and untyped rows

pub mod schema;
pub mod value;

pub use schema::{Column, Record, Schema, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};
pub use value::{FieldType, Value};
