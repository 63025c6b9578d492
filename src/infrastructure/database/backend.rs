//! Storage backend contract.
//!
//! A backend executes schema-driven queries either on its shared pool
//! (`conn` is `None`) or on the connection of an open transaction.

use async_trait::async_trait;

use super::unit_of_work::UnitOfWork;
use crate::domain::query::{FindOptions, Predicate};
use crate::domain::value_objects::{Record, Schema, Value};
use crate::shared::error::StorageError;

#[async_trait]
pub trait Backend: UnitOfWork {
    /// Rows matching every predicate, sorted and windowed per `options`.
    async fn find(
        &self,
        conn: Option<&mut Self::Connection>,
        schema: &'static Schema,
        options: &FindOptions,
    ) -> Result<Vec<Record>, StorageError>;

    /// Number of rows matching every predicate.
    async fn count(
        &self,
        conn: Option<&mut Self::Connection>,
        schema: &'static Schema,
        predicates: &[Predicate],
    ) -> Result<u64, StorageError>;

    /// Insert one row and return it with generated columns filled in.
    async fn insert(
        &self,
        conn: Option<&mut Self::Connection>,
        schema: &'static Schema,
        values: Vec<(&'static str, Value)>,
    ) -> Result<Record, StorageError>;

    /// Apply changes to the row with `id`. `None` when no such row exists.
    async fn update(
        &self,
        conn: Option<&mut Self::Connection>,
        schema: &'static Schema,
        id: i64,
        changes: Vec<(&'static str, Value)>,
    ) -> Result<Option<Record>, StorageError>;

    /// Delete every row matching the predicates. Returns the number removed.
    async fn delete(
        &self,
        conn: Option<&mut Self::Connection>,
        schema: &'static Schema,
        predicates: &[Predicate],
    ) -> Result<u64, StorageError>;

    /// Atomically add `delta` to an integer field of one row.
    ///
    /// Fails with [`StorageError::RowNotFound`] when the row does not exist.
    async fn increment(
        &self,
        conn: Option<&mut Self::Connection>,
        schema: &'static Schema,
        id: i64,
        field: &str,
        delta: i64,
    ) -> Result<(), StorageError>;
}
