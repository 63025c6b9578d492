//! Generic Entity Repository
//!
//! One repository type serves every entity: the entity's static schema tells
//! the backend which table and columns to use, and [`Entity::from_record`]
//! decodes the rows.
//!
//! Every method takes an optional [`TransactionHandle`]. With `None` the call
//! runs on the shared pool; with a handle it runs on that transaction's
//! connection and fails if the handle is already finalized.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use crate::domain::query::{FindOptions, Predicate};
use crate::domain::value_objects::{Value, ID_FIELD};
use crate::domain::{Entity, NewEntity};
use crate::infrastructure::database::{Backend, TransactionHandle};
use crate::infrastructure::metrics;
use crate::shared::error::StorageError;

/// Repository for entity `E` over backend `B`.
pub struct EntityRepository<E: Entity, B: Backend> {
    backend: Arc<B>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, B: Backend> Clone for EntityRepository<E, B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity, B: Backend> EntityRepository<E, B> {
    /// Create a new repository with the given backend.
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            _entity: PhantomData,
        }
    }

    pub fn table(&self) -> &'static str {
        E::schema().table
    }

    fn observe(&self, operation: &str, started: Instant) {
        metrics::record_db_query(operation, self.table(), started.elapsed().as_secs_f64());
    }

    /// Fetch entities matching the options.
    pub async fn find(
        &self,
        tx: Option<&mut TransactionHandle<B>>,
        options: &FindOptions,
    ) -> Result<Vec<E>, StorageError> {
        let conn = TransactionHandle::connection_of(tx)?;
        let started = Instant::now();
        let records = self.backend.find(conn, E::schema(), options).await;
        self.observe("find", started);
        records?.iter().map(E::from_record).collect()
    }

    /// First entity matching every predicate.
    pub async fn find_one(
        &self,
        tx: Option<&mut TransactionHandle<B>>,
        predicates: Vec<Predicate>,
    ) -> Result<Option<E>, StorageError> {
        let options = FindOptions {
            predicates,
            take: Some(1),
            ..FindOptions::default()
        };
        Ok(self.find(tx, &options).await?.into_iter().next())
    }

    /// Find an entity by its identity.
    pub async fn find_by_id(
        &self,
        tx: Option<&mut TransactionHandle<B>>,
        id: i64,
    ) -> Result<Option<E>, StorageError> {
        self.find_one(tx, vec![Predicate::equal(ID_FIELD, id)]).await
    }

    /// Find an entity by its identity, failing with
    /// [`StorageError::RowNotFound`] when it does not exist.
    pub async fn get(
        &self,
        tx: Option<&mut TransactionHandle<B>>,
        id: i64,
    ) -> Result<E, StorageError> {
        self.find_by_id(tx, id)
            .await?
            .ok_or(StorageError::RowNotFound {
                table: self.table(),
                id,
            })
    }

    /// Number of entities matching every predicate.
    pub async fn count(
        &self,
        tx: Option<&mut TransactionHandle<B>>,
        predicates: &[Predicate],
    ) -> Result<u64, StorageError> {
        let conn = TransactionHandle::connection_of(tx)?;
        let started = Instant::now();
        let count = self.backend.count(conn, E::schema(), predicates).await;
        self.observe("count", started);
        count
    }

    /// Whether any entity matches every predicate.
    pub async fn exists(
        &self,
        tx: Option<&mut TransactionHandle<B>>,
        predicates: &[Predicate],
    ) -> Result<bool, StorageError> {
        Ok(self.count(tx, predicates).await? > 0)
    }

    /// Persist a new entity.
    pub async fn save<N>(
        &self,
        tx: Option<&mut TransactionHandle<B>>,
        new: N,
    ) -> Result<E, StorageError>
    where
        N: NewEntity<Entity = E>,
    {
        let conn = TransactionHandle::connection_of(tx)?;
        let started = Instant::now();
        let record = self
            .backend
            .insert(conn, E::schema(), new.into_values())
            .await;
        self.observe("insert", started);
        E::from_record(&record?)
    }

    /// Apply field changes to one entity. `None` when it does not exist.
    pub async fn update(
        &self,
        tx: Option<&mut TransactionHandle<B>>,
        id: i64,
        changes: Vec<(&'static str, Value)>,
    ) -> Result<Option<E>, StorageError> {
        let conn = TransactionHandle::connection_of(tx)?;
        let started = Instant::now();
        let record = self.backend.update(conn, E::schema(), id, changes).await;
        self.observe("update", started);
        record?.as_ref().map(E::from_record).transpose()
    }

    /// Delete every entity matching the predicates.
    pub async fn delete(
        &self,
        tx: Option<&mut TransactionHandle<B>>,
        predicates: &[Predicate],
    ) -> Result<u64, StorageError> {
        let conn = TransactionHandle::connection_of(tx)?;
        let started = Instant::now();
        let removed = self.backend.delete(conn, E::schema(), predicates).await;
        self.observe("delete", started);
        removed
    }

    /// Delete one entity. Returns whether it existed.
    pub async fn delete_by_id(
        &self,
        tx: Option<&mut TransactionHandle<B>>,
        id: i64,
    ) -> Result<bool, StorageError> {
        Ok(self.delete(tx, &[Predicate::equal(ID_FIELD, id)]).await? > 0)
    }

    /// Atomically adjust an integer counter.
    pub async fn increment(
        &self,
        tx: Option<&mut TransactionHandle<B>>,
        id: i64,
        field: &str,
        delta: i64,
    ) -> Result<(), StorageError> {
        let conn = TransactionHandle::connection_of(tx)?;
        let started = Instant::now();
        let result = self
            .backend
            .increment(conn, E::schema(), id, field, delta)
            .await;
        self.observe("increment", started);
        result
    }
}
