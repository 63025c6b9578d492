//! In-process backend.
//!
//! Keeps every table in memory behind one async mutex. A transaction holds
//! the mutex for its whole lifetime and works on a private copy of the state,
//! which is written back on commit and discarded on rollback or drop. While a
//! transaction is open, pool-level calls wait for it to finish, so work done
//! inside a scope must always go through its handle.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::backend::Backend;
use super::unit_of_work::UnitOfWork;
use crate::domain::query::{Direction, FindOptions, Predicate};
use crate::domain::value_objects::{
    FieldType, Record, Schema, Value, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD,
};
use crate::shared::error::StorageError;

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    next_id: i64,
    rows: BTreeMap<i64, Record>,
}

/// Snapshot of every table.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    tables: HashMap<&'static str, MemoryTable>,
}

impl MemoryState {
    fn table(&mut self, schema: &Schema) -> &mut MemoryTable {
        self.tables.entry(schema.table).or_default()
    }

    fn matching<'a>(
        &'a self,
        schema: &Schema,
        predicates: &'a [Predicate],
    ) -> Result<impl Iterator<Item = &'a Record> + 'a, StorageError> {
        for predicate in predicates {
            schema.require(&predicate.field)?;
        }
        let rows = self
            .tables
            .get(schema.table)
            .into_iter()
            .flat_map(|table| table.rows.values());
        Ok(rows.filter(move |row| {
            predicates
                .iter()
                .all(|p| p.condition.matches(&row.value(&p.field)))
        }))
    }

    fn select(&self, schema: &Schema, options: &FindOptions) -> Result<Vec<Record>, StorageError> {
        for order in &options.orderings {
            schema.require(&order.field)?;
        }
        let mut rows: Vec<Record> = self
            .matching(schema, &options.predicates)?
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            for order in &options.orderings {
                let ordering = a.value(&order.field).sort_cmp(&b.value(&order.field));
                let ordering = match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                };
                if ordering.is_ne() {
                    return ordering;
                }
            }
            std::cmp::Ordering::Equal
        });

        let skip = options.skip.unwrap_or(0) as usize;
        let take = options.take.map_or(usize::MAX, |t| t as usize);
        Ok(rows.into_iter().skip(skip).take(take).collect())
    }

    fn count(&self, schema: &Schema, predicates: &[Predicate]) -> Result<u64, StorageError> {
        Ok(self.matching(schema, predicates)?.count() as u64)
    }

    fn insert(
        &mut self,
        schema: &Schema,
        values: Vec<(&'static str, Value)>,
    ) -> Result<Record, StorageError> {
        for (field, _) in &values {
            schema.require(field)?;
        }
        let now = Utc::now();
        let table = self.table(schema);
        table.next_id += 1;
        let id = table.next_id;

        let mut record: Record = schema
            .columns
            .iter()
            .map(|c| (c.field.to_string(), Value::Null))
            .collect();
        record.insert(ID_FIELD, Value::Int(id));
        for field in [CREATED_AT_FIELD, UPDATED_AT_FIELD] {
            if schema.has_field(field) {
                record.insert(field, Value::Timestamp(now));
            }
        }
        for (field, value) in values {
            record.insert(field, value);
        }

        table.rows.insert(id, record.clone());
        Ok(record)
    }

    fn update(
        &mut self,
        schema: &Schema,
        id: i64,
        changes: Vec<(&'static str, Value)>,
    ) -> Result<Option<Record>, StorageError> {
        for (field, _) in &changes {
            schema.require(field)?;
        }
        let touch = !changes.is_empty() && schema.has_field(UPDATED_AT_FIELD);
        let Some(row) = self.table(schema).rows.get_mut(&id) else {
            return Ok(None);
        };
        for (field, value) in changes {
            row.insert(field, value);
        }
        if touch {
            row.insert(UPDATED_AT_FIELD, Value::Timestamp(Utc::now()));
        }
        Ok(Some(row.clone()))
    }

    fn delete(&mut self, schema: &Schema, predicates: &[Predicate]) -> Result<u64, StorageError> {
        let doomed: Vec<i64> = self
            .matching(schema, predicates)?
            .filter_map(Record::id)
            .collect();
        let table = self.table(schema);
        for id in &doomed {
            table.rows.remove(id);
        }
        Ok(doomed.len() as u64)
    }

    fn increment(
        &mut self,
        schema: &'static Schema,
        id: i64,
        field: &str,
        delta: i64,
    ) -> Result<(), StorageError> {
        let column = schema.require(field)?;
        if column.ty != FieldType::Integer {
            return Err(StorageError::Decode(format!(
                "field '{}' of {} is not an integer",
                field, schema.table
            )));
        }
        let row = self
            .table(schema)
            .rows
            .get_mut(&id)
            .ok_or(StorageError::RowNotFound {
                table: schema.table,
                id,
            })?;
        let current = row.value(field).as_i64().unwrap_or(0);
        row.insert(column.field, Value::Int(current + delta));
        Ok(())
    }
}

/// Counts a connection as open until dropped.
struct ConnectionLease(Arc<AtomicUsize>);

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Exclusive access to the store for the length of one transaction.
pub struct MemoryConnection {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    _lease: ConnectionLease,
}

/// Transaction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub begun: u64,
    pub committed: u64,
    pub rolled_back: u64,
}

/// Backend keeping all rows in process memory.
pub struct MemoryBackend {
    state: Arc<AsyncMutex<MemoryState>>,
    open_connections: Arc<AtomicUsize>,
    available: AtomicBool,
    stats: Mutex<MemoryStats>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AsyncMutex::new(MemoryState::default())),
            open_connections: Arc::new(AtomicUsize::new(0)),
            available: AtomicBool::new(true),
            stats: Mutex::new(MemoryStats::default()),
        }
    }

    /// Transactions begun but not yet finalized or dropped.
    pub fn open_connections(&self) -> usize {
        self.open_connections.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> MemoryStats {
        *self.stats.lock()
    }

    /// Make every subsequent call fail with [`StorageError::Unavailable`]
    /// (or succeed again).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable("memory backend is offline".into()))
        }
    }

    async fn with_state<R, F>(
        &self,
        conn: Option<&mut MemoryConnection>,
        f: F,
    ) -> Result<R, StorageError>
    where
        F: FnOnce(&mut MemoryState) -> Result<R, StorageError> + Send,
        R: Send,
    {
        self.check_available()?;
        match conn {
            Some(conn) => f(&mut conn.working),
            None => {
                let mut state = self.state.lock().await;
                f(&mut state)
            }
        }
    }
}

#[async_trait]
impl UnitOfWork for MemoryBackend {
    type Connection = MemoryConnection;

    async fn begin(&self) -> Result<MemoryConnection, StorageError> {
        self.check_available()?;
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        self.open_connections.fetch_add(1, Ordering::SeqCst);
        self.stats.lock().begun += 1;
        Ok(MemoryConnection {
            guard,
            working,
            _lease: ConnectionLease(Arc::clone(&self.open_connections)),
        })
    }

    async fn commit(&self, connection: MemoryConnection) -> Result<(), StorageError> {
        let MemoryConnection {
            mut guard, working, ..
        } = connection;
        *guard = working;
        self.stats.lock().committed += 1;
        Ok(())
    }

    async fn rollback(&self, connection: MemoryConnection) -> Result<(), StorageError> {
        drop(connection);
        self.stats.lock().rolled_back += 1;
        Ok(())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn find(
        &self,
        conn: Option<&mut MemoryConnection>,
        schema: &'static Schema,
        options: &FindOptions,
    ) -> Result<Vec<Record>, StorageError> {
        self.with_state(conn, |state| state.select(schema, options))
            .await
    }

    async fn count(
        &self,
        conn: Option<&mut MemoryConnection>,
        schema: &'static Schema,
        predicates: &[Predicate],
    ) -> Result<u64, StorageError> {
        self.with_state(conn, |state| state.count(schema, predicates))
            .await
    }

    async fn insert(
        &self,
        conn: Option<&mut MemoryConnection>,
        schema: &'static Schema,
        values: Vec<(&'static str, Value)>,
    ) -> Result<Record, StorageError> {
        self.with_state(conn, move |state| state.insert(schema, values))
            .await
    }

    async fn update(
        &self,
        conn: Option<&mut MemoryConnection>,
        schema: &'static Schema,
        id: i64,
        changes: Vec<(&'static str, Value)>,
    ) -> Result<Option<Record>, StorageError> {
        self.with_state(conn, move |state| state.update(schema, id, changes))
            .await
    }

    async fn delete(
        &self,
        conn: Option<&mut MemoryConnection>,
        schema: &'static Schema,
        predicates: &[Predicate],
    ) -> Result<u64, StorageError> {
        self.with_state(conn, |state| state.delete(schema, predicates))
            .await
    }

    async fn increment(
        &self,
        conn: Option<&mut MemoryConnection>,
        schema: &'static Schema,
        id: i64,
        field: &str,
        delta: i64,
    ) -> Result<(), StorageError> {
        self.with_state(conn, |state| state.increment(schema, id, field, delta))
            .await
    }
}
