//! Unit of Work Pattern Implementation
//!
//! Provides transactional boundaries for database operations.
//! Ensures all operations within a business transaction succeed or fail together.
//!
//! A [`TransactionScope`] opens one transaction per call to
//! [`TransactionScope::with_transaction`] and hands the resulting
//! [`TransactionHandle`] to the work closure by reference. Every write that
//! must be atomic with the others takes that same handle. The scope commits
//! when the work succeeds and rolls back when it fails; if the scope's future
//! is dropped mid-flight the handle rolls back on drop. In all three cases the
//! connection is released exactly once, because the handle owns it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::infrastructure::metrics;
use crate::shared::error::{AppError, StorageError};

/// Unit of Work trait for managing database transactions.
///
/// This pattern ensures that multiple repository operations can be
/// grouped into a single atomic transaction.
#[async_trait]
pub trait UnitOfWork: Send + Sync + 'static {
    /// An open transaction on an exclusive connection. Dropping it without
    /// calling [`commit`](Self::commit) must roll the transaction back and
    /// release the connection.
    type Connection: Send;

    /// Begin a new transaction.
    async fn begin(&self) -> Result<Self::Connection, StorageError>;

    /// Commit the transaction.
    async fn commit(&self, connection: Self::Connection) -> Result<(), StorageError>;

    /// Rollback the transaction.
    async fn rollback(&self, connection: Self::Connection) -> Result<(), StorageError>;
}

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a transaction handle. `Committed` and `RolledBack` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

impl TransactionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Committed => "committed",
            Self::RolledBack => "rolled back",
        }
    }

    /// Metric label for a finalized state.
    fn outcome(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        }
    }
}

/// One open database transaction, owned by the scope that created it.
pub struct TransactionHandle<U: UnitOfWork> {
    id: u64,
    state: TransactionState,
    connection: Option<U::Connection>,
}

impl<U: UnitOfWork> TransactionHandle<U> {
    pub(crate) fn open(connection: U::Connection) -> Self {
        Self {
            id: NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed),
            state: TransactionState::Open,
            connection: Some(connection),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// The underlying connection for query execution.
    ///
    /// Fails with [`StorageError::TransactionFinalized`] once the handle has
    /// been committed or rolled back.
    pub fn connection(&mut self) -> Result<&mut U::Connection, StorageError> {
        let (id, state) = (self.id, self.state);
        match (state, self.connection.as_mut()) {
            (TransactionState::Open, Some(connection)) => Ok(connection),
            _ => Err(StorageError::TransactionFinalized {
                id,
                state: state.as_str(),
            }),
        }
    }

    /// Resolve an optional handle into an optional connection.
    pub fn connection_of(
        handle: Option<&mut Self>,
    ) -> Result<Option<&mut U::Connection>, StorageError> {
        handle.map(Self::connection).transpose()
    }

    fn take_connection(&mut self) -> Result<U::Connection, StorageError> {
        match (self.state, self.connection.take()) {
            (TransactionState::Open, Some(connection)) => Ok(connection),
            _ => Err(StorageError::TransactionFinalized {
                id: self.id,
                state: self.state.as_str(),
            }),
        }
    }

    /// Commit the transaction.
    pub(crate) async fn commit(&mut self, uow: &U) -> Result<(), StorageError> {
        let connection = self.take_connection()?;
        let result = uow.commit(connection).await;
        self.state = match result {
            Ok(()) => TransactionState::Committed,
            Err(_) => TransactionState::RolledBack,
        };
        metrics::record_transaction(self.state.outcome());
        result
    }

    /// Rollback the transaction.
    pub(crate) async fn rollback(&mut self, uow: &U) -> Result<(), StorageError> {
        let connection = self.take_connection()?;
        self.state = TransactionState::RolledBack;
        metrics::record_transaction(self.state.outcome());
        uow.rollback(connection).await
    }
}

impl<U: UnitOfWork> Drop for TransactionHandle<U> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            tracing::warn!(
                transaction_id = self.id,
                "Transaction dropped while open, rolling back"
            );
            self.state = TransactionState::RolledBack;
            metrics::record_transaction("aborted");
            drop(connection);
        }
    }
}

impl<U: UnitOfWork> std::fmt::Debug for TransactionHandle<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionHandle")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish()
    }
}

/// Runs work against a single transaction and finalizes it exactly once.
pub struct TransactionScope<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> Clone for TransactionScope<U> {
    fn clone(&self) -> Self {
        Self {
            uow: Arc::clone(&self.uow),
        }
    }
}

impl<U: UnitOfWork> TransactionScope<U> {
    /// Create a new scope over a unit of work.
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    /// Execute a closure within a transaction.
    ///
    /// Commits when the closure succeeds and rolls back when it fails. Any
    /// failure, including one to begin or commit, is returned as
    /// [`AppError::TransactionFailed`] carrying the original cause.
    ///
    /// # Example
    /// ```ignore
    /// let comment = scope.with_transaction(move |tx| Box::pin(async move {
    ///     let comment = comments.save(Some(&mut *tx), new_comment).await?;
    ///     posts.increment(Some(&mut *tx), post_id, "commentCount", 1).await?;
    ///     Ok(comment)
    /// })).await?;
    /// ```
    pub async fn with_transaction<T, F>(&self, work: F) -> Result<T, AppError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut TransactionHandle<U>) -> BoxFuture<'c, Result<T, AppError>>
            + Send,
    {
        let connection = self
            .uow
            .begin()
            .await
            .map_err(|e| AppError::transaction_failed(e.into()))?;
        let mut handle = TransactionHandle::<U>::open(connection);
        let transaction_id = handle.id();
        tracing::debug!(transaction_id, "Transaction opened");

        match work(&mut handle).await {
            Ok(value) => {
                handle
                    .commit(&self.uow)
                    .await
                    .map_err(|e| AppError::transaction_failed(e.into()))?;
                tracing::debug!(transaction_id, "Transaction committed");
                Ok(value)
            }
            Err(cause) => {
                if let Err(e) = handle.rollback(&self.uow).await {
                    tracing::error!(transaction_id, error = %e, "Rollback failed");
                }
                tracing::warn!(transaction_id, error = %cause, "Transaction rolled back");
                Err(AppError::transaction_failed(cause))
            }
        }
    }
}
