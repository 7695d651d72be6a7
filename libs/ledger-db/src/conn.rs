//! Shared connection handle with typed transactions.

use std::{future::Future, pin::Pin};

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::tx_error::{InfraError, TxError};

/// Store handle injected into repositories and services.
///
/// Cloning is cheap: clones share the same underlying pool.
#[derive(Clone, Debug)]
pub struct DbConn {
    conn: DatabaseConnection,
}

impl DbConn {
    #[must_use]
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Underlying connection for single-statement reads and writes.
    #[must_use]
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Execute a closure inside a database transaction.
    ///
    /// The transaction commits when the closure returns `Ok` and rolls back otherwise.
    ///
    /// # Example
    ///
    /// ```ignore
    /// db.in_transaction(move |tx| Box::pin(async move {
    ///     let balance = repo.get(tx, user_id).await?;
    ///     repo.store(tx, balance.credited(amount)).await
    /// }))
    /// .await
    /// .map_err(|e| e.into_domain(DomainError::storage_infra))
    /// ```
    ///
    /// # Errors
    ///
    /// - `TxError::Domain(e)` when the callback returns `Err(e)`.
    /// - `TxError::Infra(_)` when the transaction cannot begin or commit.
    pub async fn in_transaction<T, E, F>(&self, f: F) -> Result<T, TxError<E>>
    where
        T: Send + 'static,
        E: std::fmt::Debug + std::fmt::Display + Send + 'static,
        F: for<'c> FnOnce(
                &'c DatabaseTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
    {
        self.conn
            .transaction::<_, T, TxError<E>>(|txn| {
                let fut = f(txn);
                Box::pin(async move { fut.await.map_err(TxError::Domain) })
            })
            .await
            .map_err(|e| match e {
                sea_orm::TransactionError::Transaction(tx_err) => tx_err,
                sea_orm::TransactionError::Connection(db_err) => InfraError::from(db_err).into(),
            })
    }

    /// [`in_transaction`](Self::in_transaction) with infrastructure errors mapped into
    /// the domain error type.
    ///
    /// # Errors
    ///
    /// Returns the callback's error, or `map_infra` applied to an infrastructure failure.
    pub async fn in_transaction_mapped<T, E, F, M>(&self, map_infra: M, f: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: std::fmt::Debug + std::fmt::Display + Send + 'static,
        M: FnOnce(InfraError) -> E + Send,
        F: for<'c> FnOnce(
                &'c DatabaseTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
    {
        self.in_transaction(f)
            .await
            .map_err(|tx_err| tx_err.into_domain(map_infra))
    }
}
