//! Scoped transaction execution over the repository set.
//!
//! [`TxnManager::with_read_txn`] runs a closure against a read-only view;
//! [`TxnManager::with_txn`] runs it against the full repository set and
//! commits only if the closure succeeds. Errors from the closure are
//! returned to the caller unchanged.

use std::cell::Cell;

use rk_core::{Error, Result};
use rusqlite::TransactionBehavior;

use crate::pool::{get_conn, DbPool, PooledConnection};
use crate::repo::{ReaderRepository, Repository};

thread_local! {
    static IN_WRITE_TXN: Cell<bool> = const { Cell::new(false) };
}

/// Clears the write-scope flag when the scope ends, including on unwind.
struct WriteScopeGuard;

impl WriteScopeGuard {
    fn enter() -> Result<Self> {
        IN_WRITE_TXN.with(|flag| {
            if flag.replace(true) {
                Err(Error::Internal(
                    "write transaction opened inside another write transaction".into(),
                ))
            } else {
                Ok(WriteScopeGuard)
            }
        })
    }
}

impl Drop for WriteScopeGuard {
    fn drop(&mut self) {
        IN_WRITE_TXN.with(|flag| flag.set(false));
    }
}

/// Pooled connection held in `query_only` mode. The mode is switched off
/// again when the guard drops, so a panicking read scope cannot return a
/// read-only connection to the pool.
struct QueryOnlyConn(PooledConnection);

impl QueryOnlyConn {
    fn enter(conn: PooledConnection) -> Result<Self> {
        conn.pragma_update(None, "query_only", true)
            .map_err(|e| Error::database(e.to_string()))?;
        Ok(Self(conn))
    }
}

impl Drop for QueryOnlyConn {
    fn drop(&mut self) {
        if let Err(e) = self.0.pragma_update(None, "query_only", false) {
            tracing::warn!(error = %e, "Failed to leave query_only mode");
        }
    }
}

/// Hands out transaction scopes over a connection pool.
#[derive(Clone)]
pub struct TxnManager {
    pool: DbPool,
}

impl TxnManager {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Run `f` inside a read-only transaction.
    ///
    /// The connection is switched to `query_only` for the duration of the
    /// scope, so a write attempted through a raw statement fails as well.
    /// Read scopes may overlap freely.
    pub fn with_read_txn<T, F>(&self, f: F) -> Result<T>
    where
        F: for<'a> FnOnce(ReaderRepository<'a>) -> Result<T>,
    {
        let mut conn = QueryOnlyConn::enter(get_conn(&self.pool)?)?;
        let tx = conn
            .0
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .map_err(|e| Error::database(e.to_string()))?;
        // On error or unwind the transaction drops first and rolls back,
        // then the guard restores the connection.
        let value = f(ReaderRepository::new(&tx))?;
        tx.commit().map_err(|e| Error::database(e.to_string()))?;
        Ok(value)
    }

    /// Run `f` inside a read-write transaction.
    ///
    /// All steps performed through the [`Repository`] commit together if `f`
    /// returns `Ok`; any error rolls the whole scope back and is returned as
    /// is. Opening a write scope from inside another one on the same thread
    /// is rejected.
    pub fn with_txn<T, F>(&self, f: F) -> Result<T>
    where
        F: for<'a> FnOnce(Repository<'a>) -> Result<T>,
    {
        let _guard = WriteScopeGuard::enter()?;
        let mut conn = get_conn(&self.pool)?;

        // IMMEDIATE takes the write lock up front so concurrent writers
        // serialize at BEGIN instead of failing on lock upgrade.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::database(e.to_string()))?;

        match f(Repository::new(&tx)) {
            Ok(value) => {
                tx.commit().map_err(|e| Error::database(e.to_string()))?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!(error = %rollback_err, "Rollback failed");
                }
                tracing::debug!(error = %e, "Write transaction rolled back");
                Err(e)
            }
        }
    }
}
