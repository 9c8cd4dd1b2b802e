//! Transaction and savepoint scopes (spec.md §4.6).
//!
//! Mirrors `oxide-migrate::executor`'s apply-then-rollback-on-error shape
//! (`MigrationExecutor::apply`/`rollback`), generalized from "run one
//! migration, roll back on failure" into a reusable scope function that
//! wraps an arbitrary body closure.

use crate::codec::WireValue;
use crate::exec::Connection;
use crate::error::{Error, Result, TransactionError};

/// Transaction isolation level, set via `SET TRANSACTION ISOLATION LEVEL`
/// at `BEGIN` time where the dialect supports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    /// `READ UNCOMMITTED`
    ReadUncommitted,
    /// `READ COMMITTED`
    ReadCommitted,
    /// `REPEATABLE READ`
    RepeatableRead,
    /// `SERIALIZABLE`
    Serializable,
}

impl IsolationLevel {
    fn as_sql(self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

/// A handle to an open transaction scope. `body` in [`transaction`]
/// receives this rather than the raw connection, so `execute_sql` calls
/// inside the body are strictly ordered after `BEGIN` and before
/// `COMMIT`/`ROLLBACK` (spec.md §5 "Ordering guarantees").
pub struct TransactionHandle<'c, C: Connection> {
    conn: &'c mut C,
    active: bool,
}

impl<'c, C: Connection> TransactionHandle<'c, C> {
    /// Runs a statement against the underlying connection from inside
    /// the transaction scope.
    ///
    /// # Errors
    ///
    /// Propagates the connection's execution failures.
    pub fn execute(&mut self, sql: &str, params: &[WireValue]) -> Result<Vec<C::Row>> {
        self.conn.execute_sql(sql, params)
    }

    /// Opens a nested `SAVEPOINT` scope named `name`.
    ///
    /// # Errors
    ///
    /// See [`savepoint`].
    pub fn savepoint<T>(
        &mut self,
        name: &str,
        body: impl FnOnce(&mut TransactionHandle<'_, C>) -> Result<T>,
    ) -> Result<T> {
        savepoint(self, name, body)
    }

    /// Marks this handle (and every savepoint nested within it) no
    /// longer usable after commit/rollback has been issued once.
    fn deactivate(&mut self) {
        self.active = false;
    }
}

/// Acquires a transaction scope with an explicit `BEGIN`, runs `body`
/// with a transaction handle, and commits on normal return or rolls back
/// and re-raises on error (spec.md §4.6, §8 invariant 8).
///
/// Commit/rollback are idempotent: the active flag is cleared on first
/// completion, so a body that panics partway through cleanup (or is
/// re-entered via `?`) never issues a second `COMMIT`/`ROLLBACK`.
///
/// # Errors
///
/// Returns [`TransactionError::Begin`]/[`TransactionError::Commit`]/
/// [`TransactionError::Rollback`] for driver-level transaction-control
/// failures, or propagates whatever error `body` raised.
pub fn transaction<C: Connection, T>(
    conn: &mut C,
    isolation: Option<IsolationLevel>,
    body: impl FnOnce(&mut TransactionHandle<'_, C>) -> Result<T>,
) -> Result<T> {
    tracing::debug!(isolation = ?isolation.map(IsolationLevel::as_sql), "beginning transaction");
    conn.execute_sql("BEGIN", &[])
        .map_err(|e| Error::Transaction(TransactionError::Begin(e.to_string())))?;
    if let Some(level) = isolation {
        conn.execute_sql(&format!("SET TRANSACTION ISOLATION LEVEL {}", level.as_sql()), &[])
            .map_err(|e| Error::Transaction(TransactionError::Begin(e.to_string())))?;
    }

    let mut handle = TransactionHandle { conn, active: true };

    match body(&mut handle) {
        Ok(value) => {
            commit(&mut handle)?;
            Ok(value)
        }
        Err(err) => {
            rollback(&mut handle)?;
            Err(err)
        }
    }
}

fn commit<C: Connection>(handle: &mut TransactionHandle<'_, C>) -> Result<()> {
    if !handle.active {
        return Ok(());
    }
    tracing::debug!("committing transaction");
    handle
        .conn
        .execute_sql("COMMIT", &[])
        .map_err(|e| Error::Transaction(TransactionError::Commit(e.to_string())))?;
    handle.deactivate();
    Ok(())
}

fn rollback<C: Connection>(handle: &mut TransactionHandle<'_, C>) -> Result<()> {
    if !handle.active {
        return Ok(());
    }
    tracing::warn!("rolling back transaction");
    handle
        .conn
        .execute_sql("ROLLBACK", &[])
        .map_err(|e| Error::Transaction(TransactionError::Rollback(e.to_string())))?;
    handle.deactivate();
    Ok(())
}

/// Opens a nested `SAVEPOINT name`, runs `body`, and on normal return
/// issues `RELEASE SAVEPOINT name`; on failure issues `ROLLBACK TO
/// SAVEPOINT name` then re-raises (spec.md §4.6, §8 invariant 9).
///
/// Savepoints nest arbitrarily: rolling back to an inner savepoint never
/// undoes writes made in the enclosing transaction before it was opened.
///
/// # Errors
///
/// Returns [`TransactionError::Begin`]/[`TransactionError::Commit`]/
/// [`TransactionError::Rollback`] for driver-level savepoint-control
/// failures, or propagates whatever error `body` raised.
pub fn savepoint<C: Connection, T>(
    handle: &mut TransactionHandle<'_, C>,
    name: &str,
    body: impl FnOnce(&mut TransactionHandle<'_, C>) -> Result<T>,
) -> Result<T> {
    tracing::debug!(savepoint = %name, "opening savepoint");
    handle
        .conn
        .execute_sql(&format!("SAVEPOINT {name}"), &[])
        .map_err(|e| Error::Transaction(TransactionError::Begin(e.to_string())))?;

    let mut nested = TransactionHandle {
        conn: &mut *handle.conn,
        active: true,
    };

    match body(&mut nested) {
        Ok(value) => {
            tracing::debug!(savepoint = %name, "releasing savepoint");
            nested
                .conn
                .execute_sql(&format!("RELEASE SAVEPOINT {name}"), &[])
                .map_err(|e| Error::Transaction(TransactionError::Commit(e.to_string())))?;
            nested.deactivate();
            Ok(value)
        }
        Err(err) => {
            tracing::warn!(savepoint = %name, "rolling back to savepoint");
            nested
                .conn
                .execute_sql(&format!("ROLLBACK TO SAVEPOINT {name}"), &[])
                .map_err(|e| Error::Transaction(TransactionError::Rollback(e.to_string())))?;
            nested.deactivate();
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ColumnInfo;
    use std::cell::RefCell;

    struct FakeRow;
    impl crate::codec::RawRow for FakeRow {
        fn columns(&self) -> Vec<String> {
            Vec::new()
        }
        fn get(&self, _column: &str) -> Option<WireValue> {
            None
        }
    }

    struct RecordingConnection {
        log: RefCell<Vec<String>>,
        fail_statement: Option<&'static str>,
    }

    impl Connection for RecordingConnection {
        type Row = FakeRow;

        fn execute_sql(&mut self, sql: &str, _params: &[WireValue]) -> Result<Vec<Self::Row>> {
            self.log.borrow_mut().push(sql.to_string());
            if Some(sql) == self.fail_statement {
                return Err(Error::Execution(crate::error::ExecutionError::message("driver rejected statement")));
            }
            Ok(Vec::new())
        }

        fn list_tables(&mut self, _schema: Option<&str>) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn describe_table(&mut self, _table: &str, _schema: Option<&str>) -> Result<Vec<ColumnInfo>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_transaction_commits_on_success() {
        let mut conn = RecordingConnection { log: RefCell::new(Vec::new()), fail_statement: None };
        let result = transaction(&mut conn, None, |txn| {
            txn.execute("INSERT INTO t VALUES (1)", &[])?;
            Ok(42)
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(*conn.log.borrow(), vec!["BEGIN", "INSERT INTO t VALUES (1)", "COMMIT"]);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut conn = RecordingConnection { log: RefCell::new(Vec::new()), fail_statement: None };
        let err = TransactionError::Rollback("ignored".into());
        let result: Result<()> = transaction(&mut conn, None, |txn| {
            txn.execute("INSERT INTO t VALUES (1)", &[])?;
            Err(Error::Transaction(err))
        });
        assert!(result.is_err());
        assert_eq!(*conn.log.borrow(), vec!["BEGIN", "INSERT INTO t VALUES (1)", "ROLLBACK"]);
    }

    #[test]
    fn test_savepoint_releases_on_success_and_keeps_outer_writes() {
        let mut conn = RecordingConnection { log: RefCell::new(Vec::new()), fail_statement: None };
        transaction(&mut conn, None, |txn| {
            txn.execute("INSERT INTO t VALUES (1)", &[])?;
            txn.savepoint("sp1", |inner| {
                inner.execute("INSERT INTO t VALUES (2)", &[])?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
        assert_eq!(
            *conn.log.borrow(),
            vec![
                "BEGIN",
                "INSERT INTO t VALUES (1)",
                "SAVEPOINT sp1",
                "INSERT INTO t VALUES (2)",
                "RELEASE SAVEPOINT sp1",
                "COMMIT",
            ]
        );
    }

    #[test]
    fn test_savepoint_rolls_back_only_inner_writes() {
        let mut conn = RecordingConnection { log: RefCell::new(Vec::new()), fail_statement: None };
        transaction(&mut conn, None, |txn| {
            txn.execute("INSERT INTO t VALUES (1)", &[])?;
            let inner_result: Result<()> = txn.savepoint("sp1", |inner| {
                inner.execute("INSERT INTO t VALUES (2)", &[])?;
                Err(Error::Transaction(TransactionError::Rollback("boom".into())))
            });
            assert!(inner_result.is_err());
            Ok(())
        })
        .unwrap();
        assert_eq!(
            *conn.log.borrow(),
            vec![
                "BEGIN",
                "INSERT INTO t VALUES (1)",
                "SAVEPOINT sp1",
                "INSERT INTO t VALUES (2)",
                "ROLLBACK TO SAVEPOINT sp1",
                "COMMIT",
            ]
        );
    }

    #[test]
    fn test_transaction_sets_isolation_level() {
        let mut conn = RecordingConnection { log: RefCell::new(Vec::new()), fail_statement: None };
        transaction(&mut conn, Some(IsolationLevel::Serializable), |_| Ok(())).unwrap();
        assert_eq!(
            *conn.log.borrow(),
            vec!["BEGIN", "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE", "COMMIT"]
        );
    }
}
