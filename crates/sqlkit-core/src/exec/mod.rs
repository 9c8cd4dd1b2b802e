//! Execution surface (spec.md §4.5/§6.1).
//!
//! The core never drives a wire protocol itself — `Connection` is the
//! capability a driver crate implements; `sqlkit-core` only compiles,
//! binds, and decodes around it. Synchronous, mirroring spec.md §5
//! ("Scheduling model": a connection is exclusive, non-`Sync`, blocking
//! access) rather than the teacher's `sqlx`/`tokio` async executor
//! (`oxide-migrate::executor::MigrationExecutor`) — that async
//! dependency is dropped (see DESIGN.md) since spec.md names no async
//! runtime and defines suspension points in terms of blocking, not
//! futures.

use std::collections::HashMap;

use crate::ast::query::Query;
use crate::codec::{decode_named_row, RawRow, Registry, WireValue};
use crate::dialect::{self, Dialect};
use crate::error::{BindError, CardinalityError, Error, ExecutionError, Result};
use crate::schema::Row;

/// Column metadata returned by `describe_table` (spec.md §6.1).
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// The driver-reported type name.
    pub type_name: String,
    /// Whether the column allows `NULL`.
    pub nullable: bool,
    /// The column's default expression text, if any.
    pub default: Option<String>,
    /// Whether the column is (part of) the primary key.
    pub primary_key: bool,
}

/// The driver capability a connection provides (spec.md §6.1).
///
/// A connection is not `Sync`: exclusive access to a single wire
/// protocol session is the caller's responsibility (spec.md §5).
pub trait Connection {
    /// The row type this connection's driver produces.
    type Row: RawRow;

    /// Submits a statement with positional parameters and returns its
    /// rows.
    fn execute_sql(&mut self, sql: &str, params: &[WireValue]) -> Result<Vec<Self::Row>>;

    /// Whether this driver supports prepared statements. Defaults to
    /// `false`; drivers that do should override this and
    /// `prepare_statement`/`execute_prepared`.
    fn supports_prepared_statements(&self) -> bool {
        false
    }

    /// Compiles `sql` once for repeated execution. Optional.
    ///
    /// # Errors
    ///
    /// Returns an [`Error::Execution`] if the driver rejects the
    /// statement.
    fn prepare_statement(&mut self, sql: &str) -> Result<u64> {
        let _ = sql;
        Err(Error::Execution(ExecutionError::message(
            "this driver does not support prepared statements",
        )))
    }

    /// Executes a previously prepared statement. Optional.
    ///
    /// # Errors
    ///
    /// Returns an [`Error::Execution`] if the driver rejects the
    /// statement or the handle is invalid.
    fn execute_prepared(&mut self, handle: u64, params: &[WireValue]) -> Result<Vec<Self::Row>> {
        let _ = (handle, params);
        Err(Error::Execution(ExecutionError::message(
            "this driver does not support prepared statements",
        )))
    }

    /// Lists tables visible to this connection, optionally scoped to a
    /// schema.
    fn list_tables(&mut self, schema: Option<&str>) -> Result<Vec<String>>;

    /// Describes a table's columns.
    fn describe_table(&mut self, table: &str, schema: Option<&str>) -> Result<Vec<ColumnInfo>>;

    /// Lists schemas, defaulting to empty for schema-less databases
    /// (SQLite).
    fn list_schemas(&mut self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Resolves `param_names` (in compiler order) against a caller-supplied
/// named-parameter record (spec.md §4.5 "Parameter binding").
fn bind_params(param_names: &[String], named_params: &HashMap<String, WireValue>) -> Result<Vec<WireValue>> {
    param_names
        .iter()
        .map(|name| {
            named_params
                .get(name)
                .cloned()
                .ok_or_else(|| Error::Bind(BindError::MissingParameter { name: name.clone() }))
        })
        .collect()
}

fn compile_and_bind<Shape>(
    dialect: &dyn Dialect,
    query: &Query<Shape>,
    named_params: &HashMap<String, WireValue>,
) -> Result<(String, Vec<WireValue>)> {
    let (sql, param_names) = dialect::compile(dialect, query.node()).map_err(Error::Compile)?;
    let bound = bind_params(&param_names, named_params)?;
    Ok((sql, bound))
}

/// Returns the compiled SQL text for `query` without executing it
/// (spec.md §4.5 "sql(dialect, query)").
///
/// # Errors
///
/// Returns an [`Error::Compile`] if `query` is not expressible in
/// `dialect`.
pub fn sql<Shape>(dialect: &dyn Dialect, query: &Query<Shape>) -> Result<String> {
    dialect::compile(dialect, query.node())
        .map(|(sql, _)| sql)
        .map_err(Error::Compile)
}

/// Compiles, binds, executes, and decodes every row of `query` into
/// `Row::FIELD_NAMES`-mapped values (spec.md §4.5 "fetch_all").
///
/// # Errors
///
/// Propagates compile, bind, execution, and decode failures.
pub fn fetch_all<C: Connection, R: Row>(
    conn: &mut C,
    dialect: &dyn Dialect,
    registry: &Registry,
    query: &Query<R>,
    named_params: &HashMap<String, WireValue>,
) -> Result<Vec<R>> {
    let (sql_text, params) = compile_and_bind(dialect, query, named_params)?;
    tracing::debug!(sql = %sql_text, param_count = params.len(), "executing fetch_all");
    let rows = conn
        .execute_sql(&sql_text, &params)
        .map_err(|e| wrap_execution(e, &sql_text))?;
    rows.into_iter().map(|row| decode_row::<R, C::Row>(&row, registry)).collect()
}

/// Like [`fetch_all`], but requires exactly one row (spec.md §4.5
/// "fetch_one").
///
/// # Errors
///
/// Returns [`CardinalityError::ExpectedOne`] when zero or more than one
/// row is returned, in addition to the failure modes of `fetch_all`.
pub fn fetch_one<C: Connection, R: Row>(
    conn: &mut C,
    dialect: &dyn Dialect,
    registry: &Registry,
    query: &Query<R>,
    named_params: &HashMap<String, WireValue>,
) -> Result<R> {
    let mut rows = fetch_all(conn, dialect, registry, query, named_params)?;
    if rows.len() != 1 {
        return Err(Error::Cardinality(CardinalityError::ExpectedOne { actual: rows.len() }));
    }
    Ok(rows.remove(0))
}

/// Like [`fetch_all`], but returns `None` for zero rows and fails on
/// more than one (spec.md §4.5 "fetch_maybe").
///
/// # Errors
///
/// Returns [`CardinalityError::ExpectedAtMostOne`] when more than one
/// row is returned, in addition to the failure modes of `fetch_all`.
pub fn fetch_maybe<C: Connection, R: Row>(
    conn: &mut C,
    dialect: &dyn Dialect,
    registry: &Registry,
    query: &Query<R>,
    named_params: &HashMap<String, WireValue>,
) -> Result<Option<R>> {
    let mut rows = fetch_all(conn, dialect, registry, query, named_params)?;
    match rows.len() {
        0 => Ok(None),
        1 => Ok(Some(rows.remove(0))),
        actual => Err(Error::Cardinality(CardinalityError::ExpectedAtMostOne { actual })),
    }
}

/// Compiles, binds, and executes `query`, discarding any returned rows
/// (spec.md §4.5 "execute_dml").
///
/// # Errors
///
/// Propagates compile, bind, and execution failures.
pub fn execute_dml<C: Connection, Shape>(
    conn: &mut C,
    dialect: &dyn Dialect,
    query: &Query<Shape>,
    named_params: &HashMap<String, WireValue>,
) -> Result<()> {
    let (sql_text, params) = compile_and_bind(dialect, query, named_params)?;
    tracing::debug!(sql = %sql_text, param_count = params.len(), "executing execute_dml");
    conn.execute_sql(&sql_text, &params).map_err(|e| wrap_execution(e, &sql_text))?;
    Ok(())
}

/// Prepends an `EXPLAIN` form and executes it with no parameters,
/// returning the row representations joined by newlines (spec.md §4.5
/// "explain").
///
/// # Errors
///
/// Propagates compile and execution failures.
pub fn explain<C: Connection, Shape>(conn: &mut C, dialect: &dyn Dialect, query: &Query<Shape>) -> Result<String> {
    let (sql_text, _) = dialect::compile(dialect, query.node()).map_err(Error::Compile)?;
    let explain_sql = format!("EXPLAIN {sql_text}");
    tracing::debug!(sql = %explain_sql, "executing explain");
    let rows = conn
        .execute_sql(&explain_sql, &[])
        .map_err(|e| wrap_execution(e, &explain_sql))?;
    let lines: Vec<String> = rows
        .iter()
        .map(|row| {
            row.columns()
                .iter()
                .map(|col| format!("{:?}", row.get(col).unwrap_or(WireValue::Null)))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect();
    Ok(lines.join("\n"))
}

fn decode_row<R: Row, Raw: RawRow>(row: &Raw, registry: &Registry) -> Result<R> {
    let values = decode_named_row(row, registry, R::FIELD_NAMES, R::FIELD_TYPE_TAGS, R::FIELD_NULLABLE)
        .map_err(Error::Decode)?;
    R::from_positional(values).map_err(Error::Decode)
}

fn wrap_execution(err: Error, sql_text: &str) -> Error {
    match err {
        Error::Execution(e) => Error::Execution(e),
        other => {
            let boxed: Box<dyn std::error::Error + Send + Sync + 'static> = Box::new(other);
            Error::Execution(ExecutionError::new(format!("while executing: {sql_text}"), boxed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expr::col;
    use crate::ast::query::{item, item_as};
    use crate::dialect::SqliteDialect;
    use crate::error::DecodeError;

    struct Account {
        id: i64,
        email: String,
    }

    impl Row for Account {
        const FIELD_NAMES: &'static [&'static str] = &["id", "email"];
        const FIELD_TYPE_TAGS: &'static [&'static str] = &["int", "text"];
        const FIELD_NULLABLE: &'static [bool] = &[false, false];

        fn from_positional(values: Vec<WireValue>) -> std::result::Result<Self, DecodeError> {
            let mut it = values.into_iter();
            let id = match it.next() {
                Some(WireValue::Int(v)) => v,
                _ => return Err(DecodeError::ConstructorRejected { reason: "id must be int".into() }),
            };
            let email = match it.next() {
                Some(WireValue::Text(v)) => v,
                _ => return Err(DecodeError::ConstructorRejected { reason: "email must be text".into() }),
            };
            Ok(Self { id, email })
        }
    }

    #[derive(Clone)]
    struct FakeRow {
        columns: HashMap<String, WireValue>,
    }

    impl RawRow for FakeRow {
        fn columns(&self) -> Vec<String> {
            self.columns.keys().cloned().collect()
        }

        fn get(&self, column: &str) -> Option<WireValue> {
            self.columns.get(column).cloned()
        }
    }

    struct FakeConnection {
        rows: Vec<FakeRow>,
    }

    impl Connection for FakeConnection {
        type Row = FakeRow;

        fn execute_sql(&mut self, _sql: &str, _params: &[WireValue]) -> Result<Vec<Self::Row>> {
            Ok(self.rows.clone())
        }

        fn list_tables(&mut self, _schema: Option<&str>) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn describe_table(&mut self, _table: &str, _schema: Option<&str>) -> Result<Vec<ColumnInfo>> {
            Ok(Vec::new())
        }
    }

    fn account_row(id: i64, email: &str) -> FakeRow {
        let mut columns = HashMap::new();
        columns.insert("id".to_string(), WireValue::Int(id));
        columns.insert("email".to_string(), WireValue::Text(email.to_string()));
        FakeRow { columns }
    }

    fn account_query() -> Query<Account> {
        crate::ast::query::from("accounts").select::<Account>(vec![
            item_as(col("accounts", "id"), "id"),
            item_as(col("accounts", "email"), "email"),
        ])
    }

    #[test]
    fn test_sql_compiles_without_executing() {
        let dialect = SqliteDialect::new();
        let text = sql(&dialect, &account_query()).unwrap();
        assert!(text.starts_with("SELECT"));
    }

    #[test]
    fn test_fetch_all_decodes_every_row() {
        let dialect = SqliteDialect::new();
        let registry = Registry::with_builtins();
        let mut conn = FakeConnection {
            rows: vec![account_row(1, "a@example.com"), account_row(2, "b@example.com")],
        };
        let accounts = fetch_all(&mut conn, &dialect, &registry, &account_query(), &HashMap::new()).unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].id, 1);
        assert_eq!(accounts[1].email, "b@example.com");
    }

    #[test]
    fn test_fetch_one_rejects_zero_rows() {
        let dialect = SqliteDialect::new();
        let registry = Registry::with_builtins();
        let mut conn = FakeConnection { rows: vec![] };
        let err = fetch_one(&mut conn, &dialect, &registry, &account_query(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, Error::Cardinality(CardinalityError::ExpectedOne { actual: 0 })));
    }

    #[test]
    fn test_fetch_maybe_rejects_more_than_one_row() {
        let dialect = SqliteDialect::new();
        let registry = Registry::with_builtins();
        let mut conn = FakeConnection {
            rows: vec![account_row(1, "a@example.com"), account_row(2, "b@example.com")],
        };
        let err = fetch_maybe(&mut conn, &dialect, &registry, &account_query(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, Error::Cardinality(CardinalityError::ExpectedAtMostOne { actual: 2 })));
    }

    #[test]
    fn test_fetch_maybe_accepts_zero_rows() {
        let dialect = SqliteDialect::new();
        let registry = Registry::with_builtins();
        let mut conn = FakeConnection { rows: vec![] };
        let result = fetch_maybe(&mut conn, &dialect, &registry, &account_query(), &HashMap::new()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_bind_params_reports_missing_named_parameter() {
        let query = crate::ast::query::from("accounts")
            .where_(col("accounts", "id").eq(crate::ast::expr::param(crate::ast::ParamType::Int, "uid")))
            .select::<Account>(vec![item(col("accounts", "id")), item(col("accounts", "email"))]);
        let dialect = SqliteDialect::new();
        let mut conn = FakeConnection { rows: vec![] };
        let err = fetch_all(&mut conn, &dialect, &Registry::with_builtins(), &query, &HashMap::new()).unwrap_err();
        assert!(matches!(err, Error::Bind(BindError::MissingParameter { name }) if name == "uid"));
    }
}
