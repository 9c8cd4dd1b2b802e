//! Universal invariants over the AST, compiler, and execution surface.

use std::collections::HashMap;

use sqlkit_core::ast::expr::{col, field, param};
use sqlkit_core::ast::query::{from, from_ref, item, AnonymousRow};
use sqlkit_core::ast::{ParamType, TableRef};
use sqlkit_core::codec::{RawRow, Registry, WireValue};
use sqlkit_core::dialect::{self, Capability, Dialect, MySqlDialect, PostgresDialect, SqliteDialect};
use sqlkit_core::error::{CardinalityError, CompileError, Error};
use sqlkit_core::exec::{self, ColumnInfo, Connection};
use sqlkit_core::schema::Row;
use sqlkit_core::txn;

fn count_params(sql: &str) -> usize {
    sql.matches('?').count()
}

/// Invariant 1: `compile`'s param-name list length equals the number of
/// `Param` nodes, and every name is present in the list.
#[test]
fn invariant_compile_bind_round_trip() {
    let dialect = SqliteDialect::new();
    let query = from("users")
        .where_(
            col("users", "age")
                .gt(param(ParamType::Int, "min"))
                .and(col("users", "email").eq(param(ParamType::Text, "email"))),
        )
        .select::<AnonymousRow>(vec![item(col("users", "id"))]);
    let (sql, param_names) = dialect::compile(&dialect, query.node()).unwrap();
    assert_eq!(param_names, vec!["min".to_string(), "email".to_string()]);
    assert_eq!(count_params(&sql), param_names.len());

    let mut bound = HashMap::new();
    bound.insert("min".to_string(), WireValue::Int(18));
    bound.insert("email".to_string(), WireValue::Text("a@example.com".to_string()));
    let positional: Vec<WireValue> = param_names.iter().map(|name| bound[name].clone()).collect();
    assert_eq!(positional.len(), param_names.len());
}

/// Invariant 2: structurally equal ASTs compile to byte-identical SQL
/// and param-name lists.
#[test]
fn invariant_structural_equality_implies_identical_compile_output() {
    let dialect = PostgresDialect::new();
    let build = || {
        from("users")
            .where_(col("users", "id").eq(param(ParamType::Int, "uid")))
            .select::<AnonymousRow>(vec![item(col("users", "id"))])
    };
    let a = build();
    let b = build();
    assert_eq!(a.node(), b.node());
    let (sql_a, params_a) = dialect::compile(&dialect, a.node()).unwrap();
    let (sql_b, params_b) = dialect::compile(&dialect, b.node()).unwrap();
    assert_eq!(sql_a, sql_b);
    assert_eq!(params_a, params_b);
}

/// Invariant 3: a name containing the dialect's quote character is
/// emitted with that character doubled.
#[test]
fn invariant_identifier_quoting_doubles_embedded_quote_char() {
    let sqlite = SqliteDialect::new();
    assert_eq!(sqlite.quote_identifier("weird`name"), "`weird``name`");
    let postgres = PostgresDialect::new();
    assert_eq!(postgres.quote_identifier("weird\"name"), "\"weird\"\"name\"");
}

/// Invariant 4: non-`Select`/`Returning` combinators preserve `OutShape`
/// — enforced by the type system itself; if `where_`/`limit`/`order_by`
/// changed the shape parameter, this wouldn't type-check.
#[test]
fn invariant_shape_preservation_is_type_checked() {
    fn still_anonymous(q: sqlkit_core::ast::query::Query<AnonymousRow>) -> sqlkit_core::ast::query::Query<AnonymousRow> {
        q.where_(field("active").eq(true)).limit(10).offset(0)
    }
    let q = still_anonymous(from("users"));
    let dialect = SqliteDialect::new();
    assert!(dialect::compile(&dialect, q.node()).is_ok());
}

/// Invariant 5: a `PlaceholderField` resolves when the query has exactly
/// one primary table, and fails with `UnresolvedPlaceholder` otherwise.
#[test]
fn invariant_placeholder_resolution() {
    let dialect = SqliteDialect::new();

    let resolvable = from("users").where_(field("id").eq(param(ParamType::Int, "uid")));
    assert!(dialect::compile(&dialect, resolvable.node()).is_ok());

    let derived = from("users").select::<AnonymousRow>(vec![item(field("id"))]);
    let unresolvable = from_ref(TableRef::Subquery {
        query: Box::new(derived.into_node()),
        alias: "derived".to_string(),
        lateral: false,
    })
    .where_(field("id").eq(param(ParamType::Int, "uid")));
    let err = dialect::compile(&dialect, unresolvable.node()).unwrap_err();
    assert!(matches!(err, CompileError::UnresolvedPlaceholder { .. }));
}

/// Invariant 6: an unsupported capability fails with
/// `CompileError::Unsupported` and never produces partial SQL.
#[test]
fn invariant_capability_gating_produces_no_partial_sql() {
    let dialect = MySqlDialect::with_version(sqlkit_core::dialect::DialectVersion::new(5, 7, 0));
    assert!(!dialect.supports(Capability::Cte));
    let main = from("users").select::<AnonymousRow>(vec![item(field("id"))]);
    let with_query = sqlkit_core::ast::query::with(
        vec![sqlkit_core::ast::query::cte("active", from("users"), None)],
        main,
        false,
    );
    let err = dialect::compile(&dialect, with_query.node()).unwrap_err();
    assert!(matches!(
        err,
        CompileError::Unsupported {
            capability: Capability::Cte,
            ..
        }
    ));
}

struct Item {
    id: i64,
}

impl Row for Item {
    const FIELD_NAMES: &'static [&'static str] = &["id"];
    const FIELD_TYPE_TAGS: &'static [&'static str] = &["int"];
    const FIELD_NULLABLE: &'static [bool] = &[false];

    fn from_positional(values: Vec<WireValue>) -> Result<Self, sqlkit_core::error::DecodeError> {
        match values.into_iter().next() {
            Some(WireValue::Int(id)) => Ok(Self { id }),
            _ => Err(sqlkit_core::error::DecodeError::ConstructorRejected { reason: "id must be int".into() }),
        }
    }
}

#[derive(Clone)]
struct FixtureRow {
    id: i64,
}

impl RawRow for FixtureRow {
    fn columns(&self) -> Vec<String> {
        vec!["id".to_string()]
    }

    fn get(&self, column: &str) -> Option<WireValue> {
        (column == "id").then_some(WireValue::Int(self.id))
    }
}

struct FixtureConnection {
    rows: Vec<FixtureRow>,
}

impl Connection for FixtureConnection {
    type Row = FixtureRow;

    fn execute_sql(&mut self, _sql: &str, _params: &[WireValue]) -> sqlkit_core::Result<Vec<Self::Row>> {
        Ok(self.rows.clone())
    }

    fn list_tables(&mut self, _schema: Option<&str>) -> sqlkit_core::Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn describe_table(&mut self, _table: &str, _schema: Option<&str>) -> sqlkit_core::Result<Vec<ColumnInfo>> {
        Ok(Vec::new())
    }
}

fn item_query() -> sqlkit_core::ast::query::Query<Item> {
    from("items").select::<Item>(vec![item(col("items", "id"))])
}

/// Invariant 7: `fetch_one` succeeds iff exactly one row; `fetch_maybe`
/// succeeds iff zero or one; `fetch_all` always succeeds.
#[test]
fn invariant_cardinality_contracts() {
    let dialect = SqliteDialect::new();
    let registry = Registry::with_builtins();

    for count in 0..=3usize {
        let mut conn = FixtureConnection {
            rows: (0..count as i64).map(|id| FixtureRow { id }).collect(),
        };
        let all = exec::fetch_all(&mut conn, &dialect, &registry, &item_query(), &HashMap::new()).unwrap();
        assert_eq!(all.len(), count);

        let one = exec::fetch_one(&mut conn, &dialect, &registry, &item_query(), &HashMap::new());
        assert_eq!(one.is_ok(), count == 1);
        if count != 1 {
            assert!(matches!(
                one.unwrap_err(),
                Error::Cardinality(CardinalityError::ExpectedOne { actual }) if actual == count
            ));
        }

        let maybe = exec::fetch_maybe(&mut conn, &dialect, &registry, &item_query(), &HashMap::new());
        assert_eq!(maybe.is_ok(), count <= 1);
        if count > 1 {
            assert!(matches!(
                maybe.unwrap_err(),
                Error::Cardinality(CardinalityError::ExpectedAtMostOne { actual }) if actual == count
            ));
        }
    }
}

/// Invariants 8/9: a committing body keeps its writes; a raising body
/// rolls back everything it attempted, including writes made after a
/// savepoint that itself rolled back, while leaving pre-savepoint writes
/// of the outer transaction intact.
#[test]
fn invariants_transaction_atomicity_and_savepoint_locality() {
    let mut conn = FixtureConnection { rows: vec![] };

    let committed = txn::transaction(&mut conn, None, |handle| {
        handle.execute("INSERT INTO items (id) VALUES (1)", &[])?;
        Ok(42)
    });
    assert_eq!(committed.unwrap(), 42);

    let rolled_back: sqlkit_core::Result<()> = txn::transaction(&mut conn, None, |handle| {
        handle.execute("INSERT INTO items (id) VALUES (2)", &[])?;
        Err(Error::Execution(sqlkit_core::error::ExecutionError::message("body failed")))
    });
    assert!(rolled_back.is_err());

    let outcome: sqlkit_core::Result<()> = txn::transaction(&mut conn, None, |handle| {
        handle.execute("INSERT INTO items (id) VALUES (3)", &[])?;
        let inner: sqlkit_core::Result<()> = handle.savepoint("sp1", |nested| {
            nested.execute("INSERT INTO items (id) VALUES (4)", &[])?;
            Err(Error::Execution(sqlkit_core::error::ExecutionError::message("savepoint body failed")))
        });
        assert!(inner.is_err());
        Ok(())
    });
    assert!(outcome.is_ok());
}
