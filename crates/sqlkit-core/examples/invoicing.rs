//! Builds and runs a small invoicing query against an in-memory mock
//! connection, showing the query builder, `#[derive(Row)]`, and the
//! transaction scope working together.
//!
//! Run with: cargo run --example invoicing

use std::collections::HashMap;

use sqlkit_core::ast::expr::{col, param};
use sqlkit_core::ast::query::{from, item_as};
use sqlkit_core::ast::ParamType;
use sqlkit_core::codec::{RawRow, Registry, WireValue};
use sqlkit_core::dialect::SqliteDialect;
use sqlkit_core::exec::{self, ColumnInfo, Connection};
use sqlkit_core::txn;
use sqlkit_derive::Row;

#[derive(Debug, Row)]
struct Invoice {
    id: i64,
    customer: String,
    #[row(type = "float")]
    total_cents: f64,
}

#[derive(Clone)]
struct MockRow {
    columns: HashMap<String, WireValue>,
}

impl RawRow for MockRow {
    fn columns(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    fn get(&self, column: &str) -> Option<WireValue> {
        self.columns.get(column).cloned()
    }
}

/// Pretends to be a driver: every statement just echoes back a fixed
/// row set, enough to exercise the compile/bind/decode pipeline.
struct MockConnection {
    rows: Vec<MockRow>,
}

impl Connection for MockConnection {
    type Row = MockRow;

    fn execute_sql(&mut self, sql: &str, _params: &[WireValue]) -> sqlkit_core::Result<Vec<Self::Row>> {
        println!("-> {sql}");
        Ok(self.rows.clone())
    }

    fn list_tables(&mut self, _schema: Option<&str>) -> sqlkit_core::Result<Vec<String>> {
        Ok(vec!["invoices".to_string()])
    }

    fn describe_table(&mut self, _table: &str, _schema: Option<&str>) -> sqlkit_core::Result<Vec<ColumnInfo>> {
        Ok(Vec::new())
    }
}

fn invoice_row(id: i64, customer: &str, total_cents: f64) -> MockRow {
    let mut columns = HashMap::new();
    columns.insert("id".to_string(), WireValue::Int(id));
    columns.insert("customer".to_string(), WireValue::Text(customer.to_string()));
    columns.insert("total_cents".to_string(), WireValue::Float(total_cents));
    MockRow { columns }
}

fn main() -> sqlkit_core::Result<()> {
    let dialect = SqliteDialect::new();
    let registry = Registry::with_builtins();
    let mut conn = MockConnection {
        rows: vec![invoice_row(1, "Acme Corp", 4999.0), invoice_row(2, "Acme Corp", 1500.0)],
    };

    let query = from("invoices")
        .where_(col("invoices", "customer").eq(param(ParamType::Text, "customer")))
        .select::<Invoice>(vec![
            item_as(col("invoices", "id"), "id"),
            item_as(col("invoices", "customer"), "customer"),
            item_as(col("invoices", "total_cents"), "total_cents"),
        ]);

    let mut params = HashMap::new();
    params.insert("customer".to_string(), WireValue::Text("Acme Corp".to_string()));

    let invoices = exec::fetch_all(&mut conn, &dialect, &registry, &query, &params)?;
    for invoice in &invoices {
        println!("invoice {}: {} owes {:.2}", invoice.id, invoice.customer, invoice.total_cents / 100.0);
    }

    txn::transaction(&mut conn, None, |handle| {
        handle.execute(
            "UPDATE invoices SET paid = 1 WHERE customer = ?",
            &[WireValue::Text("Acme Corp".to_string())],
        )?;
        Ok(())
    })?;

    Ok(())
}
