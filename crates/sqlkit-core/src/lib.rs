//! # sqlkit-core
//!
//! A typed, composable SQL query builder and dialect compiler.
//!
//! This crate provides:
//! - An algebraic AST (`ast`) built step by step through a typestate
//!   `Query<Shape>` pipeline, so the tree's shape mirrors SQL's logical
//!   evaluation order.
//! - A capability-gated dialect compiler (`dialect`) covering SQLite,
//!   PostgreSQL, and MySQL, turning an AST into `(sql_text, param_names)`.
//! - A type-keyed codec registry (`codec`) and row-mapping trait
//!   (`schema`) for decoding driver rows into Rust structs.
//! - An execution surface (`exec`), transaction/savepoint scopes
//!   (`txn`), a connection pool (`pool`), and a prepared-statement cache
//!   (`cache`) built around a driver-supplied [`exec::Connection`].
//!
//! ## Building and compiling a query
//!
//! ```rust
//! use sqlkit_core::ast::expr::{col, param};
//! use sqlkit_core::ast::query::{from, item_as, AnonymousRow};
//! use sqlkit_core::ast::ParamType;
//! use sqlkit_core::dialect::{self, SqliteDialect};
//!
//! let query = from("users")
//!     .where_(col("users", "id").eq(param(ParamType::Int, "uid")))
//!     .select::<AnonymousRow>(vec![
//!         item_as(col("users", "id"), "id"),
//!         item_as(col("users", "email"), "email"),
//!     ]);
//!
//! let (sql, params) = dialect::compile(&SqliteDialect::new(), query.node()).unwrap();
//! assert_eq!(params, vec!["uid".to_string()]);
//! assert!(sql.starts_with("SELECT"));
//! ```

pub mod ast;
pub mod cache;
pub mod codec;
pub mod dialect;
pub mod error;
pub mod exec;
pub mod pool;
pub mod schema;
pub mod txn;

pub use error::{Error, Result};
pub use schema::Row;
