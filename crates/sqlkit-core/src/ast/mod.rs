//! Abstract Syntax Tree (AST) types for SQL expressions, queries, and DDL.

pub mod ddl;
pub mod expr;
pub mod query;
pub mod types;

pub use ddl::{AlterOperation, CreateIndex, DDLStatement};
pub use expr::{
    BinaryOp, Expr, FrameBound, FrameMode, IntoExpr, JsonValue, Literal, ParamType, UnaryOp,
    WhenClause, WindowFrame, WindowSpec,
};
pub use query::{
    AnonymousRow, Cte, ForeignKeyRef, JoinClause, JoinKind, Query, QueryNode, SelectItem,
    SetOpKind, TableRef,
};
pub use types::{ColumnConstraint, ColumnDef, DataType, ReferentialAction, TableConstraint};
