//! Query AST (spec.md §3.2).
//!
//! `Query<OutShape>` is built step by step by a pipeline; each step wraps
//! its predecessor in a new, immutable node, so the tree's shape mirrors
//! SQL's logical evaluation order (`FROM` → `JOIN` → `WHERE` → `GROUP BY`
//! → `HAVING` → `SELECT` → `DISTINCT` → `ORDER BY` → `LIMIT` → `OFFSET`).
//! `OutShape` is a zero-sized phantom marker, the same typestate trick the
//! teacher's `builder::select::SelectDyn<Cols, From>` uses to track which
//! operations are legal — here it tracks what Rust type a compiled query
//! decodes into, rather than which builder method is callable.
//!
//! Only `Select` and `Returning` change `OutShape`; every other node is
//! shape-preserving (spec.md §4.2, tested in `tests/properties.rs`).

use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use super::expr::Expr;
use super::types::ReferentialAction;

/// The output shape of a bare `From` (or any node before the first
/// `Select`/`Returning`): rows are handed back without struct mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnonymousRow;

/// Join kind for a `JOIN` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    /// `INNER JOIN`
    Inner,
    /// `LEFT JOIN`
    Left,
    /// `RIGHT JOIN`
    Right,
    /// `FULL JOIN`
    Full,
}

/// A table reference, either a named table or a derived subquery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableRef {
    /// A table (optionally schema-qualified and aliased).
    Table {
        /// Schema name, if qualified.
        schema: Option<String>,
        /// Table name.
        name: String,
        /// Alias, if any.
        alias: Option<String>,
    },
    /// A derived table: `(<query>) AS <alias>`.
    Subquery {
        /// The subquery.
        query: Box<QueryNode>,
        /// Required alias.
        alias: String,
        /// Whether this is a `LATERAL` derived table (capability-gated).
        lateral: bool,
    },
}

impl TableRef {
    /// Creates a plain table reference.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::Table {
            schema: None,
            name: name.into(),
            alias: None,
        }
    }

    /// Returns the short name used to resolve `PlaceholderField`s: the
    /// alias if present, otherwise the table name.
    #[must_use]
    pub fn short_name(&self) -> &str {
        match self {
            Self::Table { alias, name, .. } => alias.as_deref().unwrap_or(name),
            Self::Subquery { alias, .. } => alias,
        }
    }
}

/// A `JOIN` clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinClause {
    /// Join kind.
    pub kind: JoinKind,
    /// Joined table.
    pub table: TableRef,
    /// Join condition.
    pub on: Expr,
}

/// A single projected item in `SELECT`/`RETURNING`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectItem {
    /// `*` — select every column.
    All,
    /// A projected expression, optionally aliased.
    Expr {
        /// The expression.
        expr: Expr,
        /// Output alias, if any.
        alias: Option<String>,
    },
}

/// Builds a plain (unaliased) projected column item.
#[must_use]
pub fn item(expr: Expr) -> SelectItem {
    SelectItem::Expr { expr, alias: None }
}

/// Builds an aliased projected column item.
#[must_use]
pub fn item_as(expr: Expr, alias: impl Into<String>) -> SelectItem {
    SelectItem::Expr {
        expr,
        alias: Some(alias.into()),
    }
}

/// Set operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOpKind {
    /// `UNION`
    Union,
    /// `INTERSECT`
    Intersect,
    /// `EXCEPT`
    Except,
}

/// The conflict-resolution action of an `ON CONFLICT`/`ON DUPLICATE KEY`
/// clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConflictAction {
    /// `DO NOTHING`.
    DoNothing,
    /// `DO UPDATE SET col = expr, ...`.
    DoUpdate(Vec<(String, Expr)>),
}

/// A single named common table expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cte {
    /// CTE name, referenced by the main query's `FROM`.
    pub name: String,
    /// The CTE's own query.
    pub query: Box<QueryNode>,
    /// Optional explicit column list.
    pub columns: Option<Vec<String>>,
}

/// A foreign-key-like reference used by `AlterOperation::AddForeignKey`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignKeyRef {
    /// Local columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub ref_table: String,
    /// Referenced columns.
    pub ref_columns: Vec<String>,
    /// `ON DELETE` action.
    pub on_delete: Option<ReferentialAction>,
    /// `ON UPDATE` action.
    pub on_update: Option<ReferentialAction>,
}

/// The type-erased query tree. `Query<Shape>` is a thin phantom-typed
/// wrapper over this; the compiler operates on `QueryNode` directly since
/// `Shape` carries no runtime information.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryNode {
    /// `FROM <table>`.
    From { table: TableRef },
    /// A `JOIN` applied to a predecessor.
    Join {
        /// Predecessor.
        source: Box<QueryNode>,
        /// The join clause.
        join: JoinClause,
    },
    /// `WHERE <condition>`.
    Where {
        /// Predecessor.
        source: Box<QueryNode>,
        /// The filter condition.
        condition: Expr,
    },
    /// `GROUP BY <fields>`. An empty `fields` is a no-op, per spec.md §4.2.
    GroupBy {
        /// Predecessor.
        source: Box<QueryNode>,
        /// Grouping expressions.
        fields: Vec<Expr>,
    },
    /// `HAVING <condition>`.
    Having {
        /// Predecessor.
        source: Box<QueryNode>,
        /// The filter condition.
        condition: Expr,
    },
    /// `SELECT <items>`. An empty `items` is a no-op (identity), per
    /// spec.md §4.2.
    Select {
        /// Predecessor.
        source: Box<QueryNode>,
        /// Projected items.
        items: Vec<SelectItem>,
    },
    /// `SELECT DISTINCT ...`.
    Distinct {
        /// Predecessor.
        source: Box<QueryNode>,
    },
    /// `ORDER BY <items>`, each paired with a descending flag.
    OrderBy {
        /// Predecessor.
        source: Box<QueryNode>,
        /// `(expr, descending)` pairs, in clause order.
        items: Vec<(Expr, bool)>,
    },
    /// `LIMIT <n>`.
    Limit {
        /// Predecessor.
        source: Box<QueryNode>,
        /// Row limit.
        n: u64,
    },
    /// `OFFSET <n>`.
    Offset {
        /// Predecessor.
        source: Box<QueryNode>,
        /// Row offset.
        n: u64,
    },
    /// `<left> UNION|INTERSECT|EXCEPT [ALL] <right>`.
    SetOp {
        /// Left side.
        left: Box<QueryNode>,
        /// Right side.
        right: Box<QueryNode>,
        /// Operation kind.
        kind: SetOpKind,
        /// Whether `ALL` was specified.
        all: bool,
    },
    /// `WITH [RECURSIVE] <ctes> <main>`.
    With {
        /// Named CTEs.
        ctes: Vec<Cte>,
        /// The main query.
        main: Box<QueryNode>,
        /// Whether `RECURSIVE` was specified.
        recursive: bool,
    },
    /// `INSERT INTO <table> (<columns>)`.
    InsertInto {
        /// Target table.
        table: String,
        /// Target columns, in positional order.
        columns: Vec<String>,
    },
    /// `VALUES (<row>), (<row>), ...` applied to an `InsertInto`.
    InsertValues {
        /// Predecessor (must be `InsertInto`).
        source: Box<QueryNode>,
        /// Row values, each matching `columns` positionally.
        rows: Vec<Vec<Expr>>,
    },
    /// `INSERT INTO <table> (<columns>) <query>`.
    InsertQuery {
        /// Predecessor (must be `InsertInto`).
        source: Box<QueryNode>,
        /// The source `SELECT`.
        query: Box<QueryNode>,
    },
    /// `ON CONFLICT [(<target_cols>)] <action> [WHERE ...]`, wrapping an
    /// insert.
    OnConflict {
        /// Predecessor (an insert form).
        source: Box<QueryNode>,
        /// Conflict target columns (empty means "infer from unique
        /// constraint").
        target_cols: Vec<String>,
        /// Action taken on conflict.
        action: ConflictAction,
        /// Optional `WHERE` filtering which conflicts trigger the action.
        where_clause: Option<Expr>,
    },
    /// `UPDATE <table>`.
    Update {
        /// Target table.
        table: String,
    },
    /// `SET <assignments>` applied to an `Update`.
    UpdateSet {
        /// Predecessor (must be `Update`).
        source: Box<QueryNode>,
        /// `(column, expr)` assignments.
        assignments: Vec<(String, Expr)>,
    },
    /// `WHERE <condition>` applied to an `UpdateSet`.
    UpdateWhere {
        /// Predecessor.
        source: Box<QueryNode>,
        /// The filter condition.
        condition: Expr,
    },
    /// `DELETE FROM <table>`.
    DeleteFrom {
        /// Target table.
        table: String,
    },
    /// `WHERE <condition>` applied to a `DeleteFrom`.
    DeleteWhere {
        /// Predecessor.
        source: Box<QueryNode>,
        /// The filter condition.
        condition: Expr,
    },
    /// `RETURNING <items>`, wrapping any DML form.
    Returning {
        /// Predecessor (a DML form).
        source: Box<QueryNode>,
        /// Returned items.
        items: Vec<SelectItem>,
    },
}

/// A query tree tagged with the Rust type its rows decode into.
///
/// `Shape` carries no runtime state (`PhantomData`); `into_node` strips it
/// for compilation, which operates purely on `QueryNode`.
#[derive(Debug, Clone)]
pub struct Query<Shape> {
    pub(crate) node: QueryNode,
    _marker: PhantomData<Shape>,
}

// Equality ignores `Shape` entirely: two queries are equal iff their trees
// are, regardless of what they're tagged to decode into. A derived impl
// would wrongly require `Shape: PartialEq`.
impl<Shape> PartialEq for Query<Shape> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl<Shape> Eq for Query<Shape> {}

// Matches the `PartialEq` impl above: hash over the tree only, independent
// of `Shape` (a derived impl would wrongly require `Shape: Hash`).
impl<Shape> Hash for Query<Shape> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.hash(state);
    }
}

impl<Shape> Query<Shape> {
    fn wrap(node: QueryNode) -> Self {
        Self {
            node,
            _marker: PhantomData,
        }
    }

    /// Re-tags this query with a different output shape without altering
    /// its tree. Used internally by `select`/`returning`.
    fn retag<NewShape>(self) -> Query<NewShape> {
        Query {
            node: self.node,
            _marker: PhantomData,
        }
    }

    /// Consumes the query, returning its type-erased AST.
    #[must_use]
    pub fn into_node(self) -> QueryNode {
        self.node
    }

    /// Borrows the type-erased AST.
    #[must_use]
    pub fn node(&self) -> &QueryNode {
        &self.node
    }

    /// `WHERE <condition>` (or, for an `UPDATE`/`DELETE` predecessor, its
    /// `WHERE` clause).
    #[must_use]
    pub fn where_(self, condition: Expr) -> Self {
        let node = match self.node {
            QueryNode::UpdateSet { .. } => QueryNode::UpdateWhere {
                source: Box::new(self.node),
                condition,
            },
            QueryNode::DeleteFrom { .. } => QueryNode::DeleteWhere {
                source: Box::new(self.node),
                condition,
            },
            other => QueryNode::Where {
                source: Box::new(other),
                condition,
            },
        };
        Self::wrap(node)
    }

    /// Adds a `JOIN` clause.
    #[must_use]
    pub fn join(self, kind: JoinKind, table: TableRef, on: Expr) -> Self {
        Self::wrap(QueryNode::Join {
            source: Box::new(self.node),
            join: JoinClause { kind, table, on },
        })
    }

    /// `INNER JOIN`.
    #[must_use]
    pub fn inner_join(self, table: TableRef, on: Expr) -> Self {
        self.join(JoinKind::Inner, table, on)
    }

    /// `LEFT JOIN`.
    #[must_use]
    pub fn left_join(self, table: TableRef, on: Expr) -> Self {
        self.join(JoinKind::Left, table, on)
    }

    /// `RIGHT JOIN`.
    #[must_use]
    pub fn right_join(self, table: TableRef, on: Expr) -> Self {
        self.join(JoinKind::Right, table, on)
    }

    /// `FULL JOIN`.
    #[must_use]
    pub fn full_join(self, table: TableRef, on: Expr) -> Self {
        self.join(JoinKind::Full, table, on)
    }

    /// `GROUP BY <fields>`.
    #[must_use]
    pub fn group_by(self, fields: Vec<Expr>) -> Self {
        Self::wrap(QueryNode::GroupBy {
            source: Box::new(self.node),
            fields,
        })
    }

    /// `HAVING <condition>`.
    #[must_use]
    pub fn having(self, condition: Expr) -> Self {
        Self::wrap(QueryNode::Having {
            source: Box::new(self.node),
            condition,
        })
    }

    /// `DISTINCT`.
    #[must_use]
    pub fn distinct(self) -> Self {
        Self::wrap(QueryNode::Distinct {
            source: Box::new(self.node),
        })
    }

    /// `ORDER BY <items>`.
    #[must_use]
    pub fn order_by(self, items: Vec<(Expr, bool)>) -> Self {
        Self::wrap(QueryNode::OrderBy {
            source: Box::new(self.node),
            items,
        })
    }

    /// `LIMIT <n>`.
    #[must_use]
    pub fn limit(self, n: u64) -> Self {
        Self::wrap(QueryNode::Limit {
            source: Box::new(self.node),
            n,
        })
    }

    /// `OFFSET <n>`.
    #[must_use]
    pub fn offset(self, n: u64) -> Self {
        Self::wrap(QueryNode::Offset {
            source: Box::new(self.node),
            n,
        })
    }

    /// `SELECT <items>`, changing the output shape to `NewShape`.
    #[must_use]
    pub fn select<NewShape>(self, items: Vec<SelectItem>) -> Query<NewShape> {
        Query::wrap(QueryNode::Select {
            source: Box::new(self.node),
            items,
        })
        .retag()
    }

    /// `VALUES (<rows>)` applied to an `InsertInto`.
    #[must_use]
    pub fn values(self, rows: Vec<Vec<Expr>>) -> Self {
        Self::wrap(QueryNode::InsertValues {
            source: Box::new(self.node),
            rows,
        })
    }

    /// `INSERT INTO ... <query>` applied to an `InsertInto`.
    #[must_use]
    pub fn insert_query<FromShape>(self, query: Query<FromShape>) -> Self {
        Self::wrap(QueryNode::InsertQuery {
            source: Box::new(self.node),
            query: Box::new(query.into_node()),
        })
    }

    /// `ON CONFLICT ...` applied to an insert form.
    #[must_use]
    pub fn on_conflict(
        self,
        target_cols: Vec<String>,
        action: ConflictAction,
        where_clause: Option<Expr>,
    ) -> Self {
        Self::wrap(QueryNode::OnConflict {
            source: Box::new(self.node),
            target_cols,
            action,
            where_clause,
        })
    }

    /// `SET <assignments>` applied to an `Update`.
    #[must_use]
    pub fn set(self, assignments: Vec<(String, Expr)>) -> Self {
        Self::wrap(QueryNode::UpdateSet {
            source: Box::new(self.node),
            assignments,
        })
    }

    /// `RETURNING <items>`, changing the output shape to `NewShape`.
    #[must_use]
    pub fn returning<NewShape>(self, items: Vec<SelectItem>) -> Query<NewShape> {
        Query::wrap(QueryNode::Returning {
            source: Box::new(self.node),
            items,
        })
        .retag()
    }

    /// `<self> UNION [ALL] <other>`.
    #[must_use]
    pub fn union(self, other: Self, all: bool) -> Self {
        Self::wrap(QueryNode::SetOp {
            left: Box::new(self.node),
            right: Box::new(other.node),
            kind: SetOpKind::Union,
            all,
        })
    }

    /// `<self> INTERSECT [ALL] <other>`.
    #[must_use]
    pub fn intersect(self, other: Self, all: bool) -> Self {
        Self::wrap(QueryNode::SetOp {
            left: Box::new(self.node),
            right: Box::new(other.node),
            kind: SetOpKind::Intersect,
            all,
        })
    }

    /// `<self> EXCEPT [ALL] <other>`.
    #[must_use]
    pub fn except(self, other: Self, all: bool) -> Self {
        Self::wrap(QueryNode::SetOp {
            left: Box::new(self.node),
            right: Box::new(other.node),
            kind: SetOpKind::Except,
            all,
        })
    }
}

/// `FROM <table>` — the start of every `SELECT` pipeline.
#[must_use]
pub fn from(table: impl Into<String>) -> Query<AnonymousRow> {
    Query::wrap(QueryNode::From {
        table: TableRef::new(table),
    })
}

/// `FROM <table_ref>` — for aliased tables or derived subqueries.
#[must_use]
pub fn from_ref(table: TableRef) -> Query<AnonymousRow> {
    Query::wrap(QueryNode::From { table })
}

/// `INSERT INTO <table> (<columns>)` — the start of an insert pipeline.
#[must_use]
pub fn insert_into(table: impl Into<String>, columns: Vec<String>) -> Query<AnonymousRow> {
    Query::wrap(QueryNode::InsertInto {
        table: table.into(),
        columns,
    })
}

/// `UPDATE <table>` — the start of an update pipeline.
#[must_use]
pub fn update(table: impl Into<String>) -> Query<AnonymousRow> {
    Query::wrap(QueryNode::Update {
        table: table.into(),
    })
}

/// `DELETE FROM <table>` — the start of a delete pipeline.
#[must_use]
pub fn delete_from(table: impl Into<String>) -> Query<AnonymousRow> {
    Query::wrap(QueryNode::DeleteFrom {
        table: table.into(),
    })
}

/// Wraps a `WITH [RECURSIVE]` clause around a main query.
#[must_use]
pub fn with<Shape>(ctes: Vec<Cte>, main: Query<Shape>, recursive: bool) -> Query<Shape> {
    Query::wrap(QueryNode::With {
        ctes,
        main: Box::new(main.node),
        recursive,
    })
}

/// Names a CTE built from a query.
#[must_use]
pub fn cte<Shape>(name: impl Into<String>, query: Query<Shape>, columns: Option<Vec<String>>) -> Cte {
    Cte {
        name: name.into(),
        query: Box::new(query.node),
        columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expr::{field, param, IntoExpr, ParamType};

    #[test]
    fn test_shape_preservation_for_non_select_nodes() {
        let q = from("users")
            .where_(field("active").eq(true))
            .order_by(vec![(field("id"), false)])
            .limit(10)
            .offset(5);
        match q.node() {
            QueryNode::Offset { .. } => {}
            other => panic!("expected Offset at the top, got {other:?}"),
        }
    }

    #[test]
    fn test_select_changes_shape_once() {
        let q = from("users")
            .where_(field("id").eq(param(ParamType::Int, "id")))
            .select::<AnonymousRow>(vec![item(field("email"))]);
        assert!(matches!(q.node(), QueryNode::Select { .. }));
    }

    #[test]
    fn test_join_then_where_builds_expected_tree() {
        let q = from("u")
            .inner_join(TableRef::new("orders"), field("id").eq(field("user_id")))
            .where_(field("active").eq(true));
        match q.node() {
            QueryNode::Where { source, .. } => {
                assert!(matches!(**source, QueryNode::Join { .. }));
            }
            other => panic!("unexpected node: {other:?}"),
        }
    }

    #[test]
    fn test_empty_select_and_group_by_are_permitted() {
        let q = from("users").select::<AnonymousRow>(vec![]);
        assert!(matches!(q.node(), QueryNode::Select { items, .. } if items.is_empty()));

        let q2 = from("users").group_by(vec![]);
        assert!(matches!(q2.node(), QueryNode::GroupBy { fields, .. } if fields.is_empty()));
    }

    #[test]
    fn test_insert_pipeline() {
        let q = insert_into("users", vec!["name".into(), "email".into()])
            .values(vec![vec!["Alice".into_expr(), "a@example.com".into_expr()]]);
        assert!(matches!(q.node(), QueryNode::InsertValues { .. }));
    }
}
