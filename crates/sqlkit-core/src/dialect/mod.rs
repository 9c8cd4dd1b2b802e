//! The dialect compiler (spec.md §4.3).
//!
//! A [`Dialect`] supplies identifier quoting, placeholder syntax, a
//! capability matrix, and type/literal mapping; the shared [`Compiler`]
//! walks a [`QueryNode`]/[`DDLStatement`] tree and emits `(sql_text,
//! ordered_param_names)` against whichever dialect it is given. The walk
//! itself, the placeholder-resolution pass, and the clause-ordering
//! template live here once; only the genuinely dialect-specific
//! decisions (quoting, type maps, join/set-op rejections, UPSERT
//! spelling) are trait methods, following the teacher's
//! `migrations::dialect::MigrationDialect` shape — a shared trait with
//! defaulted methods, overridden per dialect struct.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::ast::expr::{BinaryOp, Expr, FrameBound, FrameMode, JsonValue, Literal, UnaryOp};
use crate::ast::ddl::{AlterOperation, DDLStatement};
use crate::ast::query::{
    ConflictAction, Cte, JoinClause, JoinKind, QueryNode, SelectItem, SetOpKind, TableRef,
};
use crate::ast::types::DataType;
use crate::error::CompileError;

/// A boolean, possibly version-dependent, feature flag advertised by a
/// dialect (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Non-recursive `WITH`.
    Cte,
    /// `WITH RECURSIVE` (spec.md §9 Open Question #1).
    RecursiveCte,
    /// `RETURNING`.
    Returning,
    /// `ON CONFLICT`/`ON DUPLICATE KEY UPDATE` upserts.
    Upsert,
    /// Window (analytic) functions.
    Window,
    /// `LATERAL` derived tables.
    Lateral,
    /// Bulk-load fast paths (`COPY`, `LOAD DATA INFILE`).
    BulkCopy,
    /// `SAVEPOINT`.
    Savepoint,
    /// Advisory locks.
    AdvisoryLock,
}

/// A dialect's version, used to gate version-dependent capabilities
/// (SQLite RETURNING ≥ 3.35, MySQL CTE/window ≥ 8.0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct DialectVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version.
    pub patch: u32,
}

impl DialectVersion {
    /// Builds a version directly.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Parses a `"major.minor.patch"` (or `"major.minor"`, or `"major"`)
    /// string. Missing components default to zero.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().map(str::parse).transpose().ok()??;
        let patch = parts.next().map(str::parse).transpose().ok()??;
        Some(Self { major, minor, patch })
    }
}

/// How a dialect spells `INSERT ... ON CONFLICT` semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStyle {
    /// `INSERT ... ON CONFLICT [(cols)] DO NOTHING | DO UPDATE SET ...`
    /// (PostgreSQL, SQLite).
    OnConflict,
    /// `INSERT IGNORE INTO ...` / `INSERT ... ON DUPLICATE KEY UPDATE ...`
    /// (MySQL).
    MySql,
}

/// Per-dialect behavior. One zero-sized struct per target database.
pub trait Dialect: Send + Sync {
    /// The dialect's name, used in error messages.
    fn name(&self) -> &'static str;

    /// The identifier quote character.
    fn identifier_quote(&self) -> char;

    /// The server/engine version, used for version-gated capabilities.
    /// Defaults to `0.0.0` (treated as "unknown", gating any
    /// version-dependent capability off).
    fn version(&self) -> DialectVersion {
        DialectVersion::default()
    }

    /// The positional placeholder text for the `idx`-th parameter
    /// (1-based).
    fn placeholder(&self, idx: usize) -> String;

    /// Whether this dialect, at its configured version, supports a
    /// capability.
    fn supports(&self, capability: Capability) -> bool;

    /// Whether `ILIKE`/`NOT ILIKE` has native syntax. When `false`, the
    /// compiler emits `UPPER(x) LIKE UPPER(y)`.
    fn supports_ilike_native(&self) -> bool {
        false
    }

    /// Renders a boolean literal.
    fn encode_bool(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    /// Maps a column `DataType` to dialect-specific SQL text.
    fn map_data_type(&self, data_type: &DataType) -> Result<String, CompileError>;

    /// Rewrites an auto-incrementing column's type (PostgreSQL `SERIAL`/
    /// `BIGSERIAL`). Returning `Some` suppresses a separate
    /// `AutoIncrement` clause for that column.
    fn autoincrement_rewrite(&self, _data_type: &DataType) -> Option<String> {
        None
    }

    /// Whether a join kind is rejected outright (MySQL rejects
    /// `FULL JOIN`).
    fn rejects_join(&self, _kind: JoinKind) -> bool {
        false
    }

    /// Whether a set operation kind is rejected outright (MySQL rejects
    /// `INTERSECT`/`EXCEPT`).
    fn rejects_set_op(&self, _kind: SetOpKind) -> bool {
        false
    }

    /// How this dialect spells an upsert.
    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::OnConflict
    }

    /// Whether `DROP TABLE ... CASCADE` is natively supported. When
    /// `false`, the compiler still emits the statement but logs a
    /// warning (spec.md §4.3 "DDL edge cases").
    fn supports_cascade_drop(&self) -> bool {
        true
    }

    /// Whether `ALTER TABLE ... DROP COLUMN` is supported.
    fn supports_drop_column(&self) -> bool {
        true
    }

    /// Whether `ALTER TABLE ... RENAME COLUMN` is supported.
    fn supports_rename_column(&self) -> bool {
        true
    }

    /// Whether `ALTER COLUMN SET/DROP DEFAULT`, `SET/DROP NOT NULL`,
    /// `SET TYPE`, and storage/statistics ops are supported.
    fn supports_alter_column_ops(&self) -> bool {
        true
    }

    /// Whether `ALTER TABLE ADD CONSTRAINT`/`ADD FOREIGN KEY`/
    /// `DROP CONSTRAINT` are supported. SQLite has no single-statement
    /// spelling for these (it requires a table rebuild), matching its
    /// `supports_alter_column_ops` restriction.
    fn supports_alter_table_constraints(&self) -> bool {
        true
    }

    /// Whether `CREATE INDEX ... USING <method>` is supported natively
    /// (PostgreSQL only, spec.md §4.3 "DDL edge cases"). Dialects that
    /// return `false` either drop the method silently (SQLite) or log a
    /// warning and drop it (MySQL); `compile_create_index` tells the two
    /// apart by name since the distinction is purely "is the clause worth
    /// flagging to the caller", not a capability.
    fn supports_index_method(&self) -> bool {
        false
    }

    /// Quotes an identifier, doubling an embedded quote character.
    fn quote_identifier(&self, name: &str) -> String {
        let q = self.identifier_quote();
        let mut doubled = String::with_capacity(name.len() + 2);
        doubled.push(q);
        for ch in name.chars() {
            if ch == q {
                doubled.push(q);
            }
            doubled.push(ch);
        }
        doubled.push(q);
        doubled
    }
}

/// Compiles a query tree against a dialect, returning the SQL text and
/// the ordered list of parameter names encountered (spec.md §6.2).
pub fn compile(dialect: &dyn Dialect, node: &QueryNode) -> Result<(String, Vec<String>), CompileError> {
    let mut compiler = Compiler::new(dialect);
    let sql = compiler.compile_top(node)?;
    Ok((sql, compiler.params))
}

/// Compiles a DDL statement against a dialect. DDL carries no
/// parameters; best-effort emissions that still proceed despite a
/// dialect limitation log a `tracing::warn!` rather than failing (spec.md
/// §9 "Warnings vs errors").
pub fn compile_ddl(dialect: &dyn Dialect, stmt: &DDLStatement) -> Result<String, CompileError> {
    let mut compiler = Compiler::new(dialect);
    compiler.compile_ddl(stmt)
}

/// Returns the unique table reachable from `node` without passing
/// through a `Join` or `SetOp`, or `None` if zero or several such tables
/// exist (spec.md §4.2).
fn find_primary_table(node: &QueryNode) -> Option<String> {
    match node {
        QueryNode::From { table } => Some(table.short_name().to_string()),
        QueryNode::Join { .. } | QueryNode::SetOp { .. } => None,
        QueryNode::Update { table } | QueryNode::DeleteFrom { table } | QueryNode::InsertInto { table, .. } => {
            Some(table.clone())
        }
        QueryNode::With { main, .. } => find_primary_table(main),
        QueryNode::Where { source, .. }
        | QueryNode::GroupBy { source, .. }
        | QueryNode::Having { source, .. }
        | QueryNode::Select { source, .. }
        | QueryNode::Distinct { source }
        | QueryNode::OrderBy { source, .. }
        | QueryNode::Limit { source, .. }
        | QueryNode::Offset { source, .. }
        | QueryNode::Returning { source, .. }
        | QueryNode::UpdateSet { source, .. }
        | QueryNode::UpdateWhere { source, .. }
        | QueryNode::DeleteWhere { source, .. }
        | QueryNode::InsertValues { source, .. }
        | QueryNode::InsertQuery { source, .. }
        | QueryNode::OnConflict { source, .. } => find_primary_table(source),
    }
}

#[derive(Default)]
struct SelectParts {
    table: Option<RenderedTable>,
    joins: Vec<JoinClause>,
    where_: Option<Expr>,
    group_by: Vec<Expr>,
    having: Option<Expr>,
    select_items: Vec<SelectItem>,
    distinct: bool,
    order_by: Vec<(Expr, bool)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

enum RenderedTable {
    Direct(TableRef),
    Derived(String),
}

#[derive(Default)]
struct InsertParts {
    table: String,
    columns: Vec<String>,
    rows: Option<Vec<Vec<Expr>>>,
    query: Option<QueryNode>,
    conflict: Option<(Vec<String>, ConflictAction, Option<Expr>)>,
}

#[derive(Default)]
struct UpdateParts {
    table: String,
    assignments: Vec<(String, Expr)>,
    where_: Option<Expr>,
}

#[derive(Default)]
struct DeleteParts {
    table: String,
    where_: Option<Expr>,
}

fn and_opt(existing: Option<Expr>, new: Expr) -> Expr {
    match existing {
        Some(e) => e.and(new),
        None => new,
    }
}

/// Threads the growing parameter-name list through a single compilation
/// pass. Constructed fresh per `compile`/`compile_ddl` call.
struct Compiler<'d> {
    dialect: &'d dyn Dialect,
    params: Vec<String>,
}

impl<'d> Compiler<'d> {
    fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            params: Vec::new(),
        }
    }

    fn quote(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    fn compile_top(&mut self, node: &QueryNode) -> Result<String, CompileError> {
        match node {
            QueryNode::With { ctes, main, recursive } => self.compile_with(ctes, main, *recursive),
            QueryNode::SetOp { left, right, kind, all } => self.compile_set_op(left, right, *kind, *all),
            QueryNode::InsertInto { .. }
            | QueryNode::InsertValues { .. }
            | QueryNode::InsertQuery { .. }
            | QueryNode::OnConflict { .. } => self.compile_insert(node),
            QueryNode::Update { .. } | QueryNode::UpdateSet { .. } | QueryNode::UpdateWhere { .. } => {
                self.compile_update(node)
            }
            QueryNode::DeleteFrom { .. } | QueryNode::DeleteWhere { .. } => self.compile_delete(node),
            QueryNode::Returning { source, items } => self.compile_returning(source, items),
            other => self.compile_select(other),
        }
    }

    fn compile_with(&mut self, ctes: &[Cte], main: &QueryNode, recursive: bool) -> Result<String, CompileError> {
        let capability = if recursive { Capability::RecursiveCte } else { Capability::Cte };
        if !self.dialect.supports(capability) {
            return Err(CompileError::Unsupported {
                capability,
                dialect: self.dialect.name(),
            });
        }
        if ctes.is_empty() {
            return Err(CompileError::EmptyStructure {
                what: "WITH clause".into(),
            });
        }
        let mut sql = String::from("WITH ");
        if recursive {
            sql.push_str("RECURSIVE ");
        }
        let rendered = ctes
            .iter()
            .map(|c| self.compile_cte(c))
            .collect::<Result<Vec<_>, _>>()?;
        sql.push_str(&rendered.join(", "));
        sql.push(' ');
        sql.push_str(&self.compile_top(main)?);
        Ok(sql)
    }

    fn compile_cte(&mut self, cte: &Cte) -> Result<String, CompileError> {
        let mut s = self.quote(&cte.name);
        if let Some(cols) = &cte.columns {
            s.push_str(" (");
            s.push_str(&cols.iter().map(|c| self.quote(c)).collect::<Vec<_>>().join(", "));
            s.push(')');
        }
        s.push_str(" AS (");
        s.push_str(&self.compile_top(&cte.query)?);
        s.push(')');
        Ok(s)
    }

    fn compile_set_op(
        &mut self,
        left: &QueryNode,
        right: &QueryNode,
        kind: SetOpKind,
        all: bool,
    ) -> Result<String, CompileError> {
        if self.dialect.rejects_set_op(kind) {
            return Err(CompileError::UnsupportedOperation {
                dialect: self.dialect.name(),
                operation: format!("{kind:?}"),
            });
        }
        let left_sql = self.compile_top(left)?;
        let right_sql = self.compile_top(right)?;
        let keyword = match kind {
            SetOpKind::Union => "UNION",
            SetOpKind::Intersect => "INTERSECT",
            SetOpKind::Except => "EXCEPT",
        };
        Ok(format!(
            "{left_sql} {keyword}{} {right_sql}",
            if all { " ALL" } else { "" }
        ))
    }

    fn compile_returning(&mut self, source: &QueryNode, items: &[SelectItem]) -> Result<String, CompileError> {
        if !self.dialect.supports(Capability::Returning) {
            return Err(CompileError::Unsupported {
                capability: Capability::Returning,
                dialect: self.dialect.name(),
            });
        }
        let primary = find_primary_table(source);
        let base = self.compile_top(source)?;
        let items_sql = self.render_select_items(items, primary.as_deref())?;
        Ok(format!("{base} RETURNING {items_sql}"))
    }

    fn flatten_select(&mut self, node: &QueryNode, parts: &mut SelectParts) -> Result<(), CompileError> {
        match node {
            QueryNode::From { table } => {
                parts.table = Some(RenderedTable::Direct(table.clone()));
                Ok(())
            }
            QueryNode::Join { source, join } => {
                self.flatten_select(source, parts)?;
                parts.joins.push(join.clone());
                Ok(())
            }
            QueryNode::Where { source, condition } => {
                self.flatten_select(source, parts)?;
                parts.where_ = Some(and_opt(parts.where_.take(), condition.clone()));
                Ok(())
            }
            QueryNode::GroupBy { source, fields } => {
                self.flatten_select(source, parts)?;
                if !fields.is_empty() {
                    parts.group_by = fields.clone();
                }
                Ok(())
            }
            QueryNode::Having { source, condition } => {
                self.flatten_select(source, parts)?;
                parts.having = Some(and_opt(parts.having.take(), condition.clone()));
                Ok(())
            }
            QueryNode::Select { source, items } => {
                self.flatten_select(source, parts)?;
                if !items.is_empty() {
                    parts.select_items = items.clone();
                }
                Ok(())
            }
            QueryNode::Distinct { source } => {
                self.flatten_select(source, parts)?;
                parts.distinct = true;
                Ok(())
            }
            QueryNode::OrderBy { source, items } => {
                self.flatten_select(source, parts)?;
                parts.order_by = items.clone();
                Ok(())
            }
            QueryNode::Limit { source, n } => {
                self.flatten_select(source, parts)?;
                parts.limit = Some(*n);
                Ok(())
            }
            QueryNode::Offset { source, n } => {
                self.flatten_select(source, parts)?;
                parts.offset = Some(*n);
                Ok(())
            }
            other => {
                let inner_sql = self.compile_top(other)?;
                parts.table = Some(RenderedTable::Derived(inner_sql));
                Ok(())
            }
        }
    }

    fn compile_select(&mut self, node: &QueryNode) -> Result<String, CompileError> {
        let primary = find_primary_table(node);
        let mut parts = SelectParts::default();
        self.flatten_select(node, &mut parts)?;

        let table_sql = match parts.table.take() {
            Some(RenderedTable::Direct(t)) => self.render_table_ref(&t)?,
            Some(RenderedTable::Derived(sql)) => format!("({sql}) AS sub"),
            None => {
                return Err(CompileError::EmptyStructure {
                    what: "FROM clause".into(),
                })
            }
        };

        let mut sql = String::from("SELECT ");
        if parts.distinct {
            sql.push_str("DISTINCT ");
        }
        if parts.select_items.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.render_select_items(&parts.select_items, primary.as_deref())?);
        }
        sql.push_str(" FROM ");
        sql.push_str(&table_sql);

        for join in &parts.joins {
            if self.dialect.rejects_join(join.kind) {
                return Err(CompileError::UnsupportedOperation {
                    dialect: self.dialect.name(),
                    operation: format!("{:?} JOIN", join.kind),
                });
            }
            sql.push(' ');
            sql.push_str(join_keyword(join.kind));
            sql.push(' ');
            sql.push_str(&self.render_table_ref(&join.table)?);
            sql.push_str(" ON ");
            sql.push_str(&self.compile_expr(&join.on, primary.as_deref())?);
        }

        if let Some(cond) = &parts.where_ {
            sql.push_str(" WHERE ");
            sql.push_str(&self.compile_expr(cond, primary.as_deref())?);
        }
        if !parts.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            let rendered = parts
                .group_by
                .iter()
                .map(|e| self.compile_expr(e, primary.as_deref()))
                .collect::<Result<Vec<_>, _>>()?;
            sql.push_str(&rendered.join(", "));
        }
        if let Some(cond) = &parts.having {
            sql.push_str(" HAVING ");
            sql.push_str(&self.compile_expr(cond, primary.as_deref())?);
        }
        if !parts.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.render_order_by(&parts.order_by, primary.as_deref())?);
        }
        if let Some(n) = parts.limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }
        if let Some(n) = parts.offset {
            sql.push_str(&format!(" OFFSET {n}"));
        }
        Ok(sql)
    }

    fn render_table_ref(&mut self, t: &TableRef) -> Result<String, CompileError> {
        match t {
            TableRef::Table { schema, name, alias } => {
                let mut s = String::new();
                if let Some(sch) = schema {
                    s.push_str(&self.quote(sch));
                    s.push('.');
                }
                s.push_str(&self.quote(name));
                if let Some(a) = alias {
                    s.push_str(" AS ");
                    s.push_str(&self.quote(a));
                }
                Ok(s)
            }
            TableRef::Subquery { query, alias, lateral } => {
                if *lateral && !self.dialect.supports(Capability::Lateral) {
                    return Err(CompileError::Unsupported {
                        capability: Capability::Lateral,
                        dialect: self.dialect.name(),
                    });
                }
                let inner = self.compile_top(query)?;
                Ok(format!(
                    "{}({inner}) AS {}",
                    if *lateral { "LATERAL " } else { "" },
                    self.quote(alias)
                ))
            }
        }
    }

    fn render_select_items(&mut self, items: &[SelectItem], primary: Option<&str>) -> Result<String, CompileError> {
        let rendered = items
            .iter()
            .map(|item| match item {
                SelectItem::All => Ok("*".to_string()),
                SelectItem::Expr { expr, alias } => {
                    let sql = self.compile_expr(expr, primary)?;
                    Ok(match alias {
                        Some(a) => format!("{sql} AS {}", self.quote(a)),
                        None => sql,
                    })
                }
            })
            .collect::<Result<Vec<_>, CompileError>>()?;
        Ok(rendered.join(", "))
    }

    fn render_order_by(&mut self, items: &[(Expr, bool)], primary: Option<&str>) -> Result<String, CompileError> {
        let rendered = items
            .iter()
            .map(|(e, desc)| {
                let sql = self.compile_expr(e, primary)?;
                Ok(if *desc { format!("{sql} DESC") } else { sql })
            })
            .collect::<Result<Vec<_>, CompileError>>()?;
        Ok(rendered.join(", "))
    }

    fn flatten_insert(&self, node: &QueryNode, parts: &mut InsertParts) -> Result<(), CompileError> {
        match node {
            QueryNode::InsertInto { table, columns } => {
                parts.table = table.clone();
                parts.columns = columns.clone();
                Ok(())
            }
            QueryNode::InsertValues { source, rows } => {
                self.flatten_insert(source, parts)?;
                parts.rows = Some(rows.clone());
                Ok(())
            }
            QueryNode::InsertQuery { source, query } => {
                self.flatten_insert(source, parts)?;
                parts.query = Some((**query).clone());
                Ok(())
            }
            QueryNode::OnConflict {
                source,
                target_cols,
                action,
                where_clause,
            } => {
                self.flatten_insert(source, parts)?;
                parts.conflict = Some((target_cols.clone(), action.clone(), where_clause.clone()));
                Ok(())
            }
            _ => Err(CompileError::EmptyStructure {
                what: "INSERT pipeline".into(),
            }),
        }
    }

    fn compile_insert(&mut self, node: &QueryNode) -> Result<String, CompileError> {
        let mut parts = InsertParts::default();
        self.flatten_insert(node, &mut parts)?;
        if parts.table.is_empty() {
            return Err(CompileError::EmptyStructure {
                what: "INSERT statement".into(),
            });
        }
        let table_sql = self.quote(&parts.table);
        let cols_sql = parts.columns.iter().map(|c| self.quote(c)).collect::<Vec<_>>().join(", ");
        let primary = Some(parts.table.clone());

        let body_sql = if let Some(rows) = &parts.rows {
            if rows.is_empty() {
                return Err(CompileError::EmptyStructure {
                    what: "INSERT VALUES".into(),
                });
            }
            let rendered_rows = rows
                .iter()
                .map(|row| {
                    let vals = row
                        .iter()
                        .map(|e| self.compile_expr(e, primary.as_deref()))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(format!("({})", vals.join(", ")))
                })
                .collect::<Result<Vec<_>, CompileError>>()?;
            format!("VALUES {}", rendered_rows.join(", "))
        } else if let Some(q) = &parts.query {
            self.compile_top(q)?
        } else {
            return Err(CompileError::EmptyStructure {
                what: "INSERT source (VALUES or query)".into(),
            });
        };

        let mut prefix_override = None;
        let mut suffix = String::new();

        if let Some((target_cols, action, where_clause)) = &parts.conflict {
            if !self.dialect.supports(Capability::Upsert) {
                return Err(CompileError::Unsupported {
                    capability: Capability::Upsert,
                    dialect: self.dialect.name(),
                });
            }
            match self.dialect.upsert_style() {
                UpsertStyle::OnConflict => {
                    let mut s = String::from(" ON CONFLICT");
                    if !target_cols.is_empty() {
                        s.push_str(" (");
                        s.push_str(&target_cols.iter().map(|c| self.quote(c)).collect::<Vec<_>>().join(", "));
                        s.push(')');
                    }
                    match action {
                        ConflictAction::DoNothing => s.push_str(" DO NOTHING"),
                        ConflictAction::DoUpdate(assignments) => {
                            s.push_str(" DO UPDATE SET ");
                            s.push_str(&self.render_assignments(assignments, primary.as_deref())?);
                        }
                    }
                    if let Some(wc) = where_clause {
                        s.push_str(" WHERE ");
                        s.push_str(&self.compile_expr(wc, primary.as_deref())?);
                    }
                    suffix = s;
                }
                UpsertStyle::MySql => match action {
                    ConflictAction::DoNothing => prefix_override = Some("INSERT IGNORE INTO".to_string()),
                    ConflictAction::DoUpdate(assignments) => {
                        suffix = format!(
                            " ON DUPLICATE KEY UPDATE {}",
                            self.render_assignments(assignments, primary.as_deref())?
                        );
                    }
                },
            }
        }

        let prefix = prefix_override.unwrap_or_else(|| "INSERT INTO".to_string());
        let cols_part = if cols_sql.is_empty() {
            String::new()
        } else {
            format!(" ({cols_sql})")
        };
        Ok(format!("{prefix} {table_sql}{cols_part} {body_sql}{suffix}"))
    }

    fn render_assignments(&mut self, assignments: &[(String, Expr)], primary: Option<&str>) -> Result<String, CompileError> {
        let rendered = assignments
            .iter()
            .map(|(col, expr)| Ok(format!("{} = {}", self.quote(col), self.compile_expr(expr, primary)?)))
            .collect::<Result<Vec<_>, CompileError>>()?;
        Ok(rendered.join(", "))
    }

    fn compile_update(&mut self, node: &QueryNode) -> Result<String, CompileError> {
        fn flatten(node: &QueryNode, parts: &mut UpdateParts) -> Result<(), CompileError> {
            match node {
                QueryNode::Update { table } => {
                    parts.table = table.clone();
                    Ok(())
                }
                QueryNode::UpdateSet { source, assignments } => {
                    flatten(source, parts)?;
                    parts.assignments = assignments.clone();
                    Ok(())
                }
                QueryNode::UpdateWhere { source, condition } => {
                    flatten(source, parts)?;
                    parts.where_ = Some(condition.clone());
                    Ok(())
                }
                _ => Err(CompileError::EmptyStructure {
                    what: "UPDATE statement".into(),
                }),
            }
        }
        let mut parts = UpdateParts::default();
        flatten(node, &mut parts)?;
        if parts.assignments.is_empty() {
            return Err(CompileError::EmptyStructure {
                what: "UPDATE SET list".into(),
            });
        }
        let primary = Some(parts.table.clone());
        let mut sql = format!(
            "UPDATE {} SET {}",
            self.quote(&parts.table),
            self.render_assignments(&parts.assignments, primary.as_deref())?
        );
        if let Some(cond) = &parts.where_ {
            sql.push_str(" WHERE ");
            sql.push_str(&self.compile_expr(cond, primary.as_deref())?);
        }
        Ok(sql)
    }

    fn compile_delete(&mut self, node: &QueryNode) -> Result<String, CompileError> {
        fn flatten(node: &QueryNode, parts: &mut DeleteParts) -> Result<(), CompileError> {
            match node {
                QueryNode::DeleteFrom { table } => {
                    parts.table = table.clone();
                    Ok(())
                }
                QueryNode::DeleteWhere { source, condition } => {
                    flatten(source, parts)?;
                    parts.where_ = Some(condition.clone());
                    Ok(())
                }
                _ => Err(CompileError::EmptyStructure {
                    what: "DELETE statement".into(),
                }),
            }
        }
        let mut parts = DeleteParts::default();
        flatten(node, &mut parts)?;
        let primary = Some(parts.table.clone());
        let mut sql = format!("DELETE FROM {}", self.quote(&parts.table));
        if let Some(cond) = &parts.where_ {
            sql.push_str(" WHERE ");
            sql.push_str(&self.compile_expr(cond, primary.as_deref())?);
        }
        Ok(sql)
    }

    fn compile_expr(&mut self, expr: &Expr, primary: Option<&str>) -> Result<String, CompileError> {
        match expr {
            Expr::ColRef { table, column } => Ok(format!("{}.{}", self.quote(table), self.quote(column))),
            Expr::Literal(lit) => self.compile_literal(lit),
            Expr::Param { name, .. } => {
                self.params.push(name.clone());
                Ok(self.dialect.placeholder(self.params.len()))
            }
            Expr::PlaceholderField { column } => {
                let table = primary.ok_or_else(|| CompileError::UnresolvedPlaceholder {
                    statement: "query".to_string(),
                    column: column.clone(),
                    reason: "no single unambiguous primary table".to_string(),
                })?;
                Ok(format!("{}.{}", self.quote(table), self.quote(column)))
            }
            Expr::RawExpr { sql } => Ok(sql.clone()),
            Expr::UnaryOp { op, operand } => {
                let inner = self.compile_expr(operand, primary)?;
                Ok(match op {
                    UnaryOp::Not => format!("NOT ({inner})"),
                    UnaryOp::IsNull => format!("{inner} IS NULL"),
                    UnaryOp::IsNotNull => format!("{inner} IS NOT NULL"),
                    UnaryOp::Exists => format!("EXISTS {inner}"),
                    UnaryOp::NotExists => format!("NOT EXISTS {inner}"),
                })
            }
            Expr::BinaryOp { op, left, right } => {
                let left_sql = self.compile_expr(left, primary)?;
                let right_sql = self.compile_expr(right, primary)?;
                if matches!(op, BinaryOp::ILike | BinaryOp::NotILike) && !self.dialect.supports_ilike_native() {
                    let keyword = if matches!(op, BinaryOp::ILike) { "LIKE" } else { "NOT LIKE" };
                    Ok(format!("UPPER({left_sql}) {keyword} UPPER({right_sql})"))
                } else {
                    Ok(format!("({left_sql} {} {right_sql})", op.as_str()))
                }
            }
            Expr::FuncCall { name, args } => {
                let rendered = args
                    .iter()
                    .map(|a| self.compile_expr(a, primary))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("{name}({})", rendered.join(", ")))
            }
            Expr::BetweenOp { expr, low, high, negated } => {
                let e = self.compile_expr(expr, primary)?;
                let l = self.compile_expr(low, primary)?;
                let h = self.compile_expr(high, primary)?;
                Ok(format!("{e}{} BETWEEN {l} AND {h}", if *negated { " NOT" } else { "" }))
            }
            Expr::InOp { expr, values, negated } => {
                let e = self.compile_expr(expr, primary)?;
                let rendered = values
                    .iter()
                    .map(|v| self.compile_expr(v, primary))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!(
                    "{e} {}IN ({})",
                    if *negated { "NOT " } else { "" },
                    rendered.join(", ")
                ))
            }
            Expr::Cast { expr, target_type } => {
                let e = self.compile_expr(expr, primary)?;
                Ok(format!("CAST({e} AS {})", self.dialect.map_data_type(target_type)?))
            }
            Expr::Subquery(query) => Ok(format!("({})", self.compile_top(query.node())?)),
            Expr::CaseExpr { whens, else_expr } => {
                let mut sql = String::from("CASE");
                for when in whens {
                    sql.push_str(" WHEN ");
                    sql.push_str(&self.compile_expr(&when.condition, primary)?);
                    sql.push_str(" THEN ");
                    sql.push_str(&self.compile_expr(&when.result, primary)?);
                }
                if let Some(e) = else_expr {
                    sql.push_str(" ELSE ");
                    sql.push_str(&self.compile_expr(e, primary)?);
                }
                sql.push_str(" END");
                Ok(sql)
            }
            Expr::WindowFunc { name, args, over } => {
                if !self.dialect.supports(Capability::Window) {
                    return Err(CompileError::Unsupported {
                        capability: Capability::Window,
                        dialect: self.dialect.name(),
                    });
                }
                let rendered_args = args
                    .iter()
                    .map(|a| self.compile_expr(a, primary))
                    .collect::<Result<Vec<_>, _>>()?;
                let over_sql = self.render_window_spec(over, primary)?;
                Ok(format!("{name}({}) OVER ({over_sql})", rendered_args.join(", ")))
            }
        }
    }

    fn render_window_spec(
        &mut self,
        over: &crate::ast::expr::WindowSpec,
        primary: Option<&str>,
    ) -> Result<String, CompileError> {
        let mut clauses = Vec::new();
        if !over.partition_by.is_empty() {
            let rendered = over
                .partition_by
                .iter()
                .map(|e| self.compile_expr(e, primary))
                .collect::<Result<Vec<_>, _>>()?;
            clauses.push(format!("PARTITION BY {}", rendered.join(", ")));
        }
        if !over.order_by.is_empty() {
            clauses.push(format!("ORDER BY {}", self.render_order_by(&over.order_by, primary)?));
        }
        if let Some(frame) = &over.frame {
            clauses.push(render_window_frame(frame));
        }
        Ok(clauses.join(" "))
    }

    fn compile_literal(&mut self, lit: &Literal) -> Result<String, CompileError> {
        Ok(match lit {
            Literal::Integer(v) => v.to_string(),
            Literal::Float(v) => v.to_string(),
            Literal::Boolean(v) => self.dialect.encode_bool(*v).to_string(),
            Literal::Text(s) => quote_text(s),
            Literal::Blob(b) => quote_blob(b),
            Literal::Date(s) | Literal::Datetime(s) | Literal::Uuid(s) => format!("'{s}'"),
            Literal::Json(j) => quote_text(&json_to_text(j)),
            Literal::Null => "NULL".to_string(),
        })
    }

    fn compile_ddl(&mut self, stmt: &DDLStatement) -> Result<String, CompileError> {
        match stmt {
            DDLStatement::CreateTable {
                name,
                columns,
                constraints,
                if_not_exists,
                temporary,
            } => self.compile_create_table(name, columns, constraints, *if_not_exists, *temporary),
            DDLStatement::AlterTable { name, operations } => self.compile_alter_table(name, operations),
            DDLStatement::DropTable { name, if_exists, cascade } => {
                self.compile_drop_table(name, *if_exists, *cascade)
            }
            DDLStatement::CreateIndex(idx) => self.compile_create_index(idx),
            DDLStatement::DropIndex { name, if_exists, table } => self.compile_drop_index(name, *if_exists, table.as_deref()),
        }
    }

    fn compile_create_table(
        &mut self,
        name: &str,
        columns: &[crate::ast::types::ColumnDef],
        constraints: &[crate::ast::types::TableConstraint],
        if_not_exists: bool,
        temporary: bool,
    ) -> Result<String, CompileError> {
        use crate::ast::types::{ColumnConstraint, TableConstraint};
        if columns.is_empty() {
            return Err(CompileError::EmptyStructure {
                what: "CREATE TABLE column list".into(),
            });
        }
        let mut sql = String::from("CREATE ");
        if temporary {
            sql.push_str(self.dialect_temporary_keyword());
        }
        sql.push_str("TABLE ");
        if if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&self.quote(name));
        sql.push_str(" (");

        let mut pieces = Vec::new();
        let mut comment_statements = Vec::new();
        for col in columns {
            let mut piece = self.quote(&col.name);
            piece.push(' ');
            let autoincrement = col.is_autoincrement();
            let rewritten_type = if autoincrement {
                self.dialect.autoincrement_rewrite(&col.data_type)
            } else {
                None
            };
            piece.push_str(&rewritten_type.unwrap_or(self.dialect.map_data_type(&col.data_type)?));
            for c in &col.constraints {
                match c {
                    ColumnConstraint::PrimaryKey => piece.push_str(" PRIMARY KEY"),
                    ColumnConstraint::NotNull => piece.push_str(" NOT NULL"),
                    ColumnConstraint::Unique => piece.push_str(" UNIQUE"),
                    ColumnConstraint::Default(expr) => {
                        piece.push_str(" DEFAULT ");
                        piece.push_str(&self.compile_expr(expr, None)?);
                    }
                    ColumnConstraint::Check(expr) => {
                        piece.push_str(" CHECK (");
                        piece.push_str(&self.compile_expr(expr, None)?);
                        piece.push(')');
                    }
                    ColumnConstraint::ForeignKey {
                        table,
                        column,
                        on_delete,
                        on_update,
                    } => {
                        piece.push_str(&format!(" REFERENCES {}({})", self.quote(table), self.quote(column)));
                        if let Some(a) = on_delete {
                            piece.push_str(&format!(" ON DELETE {}", a.as_str()));
                        }
                        if let Some(a) = on_update {
                            piece.push_str(&format!(" ON UPDATE {}", a.as_str()));
                        }
                    }
                    ColumnConstraint::AutoIncrement => {
                        if rewritten_type.is_none() {
                            piece.push_str(&self.dialect_autoincrement_keyword());
                        }
                    }
                    ColumnConstraint::Generated { expr, stored } => {
                        piece.push_str(" GENERATED ALWAYS AS (");
                        piece.push_str(&self.compile_expr(expr, None)?);
                        piece.push_str(if *stored { ") STORED" } else { ") VIRTUAL" });
                    }
                    ColumnConstraint::Collation(collation) => piece.push_str(&format!(" COLLATE {collation}")),
                    ColumnConstraint::Identity => piece.push_str(" GENERATED ALWAYS AS IDENTITY"),
                    ColumnConstraint::Comment(text) => match self.dialect.name() {
                        "mysql" => {
                            piece.push_str(" COMMENT ");
                            piece.push_str(&quote_text(text));
                        }
                        "postgresql" => comment_statements.push(format!(
                            "COMMENT ON COLUMN {}.{} IS {}",
                            self.quote(name),
                            self.quote(&col.name),
                            quote_text(text)
                        )),
                        other => tracing::warn!(
                            code = "ddl.column_comment_unsupported",
                            dialect = other,
                            table = %name,
                            column = %col.name,
                            "COMMENT constraint requested but not supported by dialect; dropping"
                        ),
                    },
                }
            }
            pieces.push(piece);
        }
        for constraint in constraints {
            pieces.push(self.render_table_constraint(constraint)?);
        }
        sql.push_str(&pieces.join(", "));
        sql.push(')');
        if !comment_statements.is_empty() {
            sql.push_str("; ");
            sql.push_str(&comment_statements.join("; "));
        }
        Ok(sql)
    }

    fn render_table_constraint(&mut self, constraint: &crate::ast::types::TableConstraint) -> Result<String, CompileError> {
        use crate::ast::types::TableConstraint;
        Ok(match constraint {
            TableConstraint::PrimaryKey(cols) => {
                format!("PRIMARY KEY ({})", cols.iter().map(|c| self.quote(c)).collect::<Vec<_>>().join(", "))
            }
            TableConstraint::Unique(cols) => {
                format!("UNIQUE ({})", cols.iter().map(|c| self.quote(c)).collect::<Vec<_>>().join(", "))
            }
            TableConstraint::Check(expr) => format!("CHECK ({})", self.compile_expr(expr, None)?),
            TableConstraint::ForeignKey {
                columns,
                ref_table,
                ref_columns,
                on_delete,
                on_update,
            } => self.render_foreign_key(columns, ref_table, ref_columns, *on_delete, *on_update),
        })
    }

    fn render_foreign_key(
        &self,
        columns: &[String],
        ref_table: &str,
        ref_columns: &[String],
        on_delete: Option<crate::ast::types::ReferentialAction>,
        on_update: Option<crate::ast::types::ReferentialAction>,
    ) -> String {
        let mut s = format!(
            "FOREIGN KEY ({}) REFERENCES {}({})",
            columns.iter().map(|c| self.quote(c)).collect::<Vec<_>>().join(", "),
            self.quote(ref_table),
            ref_columns.iter().map(|c| self.quote(c)).collect::<Vec<_>>().join(", ")
        );
        if let Some(a) = on_delete {
            s.push_str(&format!(" ON DELETE {}", a.as_str()));
        }
        if let Some(a) = on_update {
            s.push_str(&format!(" ON UPDATE {}", a.as_str()));
        }
        s
    }

    fn dialect_autoincrement_keyword(&self) -> String {
        match self.dialect.name() {
            "sqlite" => " AUTOINCREMENT".to_string(),
            "mysql" => " AUTO_INCREMENT".to_string(),
            _ => String::new(),
        }
    }

    fn dialect_temporary_keyword(&self) -> &'static str {
        if self.dialect.name() == "sqlite" {
            "TEMP "
        } else {
            "TEMPORARY "
        }
    }

    fn compile_alter_table(&mut self, name: &str, operations: &[AlterOperation]) -> Result<String, CompileError> {
        if operations.is_empty() {
            return Err(CompileError::EmptyStructure {
                what: "ALTER TABLE operation list".into(),
            });
        }
        let table_sql = self.quote(name);
        let mut rendered = Vec::new();
        for op in operations {
            rendered.push(self.compile_alter_operation(name, &table_sql, op)?);
        }
        Ok(rendered.join("; "))
    }

    fn compile_alter_operation(
        &mut self,
        table: &str,
        table_sql: &str,
        op: &AlterOperation,
    ) -> Result<String, CompileError> {
        match op {
            AlterOperation::AddColumn(col) => {
                let col_sql = self.compile_create_table(table, std::slice::from_ref(col), &[], false, false)?;
                let inner = col_sql
                    .splitn(2, '(')
                    .nth(1)
                    .and_then(|s| s.strip_suffix(')'))
                    .unwrap_or_default();
                Ok(format!("ALTER TABLE {table_sql} ADD COLUMN {inner}"))
            }
            AlterOperation::DropColumn(col) => {
                if !self.dialect.supports_drop_column() {
                    return Err(CompileError::UnsupportedOperation {
                        dialect: self.dialect.name(),
                        operation: format!("DROP COLUMN {col}"),
                    });
                }
                Ok(format!("ALTER TABLE {table_sql} DROP COLUMN {}", self.quote(col)))
            }
            AlterOperation::RenameColumn { from, to } => {
                if !self.dialect.supports_rename_column() {
                    return Err(CompileError::UnsupportedOperation {
                        dialect: self.dialect.name(),
                        operation: format!("RENAME COLUMN {from}"),
                    });
                }
                Ok(format!(
                    "ALTER TABLE {table_sql} RENAME COLUMN {} TO {}",
                    self.quote(from),
                    self.quote(to)
                ))
            }
            AlterOperation::AddTableConstraint(constraint) => {
                if !self.dialect.supports_alter_table_constraints() {
                    return Err(CompileError::UnsupportedOperation {
                        dialect: self.dialect.name(),
                        operation: "ADD CONSTRAINT".to_string(),
                    });
                }
                let rendered = self.render_table_constraint(constraint)?;
                Ok(format!("ALTER TABLE {table_sql} ADD {rendered}"))
            }
            AlterOperation::AddForeignKey(fk) => {
                if !self.dialect.supports_alter_table_constraints() {
                    return Err(CompileError::UnsupportedOperation {
                        dialect: self.dialect.name(),
                        operation: "ADD FOREIGN KEY".to_string(),
                    });
                }
                let rendered = self.render_foreign_key(&fk.columns, &fk.ref_table, &fk.ref_columns, fk.on_delete, fk.on_update);
                Ok(format!("ALTER TABLE {table_sql} ADD {rendered}"))
            }
            AlterOperation::DropConstraint(constraint_name) => {
                if !self.dialect.supports_alter_table_constraints() {
                    return Err(CompileError::UnsupportedOperation {
                        dialect: self.dialect.name(),
                        operation: format!("DROP CONSTRAINT {constraint_name}"),
                    });
                }
                Ok(format!("ALTER TABLE {table_sql} DROP CONSTRAINT {}", self.quote(constraint_name)))
            }
            AlterOperation::SetDefault { column, default } => {
                if !self.dialect.supports_alter_column_ops() {
                    return Err(CompileError::UnsupportedOperation {
                        dialect: self.dialect.name(),
                        operation: format!("ALTER COLUMN {column} SET DEFAULT"),
                    });
                }
                let default_sql = self.compile_expr(default, None)?;
                Ok(format!(
                    "ALTER TABLE {table_sql} ALTER COLUMN {} SET DEFAULT {default_sql}",
                    self.quote(column)
                ))
            }
            AlterOperation::DropDefault { column } => self.require_alter_column_ops(table_sql, column, "DROP DEFAULT"),
            AlterOperation::SetNotNull { column } => self.require_alter_column_ops(table_sql, column, "SET NOT NULL"),
            AlterOperation::DropNotNull { column } => self.require_alter_column_ops(table_sql, column, "DROP NOT NULL"),
            AlterOperation::SetType { column, .. } => self.require_alter_column_ops(table_sql, column, "SET TYPE"),
            AlterOperation::SetStatistics { column, target } => {
                if !self.dialect.supports_alter_column_ops() {
                    return Err(CompileError::UnsupportedOperation {
                        dialect: self.dialect.name(),
                        operation: format!("ALTER COLUMN {column} SET STATISTICS"),
                    });
                }
                Ok(format!(
                    "ALTER TABLE {table_sql} ALTER COLUMN {} SET STATISTICS {target}",
                    self.quote(column)
                ))
            }
            AlterOperation::SetStorage { column, mode } => {
                if !self.dialect.supports_alter_column_ops() {
                    return Err(CompileError::UnsupportedOperation {
                        dialect: self.dialect.name(),
                        operation: format!("ALTER COLUMN {column} SET STORAGE"),
                    });
                }
                Ok(format!(
                    "ALTER TABLE {table_sql} ALTER COLUMN {} SET STORAGE {mode}",
                    self.quote(column)
                ))
            }
            AlterOperation::RenameTable(new_name) => Ok(format!("ALTER TABLE {table_sql} RENAME TO {}", self.quote(new_name))),
        }
    }

    fn require_alter_column_ops(&self, table_sql: &str, column: &str, op_name: &str) -> Result<String, CompileError> {
        if !self.dialect.supports_alter_column_ops() {
            return Err(CompileError::UnsupportedOperation {
                dialect: self.dialect.name(),
                operation: format!("ALTER COLUMN {column} {op_name}"),
            });
        }
        Ok(format!("ALTER TABLE {table_sql} ALTER COLUMN {} {op_name}", self.quote(column)))
    }

    fn compile_drop_table(&mut self, name: &str, if_exists: bool, cascade: bool) -> Result<String, CompileError> {
        let mut sql = String::from("DROP TABLE ");
        if if_exists {
            sql.push_str("IF EXISTS ");
        }
        sql.push_str(&self.quote(name));
        if cascade {
            if !self.dialect.supports_cascade_drop() {
                tracing::warn!(
                    code = "ddl.cascade_unsupported",
                    dialect = self.dialect.name(),
                    table = name,
                    "CASCADE requested but not supported by dialect; emitting without it"
                );
            } else {
                sql.push_str(" CASCADE");
            }
        }
        Ok(sql)
    }

    fn compile_create_index(&mut self, idx: &crate::ast::ddl::CreateIndex) -> Result<String, CompileError> {
        let mut sql = String::from("CREATE ");
        if idx.unique {
            sql.push_str("UNIQUE ");
        }
        sql.push_str("INDEX ");
        if idx.if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&self.quote(&idx.name));
        sql.push_str(" ON ");
        sql.push_str(&self.quote(&idx.table));
        if let Some(method) = &idx.method {
            if self.dialect.supports_index_method() {
                sql.push_str(" USING ");
                sql.push_str(method);
            } else if self.dialect.name() == "mysql" {
                tracing::warn!(
                    code = "ddl.index_method_unsupported",
                    dialect = self.dialect.name(),
                    index = %idx.name,
                    method = %method,
                    "USING <method> requested but not supported by dialect; emitting without it"
                );
            }
        }
        sql.push_str(" (");
        let mut keys: Vec<String> = idx.columns.iter().map(|c| self.quote(c)).collect();
        for expr in &idx.expressions {
            keys.push(format!("({})", self.compile_expr(expr, Some(&idx.table))?));
        }
        sql.push_str(&keys.join(", "));
        sql.push(')');
        if let Some(pred) = &idx.predicate {
            sql.push_str(" WHERE ");
            sql.push_str(&self.compile_expr(pred, Some(&idx.table))?);
        }
        Ok(sql)
    }

    fn compile_drop_index(&mut self, name: &str, if_exists: bool, table: Option<&str>) -> Result<String, CompileError> {
        let mut sql = String::from("DROP INDEX ");
        if if_exists {
            sql.push_str("IF EXISTS ");
        }
        sql.push_str(&self.quote(name));
        if self.dialect.name() == "mysql" {
            if let Some(t) = table {
                sql.push_str(" ON ");
                sql.push_str(&self.quote(t));
            }
        }
        Ok(sql)
    }
}

fn join_keyword(kind: JoinKind) -> &'static str {
    match kind {
        JoinKind::Inner => "INNER JOIN",
        JoinKind::Left => "LEFT JOIN",
        JoinKind::Right => "RIGHT JOIN",
        JoinKind::Full => "FULL JOIN",
    }
}

fn render_window_frame(frame: &crate::ast::expr::WindowFrame) -> String {
    let mode = match frame.mode {
        FrameMode::Rows => "ROWS",
        FrameMode::Range => "RANGE",
        FrameMode::Groups => "GROUPS",
    };
    let start = render_frame_bound(&frame.start);
    match &frame.end {
        Some(end) => format!("{mode} BETWEEN {start} AND {}", render_frame_bound(end)),
        None => format!("{mode} {start}"),
    }
}

fn render_frame_bound(bound: &FrameBound) -> String {
    match bound {
        FrameBound::UnboundedPreceding => "UNBOUNDED PRECEDING".to_string(),
        FrameBound::UnboundedFollowing => "UNBOUNDED FOLLOWING".to_string(),
        FrameBound::Offset(n) => match n.cmp(&0) {
            std::cmp::Ordering::Less => format!("{} PRECEDING", n.unsigned_abs()),
            std::cmp::Ordering::Greater => format!("{n} FOLLOWING"),
            std::cmp::Ordering::Equal => "CURRENT ROW".to_string(),
        },
    }
}

fn quote_text(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn quote_blob(b: &[u8]) -> String {
    let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
    format!("X'{hex}'")
}

fn json_to_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Object(entries) => {
            let inner = entries
                .iter()
                .map(|(k, v)| format!("\"{k}\":{}", json_to_text(v)))
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{inner}}}")
        }
        JsonValue::Array(items) => {
            let inner = items.iter().map(json_to_text).collect::<Vec<_>>().join(",");
            format!("[{inner}]")
        }
        JsonValue::String(s) => format!("\"{}\"", s.replace('"', "\\\"")),
        JsonValue::Number(n) => n.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Null => "null".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expr::{field, param, ParamType};
    use crate::ast::query::{from, item};

    #[test]
    fn test_dialect_version_ordering() {
        assert!(DialectVersion::new(8, 0, 0) > DialectVersion::new(5, 7, 0));
        assert_eq!(DialectVersion::parse("3.35"), Some(DialectVersion::new(3, 35, 0)));
    }

    #[test]
    fn test_scenario_1_sqlite_select_where() {
        let dialect = SqliteDialect::new();
        let q = from("users")
            .where_(field("id").eq(param(ParamType::Int, "uid")))
            .select::<crate::ast::query::AnonymousRow>(vec![item(field("id")), item(field("email"))]);
        let (sql, params) = compile(&dialect, q.node()).unwrap();
        assert_eq!(
            sql,
            "SELECT `users`.`id`, `users`.`email` FROM `users` WHERE (`users`.`id` = ?)"
        );
        assert_eq!(params, vec!["uid".to_string()]);
    }

    #[test]
    fn test_scenario_2_postgres_select_where() {
        let dialect = PostgresDialect::new();
        let q = from("users")
            .where_(field("id").eq(param(ParamType::Int, "uid")))
            .select::<crate::ast::query::AnonymousRow>(vec![item(field("id")), item(field("email"))]);
        let (sql, params) = compile(&dialect, q.node()).unwrap();
        assert_eq!(
            sql,
            "SELECT \"users\".\"id\", \"users\".\"email\" FROM \"users\" WHERE (\"users\".\"id\" = $1)"
        );
        assert_eq!(params, vec!["uid".to_string()]);
    }

    #[test]
    fn test_scenario_3_mysql_and_condition() {
        let dialect = MySqlDialect::new();
        let q = from("users").where_(
            field("age")
                .gt(param(ParamType::Int, "min"))
                .and(field("email").eq(param(ParamType::String, "e"))),
        );
        let (sql, params) = compile(&dialect, q.node()).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `users` WHERE ((`users`.`age` > ?) AND (`users`.`email` = ?))"
        );
        assert_eq!(params, vec!["min".to_string(), "e".to_string()]);
    }

    #[test]
    fn test_scenario_4_sqlite_insert() {
        let dialect = SqliteDialect::new();
        let q = crate::ast::query::insert_into("users", vec!["name".into(), "email".into()]).values(vec![vec![
            crate::ast::expr::IntoExpr::into_expr("O'Brien"),
            param(ParamType::String, "em"),
        ]]);
        let (sql, params) = compile(&dialect, q.node()).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `users` (`name`, `email`) VALUES ('O''Brien', ?)"
        );
        assert_eq!(params, vec!["em".to_string()]);
    }

    #[test]
    fn test_scenario_5_sqlite_ilike_emulation() {
        let dialect = SqliteDialect::new();
        let q = from("users").where_(field("email").ilike("%@X.COM"));
        let (sql, _params) = compile(&dialect, q.node()).unwrap();
        assert!(sql.contains("WHERE UPPER(`users`.`email`) LIKE UPPER('%@X.COM')"));
    }

    #[test]
    fn test_scenario_6_mysql_57_rejects_cte() {
        let dialect = MySqlDialect::with_version(DialectVersion::new(5, 7, 0));
        let active = from("users").where_(field("active").eq(true));
        let main = from("active").select::<crate::ast::query::AnonymousRow>(vec![item(field("email"))]);
        let with_query = crate::ast::query::with(
            vec![crate::ast::query::cte("active", active, None)],
            main,
            false,
        );
        let err = compile(&dialect, with_query.node()).unwrap_err();
        assert!(matches!(
            err,
            CompileError::Unsupported {
                capability: Capability::Cte,
                ..
            }
        ));
    }

    #[test]
    fn test_identifier_quoting_doubles_embedded_quote() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.quote_identifier("weird\"name"), "\"weird\"\"name\"");
    }

    #[test]
    fn test_postgres_create_index_emits_using_method() {
        let dialect = PostgresDialect::new();
        let idx = crate::ast::ddl::CreateIndex::new("idx_users_email", "users", vec!["email".into()]).using("gin");
        let sql = compile_ddl(&dialect, &DDLStatement::CreateIndex(idx)).unwrap();
        assert_eq!(sql, "CREATE INDEX \"idx_users_email\" ON \"users\" USING gin (\"email\")");
    }

    #[test]
    fn test_sqlite_create_index_drops_method_silently() {
        let dialect = SqliteDialect::new();
        let idx = crate::ast::ddl::CreateIndex::new("idx_users_email", "users", vec!["email".into()]).using("gin");
        let sql = compile_ddl(&dialect, &DDLStatement::CreateIndex(idx)).unwrap();
        assert_eq!(sql, "CREATE INDEX `idx_users_email` ON `users` (`email`)");
    }

    #[test]
    fn test_mysql_create_index_drops_unsupported_method() {
        let dialect = MySqlDialect::new();
        let idx = crate::ast::ddl::CreateIndex::new("idx_users_email", "users", vec!["email".into()]).using("btree");
        let sql = compile_ddl(&dialect, &DDLStatement::CreateIndex(idx)).unwrap();
        assert_eq!(sql, "CREATE INDEX `idx_users_email` ON `users` (`email`)");
    }

    #[test]
    fn test_create_index_with_expression_key() {
        let dialect = PostgresDialect::new();
        let idx = crate::ast::ddl::CreateIndex::new("idx_users_lower_email", "users", Vec::new())
            .with_expressions(vec![crate::ast::expr::func("lower", vec![field("email")])]);
        let sql = compile_ddl(&dialect, &DDLStatement::CreateIndex(idx)).unwrap();
        assert_eq!(
            sql,
            "CREATE INDEX \"idx_users_lower_email\" ON \"users\" (lower(\"users\".\"email\"))"
        );
    }

    #[test]
    fn test_postgres_alter_table_add_foreign_key() {
        let dialect = PostgresDialect::new();
        let stmt = DDLStatement::AlterTable {
            name: "orders".into(),
            operations: vec![AlterOperation::AddForeignKey(crate::ast::query::ForeignKeyRef {
                columns: vec!["customer_id".into()],
                ref_table: "customers".into(),
                ref_columns: vec!["id".into()],
                on_delete: Some(crate::ast::types::ReferentialAction::Cascade),
                on_update: None,
            })],
        };
        let sql = compile_ddl(&dialect, &stmt).unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE \"orders\" ADD FOREIGN KEY (\"customer_id\") REFERENCES \"customers\"(\"id\") ON DELETE CASCADE"
        );
    }

    #[test]
    fn test_sqlite_rejects_alter_table_add_constraint() {
        let dialect = SqliteDialect::new();
        let stmt = DDLStatement::AlterTable {
            name: "orders".into(),
            operations: vec![AlterOperation::DropConstraint("ck_total_positive".into())],
        };
        let err = compile_ddl(&dialect, &stmt).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedOperation { .. }));
    }

    #[test]
    fn test_postgres_alter_column_set_statistics_and_storage() {
        let dialect = PostgresDialect::new();
        let stmt = DDLStatement::AlterTable {
            name: "events".into(),
            operations: vec![
                AlterOperation::SetStatistics {
                    column: "payload".into(),
                    target: 1000,
                },
                AlterOperation::SetStorage {
                    column: "payload".into(),
                    mode: "EXTERNAL".into(),
                },
            ],
        };
        let sql = compile_ddl(&dialect, &stmt).unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE \"events\" ALTER COLUMN \"payload\" SET STATISTICS 1000; \
             ALTER TABLE \"events\" ALTER COLUMN \"payload\" SET STORAGE EXTERNAL"
        );
    }

    #[test]
    fn test_sqlite_rejects_set_statistics_and_storage() {
        let dialect = SqliteDialect::new();
        let stats_err = compile_ddl(
            &dialect,
            &DDLStatement::AlterTable {
                name: "events".into(),
                operations: vec![AlterOperation::SetStatistics {
                    column: "payload".into(),
                    target: 100,
                }],
            },
        )
        .unwrap_err();
        assert!(matches!(stats_err, CompileError::UnsupportedOperation { .. }));

        let storage_err = compile_ddl(
            &dialect,
            &DDLStatement::AlterTable {
                name: "events".into(),
                operations: vec![AlterOperation::SetStorage {
                    column: "payload".into(),
                    mode: "EXTERNAL".into(),
                }],
            },
        )
        .unwrap_err();
        assert!(matches!(storage_err, CompileError::UnsupportedOperation { .. }));
    }

    #[test]
    fn test_create_temporary_table() {
        let dialect = SqliteDialect::new();
        let stmt = DDLStatement::create_table("scratch", vec![crate::ast::types::ColumnDef::new("id", crate::ast::types::DataType::Bigint)]).temporary();
        let sql = compile_ddl(&dialect, &stmt).unwrap();
        assert!(sql.starts_with("CREATE TEMP TABLE `scratch`"));
    }

    fn column_with_comment() -> Vec<crate::ast::types::ColumnDef> {
        vec![
            crate::ast::types::ColumnDef::new("id", crate::ast::types::DataType::Bigint),
            crate::ast::types::ColumnDef::new("bio", crate::ast::types::DataType::Text)
                .with(crate::ast::types::ColumnConstraint::Comment("free-form biography text".into())),
        ]
    }

    #[test]
    fn test_mysql_emits_inline_column_comment() {
        let dialect = MySqlDialect::new();
        let stmt = DDLStatement::create_table("users", column_with_comment());
        let sql = compile_ddl(&dialect, &stmt).unwrap();
        assert!(sql.contains("COMMENT 'free-form biography text'"));
    }

    #[test]
    fn test_postgres_emits_comment_on_column_statement() {
        let dialect = PostgresDialect::new();
        let stmt = DDLStatement::create_table("users", column_with_comment());
        let sql = compile_ddl(&dialect, &stmt).unwrap();
        assert!(sql.contains("; COMMENT ON COLUMN \"users\".\"bio\" IS 'free-form biography text'"));
    }

    #[test]
    fn test_sqlite_drops_column_comment_silently() {
        let dialect = SqliteDialect::new();
        let stmt = DDLStatement::create_table("users", column_with_comment());
        let sql = compile_ddl(&dialect, &stmt).unwrap();
        assert!(!sql.contains("COMMENT"));
        assert!(!sql.contains("free-form"));
    }
}
