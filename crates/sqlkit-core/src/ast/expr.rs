//! Expression AST types (spec.md §3.1).
//!
//! `Expr` is a single closed sum type for every scalar SQL expression this
//! crate can build: column references, literals, named parameters, the
//! `PlaceholderField` sugar resolved by the compiler, raw SQL escape
//! hatches, unary/binary operators, function calls, `BETWEEN`/`IN`, `CAST`,
//! correlated subqueries, `CASE`, and window functions. Every variant is
//! immutable; `PartialEq`/`Hash` are structural, so a tree's hash is a
//! stable cache key (spec.md §4.1).

use std::hash::{Hash, Hasher};

use super::query::Query;
use super::types::DataType;

/// A literal constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Signed integer.
    Integer(i64),
    /// Floating point. Compared/hashed via its bit pattern so `Literal`
    /// can participate in structural equality and hashing.
    Float(f64),
    /// Boolean.
    Boolean(bool),
    /// Text.
    Text(String),
    /// Binary blob.
    Blob(Vec<u8>),
    /// `'YYYY-MM-DD'` calendar date.
    Date(String),
    /// `'YYYY-MM-DD HH:MM:SS'` date and time.
    Datetime(String),
    /// Canonical-text UUID.
    Uuid(String),
    /// A JSON-shaped value: either a map or a list of further JSON values,
    /// encoded as nested `Literal`s (object keys paired with values).
    Json(JsonValue),
    /// SQL `NULL`.
    Null,
}

/// A JSON-shaped literal value, used only inside `Literal::Json`.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    /// JSON object.
    Object(Vec<(String, JsonValue)>),
    /// JSON array.
    Array(Vec<JsonValue>),
    /// JSON string.
    String(String),
    /// JSON number, kept as text to avoid float round-tripping loss.
    Number(String),
    /// JSON boolean.
    Bool(bool),
    /// JSON null.
    Null,
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Integer(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::Boolean(v) => v.hash(state),
            Self::Text(v) | Self::Date(v) | Self::Datetime(v) | Self::Uuid(v) => v.hash(state),
            Self::Blob(v) => v.hash(state),
            Self::Json(v) => v.hash(state),
            Self::Null => {}
        }
    }
}

impl Eq for JsonValue {}

impl Hash for JsonValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Object(entries) => entries.hash(state),
            Self::Array(items) => items.hash(state),
            Self::String(s) | Self::Number(s) => s.hash(state),
            Self::Bool(b) => b.hash(state),
            Self::Null => {}
        }
    }
}

/// Binary operators (spec.md §3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    LtEq,
    /// `>=`
    GtEq,
    /// `AND`
    And,
    /// `OR`
    Or,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
    /// `ILIKE` (case-insensitive LIKE; emulated on dialects without it)
    ILike,
    /// `NOT ILIKE`
    NotILike,
}

impl BinaryOp {
    /// Returns the canonical SQL keyword/symbol for this operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::ILike => "ILIKE",
            Self::NotILike => "NOT ILIKE",
        }
    }
}

/// Unary operators (spec.md §3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `NOT`
    Not,
    /// `IS NULL`
    IsNull,
    /// `IS NOT NULL`
    IsNotNull,
    /// `EXISTS`
    Exists,
    /// `NOT EXISTS`
    NotExists,
}

/// The value type a `Param` is expected to carry, used only to validate
/// binding at execution time (spec.md §3.1 "carries the intended value
/// type").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Signed integer.
    Int,
    /// Floating point.
    Float,
    /// Boolean.
    Bool,
    /// Text.
    String,
    /// Binary.
    Blob,
    /// Calendar date.
    Date,
    /// Date and time.
    Datetime,
    /// UUID.
    Uuid,
    /// JSON-shaped value.
    Json,
}

/// Frame mode for a window function's `OVER` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameMode {
    /// `ROWS`
    Rows,
    /// `RANGE`
    Range,
    /// `GROUPS`
    Groups,
}

/// A window frame bound.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameBound {
    /// `UNBOUNDED PRECEDING`.
    UnboundedPreceding,
    /// `UNBOUNDED FOLLOWING`.
    UnboundedFollowing,
    /// A signed offset: negative is `n PRECEDING`, positive is
    /// `n FOLLOWING`, zero is `CURRENT ROW` (spec.md §3.1 sign
    /// convention).
    Offset(i64),
}

/// A window frame (`ROWS|RANGE|GROUPS BETWEEN ... AND ...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowFrame {
    /// Frame unit.
    pub mode: FrameMode,
    /// Start bound.
    pub start: FrameBound,
    /// End bound (omitted means a single-bound frame: `<mode> <start>`).
    pub end: Option<FrameBound>,
}

/// The `OVER (...)` clause of a window function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowSpec {
    /// `PARTITION BY` expressions.
    pub partition_by: Vec<Expr>,
    /// `ORDER BY` expressions, each with a descending flag.
    pub order_by: Vec<(Expr, bool)>,
    /// Optional explicit frame.
    pub frame: Option<WindowFrame>,
}

/// A single `WHEN <cond> THEN <result>` arm of a `CASE` expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WhenClause {
    /// The condition.
    pub condition: Box<Expr>,
    /// The result expression if the condition holds.
    pub result: Box<Expr>,
}

/// The expression AST (spec.md §3.1).
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A qualified column reference.
    ColRef {
        /// Source table (short name or alias).
        table: String,
        /// Column name.
        column: String,
    },
    /// A constant value.
    Literal(Literal),
    /// A named placeholder carrying its intended value type.
    Param {
        /// Expected value type, validated at bind time.
        type_tag: ParamType,
        /// Parameter name, used by the executor to look up a bound value.
        name: String,
    },
    /// Sugar for `ColRef { table: <inferred>, column }`, legal only when
    /// the enclosing query has exactly one primary table (spec.md §4.2).
    /// The compiler rewrites every `PlaceholderField` to a `ColRef` before
    /// emitting it.
    PlaceholderField {
        /// Column name.
        column: String,
    },
    /// An opaque, verbatim SQL fragment (escape hatch).
    RawExpr {
        /// The literal SQL text to splice in unchanged.
        sql: String,
    },
    /// A unary operator applied to an operand.
    UnaryOp {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expr>,
    },
    /// A binary operator applied to two operands.
    BinaryOp {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// A function call.
    FuncCall {
        /// Function name.
        name: String,
        /// Arguments, in call order.
        args: Vec<Expr>,
    },
    /// `<expr> [NOT] BETWEEN <low> AND <high>`.
    BetweenOp {
        /// The tested expression.
        expr: Box<Expr>,
        /// Lower bound.
        low: Box<Expr>,
        /// Upper bound.
        high: Box<Expr>,
        /// Whether this is `NOT BETWEEN`.
        negated: bool,
    },
    /// `<expr> [NOT] IN (<values>)`.
    InOp {
        /// The tested expression.
        expr: Box<Expr>,
        /// Membership values.
        values: Vec<Expr>,
        /// Whether this is `NOT IN`.
        negated: bool,
    },
    /// `CAST(<expr> AS <target_type>)`.
    Cast {
        /// Expression being cast.
        expr: Box<Expr>,
        /// Target type.
        target_type: DataType,
    },
    /// A scalar/correlated subquery, `(<query>)`.
    Subquery(Box<Query<super::query::AnonymousRow>>),
    /// `CASE WHEN ... THEN ... [ELSE ...] END`.
    CaseExpr {
        /// `WHEN`/`THEN` arms, at least one.
        whens: Vec<WhenClause>,
        /// Optional `ELSE` result.
        else_expr: Option<Box<Expr>>,
    },
    /// A window (analytic) function call.
    WindowFunc {
        /// Function name (e.g. `ROW_NUMBER`, `SUM`).
        name: String,
        /// Arguments.
        args: Vec<Expr>,
        /// The `OVER (...)` clause.
        over: WindowSpec,
    },
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::ColRef { table, column } => {
                table.hash(state);
                column.hash(state);
            }
            Self::Literal(lit) => lit.hash(state),
            Self::Param { type_tag, name } => {
                type_tag.hash(state);
                name.hash(state);
            }
            Self::PlaceholderField { column } => column.hash(state),
            Self::RawExpr { sql } => sql.hash(state),
            Self::UnaryOp { op, operand } => {
                op.hash(state);
                operand.hash(state);
            }
            Self::BinaryOp { op, left, right } => {
                op.hash(state);
                left.hash(state);
                right.hash(state);
            }
            Self::FuncCall { name, args } => {
                name.hash(state);
                args.hash(state);
            }
            Self::BetweenOp {
                expr,
                low,
                high,
                negated,
            } => {
                expr.hash(state);
                low.hash(state);
                high.hash(state);
                negated.hash(state);
            }
            Self::InOp {
                expr,
                values,
                negated,
            } => {
                expr.hash(state);
                values.hash(state);
                negated.hash(state);
            }
            Self::Cast { expr, target_type } => {
                expr.hash(state);
                target_type.hash(state);
            }
            Self::Subquery(query) => query.hash(state),
            Self::CaseExpr { whens, else_expr } => {
                whens.hash(state);
                else_expr.hash(state);
            }
            Self::WindowFunc { name, args, over } => {
                name.hash(state);
                args.hash(state);
                over.hash(state);
            }
        }
    }
}

impl Hash for DataType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

// ---------------------------------------------------------------------
// Constructors and combinators (spec.md §4.1)
// ---------------------------------------------------------------------

/// Creates an unqualified placeholder column reference, resolved to the
/// query's single primary table at compile time.
#[must_use]
pub fn field(column: impl Into<String>) -> Expr {
    Expr::PlaceholderField {
        column: column.into(),
    }
}

/// Creates a qualified column reference.
#[must_use]
pub fn col(table: impl Into<String>, column: impl Into<String>) -> Expr {
    Expr::ColRef {
        table: table.into(),
        column: column.into(),
    }
}

/// Creates a named parameter placeholder.
#[must_use]
pub fn param(type_tag: ParamType, name: impl Into<String>) -> Expr {
    Expr::Param {
        type_tag,
        name: name.into(),
    }
}

/// Creates a verbatim SQL fragment.
#[must_use]
pub fn raw(sql: impl Into<String>) -> Expr {
    Expr::RawExpr { sql: sql.into() }
}

/// Creates a function call.
#[must_use]
pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Expr {
    Expr::FuncCall {
        name: name.into(),
        args,
    }
}

/// A trait letting raw Rust values be used anywhere an `Expr` is expected;
/// operators auto-wrap the value as `Expr::Literal` (spec.md §4.1).
pub trait IntoExpr {
    /// Converts `self` into an expression.
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

macro_rules! impl_into_expr_int {
    ($($t:ty),+) => {
        $(impl IntoExpr for $t {
            fn into_expr(self) -> Expr {
                Expr::Literal(Literal::Integer(i64::from(self)))
            }
        })+
    };
}
impl_into_expr_int!(i8, i16, i32, i64, u8, u16, u32);

impl IntoExpr for f64 {
    fn into_expr(self) -> Expr {
        Expr::Literal(Literal::Float(self))
    }
}

impl IntoExpr for f32 {
    fn into_expr(self) -> Expr {
        Expr::Literal(Literal::Float(f64::from(self)))
    }
}

impl IntoExpr for bool {
    fn into_expr(self) -> Expr {
        Expr::Literal(Literal::Boolean(self))
    }
}

impl IntoExpr for &str {
    fn into_expr(self) -> Expr {
        Expr::Literal(Literal::Text(self.to_string()))
    }
}

impl IntoExpr for String {
    fn into_expr(self) -> Expr {
        Expr::Literal(Literal::Text(self))
    }
}

impl<T: IntoExpr> IntoExpr for Option<T> {
    fn into_expr(self) -> Expr {
        match self {
            Some(v) => v.into_expr(),
            None => Expr::Literal(Literal::Null),
        }
    }
}

impl Expr {
    fn binary(self, op: BinaryOp, rhs: impl IntoExpr) -> Self {
        Self::BinaryOp {
            op,
            left: Box::new(self),
            right: Box::new(rhs.into_expr()),
        }
    }

    /// `self = rhs`
    #[must_use]
    pub fn eq(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Eq, rhs)
    }

    /// `self != rhs`
    #[must_use]
    pub fn not_eq(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::NotEq, rhs)
    }

    /// `self < rhs`
    #[must_use]
    pub fn lt(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Lt, rhs)
    }

    /// `self > rhs`
    #[must_use]
    pub fn gt(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Gt, rhs)
    }

    /// `self <= rhs`
    #[must_use]
    pub fn lt_eq(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::LtEq, rhs)
    }

    /// `self >= rhs`
    #[must_use]
    pub fn gt_eq(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::GtEq, rhs)
    }

    /// `self AND rhs` — builds a tree node; does not short-circuit.
    #[must_use]
    pub fn and(self, rhs: Self) -> Self {
        self.binary(BinaryOp::And, rhs)
    }

    /// `self OR rhs` — builds a tree node; does not short-circuit.
    #[must_use]
    pub fn or(self, rhs: Self) -> Self {
        self.binary(BinaryOp::Or, rhs)
    }

    /// `self + rhs`
    #[must_use]
    pub fn add(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Add, rhs)
    }

    /// `self - rhs`
    #[must_use]
    pub fn sub(self, rhs: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Sub, rhs)
    }

    /// `NOT self`
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::UnaryOp {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }

    /// `self IS NULL`
    #[must_use]
    pub fn is_null(self) -> Self {
        Self::UnaryOp {
            op: UnaryOp::IsNull,
            operand: Box::new(self),
        }
    }

    /// `self IS NOT NULL`
    #[must_use]
    pub fn is_not_null(self) -> Self {
        Self::UnaryOp {
            op: UnaryOp::IsNotNull,
            operand: Box::new(self),
        }
    }

    /// `self LIKE rhs`
    #[must_use]
    pub fn like(self, pattern: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Like, pattern)
    }

    /// `self NOT LIKE rhs`
    #[must_use]
    pub fn not_like(self, pattern: impl IntoExpr) -> Self {
        self.binary(BinaryOp::NotLike, pattern)
    }

    /// `self ILIKE rhs` (case-insensitive LIKE; emulated where unsupported)
    #[must_use]
    pub fn ilike(self, pattern: impl IntoExpr) -> Self {
        self.binary(BinaryOp::ILike, pattern)
    }

    /// `self NOT ILIKE rhs`
    #[must_use]
    pub fn not_ilike(self, pattern: impl IntoExpr) -> Self {
        self.binary(BinaryOp::NotILike, pattern)
    }

    /// `self BETWEEN low AND high`
    #[must_use]
    pub fn between(self, low: impl IntoExpr, high: impl IntoExpr) -> Self {
        Self::BetweenOp {
            expr: Box::new(self),
            low: Box::new(low.into_expr()),
            high: Box::new(high.into_expr()),
            negated: false,
        }
    }

    /// `self NOT BETWEEN low AND high`
    #[must_use]
    pub fn not_between(self, low: impl IntoExpr, high: impl IntoExpr) -> Self {
        Self::BetweenOp {
            expr: Box::new(self),
            low: Box::new(low.into_expr()),
            high: Box::new(high.into_expr()),
            negated: true,
        }
    }

    /// `self IN (values)`
    #[must_use]
    pub fn in_list(self, values: Vec<Expr>) -> Self {
        Self::InOp {
            expr: Box::new(self),
            values,
            negated: false,
        }
    }

    /// `self NOT IN (values)`
    #[must_use]
    pub fn not_in_list(self, values: Vec<Expr>) -> Self {
        Self::InOp {
            expr: Box::new(self),
            values,
            negated: true,
        }
    }

    /// `CAST(self AS target_type)`
    #[must_use]
    pub fn cast(self, target_type: DataType) -> Self {
        Self::Cast {
            expr: Box::new(self),
            target_type,
        }
    }

    /// `EXISTS (self)` — only meaningful when `self` is a `Subquery`.
    #[must_use]
    pub fn exists(self) -> Self {
        Self::UnaryOp {
            op: UnaryOp::Exists,
            operand: Box::new(self),
        }
    }

    /// `NOT EXISTS (self)`
    #[must_use]
    pub fn not_exists(self) -> Self {
        Self::UnaryOp {
            op: UnaryOp::NotExists,
            operand: Box::new(self),
        }
    }
}

/// Builds a `CASE WHEN ... THEN ... [ELSE ...] END` expression.
#[must_use]
pub fn case(whens: Vec<(Expr, Expr)>, else_expr: Option<Expr>) -> Expr {
    assert!(!whens.is_empty(), "CASE requires at least one WHEN arm");
    Expr::CaseExpr {
        whens: whens
            .into_iter()
            .map(|(condition, result)| WhenClause {
                condition: Box::new(condition),
                result: Box::new(result),
            })
            .collect(),
        else_expr: else_expr.map(Box::new),
    }
}
