//! SQL data types and column/table constraints.

use core::fmt;

use super::expr::Expr;

/// SQL data types, tagged independently of any dialect's native spelling.
///
/// A dialect's type map (`dialect::Dialect::map_data_type`) turns these
/// tags into dialect-specific SQL text (e.g. `:boolean` becomes
/// `TINYINT(1)` under MySQL and `INTEGER` under SQLite).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// Signed integer (maps to `INTEGER`/`INT4` family).
    Integer,
    /// Signed 64-bit integer (maps to `BIGINT`/`INT8` family).
    Bigint,
    /// Floating point (maps to `REAL`/`FLOAT4` family).
    Real,
    /// Boolean.
    Boolean,
    /// Variable-length text, unbounded.
    Text,
    /// Variable-length text with a length bound.
    Varchar(Option<u32>),
    /// Binary large object.
    Blob,
    /// Calendar date.
    Date,
    /// Combined date and time.
    Datetime,
    /// Timestamp (may carry timezone semantics depending on dialect).
    Timestamp,
    /// UUID.
    Uuid,
    /// JSON-shaped value.
    Json,
    /// Dialect-specific escape hatch, emitted verbatim.
    Custom(String),
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Bigint => write!(f, "bigint"),
            Self::Real => write!(f, "real"),
            Self::Boolean => write!(f, "boolean"),
            Self::Text => write!(f, "text"),
            Self::Varchar(Some(n)) => write!(f, "varchar({n})"),
            Self::Varchar(None) => write!(f, "varchar"),
            Self::Blob => write!(f, "blob"),
            Self::Date => write!(f, "date"),
            Self::Datetime => write!(f, "datetime"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Uuid => write!(f, "uuid"),
            Self::Json => write!(f, "json"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// Action to take on a foreign key's referencing rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    /// `NO ACTION` (the default in most dialects).
    NoAction,
    /// `RESTRICT`.
    Restrict,
    /// `CASCADE`.
    Cascade,
    /// `SET NULL`.
    SetNull,
    /// `SET DEFAULT`.
    SetDefault,
}

impl ReferentialAction {
    /// Returns the SQL keyword(s) for this action.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// A column-level constraint attached to a `CREATE TABLE` column definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnConstraint {
    /// `PRIMARY KEY`.
    PrimaryKey,
    /// `NOT NULL`.
    NotNull,
    /// `UNIQUE`.
    Unique,
    /// `DEFAULT <expr>`.
    Default(Expr),
    /// `CHECK (<expr>)`.
    Check(Expr),
    /// `REFERENCES <table>(<column>) [ON DELETE ...] [ON UPDATE ...]`.
    ForeignKey {
        /// Referenced table.
        table: String,
        /// Referenced column.
        column: String,
        /// `ON DELETE` action.
        on_delete: Option<ReferentialAction>,
        /// `ON UPDATE` action.
        on_update: Option<ReferentialAction>,
    },
    /// Auto-incrementing primary key (dialect-specific keyword or type
    /// rewrite, e.g. PostgreSQL `SERIAL`).
    AutoIncrement,
    /// `GENERATED ALWAYS AS (<expr>) [STORED | VIRTUAL]`.
    Generated {
        /// The generating expression.
        expr: Expr,
        /// Whether the column is materialized (`STORED`) or computed on
        /// read (`VIRTUAL`).
        stored: bool,
    },
    /// `COLLATE <name>`.
    Collation(String),
    /// `GENERATED ... AS IDENTITY` (PostgreSQL).
    Identity,
    /// A human-readable comment attached to the column (emitted as a
    /// dialect-specific `COMMENT`/`COMMENT ON COLUMN` statement where
    /// supported).
    Comment(String),
}

/// A table-level constraint in a `CREATE TABLE` statement.
#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraint {
    /// `PRIMARY KEY (col, ...)`.
    PrimaryKey(Vec<String>),
    /// `UNIQUE (col, ...)`.
    Unique(Vec<String>),
    /// `CHECK (<expr>)`.
    Check(Expr),
    /// `FOREIGN KEY (cols) REFERENCES table(cols) ...`.
    ForeignKey {
        /// Local columns.
        columns: Vec<String>,
        /// Referenced table.
        ref_table: String,
        /// Referenced columns.
        ref_columns: Vec<String>,
        /// `ON DELETE` action.
        on_delete: Option<ReferentialAction>,
        /// `ON UPDATE` action.
        on_update: Option<ReferentialAction>,
    },
}

/// A column definition inside a `CREATE TABLE` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Data type tag.
    pub data_type: DataType,
    /// Column-level constraints, in declaration order.
    pub constraints: Vec<ColumnConstraint>,
}

impl ColumnDef {
    /// Creates a new column definition with no constraints.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            constraints: Vec::new(),
        }
    }

    /// Appends a constraint to this column.
    #[must_use]
    pub fn with(mut self, constraint: ColumnConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Returns whether the column carries an explicit `NOT NULL` or
    /// `PRIMARY KEY` constraint.
    #[must_use]
    pub fn is_not_null(&self) -> bool {
        self.constraints.iter().any(|c| {
            matches!(
                c,
                ColumnConstraint::NotNull | ColumnConstraint::PrimaryKey
            )
        })
    }

    /// Returns whether the column carries `AutoIncrement`.
    #[must_use]
    pub fn is_autoincrement(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c, ColumnConstraint::AutoIncrement))
    }

    /// Returns whether the column is a (single-column) primary key.
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c, ColumnConstraint::PrimaryKey))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_display() {
        assert_eq!(DataType::Integer.to_string(), "integer");
        assert_eq!(DataType::Varchar(Some(255)).to_string(), "varchar(255)");
    }

    #[test]
    fn test_column_def_builder() {
        let col = ColumnDef::new("id", DataType::Bigint)
            .with(ColumnConstraint::PrimaryKey)
            .with(ColumnConstraint::AutoIncrement);

        assert_eq!(col.name, "id");
        assert!(col.is_primary_key());
        assert!(col.is_autoincrement());
        assert!(col.is_not_null());
    }

    #[test]
    fn test_column_def_not_null_without_primary_key() {
        let col = ColumnDef::new("email", DataType::Text).with(ColumnConstraint::NotNull);
        assert!(col.is_not_null());
        assert!(!col.is_primary_key());
    }
}
