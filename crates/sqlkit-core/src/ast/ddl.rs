//! DDL AST (spec.md §3.3): `CREATE TABLE`, `ALTER TABLE`, `DROP TABLE`,
//! `CREATE INDEX`, `DROP INDEX`.
//!
//! Schema diffing and migration inference are out of scope (spec.md §1);
//! these statements are built directly by callers, not derived from two
//! schema snapshots.

use super::expr::Expr;
use super::query::ForeignKeyRef;
use super::types::{ColumnDef, TableConstraint};

/// A single `ALTER TABLE` operation.
#[derive(Debug, Clone, PartialEq)]
pub enum AlterOperation {
    /// `ADD COLUMN <def>`.
    AddColumn(ColumnDef),
    /// `DROP COLUMN <name>`.
    DropColumn(String),
    /// `RENAME COLUMN <from> TO <to>`.
    RenameColumn {
        /// Existing column name.
        from: String,
        /// New column name.
        to: String,
    },
    /// `ADD CONSTRAINT <constraint>`.
    AddTableConstraint(TableConstraint),
    /// `DROP CONSTRAINT <name>`.
    DropConstraint(String),
    /// `ADD FOREIGN KEY ...`.
    AddForeignKey(ForeignKeyRef),
    /// `ALTER COLUMN <name> SET DEFAULT <expr>`.
    SetDefault {
        /// Column name.
        column: String,
        /// New default expression.
        default: Expr,
    },
    /// `ALTER COLUMN <name> DROP DEFAULT`.
    DropDefault {
        /// Column name.
        column: String,
    },
    /// `ALTER COLUMN <name> SET NOT NULL`.
    SetNotNull {
        /// Column name.
        column: String,
    },
    /// `ALTER COLUMN <name> DROP NOT NULL`.
    DropNotNull {
        /// Column name.
        column: String,
    },
    /// `ALTER COLUMN <name> TYPE <type>` (PostgreSQL) / column rebuild
    /// (SQLite, via the dialect's unsupported-operation error if it can't
    /// be expressed).
    SetType {
        /// Column name.
        column: String,
        /// New data type.
        data_type: super::types::DataType,
    },
    /// `ALTER COLUMN <name> SET STATISTICS <n>` (PostgreSQL planner
    /// statistics target).
    SetStatistics {
        /// Column name.
        column: String,
        /// New statistics target.
        target: i32,
    },
    /// `ALTER COLUMN <name> SET STORAGE <mode>` (PostgreSQL
    /// `PLAIN`/`EXTERNAL`/`EXTENDED`/`MAIN`).
    SetStorage {
        /// Column name.
        column: String,
        /// Storage mode keyword, emitted verbatim.
        mode: String,
    },
    /// `RENAME TO <name>`.
    RenameTable(String),
}

/// A `CREATE INDEX` statement's body.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndex {
    /// Index name.
    pub name: String,
    /// Indexed table.
    pub table: String,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Expression keys, appended after `columns` (functional indexes).
    pub expressions: Vec<Expr>,
    /// Whether `UNIQUE` was specified.
    pub unique: bool,
    /// `WHERE <predicate>` for a partial index, if any.
    pub predicate: Option<Expr>,
    /// `IF NOT EXISTS`.
    pub if_not_exists: bool,
    /// `USING <method>`, PostgreSQL-only (spec.md §4.3 "DDL edge cases").
    pub method: Option<String>,
}

impl CreateIndex {
    /// Builds an index body over plain columns, with every optional field
    /// at its default.
    #[must_use]
    pub fn new(name: impl Into<String>, table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns,
            expressions: Vec::new(),
            unique: false,
            predicate: None,
            if_not_exists: false,
            method: None,
        }
    }

    /// Sets `UNIQUE`.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets `IF NOT EXISTS`.
    #[must_use]
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Sets a `WHERE` predicate, making this a partial index.
    #[must_use]
    pub fn where_(mut self, predicate: Expr) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Appends expression keys (functional index terms) after `columns`.
    #[must_use]
    pub fn with_expressions(mut self, expressions: Vec<Expr>) -> Self {
        self.expressions = expressions;
        self
    }

    /// Sets `USING <method>`.
    #[must_use]
    pub fn using(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }
}

/// A top-level DDL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum DDLStatement {
    /// `CREATE TABLE [IF NOT EXISTS] <name> (<columns>, <constraints>)`.
    CreateTable {
        /// Table name.
        name: String,
        /// Column definitions, in declaration order.
        columns: Vec<ColumnDef>,
        /// Table-level constraints.
        constraints: Vec<TableConstraint>,
        /// `IF NOT EXISTS`.
        if_not_exists: bool,
        /// `CREATE TEMPORARY TABLE` / `CREATE TEMP TABLE`.
        temporary: bool,
    },
    /// `ALTER TABLE <name> <operations>`.
    AlterTable {
        /// Table name.
        name: String,
        /// Operations, applied in order. Most dialects require one
        /// operation per statement; multi-op support is dialect-gated
        /// (`Capability::MULTI_ALTER`).
        operations: Vec<AlterOperation>,
    },
    /// `DROP TABLE [IF EXISTS] <name> [CASCADE]`.
    DropTable {
        /// Table name.
        name: String,
        /// `IF EXISTS`.
        if_exists: bool,
        /// `CASCADE`.
        cascade: bool,
    },
    /// `CREATE INDEX ...`.
    CreateIndex(CreateIndex),
    /// `DROP INDEX [IF EXISTS] <name>`.
    DropIndex {
        /// Index name.
        name: String,
        /// `IF EXISTS`.
        if_exists: bool,
        /// Owning table, required by MySQL's `DROP INDEX ... ON <table>`
        /// spelling; ignored by dialects that don't need it.
        table: Option<String>,
    },
}

impl DDLStatement {
    /// Builds a `CREATE TABLE` statement with no constraints set yet.
    #[must_use]
    pub fn create_table(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self::CreateTable {
            name: name.into(),
            columns,
            constraints: Vec::new(),
            if_not_exists: false,
            temporary: false,
        }
    }

    /// Sets `IF NOT EXISTS` on a `CreateTable` statement.
    #[must_use]
    pub fn if_not_exists(mut self) -> Self {
        if let Self::CreateTable { if_not_exists, .. } = &mut self {
            *if_not_exists = true;
        }
        self
    }

    /// Sets `CREATE TEMPORARY TABLE` on a `CreateTable` statement.
    #[must_use]
    pub fn temporary(mut self) -> Self {
        if let Self::CreateTable { temporary, .. } = &mut self {
            *temporary = true;
        }
        self
    }

    /// Appends a table-level constraint to a `CreateTable` statement.
    #[must_use]
    pub fn with_constraint(mut self, constraint: TableConstraint) -> Self {
        if let Self::CreateTable { constraints, .. } = &mut self {
            constraints.push(constraint);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::DataType;

    #[test]
    fn test_create_table_builder() {
        let stmt = DDLStatement::create_table(
            "users",
            vec![ColumnDef::new("id", DataType::Bigint)],
        )
        .if_not_exists()
        .with_constraint(TableConstraint::PrimaryKey(vec!["id".into()]));

        match stmt {
            DDLStatement::CreateTable {
                if_not_exists,
                constraints,
                ..
            } => {
                assert!(if_not_exists);
                assert_eq!(constraints.len(), 1);
            }
            _ => panic!("expected CreateTable"),
        }
    }

    #[test]
    fn test_temporary_table_builder() {
        let stmt = DDLStatement::create_table("scratch", vec![ColumnDef::new("id", DataType::Bigint)]).temporary();
        match stmt {
            DDLStatement::CreateTable { temporary, .. } => assert!(temporary),
            _ => panic!("expected CreateTable"),
        }
    }

    #[test]
    fn test_create_index_builder() {
        let idx = CreateIndex::new("idx_users_email", "users", vec!["email".into()])
            .unique()
            .using("btree");
        assert!(idx.unique);
        assert_eq!(idx.method.as_deref(), Some("btree"));
        assert!(idx.expressions.is_empty());
    }

    #[test]
    fn test_set_statistics_and_storage_variants() {
        let stmt = DDLStatement::AlterTable {
            name: "users".into(),
            operations: vec![
                AlterOperation::SetStatistics {
                    column: "email".into(),
                    target: 500,
                },
                AlterOperation::SetStorage {
                    column: "bio".into(),
                    mode: "EXTERNAL".into(),
                },
            ],
        };
        if let DDLStatement::AlterTable { operations, .. } = stmt {
            assert!(matches!(operations[0], AlterOperation::SetStatistics { target: 500, .. }));
            assert!(matches!(&operations[1], AlterOperation::SetStorage { mode, .. } if mode == "EXTERNAL"));
        } else {
            panic!("expected AlterTable");
        }
    }

    #[test]
    fn test_alter_operations_are_ordered() {
        let stmt = DDLStatement::AlterTable {
            name: "users".into(),
            operations: vec![
                AlterOperation::AddColumn(ColumnDef::new("nickname", DataType::Text)),
                AlterOperation::DropColumn("legacy_flag".into()),
            ],
        };
        if let DDLStatement::AlterTable { operations, .. } = stmt {
            assert_eq!(operations.len(), 2);
            assert!(matches!(operations[0], AlterOperation::AddColumn(_)));
        } else {
            panic!("expected AlterTable");
        }
    }
}
