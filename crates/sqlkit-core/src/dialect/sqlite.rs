//! SQLite dialect (spec.md §4.3).

use super::{Capability, Dialect, DialectVersion, UpsertStyle};
use crate::ast::types::DataType;
use crate::error::CompileError;

/// SQLite, identified by its `sqlite3_libversion()` string.
#[derive(Debug, Clone, Copy)]
pub struct SqliteDialect {
    version: DialectVersion,
}

impl Default for SqliteDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteDialect {
    /// Creates a dialect assuming the current stable SQLite series
    /// (3.4x), which carries every capability this crate targets.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            version: DialectVersion::new(3, 45, 0),
        }
    }

    /// Creates a dialect pinned to a specific SQLite version, so
    /// version-gated capabilities (`RETURNING` requires 3.35+) can be
    /// tested.
    #[must_use]
    pub const fn with_version(version: DialectVersion) -> Self {
        Self { version }
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn identifier_quote(&self) -> char {
        '`'
    }

    fn version(&self) -> DialectVersion {
        self.version
    }

    fn placeholder(&self, _idx: usize) -> String {
        "?".to_string()
    }

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Cte | Capability::RecursiveCte | Capability::Upsert | Capability::Window => true,
            Capability::Returning => self.version >= DialectVersion::new(3, 35, 0),
            Capability::Lateral => false,
            Capability::BulkCopy => false,
            Capability::Savepoint => true,
            Capability::AdvisoryLock => false,
        }
    }

    fn encode_bool(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn map_data_type(&self, data_type: &DataType) -> Result<String, CompileError> {
        Ok(match data_type {
            DataType::Integer => "INTEGER".to_string(),
            DataType::Bigint => "INTEGER".to_string(),
            DataType::Real => "REAL".to_string(),
            DataType::Boolean => "INTEGER".to_string(),
            DataType::Text => "TEXT".to_string(),
            DataType::Varchar(_) => "TEXT".to_string(),
            DataType::Blob => "BLOB".to_string(),
            DataType::Date | DataType::Datetime | DataType::Timestamp => "TEXT".to_string(),
            DataType::Uuid => "TEXT".to_string(),
            DataType::Json => "TEXT".to_string(),
            DataType::Custom(name) => name.clone(),
        })
    }

    fn rejects_join(&self, _kind: crate::ast::query::JoinKind) -> bool {
        false
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::OnConflict
    }

    fn supports_cascade_drop(&self) -> bool {
        false
    }

    fn supports_drop_column(&self) -> bool {
        // 3.35+ via the simplified ALTER TABLE grammar.
        self.version >= DialectVersion::new(3, 35, 0)
    }

    fn supports_rename_column(&self) -> bool {
        self.version >= DialectVersion::new(3, 25, 0)
    }

    fn supports_alter_column_ops(&self) -> bool {
        // SET TYPE / SET|DROP DEFAULT / SET|DROP NOT NULL all require a
        // table rebuild SQLite has no single-statement spelling for.
        false
    }

    fn supports_alter_table_constraints(&self) -> bool {
        // ADD CONSTRAINT/ADD FOREIGN KEY/DROP CONSTRAINT require a table
        // rebuild, same restriction as supports_alter_column_ops.
        false
    }
}
