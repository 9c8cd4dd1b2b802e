//! PostgreSQL dialect (spec.md §4.3).

use super::{Capability, Dialect, DialectVersion, UpsertStyle};
use crate::ast::types::DataType;
use crate::error::CompileError;

/// PostgreSQL, identified by its `server_version` integer.
#[derive(Debug, Clone, Copy)]
pub struct PostgresDialect {
    version: DialectVersion,
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl PostgresDialect {
    /// Creates a dialect assuming a current stable PostgreSQL release.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            version: DialectVersion::new(16, 0, 0),
        }
    }

    /// Creates a dialect pinned to a specific PostgreSQL version.
    #[must_use]
    pub const fn with_version(version: DialectVersion) -> Self {
        Self { version }
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn identifier_quote(&self) -> char {
        '"'
    }

    fn version(&self) -> DialectVersion {
        self.version
    }

    fn placeholder(&self, idx: usize) -> String {
        format!("${idx}")
    }

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Cte
            | Capability::RecursiveCte
            | Capability::Upsert
            | Capability::Window
            | Capability::Returning
            | Capability::Lateral
            | Capability::Savepoint
            | Capability::AdvisoryLock => true,
            Capability::BulkCopy => true,
        }
    }

    fn supports_ilike_native(&self) -> bool {
        true
    }

    fn encode_bool(&self, value: bool) -> &'static str {
        if value { "TRUE" } else { "FALSE" }
    }

    fn map_data_type(&self, data_type: &DataType) -> Result<String, CompileError> {
        Ok(match data_type {
            DataType::Integer => "INTEGER".to_string(),
            DataType::Bigint => "BIGINT".to_string(),
            DataType::Real => "DOUBLE PRECISION".to_string(),
            DataType::Boolean => "BOOLEAN".to_string(),
            DataType::Text => "TEXT".to_string(),
            DataType::Varchar(Some(n)) => format!("VARCHAR({n})"),
            DataType::Varchar(None) => "VARCHAR".to_string(),
            DataType::Blob => "BYTEA".to_string(),
            DataType::Date => "DATE".to_string(),
            DataType::Datetime | DataType::Timestamp => "TIMESTAMP".to_string(),
            DataType::Uuid => "UUID".to_string(),
            DataType::Json => "JSONB".to_string(),
            DataType::Custom(name) => name.clone(),
        })
    }

    fn autoincrement_rewrite(&self, data_type: &DataType) -> Option<String> {
        match data_type {
            DataType::Integer => Some("SERIAL".to_string()),
            DataType::Bigint => Some("BIGSERIAL".to_string()),
            _ => None,
        }
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::OnConflict
    }

    fn supports_index_method(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_supports_index_method() {
        assert!(PostgresDialect::new().supports_index_method());
    }

    #[test]
    fn test_postgres_uses_dollar_placeholders() {
        let d = PostgresDialect::new();
        assert_eq!(d.placeholder(1), "$1");
        assert_eq!(d.placeholder(2), "$2");
    }

    #[test]
    fn test_postgres_serial_rewrite() {
        let d = PostgresDialect::new();
        assert_eq!(d.autoincrement_rewrite(&DataType::Bigint), Some("BIGSERIAL".to_string()));
    }

    #[test]
    fn test_postgres_supports_lateral() {
        assert!(PostgresDialect::new().supports(Capability::Lateral));
    }
}
