//! MySQL dialect (spec.md §4.3).

use super::{Capability, Dialect, DialectVersion, UpsertStyle};
use crate::ast::query::{JoinKind, SetOpKind};
use crate::ast::types::DataType;
use crate::error::CompileError;

/// MySQL, identified by its `version()` string. MySQL 5.7 lacks CTEs and
/// window functions (both arrived in 8.0); `FULL JOIN`, `INTERSECT`, and
/// `EXCEPT` are unsupported at any version (spec.md §4.3 scenario 6).
#[derive(Debug, Clone, Copy)]
pub struct MySqlDialect {
    version: DialectVersion,
}

impl Default for MySqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl MySqlDialect {
    /// Creates a dialect assuming a current stable MySQL 8.x release.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            version: DialectVersion::new(8, 0, 0),
        }
    }

    /// Creates a dialect pinned to a specific MySQL version.
    #[must_use]
    pub const fn with_version(version: DialectVersion) -> Self {
        Self { version }
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
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
        let v8 = DialectVersion::new(8, 0, 0);
        match capability {
            Capability::Cte | Capability::RecursiveCte | Capability::Window => self.version >= v8,
            Capability::Upsert => true,
            Capability::Returning => false,
            Capability::Lateral => self.version >= v8,
            Capability::BulkCopy => true,
            Capability::Savepoint => true,
            Capability::AdvisoryLock => true,
        }
    }

    fn encode_bool(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn map_data_type(&self, data_type: &DataType) -> Result<String, CompileError> {
        Ok(match data_type {
            DataType::Integer => "INT".to_string(),
            DataType::Bigint => "BIGINT".to_string(),
            DataType::Real => "DOUBLE".to_string(),
            DataType::Boolean => "TINYINT(1)".to_string(),
            DataType::Text => "TEXT".to_string(),
            DataType::Varchar(Some(n)) => format!("VARCHAR({n})"),
            DataType::Varchar(None) => "VARCHAR(255)".to_string(),
            DataType::Blob => "BLOB".to_string(),
            DataType::Date => "DATE".to_string(),
            DataType::Datetime | DataType::Timestamp => "DATETIME".to_string(),
            DataType::Uuid => "CHAR(36)".to_string(),
            DataType::Json => "JSON".to_string(),
            DataType::Custom(name) => name.clone(),
        })
    }

    fn rejects_join(&self, kind: JoinKind) -> bool {
        matches!(kind, JoinKind::Full)
    }

    fn rejects_set_op(&self, kind: SetOpKind) -> bool {
        matches!(kind, SetOpKind::Intersect | SetOpKind::Except)
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::MySql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_57_lacks_cte_and_window() {
        let d = MySqlDialect::with_version(DialectVersion::new(5, 7, 0));
        assert!(!d.supports(Capability::Cte));
        assert!(!d.supports(Capability::Window));
    }

    #[test]
    fn test_mysql_8_has_cte_and_window() {
        let d = MySqlDialect::new();
        assert!(d.supports(Capability::Cte));
        assert!(d.supports(Capability::Window));
    }

    #[test]
    fn test_mysql_rejects_full_join_and_set_ops() {
        let d = MySqlDialect::new();
        assert!(d.rejects_join(JoinKind::Full));
        assert!(!d.rejects_join(JoinKind::Left));
        assert!(d.rejects_set_op(SetOpKind::Intersect));
        assert!(d.rejects_set_op(SetOpKind::Except));
        assert!(!d.rejects_set_op(SetOpKind::Union));
    }

    #[test]
    fn test_mysql_never_supports_returning() {
        assert!(!MySqlDialect::new().supports(Capability::Returning));
    }
}
