//! The closed error sum type (spec.md §7).
//!
//! Every fallible operation in this crate returns one of these seven kinds,
//! wrapped in the top-level [`Error`]. Nothing is swallowed and nothing is
//! silently retried at this layer — the two narrow exceptions named in
//! spec.md §7 (pool reconnection after a health-check failure, and the
//! MySQL bulk-load warning-and-fallback) live in `pool` and stay out of
//! this error path entirely.

use crate::dialect::Capability;

/// Failures raised while compiling an AST to SQL text.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The target dialect/version does not support a capability the AST
    /// requires.
    #[error("dialect {dialect} does not support {capability:?}")]
    Unsupported {
        /// The missing capability.
        capability: Capability,
        /// The dialect that was asked to compile.
        dialect: &'static str,
    },
    /// A `PlaceholderField` could not be resolved to a single primary
    /// table.
    #[error("cannot resolve placeholder `{column}` in {statement}: {reason}")]
    UnresolvedPlaceholder {
        /// A short description of the enclosing statement.
        statement: String,
        /// The unresolved column name.
        column: String,
        /// Why resolution failed (no primary table / ambiguous).
        reason: String,
    },
    /// A structure that must not be empty was empty (e.g. `AlterTable`
    /// with zero operations).
    #[error("{what} must not be empty")]
    EmptyStructure {
        /// What was empty.
        what: String,
    },
    /// A `Cast`/column `DataType` could not be mapped for the target
    /// dialect.
    #[error("unknown column type: {type_name}")]
    UnknownColumnType {
        /// The offending type name.
        type_name: String,
    },
    /// An operation the target dialect fundamentally cannot express (e.g.
    /// SQLite `ALTER COLUMN ... SET TYPE`).
    #[error("{dialect} does not support {operation}")]
    UnsupportedOperation {
        /// The dialect.
        dialect: &'static str,
        /// A description of the rejected operation.
        operation: String,
    },
}

/// Failures raised while binding named parameters to positional values.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// A parameter name produced by `compile` has no matching entry in
    /// the caller's named-parameter record.
    #[error("missing named parameter `{name}`")]
    MissingParameter {
        /// The missing parameter's name.
        name: String,
    },
    /// A bound value's Rust type does not match the parameter's declared
    /// `ParamType`.
    #[error("parameter `{name}` expected {expected:?}, got a value of a different type")]
    TypeMismatch {
        /// The parameter's name.
        name: String,
        /// The type the parameter was declared with.
        expected: crate::ast::ParamType,
    },
}

/// A driver-reported failure, wrapped with its original cause.
#[derive(Debug, thiserror::Error)]
#[error("execution failed: {message}")]
pub struct ExecutionError {
    /// A human-readable summary.
    pub message: String,
    /// The underlying driver error, if the driver provided one.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ExecutionError {
    /// Wraps a driver error.
    pub fn new(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Builds an `ExecutionError` with no underlying cause.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }
}

/// A row-count mismatch against `fetch_one`/`fetch_maybe`'s contract.
#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum CardinalityError {
    /// `fetch_one` received a row count other than exactly one.
    #[error("fetch_one expected exactly one row, got {actual}")]
    ExpectedOne {
        /// The actual row count.
        actual: usize,
    },
    /// `fetch_maybe` received two or more rows.
    #[error("fetch_maybe expected at most one row, got {actual}")]
    ExpectedAtMostOne {
        /// The actual row count.
        actual: usize,
    },
}

/// Failures raised while decoding driver rows through the codec registry.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// No codec is registered for a value-type tag.
    #[error("no codec registered for type `{type_tag}`")]
    NoCodec {
        /// The unregistered type tag.
        type_tag: String,
    },
    /// A registered codec failed to decode a specific wire value.
    #[error("failed to decode value as `{type_tag}`: {reason}")]
    DecodeFailed {
        /// The type tag the value was decoded as.
        type_tag: String,
        /// The decoder's failure reason.
        reason: String,
    },
    /// A named struct field has no matching column in the raw row.
    #[error("missing column for field `{field}`")]
    MissingColumn {
        /// The struct field name.
        field: String,
    },
    /// A struct field's Rust type does not allow a null value, but the
    /// row contained one.
    #[error("field `{field}` does not allow null")]
    NullNotAllowed {
        /// The struct field name.
        field: String,
    },
    /// The struct's constructor rejected the decoded tuple of values.
    #[error("constructor rejected decoded row: {reason}")]
    ConstructorRejected {
        /// The constructor's failure reason.
        reason: String,
    },
}

/// Failures raised while beginning, committing, or rolling back a
/// transaction or savepoint.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// `BEGIN`/`SAVEPOINT` failed.
    #[error("failed to begin transaction scope: {0}")]
    Begin(String),
    /// `COMMIT`/`RELEASE SAVEPOINT` failed.
    #[error("failed to commit transaction scope: {0}")]
    Commit(String),
    /// `ROLLBACK`/`ROLLBACK TO SAVEPOINT` failed.
    #[error("failed to roll back transaction scope: {0}")]
    Rollback(String),
}

/// Failures raised by the connection pool.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The pool has been shut down and accepts no further acquisitions.
    #[error("pool is closed")]
    Closed,
    /// Acquisition did not complete before its timeout elapsed.
    #[error("acquisition timed out with {in_use}/{max_size} connections in use")]
    AcquisitionTimeout {
        /// Connections currently checked out.
        in_use: usize,
        /// The pool's configured maximum size.
        max_size: usize,
    },
    /// A health check (`SELECT 1`) failed and the replacement connection
    /// could not be established either.
    #[error("health check failed fatally: {0}")]
    HealthCheckFatal(String),
}

/// The top-level error type returned by every public fallible operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// See [`CompileError`].
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// See [`BindError`].
    #[error(transparent)]
    Bind(#[from] BindError),
    /// See [`ExecutionError`].
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    /// See [`CardinalityError`].
    #[error(transparent)]
    Cardinality(#[from] CardinalityError),
    /// See [`DecodeError`].
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// See [`TransactionError`].
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    /// See [`PoolError`].
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// A specialised `Result` using the crate's top-level error type.
pub type Result<T> = std::result::Result<T, Error>;
