//! Error types produced while reconciling a declared schema against a
//! live database.

use thiserror::Error;

use prax_postgres::PgError;
use prax_schema::SchemaError;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Everything that can abort a reconciliation run. Every variant is
/// recoverable at the reconciliation boundary: the outer transaction
/// rolls back and no partial write is ever visible.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A declared model failed schema-level validation before any DDL
    /// was considered.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// An enum type is referenced by one or more columns and a value
    /// removal was attempted without `reset`.
    #[error("enum '{name}' is in use and cannot lose value '{value}' without reset")]
    EnumInUse {
        /// Enum name.
        name: String,
        /// The value that would be removed.
        value: String,
    },

    /// An index was declared against a column that does not exist.
    #[error("table '{table}' has no column '{column}' to index")]
    IndexColumnMissing {
        /// Table name.
        table: String,
        /// Missing column name.
        column: String,
    },

    /// A type change was requested against a non-empty table.
    #[error("table '{table}' column '{column}' cannot change type: table is not empty")]
    TypeChangeBlocked {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// `NOT NULL` was requested on a non-empty column with no default.
    #[error("table '{table}' column '{column}' cannot become NOT NULL: existing rows have no default to fill with")]
    AddNotNullBlocked {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// `UNIQUE` was requested on a non-empty column without a
    /// guaranteed-unique generator.
    #[error("table '{table}' column '{column}' cannot become UNIQUE on non-empty data without a unique-generating default")]
    AddUniqueBlocked {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A column would be dropped from a non-empty table.
    #[error("table '{table}' column '{column}' cannot be dropped: table is not empty")]
    DropColumnBlocked {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Reserved for a future guard on dropping a table during `reset`.
    /// The current reconciler drops every public table unconditionally
    /// (`CASCADE`) during reset, so this variant is never constructed;
    /// it stays part of the taxonomy so callers can match on it.
    #[error("table '{table}' cannot be dropped")]
    DropTableBlocked {
        /// Table name.
        table: String,
    },

    /// Changing which column is primary key on a non-empty table.
    #[error("table '{table}' cannot move its primary key on non-empty data")]
    PrimaryKeyMoveBlocked {
        /// Table name.
        table: String,
    },

    /// Any failure surfaced by the underlying database driver.
    #[error(transparent)]
    DatabaseError(#[from] PgError),
}

impl MigrationError {
    /// Construct an [`MigrationError::EnumInUse`].
    pub fn enum_in_use(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::EnumInUse {
            name: name.into(),
            value: value.into(),
        }
    }

    /// True for errors that were caught before any DDL touched the
    /// database — i.e. everything except [`MigrationError::DatabaseError`],
    /// which may have failed mid-transaction (though the transaction
    /// still rolls back in full).
    pub fn is_pre_ddl(&self) -> bool {
        !matches!(self, Self::DatabaseError(_))
    }
}
