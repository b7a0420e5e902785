//! The facade crate's error type: every failure an [`crate::engine::Engine`]
//! method can produce, wrapping each dependency crate's own taxonomy.

use thiserror::Error;

use prax_migrate::MigrationError;
use prax_postgres::PgError;
use prax_schema::SchemaError;

/// Result type for [`crate::engine::Engine`] operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Everything that can fail constructing or driving an [`crate::engine::Engine`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// A declared model or enum failed schema-level validation.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Reconciliation aborted, before or during DDL.
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// The underlying driver or pool failed.
    #[error(transparent)]
    Database(#[from] PgError),
}
