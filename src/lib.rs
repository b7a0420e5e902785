//! # prax-reconcile
//!
//! Declarative-schema reconciliation engine for PostgreSQL: declare enum
//! types and table models, then call [`Engine::migrate`] to bring a live
//! database's shape in line with the declaration. There is no query
//! builder, no row mapping, and no migration-file history — this crate
//! only computes and applies the DDL difference between what is declared
//! and what the catalog currently holds.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use prax_reconcile::{Engine, EngineResult, MigrateOptions};
//! use prax_schema::{ColumnConfig, ModelConfig};
//!
//! # async fn run() -> EngineResult<()> {
//! let engine = Engine::init("postgresql://localhost/myapp").await?;
//!
//! let mut users = ModelConfig::new("users");
//! let mut id = ColumnConfig::new("id", "uuid");
//! id.primary = true;
//! users.columns.push(id);
//! engine.model(users);
//!
//! engine.migrate(MigrateOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod engine;
pub mod error;

pub use engine::{Engine, EnumDeclaration, MigrateOptions, TransactionOptions};
pub use error::{EngineError, EngineResult};
