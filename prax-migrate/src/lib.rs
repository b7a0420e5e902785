//! # prax-migrate
//!
//! Declarative-schema reconciliation engine for PostgreSQL: given a set
//! of declared models and enums, computes and applies the minimum DDL
//! sequence to bring a live database in line with the declaration.
//!
//! This crate has no query builder and no ORM-style row mapping — it
//! only reconciles *shape* (tables, columns, constraints, indexes, enum
//! types, junction tables). It also keeps no migration history table and
//! writes no migration files: reconciliation is computed fresh against
//! the live catalog on every run.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐     ┌──────────────┐     ┌────────────────┐
//! │ EnumRegistry /│────▶│ Reconciler   │────▶│ EnumMigrator    │
//! │ ModelRuntime  │     │ (reconciler) │     │ TableDiffer     │
//! └───────────────┘     └──────────────┘     │ IndexMigrator   │
//!                              │              │ JunctionBuilder │
//!                              ▼              └────────────────┘
//!                       single outer transaction (Session)
//! ```
//!
//! Every phase takes a [`session::Session`] rather than a raw connection,
//! so the whole pipeline can be exercised against a fake in tests without
//! a live Postgres.
//!
//! ## Example
//!
//! ```rust,no_run
//! use prax_schema::{ColumnConfig, EnumRegistry, ModelConfig, ModelRuntime};
//! use prax_migrate::reconciler::Reconciler;
//!
//! # async fn run(session: &dyn prax_migrate::session::Session) -> Result<(), Box<dyn std::error::Error>> {
//! let enums = EnumRegistry::new();
//! let mut users = ModelConfig::new("users");
//! let mut id = ColumnConfig::new("id", "uuid");
//! id.primary = true;
//! users.columns.push(id);
//! let models = vec![ModelRuntime::build(&users, &enums)];
//!
//! let reconciler = Reconciler::new();
//! reconciler.migrate(session, &enums, &models, false).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod enum_migrate;
pub mod error;
pub mod index_migrate;
pub mod introspect;
pub mod junction;
pub mod phases;
pub mod reconciler;
pub mod session;
pub mod table_differ;

pub use config::MigrationConfig;
pub use enum_migrate::EnumMigrator;
pub use error::{MigrateResult, MigrationError};
pub use index_migrate::IndexMigrator;
pub use introspect::{ColumnInfo, ConstraintInfo, EnumInfo, IndexInfo};
pub use junction::JunctionBuilder;
pub use reconciler::Reconciler;
pub use session::Session;
pub use table_differ::TableDiffer;
