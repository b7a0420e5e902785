//! # prax-schema
//!
//! Canonical type system, model normalization, and constraint validation
//! for declaring PostgreSQL table schemas in Rust.
//!
//! This crate has no knowledge of a live database connection or of SQL
//! execution — it turns declared models into validated, normalized data
//! and the DDL fragments a migration engine needs to reconcile them
//! against a real table. See `prax-migrate` for the engine that drives
//! a [`model::ModelRuntime`] against an actual session.
//!
//! ## Example
//!
//! ```
//! use prax_schema::{ColumnConfig, EnumRegistry, ModelConfig, ModelRuntime};
//!
//! let mut enums = EnumRegistry::new();
//! enums.register("user_role", &["ADMIN".to_string(), "STUDENT".to_string()]).unwrap();
//!
//! let mut users = ModelConfig::new("users");
//! let mut id = ColumnConfig::new("id", "uuid");
//! id.primary = true;
//! users.columns.push(id);
//!
//! let runtime = ModelRuntime::build(&users, &enums);
//! assert!(runtime.is_valid());
//! ```

pub mod canon;
pub mod check;
pub mod column;
pub mod default_value;
pub mod enum_registry;
pub mod error;
pub mod model;
pub mod relation;

pub use canon::{Canonical, CanonicalType, ResolvedType, TypeCanonicalizer};
pub use column::{ColumnConfig, ColumnSqlBuilder, NormalizedColumn};
pub use default_value::{DeclaredDefault, DefaultValidator, ValidatedDefault};
pub use enum_registry::EnumRegistry;
pub use error::{SchemaError, SchemaResult};
pub use model::{ModelConfig, ModelRuntime};
pub use relation::{FkAction, ModelRelations, Reference, RelationDescriptor, RelationGraph, RelationKind};
