//! The eight-phase column/constraint reconciliation pipeline
//! [`crate::table_differ::TableDiffer`] runs against one existing table,
//! always in the fixed order the modules are listed below.

pub mod check;
pub mod default;
pub mod fk;
pub mod name;
pub mod nullity;
pub mod pk;
pub mod ty;
pub mod unique;

use std::collections::{HashMap, HashSet};

use prax_schema::{Canonical, ModelRuntime, TypeCanonicalizer};

use crate::introspect::{ColumnInfo, ConstraintInfo};

/// Shared state threaded through all eight phases for one table. Built
/// once per [`crate::table_differ::TableDiffer`] run from a catalog
/// snapshot; phases that rename or drop a column mutate `live_columns`
/// in place so later phases see the post-rename shape without a second
/// round trip to the database.
pub struct DiffContext<'a> {
    pub model: &'a ModelRuntime,
    pub live_columns: HashMap<String, ColumnInfo>,
    pub constraints: Vec<ConstraintInfo>,
    pub row_count: Option<i64>,
    /// Model column names phase 1 (name) renamed from a DB-only column;
    /// consulted by phase 6 (fk) to decide which FK needs recreating.
    pub renamed: HashSet<String>,
}

impl<'a> DiffContext<'a> {
    pub fn new(
        model: &'a ModelRuntime,
        db_columns: Vec<ColumnInfo>,
        constraints: Vec<ConstraintInfo>,
        row_count: Option<i64>,
    ) -> Self {
        let live_columns = db_columns.into_iter().map(|c| (c.name.clone(), c)).collect();
        Self {
            model,
            live_columns,
            constraints,
            row_count,
            renamed: HashSet::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.model.table
    }

    /// Phase 0's "unknown counts are treated as has-data" rule: only an
    /// observed zero counts as empty.
    pub fn is_empty_table(&self) -> bool {
        self.row_count == Some(0)
    }
}

/// Reconstruct the [`Canonical`] a live catalog column corresponds to,
/// so it can be compared directly against a model column's declared
/// type. `udt_name` is already upper-cased and array-stripped by
/// [`crate::introspect::table_columns`]; `is_array` is applied after.
pub fn db_canonical(column: &ColumnInfo) -> Canonical {
    let mut canonical = TypeCanonicalizer::canon(&column.udt_name);
    canonical.is_array = column.is_array;
    canonical
}

/// Canonical UNIQUE constraint name: `<table>_<col>_unique`, following
/// the same `<table>_<col>_<kind>` shape as the FK/CHECK/index names.
pub fn unique_constraint_name(table: &str, column: &str) -> String {
    format!("{table}_{column}_unique")
}

/// Canonical PRIMARY KEY constraint name: `<table>_pkey`, Postgres's own
/// default so a fresh `CREATE TABLE ... PRIMARY KEY` and this module's
/// `ADD CONSTRAINT` agree on the same name.
pub fn primary_key_constraint_name(table: &str) -> String {
    format!("{table}_pkey")
}
