//! Phase 1 — alter name: detect column renames by type match, add
//! model-only columns, drop DB-only columns from empty tables.

use std::collections::HashSet;

use tracing::info;

use prax_schema::ColumnSqlBuilder;

use crate::error::{MigrateResult, MigrationError};
use crate::session::Session;

use super::{db_canonical, DiffContext};

pub async fn run(session: &dyn Session, ctx: &mut DiffContext<'_>) -> MigrateResult<()> {
    let table = ctx.table().to_string();

    let model_names: HashSet<String> = ctx
        .model
        .columns
        .iter()
        .filter(|c| !c.is_virtual)
        .map(|c| c.name.clone())
        .collect();

    let db_only: Vec<String> = ctx
        .live_columns
        .keys()
        .filter(|n| !model_names.contains(*n))
        .cloned()
        .collect();
    let model_only: Vec<String> = model_names
        .iter()
        .filter(|n| !ctx.live_columns.contains_key(*n))
        .cloned()
        .collect();

    let mut claimed_new: HashSet<String> = HashSet::new();
    let mut rename_pairs: Vec<(String, String)> = Vec::new();

    for old_name in &db_only {
        let old_canonical = db_canonical(&ctx.live_columns[old_name]);
        let candidates: Vec<&String> = model_only
            .iter()
            .filter(|new_name| !claimed_new.contains(*new_name))
            .filter(|new_name| {
                let model_col = ctx.model.columns.iter().find(|c| &c.name == *new_name).unwrap();
                model_col.canonical == old_canonical
            })
            .collect();
        if candidates.len() == 1 {
            let new_name = candidates[0].clone();
            claimed_new.insert(new_name.clone());
            rename_pairs.push((old_name.clone(), new_name));
        }
    }

    for (old_name, new_name) in &rename_pairs {
        info!(section = "table", subject = %table, action = "rename_column", kind = "ddl", from = %old_name, to = %new_name);
        session
            .execute(&format!(
                "ALTER TABLE \"{table}\" RENAME COLUMN \"{old_name}\" TO \"{new_name}\""
            ))
            .await?;
        let mut column = ctx.live_columns.remove(old_name).unwrap();
        column.name = new_name.clone();
        ctx.live_columns.insert(new_name.clone(), column);
        ctx.renamed.insert(new_name.clone());
    }

    for new_name in &model_only {
        if claimed_new.contains(new_name) {
            continue;
        }
        let model_col = ctx.model.columns.iter().find(|c| &c.name == new_name).unwrap();
        if !ctx.is_empty_table() && model_col.not_null && model_col.default.is_none() {
            return Err(MigrationError::AddNotNullBlocked {
                table: table.clone(),
                column: new_name.clone(),
            });
        }
        let fragment = ColumnSqlBuilder::build(model_col, &table);
        info!(section = "table", subject = %table, action = "add_column", kind = "ddl", column = %new_name);
        session
            .execute(&format!("ALTER TABLE \"{table}\" ADD COLUMN {fragment}"))
            .await?;
    }

    for old_name in &db_only {
        if rename_pairs.iter().any(|(old, _)| old == old_name) {
            continue;
        }
        if !ctx.is_empty_table() {
            return Err(MigrationError::DropColumnBlocked {
                table: table.clone(),
                column: old_name.clone(),
            });
        }
        info!(section = "table", subject = %table, action = "drop_column", kind = "ddl", column = %old_name);
        session
            .execute(&format!("ALTER TABLE \"{table}\" DROP COLUMN \"{old_name}\""))
            .await?;
        ctx.live_columns.remove(old_name);
    }

    Ok(())
}
