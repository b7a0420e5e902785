//! Phase 4 — nullity: set or drop `NOT NULL` to match the model,
//! skipping primary key columns (already `NOT NULL` by construction).

use tracing::info;

use crate::error::{MigrateResult, MigrationError};
use crate::session::Session;

use super::DiffContext;

pub async fn run(session: &dyn Session, ctx: &mut DiffContext<'_>) -> MigrateResult<()> {
    let table = ctx.table().to_string();
    let columns: Vec<String> = ctx.live_columns.keys().cloned().collect();

    for name in columns {
        let Some(model_col) = ctx.model.columns.iter().find(|c| c.name == name && !c.is_virtual) else {
            continue;
        };
        if model_col.primary {
            continue;
        }
        let currently_nullable = ctx.live_columns[&name].is_nullable;
        let desired_not_null = model_col.not_null;

        if currently_nullable == !desired_not_null {
            continue;
        }

        if desired_not_null {
            if !ctx.is_empty_table() && model_col.default.is_none() {
                return Err(MigrationError::AddNotNullBlocked {
                    table: table.clone(),
                    column: name.clone(),
                });
            }
            info!(section = "table", subject = %table, action = "set_not_null", kind = "ddl", column = %name);
            session
                .execute(&format!(
                    "ALTER TABLE \"{table}\" ALTER COLUMN \"{name}\" SET NOT NULL"
                ))
                .await?;
        } else {
            info!(section = "table", subject = %table, action = "drop_not_null", kind = "ddl", column = %name);
            session
                .execute(&format!(
                    "ALTER TABLE \"{table}\" ALTER COLUMN \"{name}\" DROP NOT NULL"
                ))
                .await?;
        }

        if let Some(live) = ctx.live_columns.get_mut(&name) {
            live.is_nullable = !desired_not_null;
        }
    }

    Ok(())
}
