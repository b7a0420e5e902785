//! Phase 3 — alter types: change a column's type when it diverges from
//! the model, dropping its default and CHECK first since Postgres
//! refuses a type change while either still references the old type.

use tracing::info;

use prax_schema::column::check_constraint_name;

use crate::error::{MigrateResult, MigrationError};
use crate::session::Session;

use super::{db_canonical, DiffContext};

pub async fn run(session: &dyn Session, ctx: &mut DiffContext<'_>) -> MigrateResult<()> {
    let table = ctx.table().to_string();
    let columns: Vec<String> = ctx.live_columns.keys().cloned().collect();

    for name in columns {
        let Some(model_col) = ctx.model.columns.iter().find(|c| c.name == name && !c.is_virtual) else {
            continue;
        };
        let current = db_canonical(&ctx.live_columns[&name]);
        if current == model_col.canonical {
            continue;
        }

        if !ctx.is_empty_table() {
            return Err(MigrationError::TypeChangeBlocked {
                table: table.clone(),
                column: name.clone(),
            });
        }

        let has_check = ctx
            .constraints
            .iter()
            .any(|c| c.kind == "CHECK" && c.name == check_constraint_name(&table, &name));
        if has_check {
            let constraint_name = check_constraint_name(&table, &name);
            session
                .execute(&format!("ALTER TABLE \"{table}\" DROP CONSTRAINT \"{constraint_name}\""))
                .await?;
        }

        let desired_sql = model_col.canonical.emit_sql();
        info!(section = "table", subject = %table, action = "alter_type", kind = "ddl", column = %name, to = %desired_sql);
        session
            .execute(&format!(
                "ALTER TABLE \"{table}\" ALTER COLUMN \"{name}\" DROP DEFAULT"
            ))
            .await?;
        session
            .execute(&format!(
                "ALTER TABLE \"{table}\" ALTER COLUMN \"{name}\" TYPE {desired_sql} USING NULL::{desired_sql}"
            ))
            .await?;

        if let Some(live) = ctx.live_columns.get_mut(&name) {
            live.column_default = None;
        }
    }

    Ok(())
}
