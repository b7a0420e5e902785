//! Phase 8 — default: add, drop, or replace a column's `DEFAULT` to
//! match the model. Identity sentinels never contribute a `DEFAULT`
//! clause, so they are treated the same as "no declared default".

use tracing::info;

use crate::error::MigrateResult;
use crate::session::Session;

use super::DiffContext;

pub async fn run(session: &dyn Session, ctx: &mut DiffContext<'_>) -> MigrateResult<()> {
    let table = ctx.table().to_string();
    let columns: Vec<String> = ctx.live_columns.keys().cloned().collect();

    for name in columns {
        let Some(model_col) = ctx.model.columns.iter().find(|c| c.name == name && !c.is_virtual) else {
            continue;
        };

        let desired_sql = model_col
            .default
            .as_ref()
            .and_then(|d| d.emit_sql())
            .map(str::to_string);
        let current_sql = ctx.live_columns[&name].column_default.clone();

        if normalize_expr(desired_sql.as_deref()) == normalize_expr(current_sql.as_deref()) {
            continue;
        }

        match &desired_sql {
            Some(sql) => {
                info!(section = "table", subject = %table, action = "set_default", kind = "ddl", column = %name);
                session
                    .execute(&format!(
                        "ALTER TABLE \"{table}\" ALTER COLUMN \"{name}\" SET DEFAULT {sql}"
                    ))
                    .await?;
            }
            None => {
                info!(section = "table", subject = %table, action = "drop_default", kind = "ddl", column = %name);
                session
                    .execute(&format!(
                        "ALTER TABLE \"{table}\" ALTER COLUMN \"{name}\" DROP DEFAULT"
                    ))
                    .await?;
            }
        }

        if let Some(live) = ctx.live_columns.get_mut(&name) {
            live.column_default = desired_sql;
        }
    }

    Ok(())
}

/// Postgres round-trips a stored default through its own pretty-printer
/// (`gen_random_uuid()` stays as-is, but casts and literals gain
/// whitespace and parens). Comparing raw text would churn every run, so
/// both sides are stripped down to bare alphanumerics before comparison.
fn normalize_expr(sql: Option<&str>) -> String {
    sql.unwrap_or("")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}
