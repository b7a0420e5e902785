//! Phase 2 — primary key: add, move, or drop the single-column primary
//! key constraint to match the model's declared `primary` column.

use tracing::info;

use crate::error::{MigrateResult, MigrationError};
use crate::session::Session;

use super::{primary_key_constraint_name, DiffContext};

pub async fn run(session: &dyn Session, ctx: &mut DiffContext<'_>) -> MigrateResult<()> {
    let table = ctx.table().to_string();
    let desired = ctx.model.columns.iter().find(|c| c.primary).map(|c| c.name.clone());
    let current = ctx
        .constraints
        .iter()
        .find(|c| c.kind == "PRIMARY KEY")
        .and_then(|c| c.column.clone());

    if desired == current {
        return Ok(());
    }

    if !ctx.is_empty_table() {
        return Err(MigrationError::PrimaryKeyMoveBlocked { table });
    }

    if let Some(existing) = ctx.constraints.iter().find(|c| c.kind == "PRIMARY KEY") {
        let constraint_name = existing.name.clone();
        info!(section = "table", subject = %table, action = "drop_primary_key", kind = "ddl");
        session
            .execute(&format!("ALTER TABLE \"{table}\" DROP CONSTRAINT \"{constraint_name}\""))
            .await?;
    }

    if let Some(column) = &desired {
        info!(section = "table", subject = %table, action = "add_primary_key", kind = "ddl", column = %column);
        session
            .execute(&format!(
                "ALTER TABLE \"{table}\" ADD CONSTRAINT \"{}\" PRIMARY KEY (\"{column}\")",
                primary_key_constraint_name(&table)
            ))
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use prax_schema::{ColumnConfig, EnumRegistry, ModelConfig, ModelRuntime};

    use crate::introspect::ConstraintInfo;
    use crate::phases::DiffContext;
    use crate::session::fake::FakeSession;

    use super::*;

    fn pk_constraint(column: &str) -> ConstraintInfo {
        ConstraintInfo {
            name: "widgets_pkey".to_string(),
            kind: "PRIMARY KEY".to_string(),
            column: Some(column.to_string()),
            referenced_table: None,
            referenced_column: None,
            delete_rule: None,
            update_rule: None,
            check_clause: None,
        }
    }

    fn model_with_primary(column: &str) -> ModelRuntime {
        let mut config = ModelConfig::new("widgets");
        let mut col = ColumnConfig::new(column, "uuid");
        col.primary = true;
        config.columns.push(col);
        ModelRuntime::build(&config, &EnumRegistry::new())
    }

    #[tokio::test]
    async fn matching_primary_key_is_left_alone() {
        let model = model_with_primary("id");
        let mut ctx = DiffContext::new(&model, vec![], vec![pk_constraint("id")], Some(0));
        let session = FakeSession::new();
        run(&session, &mut ctx).await.unwrap();
        assert!(session.executed_sql().is_empty());
    }

    #[tokio::test]
    async fn moving_primary_key_on_non_empty_table_is_blocked() {
        let model = model_with_primary("uuid_id");
        let mut ctx = DiffContext::new(&model, vec![], vec![pk_constraint("id")], Some(3));
        let session = FakeSession::new();
        let err = run(&session, &mut ctx).await.unwrap_err();
        assert!(matches!(err, MigrationError::PrimaryKeyMoveBlocked { .. }));
    }

    #[tokio::test]
    async fn moving_primary_key_on_empty_table_drops_and_adds() {
        let model = model_with_primary("uuid_id");
        let mut ctx = DiffContext::new(&model, vec![], vec![pk_constraint("id")], Some(0));
        let session = FakeSession::new();
        run(&session, &mut ctx).await.unwrap();
        assert_eq!(
            session.executed_sql(),
            vec![
                "ALTER TABLE \"widgets\" DROP CONSTRAINT \"widgets_pkey\"".to_string(),
                "ALTER TABLE \"widgets\" ADD CONSTRAINT \"widgets_pkey\" PRIMARY KEY (\"uuid_id\")"
                    .to_string(),
            ]
        );
    }
}
