//! Phase 5 — unique: add or drop a single-column `UNIQUE` constraint to
//! match the model. Adding one on a non-empty table is only safe when
//! the column's default is guaranteed to generate distinct values.

use prax_schema::ValidatedDefault;
use tracing::info;

use crate::error::{MigrateResult, MigrationError};
use crate::session::Session;

use super::{unique_constraint_name, DiffContext};

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
        let constraint_name = unique_constraint_name(&table, &name);
        let currently_unique = ctx
            .constraints
            .iter()
            .any(|c| c.kind == "UNIQUE" && c.column.as_deref() == Some(name.as_str()));

        if currently_unique == model_col.unique {
            continue;
        }

        if model_col.unique {
            let generates_unique_values = matches!(
                model_col.default,
                Some(ValidatedDefault::Uuid) | Some(ValidatedDefault::Identity)
            );
            if !ctx.is_empty_table() && !generates_unique_values {
                return Err(MigrationError::AddUniqueBlocked {
                    table: table.clone(),
                    column: name.clone(),
                });
            }
            info!(section = "table", subject = %table, action = "add_unique", kind = "ddl", column = %name);
            session
                .execute(&format!(
                    "ALTER TABLE \"{table}\" ADD CONSTRAINT \"{constraint_name}\" UNIQUE (\"{name}\")"
                ))
                .await?;
        } else {
            let existing_name = ctx
                .constraints
                .iter()
                .find(|c| c.kind == "UNIQUE" && c.column.as_deref() == Some(name.as_str()))
                .map(|c| c.name.clone())
                .unwrap_or(constraint_name);
            info!(section = "table", subject = %table, action = "drop_unique", kind = "ddl", column = %name);
            session
                .execute(&format!("ALTER TABLE \"{table}\" DROP CONSTRAINT \"{existing_name}\""))
                .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use prax_schema::{ColumnConfig, DeclaredDefault, EnumRegistry, ModelConfig, ModelRuntime};

    use crate::introspect::{ColumnInfo, ConstraintInfo};
    use crate::phases::DiffContext;
    use crate::session::fake::FakeSession;

    use super::*;

    fn db_col(name: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            udt_name: "UUID".to_string(),
            is_array: false,
            is_nullable: true,
            column_default: None,
            is_identity: false,
        }
    }

    fn model_with(mut col: ColumnConfig) -> ModelRuntime {
        col.unique = true;
        let mut config = ModelConfig::new("widgets");
        config.columns.push(col);
        ModelRuntime::build(&config, &EnumRegistry::new())
    }

    #[tokio::test]
    async fn adding_unique_on_non_empty_table_without_safe_default_blocks() {
        let col = ColumnConfig::new("slug", "text");
        let model = model_with(col);
        let db_columns = vec![db_col("slug")];
        let mut ctx = DiffContext::new(&model, db_columns, vec![], Some(2));
        let session = FakeSession::new();
        let err = run(&session, &mut ctx).await.unwrap_err();
        assert!(matches!(err, MigrationError::AddUniqueBlocked { .. }));
    }

    #[tokio::test]
    async fn adding_unique_with_uuid_default_on_non_empty_table_is_allowed() {
        let mut col = ColumnConfig::new("token", "uuid");
        col.default = Some(DeclaredDefault::UuidSentinel);
        let model = model_with(col);
        let db_columns = vec![db_col("token")];
        let mut ctx = DiffContext::new(&model, db_columns, vec![], Some(2));
        let session = FakeSession::new();
        run(&session, &mut ctx).await.unwrap();
        assert_eq!(
            session.executed_sql(),
            vec!["ALTER TABLE \"widgets\" ADD CONSTRAINT \"widgets_token_unique\" UNIQUE (\"token\")"
                .to_string()]
        );
    }

    #[tokio::test]
    async fn dropping_unique_uses_the_existing_constraint_name() {
        let config = {
            let mut c = ModelConfig::new("widgets");
            c.columns.push(ColumnConfig::new("slug", "text"));
            c
        };
        let model = ModelRuntime::build(&config, &EnumRegistry::new());
        let db_columns = vec![db_col("slug")];
        let constraints = vec![ConstraintInfo {
            name: "widgets_slug_key".to_string(),
            kind: "UNIQUE".to_string(),
            column: Some("slug".to_string()),
            referenced_table: None,
            referenced_column: None,
            delete_rule: None,
            update_rule: None,
            check_clause: None,
        }];
        let mut ctx = DiffContext::new(&model, db_columns, constraints, Some(2));
        let session = FakeSession::new();
        run(&session, &mut ctx).await.unwrap();
        assert_eq!(
            session.executed_sql(),
            vec!["ALTER TABLE \"widgets\" DROP CONSTRAINT \"widgets_slug_key\"".to_string()]
        );
    }
}
