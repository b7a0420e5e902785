//! Phase 6 — foreign keys: recreate the FK constraint for any column
//! phase 1 renamed, since Postgres carries a renamed column's existing
//! FK forward under its old constraint name, not the naming convention.

use tracing::info;

use prax_schema::column::fk_constraint_name;

use crate::error::MigrateResult;
use crate::session::Session;

use super::DiffContext;

pub async fn run(session: &dyn Session, ctx: &mut DiffContext<'_>) -> MigrateResult<()> {
    let table = ctx.table().to_string();

    for name in ctx.renamed.clone() {
        let Some(model_col) = ctx.model.columns.iter().find(|c| c.name == name && !c.is_virtual) else {
            continue;
        };
        let Some(reference) = &model_col.references else {
            continue;
        };

        if let Some(existing) = ctx
            .constraints
            .iter()
            .find(|c| c.kind == "FOREIGN KEY" && c.column.as_deref() == Some(name.as_str()))
        {
            let existing_name = existing.name.clone();
            session
                .execute(&format!("ALTER TABLE \"{table}\" DROP CONSTRAINT \"{existing_name}\""))
                .await?;
        }

        let constraint_name = fk_constraint_name(&table, &name);
        info!(section = "table", subject = %table, action = "add_foreign_key", kind = "ddl", column = %name);
        session
            .execute(&format!(
                "ALTER TABLE \"{table}\" ADD CONSTRAINT \"{constraint_name}\" FOREIGN KEY (\"{name}\") \
                 REFERENCES \"{}\"(\"{}\") ON DELETE {} ON UPDATE {}",
                reference.target_model.to_lowercase(),
                reference.target_column.to_lowercase(),
                reference.on_delete.sql(),
                reference.on_update.sql(),
            ))
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use prax_schema::{ColumnConfig, EnumRegistry, FkAction, ModelConfig, ModelRuntime, Reference, RelationKind};

    use crate::introspect::ConstraintInfo;
    use crate::phases::DiffContext;
    use crate::session::fake::FakeSession;

    use super::*;

    #[tokio::test]
    async fn renamed_fk_column_gets_its_constraint_recreated() {
        let mut config = ModelConfig::new("posts");
        let mut col = ColumnConfig::new("author_id", "uuid");
        col.references = Some(Reference {
            target_model: "users".to_string(),
            target_column: "id".to_string(),
            kind: RelationKind::OneToMany,
            on_delete: FkAction::Cascade,
            on_update: FkAction::Cascade,
            not_null_override: None,
        });
        config.columns.push(col);
        let model = ModelRuntime::build(&config, &EnumRegistry::new());

        let constraints = vec![ConstraintInfo {
            name: "posts_user_id_fkey".to_string(),
            kind: "FOREIGN KEY".to_string(),
            column: Some("author_id".to_string()),
            referenced_table: Some("users".to_string()),
            referenced_column: Some("id".to_string()),
            delete_rule: Some("CASCADE".to_string()),
            update_rule: Some("CASCADE".to_string()),
            check_clause: None,
        }];

        let mut ctx = DiffContext::new(&model, vec![], constraints, Some(0));
        ctx.renamed.insert("author_id".to_string());
        let session = FakeSession::new();
        run(&session, &mut ctx).await.unwrap();

        assert_eq!(
            session.executed_sql(),
            vec![
                "ALTER TABLE \"posts\" DROP CONSTRAINT \"posts_user_id_fkey\"".to_string(),
                "ALTER TABLE \"posts\" ADD CONSTRAINT \"posts_author_id_fkey\" FOREIGN KEY (\"author_id\") \
                 REFERENCES \"users\"(\"id\") ON DELETE CASCADE ON UPDATE CASCADE"
                    .to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn untouched_columns_are_skipped() {
        let config = ModelConfig::new("posts");
        let model = ModelRuntime::build(&config, &EnumRegistry::new());
        let mut ctx = DiffContext::new(&model, vec![], vec![], Some(0));
        let session = FakeSession::new();
        run(&session, &mut ctx).await.unwrap();
        assert!(session.executed_sql().is_empty());
    }
}
