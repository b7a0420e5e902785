//! Phase 7 — check: add, drop, or replace a column's named CHECK
//! constraint to match its declared expression.

use tracing::info;

use prax_schema::check;
use prax_schema::column::check_constraint_name;

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
        let constraint_name = check_constraint_name(&table, &name);
        let existing = ctx
            .constraints
            .iter()
            .find(|c| c.kind == "CHECK" && c.name == constraint_name)
            .and_then(|c| c.check_clause.clone());

        let matches = match (&model_col.check_sql, &existing) {
            (Some(desired), Some(current)) => check::normalize(desired) == check::normalize(current),
            (None, None) => true,
            _ => false,
        };
        if matches {
            continue;
        }

        if existing.is_some() {
            info!(section = "table", subject = %table, action = "drop_check", kind = "ddl", column = %name);
            session
                .execute(&format!("ALTER TABLE \"{table}\" DROP CONSTRAINT \"{constraint_name}\""))
                .await?;
        }

        if let Some(desired) = &model_col.check_sql {
            info!(section = "table", subject = %table, action = "add_check", kind = "ddl", column = %name);
            session
                .execute(&format!(
                    "ALTER TABLE \"{table}\" ADD CONSTRAINT \"{constraint_name}\" CHECK ({desired})"
                ))
                .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use prax_schema::{ColumnConfig, EnumRegistry, ModelConfig, ModelRuntime};

    use crate::introspect::{ColumnInfo, ConstraintInfo};
    use crate::phases::DiffContext;
    use crate::session::fake::FakeSession;

    use super::*;

    fn db_col(name: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            udt_name: "INTEGER".to_string(),
            is_array: false,
            is_nullable: true,
            column_default: None,
            is_identity: false,
        }
    }

    #[tokio::test]
    async fn new_check_is_added() {
        let mut config = ModelConfig::new("widgets");
        let mut col = ColumnConfig::new("age", "integer");
        col.check = Some("age >= 18".to_string());
        config.columns.push(col);
        let model = ModelRuntime::build(&config, &EnumRegistry::new());
        let db_columns = vec![db_col("age")];
        let mut ctx = DiffContext::new(&model, db_columns, vec![], Some(0));
        let session = FakeSession::new();
        run(&session, &mut ctx).await.unwrap();
        assert_eq!(
            session.executed_sql(),
            vec!["ALTER TABLE \"widgets\" ADD CONSTRAINT \"widgets_age_check\" CHECK ((age >= 18))"
                .to_string()]
        );
    }

    #[tokio::test]
    async fn equivalent_whitespace_is_left_alone() {
        let mut config = ModelConfig::new("widgets");
        let mut col = ColumnConfig::new("age", "integer");
        col.check = Some("age >= 18".to_string());
        config.columns.push(col);
        let model = ModelRuntime::build(&config, &EnumRegistry::new());
        let db_columns = vec![db_col("age")];
        let constraints = vec![ConstraintInfo {
            name: "widgets_age_check".to_string(),
            kind: "CHECK".to_string(),
            column: Some("age".to_string()),
            referenced_table: None,
            referenced_column: None,
            delete_rule: None,
            update_rule: None,
            check_clause: Some("(age  >=  18)".to_string()),
        }];
        let mut ctx = DiffContext::new(&model, db_columns, constraints, Some(0));
        let session = FakeSession::new();
        run(&session, &mut ctx).await.unwrap();
        assert!(session.executed_sql().is_empty());
    }

    #[tokio::test]
    async fn removed_check_is_dropped() {
        let mut config = ModelConfig::new("widgets");
        config.columns.push(ColumnConfig::new("age", "integer"));
        let model = ModelRuntime::build(&config, &EnumRegistry::new());
        let db_columns = vec![db_col("age")];
        let constraints = vec![ConstraintInfo {
            name: "widgets_age_check".to_string(),
            kind: "CHECK".to_string(),
            column: Some("age".to_string()),
            referenced_table: None,
            referenced_column: None,
            delete_rule: None,
            update_rule: None,
            check_clause: Some("(age >= 18)".to_string()),
        }];
        let mut ctx = DiffContext::new(&model, db_columns, constraints, Some(0));
        let session = FakeSession::new();
        run(&session, &mut ctx).await.unwrap();
        assert_eq!(
            session.executed_sql(),
            vec!["ALTER TABLE \"widgets\" DROP CONSTRAINT \"widgets_age_check\"".to_string()]
        );
    }
}
