//! Reconciles one model's table against the live database: creates it
//! fresh if absent, otherwise runs the eight-phase alter pipeline in
//! fixed order (see [`crate::phases`]).

use tracing::info;

use prax_schema::ModelRuntime;

use crate::error::MigrateResult;
use crate::phases::{self, DiffContext};
use crate::session::Session;

/// SQL for the trigger function every fresh table's `updated_at`
/// trigger calls. `CREATE OR REPLACE` keeps repeated creation safe.
const UPDATED_AT_FUNCTION_SQL: &str = r#"
CREATE OR REPLACE FUNCTION morm_set_updated_at() RETURNS trigger AS $$
BEGIN
    NEW.updated_at = CURRENT_TIMESTAMP;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql
"#;

pub struct TableDiffer;

impl TableDiffer {
    /// Bring `model`'s table in line with its declaration: create it
    /// from scratch if absent, otherwise diff it column by column and
    /// constraint by constraint.
    pub async fn migrate(session: &dyn Session, model: &ModelRuntime) -> MigrateResult<()> {
        if !session.table_exists(&model.table).await? {
            return Self::create(session, model).await;
        }

        let db_columns = session.table_columns(&model.table).await?;
        let constraints = session.table_constraints(&model.table).await?;
        let row_count = session.row_count(&model.table).await;
        let mut ctx = DiffContext::new(model, db_columns, constraints, row_count);

        phases::name::run(session, &mut ctx).await?;
        phases::pk::run(session, &mut ctx).await?;
        phases::ty::run(session, &mut ctx).await?;
        phases::nullity::run(session, &mut ctx).await?;
        phases::unique::run(session, &mut ctx).await?;
        phases::fk::run(session, &mut ctx).await?;
        phases::check::run(session, &mut ctx).await?;
        phases::default::run(session, &mut ctx).await?;

        Ok(())
    }

    async fn create(session: &dyn Session, model: &ModelRuntime) -> MigrateResult<()> {
        info!(section = "table", subject = %model.table, action = "create", kind = "ddl");
        session.execute(&model.create_table_sql()).await?;

        session.execute(UPDATED_AT_FUNCTION_SQL).await?;
        let trigger_name = format!("morm_trigger_{}_updated_at", model.table);
        info!(section = "table", subject = %model.table, action = "install_trigger", kind = "ddl", trigger = %trigger_name);
        session
            .execute(&format!(
                "CREATE TRIGGER \"{trigger_name}\" BEFORE UPDATE ON \"{}\" FOR EACH ROW EXECUTE FUNCTION morm_set_updated_at()",
                model.table
            ))
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use prax_schema::{ColumnConfig, DeclaredDefault, EnumRegistry, ModelConfig, ModelRuntime};

    use crate::session::fake::{FakeSession, FakeTable};

    use super::*;

    fn users_model() -> ModelRuntime {
        let mut config = ModelConfig::new("users");
        let mut id = ColumnConfig::new("id", "uuid");
        id.primary = true;
        id.default = Some(DeclaredDefault::UuidSentinel);
        config.columns.push(id);
        ModelRuntime::build(&config, &EnumRegistry::new())
    }

    #[tokio::test]
    async fn absent_table_is_created_with_trigger() {
        let model = users_model();
        let session = FakeSession::new();
        TableDiffer::migrate(&session, &model).await.unwrap();
        let executed = session.executed_sql();
        assert!(executed[0].contains("CREATE TABLE \"users\""));
        assert!(executed.iter().any(|s| s.contains("morm_set_updated_at")));
        assert!(executed
            .iter()
            .any(|s| s.contains("CREATE TRIGGER \"morm_trigger_users_updated_at\"")));
    }

    #[tokio::test]
    async fn existing_matching_table_is_a_no_op() {
        let model = users_model();
        let db_columns = model
            .columns
            .iter()
            .map(|c| crate::introspect::ColumnInfo {
                name: c.name.clone(),
                udt_name: match &c.canonical.base {
                    prax_schema::ResolvedType::Scalar(s) => s.sql_name().to_string(),
                    prax_schema::ResolvedType::Enum(name) => name.clone(),
                },
                is_array: c.canonical.is_array,
                is_nullable: !c.not_null,
                column_default: c.default.as_ref().and_then(|d| d.emit_sql()).map(str::to_string),
                is_identity: c.is_identity,
            })
            .collect();
        let constraints = vec![crate::introspect::ConstraintInfo {
            name: "users_pkey".to_string(),
            kind: "PRIMARY KEY".to_string(),
            column: Some("id".to_string()),
            referenced_table: None,
            referenced_column: None,
            delete_rule: None,
            update_rule: None,
            check_clause: None,
        }];
        let session = FakeSession::new().with_table(
            "users",
            FakeTable {
                columns: db_columns,
                constraints,
                row_count: Some(0),
                ..Default::default()
            },
        );
        TableDiffer::migrate(&session, &model).await.unwrap();
        assert!(session.executed_sql().is_empty());
    }
}
