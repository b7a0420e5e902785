//! Reconciles a model's single-column indexes against the live
//! database, by naming convention alone — no multi-column indexes.

use std::collections::HashSet;

use tracing::info;

use prax_schema::column::index_name;
use prax_schema::ModelRuntime;

use crate::error::{MigrateResult, MigrationError};
use crate::session::Session;

pub struct IndexMigrator;

impl IndexMigrator {
    /// Create missing declared indexes and drop orphaned ones that
    /// match this table's `<table>_*_idx` naming pattern.
    pub async fn migrate(session: &dyn Session, model: &ModelRuntime) -> MigrateResult<()> {
        let table = &model.table;

        let mut desired_names = HashSet::new();
        for column in &model.indexes {
            if !model.columns.iter().any(|c| &c.name == column && !c.is_virtual) {
                return Err(MigrationError::IndexColumnMissing {
                    table: table.clone(),
                    column: column.clone(),
                });
            }
            desired_names.insert(index_name(table, column));
        }

        let existing = session.table_indexes(table).await?;
        let existing_names: HashSet<String> = existing.iter().map(|i| i.name.clone()).collect();

        for column in &model.indexes {
            let name = index_name(table, column);
            if existing_names.contains(&name) {
                continue;
            }
            info!(section = "index", subject = %table, action = "create", kind = "ddl", index = %name);
            session
                .execute(&format!(
                    "CREATE INDEX \"{name}\" ON \"{table}\" (\"{column}\")"
                ))
                .await?;
        }

        let prefix = format!("{table}_");
        for index in &existing {
            if index.is_primary {
                continue;
            }
            if !index.name.starts_with(&prefix) || !index.name.ends_with("_idx") {
                continue;
            }
            if desired_names.contains(&index.name) {
                continue;
            }
            info!(section = "index", subject = %table, action = "drop", kind = "ddl", index = %index.name);
            session
                .execute(&format!("DROP INDEX \"{}\"", index.name))
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use prax_schema::{ColumnConfig, EnumRegistry, ModelConfig, ModelRuntime};

    use crate::introspect::IndexInfo;
    use crate::session::fake::{FakeSession, FakeTable};

    use super::*;

    fn model(indexes: Vec<&str>) -> ModelRuntime {
        let mut config = ModelConfig::new("users");
        config.columns.push(ColumnConfig::new("email", "text"));
        config.indexes = indexes.into_iter().map(str::to_string).collect();
        ModelRuntime::build(&config, &EnumRegistry::new())
    }

    #[tokio::test]
    async fn missing_index_is_created() {
        let model = model(vec!["email"]);
        let session = FakeSession::new().with_table("users", FakeTable::default());
        IndexMigrator::migrate(&session, &model).await.unwrap();
        assert_eq!(
            session.executed_sql(),
            vec!["CREATE INDEX \"users_email_idx\" ON \"users\" (\"email\")".to_string()]
        );
    }

    #[tokio::test]
    async fn orphaned_index_matching_the_pattern_is_dropped() {
        let model = model(vec![]);
        let session = FakeSession::new().with_table(
            "users",
            FakeTable {
                indexes: vec![IndexInfo {
                    name: "users_nickname_idx".to_string(),
                    columns: vec!["nickname".to_string()],
                    is_primary: false,
                }],
                ..Default::default()
            },
        );
        IndexMigrator::migrate(&session, &model).await.unwrap();
        assert_eq!(
            session.executed_sql(),
            vec!["DROP INDEX \"users_nickname_idx\"".to_string()]
        );
    }

    #[tokio::test]
    async fn primary_key_index_is_never_dropped() {
        let model = model(vec![]);
        let session = FakeSession::new().with_table(
            "users",
            FakeTable {
                indexes: vec![IndexInfo {
                    name: "users_pkey".to_string(),
                    columns: vec!["id".to_string()],
                    is_primary: true,
                }],
                ..Default::default()
            },
        );
        IndexMigrator::migrate(&session, &model).await.unwrap();
        assert!(session.executed_sql().is_empty());
    }

    #[tokio::test]
    async fn index_on_missing_column_is_an_error() {
        let model = model(vec!["ghost"]);
        let session = FakeSession::new().with_table("users", FakeTable::default());
        let err = IndexMigrator::migrate(&session, &model).await.unwrap_err();
        assert!(matches!(err, MigrationError::IndexColumnMissing { .. }));
    }
}
