//! Synthesizes pivot tables for `MANY-TO-MANY` relations.
//!
//! A many-to-many reference column (e.g. `users.position_id uuid[]`) is
//! virtual: [`prax_schema::model::ModelRuntime::create_table_sql`] never
//! emits it. Instead this module builds the junction table the relation
//! actually lives in, once per distinct unordered model pair.

use std::collections::{HashMap, HashSet};

use tracing::info;

use prax_schema::relation::{RelationGraph, RelationKind};
use prax_schema::ModelRuntime;

use crate::error::MigrateResult;
use crate::session::Session;

pub struct JunctionBuilder;

impl JunctionBuilder {
    /// Create every declared many-to-many junction table absent from the
    /// database, and make sure its two FK indexes exist. Existing
    /// junction tables are left alone beyond that: the junction shape
    /// itself never changes once created.
    pub async fn migrate(
        session: &dyn Session,
        graph: &RelationGraph,
        models: &HashMap<String, &ModelRuntime>,
    ) -> MigrateResult<()> {
        let mut created = HashSet::new();

        for (table, descriptors) in &graph.outgoing {
            for descriptor in descriptors {
                if descriptor.kind != RelationKind::ManyToMany {
                    continue;
                }

                let (lo, hi) = if table <= &descriptor.other_table {
                    (table.clone(), descriptor.other_table.clone())
                } else {
                    (descriptor.other_table.clone(), table.clone())
                };
                let junction = format!("{lo}_{hi}_junction");
                if !created.insert(junction.clone()) {
                    continue;
                }

                let Some(lo_model) = models.get(&lo).copied() else { continue };
                let Some(hi_model) = models.get(&hi).copied() else { continue };

                let (col1, col2) = if descriptor.is_self {
                    (
                        format!("{}_source_id", descriptor.column),
                        format!("{}_target_id", descriptor.column),
                    )
                } else {
                    (format!("{lo}_id"), format!("{hi}_id"))
                };

                Self::ensure_table(session, &junction, &lo, &col1, lo_model, &hi, &col2, hi_model)
                    .await?;
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn ensure_table(
        session: &dyn Session,
        junction: &str,
        lo_table: &str,
        col1: &str,
        lo_model: &ModelRuntime,
        hi_table: &str,
        col2: &str,
        hi_model: &ModelRuntime,
    ) -> MigrateResult<()> {
        if !session.table_exists(junction).await? {
            info!(section = "junction", subject = %junction, action = "create", kind = "ddl");
            let lo_pk = lo_model.primary_key();
            let hi_pk = hi_model.primary_key();
            let sql = format!(
                "CREATE TABLE \"{junction}\" (\n    \
                 \"{col1}\" {col1_type} NOT NULL,\n    \
                 \"{col2}\" {col2_type} NOT NULL,\n    \
                 PRIMARY KEY (\"{col1}\", \"{col2}\"),\n    \
                 FOREIGN KEY (\"{col1}\") REFERENCES \"{lo_table}\"(\"{lo_pk}\") ON DELETE CASCADE ON UPDATE CASCADE,\n    \
                 FOREIGN KEY (\"{col2}\") REFERENCES \"{hi_table}\"(\"{hi_pk}\") ON DELETE CASCADE ON UPDATE CASCADE\n)",
                col1_type = lo_model.primary_key_sql(),
                col2_type = hi_model.primary_key_sql(),
            );
            session.execute(&sql).await?;
        }

        let existing: HashSet<String> = session
            .table_indexes(junction)
            .await?
            .into_iter()
            .map(|i| i.name)
            .collect();

        for column in [col1, col2] {
            let index = format!("{junction}_{column}_idx");
            if existing.contains(&index) {
                continue;
            }
            info!(section = "junction", subject = %junction, action = "create_index", kind = "ddl", index = %index);
            session
                .execute(&format!(
                    "CREATE INDEX \"{index}\" ON \"{junction}\" (\"{column}\")"
                ))
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use prax_schema::{ColumnConfig, EnumRegistry, ModelConfig, ModelRelations, Reference, RelationKind};

    use crate::session::fake::FakeSession;

    use super::*;

    fn pk_model(table: &str) -> ModelRuntime {
        let mut config = ModelConfig::new(table);
        let mut id = ColumnConfig::new("id", "uuid");
        id.primary = true;
        config.columns.push(id);
        ModelRuntime::build(&config, &EnumRegistry::new())
    }

    fn mm_model(table: &str, column: &str, target: &str) -> ModelRuntime {
        let mut config = ModelConfig::new(table);
        let mut id = ColumnConfig::new("id", "uuid");
        id.primary = true;
        config.columns.push(id);
        let mut rel = ColumnConfig::new(column, "uuid[]");
        rel.references = Some(Reference {
            target_model: target.to_string(),
            target_column: "id".to_string(),
            kind: RelationKind::ManyToMany,
            on_delete: Default::default(),
            on_update: Default::default(),
            not_null_override: None,
        });
        config.columns.push(rel);
        ModelRuntime::build(&config, &EnumRegistry::new())
    }

    #[tokio::test]
    async fn s4_junction_is_created_with_sorted_name_and_both_fks() {
        let position = pk_model("position");
        let users = mm_model("users", "position_id", "position");

        let views: Vec<ModelRelations> = vec![position.relation_view(), users.relation_view()];
        let graph = RelationGraph::build(&views).unwrap();

        let mut models: HashMap<String, &ModelRuntime> = HashMap::new();
        models.insert("position".to_string(), &position);
        models.insert("users".to_string(), &users);

        let session = FakeSession::new();
        JunctionBuilder::migrate(&session, &graph, &models).await.unwrap();

        let executed = session.executed_sql();
        assert!(executed[0].contains("CREATE TABLE \"position_users_junction\""));
        assert!(executed[0].contains("\"position_id\" UUID NOT NULL"));
        assert!(executed[0].contains("\"users_id\" UUID NOT NULL"));
        assert!(executed[0].contains("PRIMARY KEY (\"position_id\", \"users_id\")"));
        assert!(executed[0].contains("REFERENCES \"position\"(\"id\") ON DELETE CASCADE ON UPDATE CASCADE"));
        assert!(executed[0].contains("REFERENCES \"users\"(\"id\") ON DELETE CASCADE ON UPDATE CASCADE"));
        assert!(executed
            .iter()
            .any(|s| s.contains("CREATE INDEX \"position_users_junction_position_id_idx\"")));
        assert!(executed
            .iter()
            .any(|s| s.contains("CREATE INDEX \"position_users_junction_users_id_idx\"")));
    }

    #[tokio::test]
    async fn existing_junction_table_is_not_recreated() {
        let position = pk_model("position");
        let users = mm_model("users", "position_id", "position");
        let views: Vec<ModelRelations> = vec![position.relation_view(), users.relation_view()];
        let graph = RelationGraph::build(&views).unwrap();

        let mut models: HashMap<String, &ModelRuntime> = HashMap::new();
        models.insert("position".to_string(), &position);
        models.insert("users".to_string(), &users);

        let session = FakeSession::new().with_table(
            "position_users_junction",
            crate::session::fake::FakeTable {
                indexes: vec![
                    crate::introspect::IndexInfo {
                        name: "position_users_junction_position_id_idx".to_string(),
                        columns: vec!["position_id".to_string()],
                        is_primary: false,
                    },
                    crate::introspect::IndexInfo {
                        name: "position_users_junction_users_id_idx".to_string(),
                        columns: vec!["users_id".to_string()],
                        is_primary: false,
                    },
                ],
                ..Default::default()
            },
        );
        JunctionBuilder::migrate(&session, &graph, &models).await.unwrap();
        assert!(session.executed_sql().is_empty());
    }
}
