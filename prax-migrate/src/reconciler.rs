//! Top-level orchestration: runs every other module in this crate, in
//! the fixed order spec'd for one reconciliation pass.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use prax_schema::{EnumRegistry, ModelRelations, ModelRuntime, RelationGraph};

use crate::enum_migrate::EnumMigrator;
use crate::error::MigrateResult;
use crate::index_migrate::IndexMigrator;
use crate::junction::JunctionBuilder;
use crate::session::Session;
use crate::table_differ::TableDiffer;

/// Drives one reconciliation run against a [`Session`]. Holds only the
/// re-entrancy flag; every other piece of state (registry, models,
/// session) is passed in per call so one `Reconciler` can be reused
/// across an engine's lifetime.
#[derive(Default)]
pub struct Reconciler {
    in_progress: AtomicBool,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile `models`/`enums` against `session`. Returns `Ok(false)`
    /// without touching the database if a call is already in flight on
    /// this `Reconciler` — the caller sees this as *aborted without
    /// effect*, not an error. Returns `Ok(true)` once the full pipeline
    /// completes; any error aborts before or during DDL, and the caller
    /// is expected to roll back the transaction `session` wraps.
    pub async fn migrate(
        &self,
        session: &dyn Session,
        enums: &EnumRegistry,
        models: &[ModelRuntime],
        reset: bool,
    ) -> MigrateResult<bool> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!(section = "reconciler", subject = "migrate", action = "refuse", kind = "reentrant");
            return Ok(false);
        }

        let result = self.run(session, enums, models, reset).await;
        self.in_progress.store(false, Ordering::SeqCst);
        result.map(|()| true)
    }

    async fn run(
        &self,
        session: &dyn Session,
        enums: &EnumRegistry,
        models: &[ModelRuntime],
        reset: bool,
    ) -> MigrateResult<()> {
        if reset {
            Self::reset(session).await?;
        }

        for model in models {
            if let Some(err) = model.errors.first() {
                return Err(err.clone().into());
            }
        }

        info!(section = "extension", subject = "pgcrypto", action = "ensure", kind = "ddl");
        session.execute("CREATE EXTENSION IF NOT EXISTS pgcrypto").await?;

        Self::bulk_rename(session, models).await?;

        let views: Vec<ModelRelations> = models.iter().map(|m| m.relation_view()).collect();
        let graph = RelationGraph::build(&views)?;

        EnumMigrator::migrate(session, enums, reset).await?;

        let by_table: HashMap<String, &ModelRuntime> =
            models.iter().map(|m| (m.table.clone(), m)).collect();

        for table in &graph.order {
            if let Some(model) = by_table.get(table) {
                TableDiffer::migrate(session, model).await?;
            }
        }

        for model in models {
            IndexMigrator::migrate(session, model).await?;
        }

        JunctionBuilder::migrate(session, &graph, &by_table).await?;

        Ok(())
    }

    /// Destructive pre-pass for `reset`: drop every non-`plpgsql`
    /// extension, every public table (`CASCADE`), then every enum type,
    /// in that order.
    async fn reset(session: &dyn Session) -> MigrateResult<()> {
        for extension in session.extensions().await? {
            info!(section = "reset", subject = %extension, action = "drop_extension", kind = "ddl");
            session
                .execute(&format!("DROP EXTENSION IF EXISTS \"{extension}\" CASCADE"))
                .await?;
        }

        for table in session.list_tables().await? {
            info!(section = "reset", subject = %table, action = "drop_table", kind = "ddl");
            session
                .execute(&format!("DROP TABLE IF EXISTS \"{table}\" CASCADE"))
                .await?;
        }

        for enum_type in session.enums().await? {
            info!(section = "reset", subject = %enum_type.name, action = "drop_type", kind = "ddl");
            session
                .execute(&format!("DROP TYPE IF EXISTS \"{}\" CASCADE", enum_type.name))
                .await?;
        }

        Ok(())
    }

    /// If exactly one DB-only table and one model-only table remain,
    /// treat it as a whole-table rename rather than a drop-then-create.
    async fn bulk_rename(session: &dyn Session, models: &[ModelRuntime]) -> MigrateResult<()> {
        let db_tables: HashSet<String> = session.list_tables().await?.into_iter().collect();
        let model_tables: HashSet<String> = models.iter().map(|m| m.table.clone()).collect();

        let db_only: Vec<&String> = db_tables.difference(&model_tables).collect();
        let model_only: Vec<&String> = model_tables.difference(&db_tables).collect();

        if db_only.len() == 1 && model_only.len() == 1 {
            let (from, to) = (db_only[0], model_only[0]);
            info!(section = "table", subject = %to, action = "rename", kind = "ddl", from = %from);
            session
                .execute(&format!("ALTER TABLE \"{from}\" RENAME TO \"{to}\""))
                .await?;
        }

        Ok(())
    }
}
