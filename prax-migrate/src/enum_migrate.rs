//! Reconciles the database's enum types against the declared
//! [`EnumRegistry`], inside the outer reconciliation transaction.

use std::collections::{BTreeMap, HashSet};

use tracing::info;

use prax_schema::EnumRegistry;

use crate::error::{MigrateResult, MigrationError};
use crate::session::Session;

/// Reconciles enum types. See [`EnumMigrator::migrate`].
pub struct EnumMigrator;

impl EnumMigrator {
    /// Bring the database's enum types in line with `registry`.
    ///
    /// 1. Renames a DB-only enum whose value list matches a registry-only
    ///    entry.
    /// 2. Creates registry entries with no DB counterpart.
    /// 3. For surviving name matches, appends added values or — if any
    ///    value was removed — recreates the type via a temporary enum
    ///    swap (blocked without `reset` when any column uses the type).
    /// 4. Drops DB enums absent from the registry, unless in use.
    pub async fn migrate(
        session: &dyn Session,
        registry: &EnumRegistry,
        reset: bool,
    ) -> MigrateResult<()> {
        let mut db_by_name: BTreeMap<String, Vec<String>> = session
            .enums()
            .await?
            .into_iter()
            .map(|e| (e.name.to_uppercase(), e.values))
            .collect();

        let registry_entries: Vec<(String, Vec<String>)> = registry
            .all()
            .map(|(name, values)| (name.to_string(), values.to_vec()))
            .collect();

        for (name, values) in &registry_entries {
            if db_by_name.contains_key(name) {
                continue;
            }
            let rename_from = db_by_name
                .iter()
                .find(|(old_name, old_values)| !registry.has(old_name) && *old_values == values)
                .map(|(old_name, _)| old_name.clone());

            if let Some(old_name) = rename_from {
                info!(section = "enum", subject = %name, action = "rename", kind = "ddl", from = %old_name);
                session
                    .execute(&format!("ALTER TYPE \"{old_name}\" RENAME TO \"{name}\""))
                    .await?;
                let values = db_by_name.remove(&old_name).unwrap();
                db_by_name.insert(name.clone(), values);
            }
        }

        for (name, values) in &registry_entries {
            if db_by_name.contains_key(name) {
                continue;
            }
            info!(section = "enum", subject = %name, action = "create", kind = "ddl");
            session
                .execute(&format!(
                    "CREATE TYPE \"{name}\" AS ENUM ({})",
                    quoted_list(values)
                ))
                .await?;
            db_by_name.insert(name.clone(), values.clone());
        }

        for (name, desired_values) in &registry_entries {
            let Some(current_values) = db_by_name.get(name).cloned() else {
                continue;
            };
            let added: Vec<String> = desired_values
                .iter()
                .filter(|v| !current_values.contains(v))
                .cloned()
                .collect();
            let removed: Vec<String> = current_values
                .iter()
                .filter(|v| !desired_values.contains(v))
                .cloned()
                .collect();

            if removed.is_empty() && added.is_empty() {
                continue;
            }

            if removed.is_empty() {
                for value in &added {
                    info!(section = "enum", subject = %name, action = "add_value", kind = "ddl", value = %value);
                    session
                        .execute(&format!(
                            "ALTER TYPE \"{name}\" ADD VALUE '{}'",
                            escape_literal(value)
                        ))
                        .await?;
                }
                continue;
            }

            let usage = session.columns_using_type(name).await?;
            if !usage.is_empty() && !reset {
                return Err(MigrationError::enum_in_use(name.clone(), removed[0].clone()));
            }

            info!(section = "enum", subject = %name, action = "recreate", kind = "ddl");
            let temp_name = format!("__prax_tmp_{name}");
            session
                .execute(&format!(
                    "CREATE TYPE \"{temp_name}\" AS ENUM ({})",
                    quoted_list(desired_values)
                ))
                .await?;

            for (table, column) in &usage {
                if session.row_count(table).await != Some(0) {
                    session.execute(&format!("DELETE FROM \"{table}\"")).await?;
                }
                session
                    .execute(&format!(
                        "ALTER TABLE \"{table}\" ALTER COLUMN \"{column}\" TYPE \"{temp_name}\" USING \"{column}\"::text::\"{temp_name}\""
                    ))
                    .await?;
            }

            session.execute(&format!("DROP TYPE \"{name}\"")).await?;
            session
                .execute(&format!("ALTER TYPE \"{temp_name}\" RENAME TO \"{name}\""))
                .await?;
        }

        let registry_names: HashSet<String> = registry.names().into_iter().collect();
        let drop_candidates: Vec<String> = db_by_name
            .keys()
            .filter(|n| !registry_names.contains(*n))
            .cloned()
            .collect();
        for name in drop_candidates {
            let usage = session.columns_using_type(&name).await?;
            if !usage.is_empty() {
                // Dropping the type itself is blocked regardless of reset: no
                // single offending value applies, so "*" marks the whole type.
                return Err(MigrationError::enum_in_use(name, "*"));
            }
            info!(section = "enum", subject = %name, action = "drop", kind = "ddl");
            session.execute(&format!("DROP TYPE \"{name}\"")).await?;
        }

        Ok(())
    }
}

fn quoted_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("'{}'", escape_literal(v)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}
