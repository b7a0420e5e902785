//! The database-session abstraction reconciliation logic runs against.
//!
//! Every phase in this crate takes a `&dyn Session` rather than a
//! `PgTransaction` directly, so it can be exercised against an in-memory
//! fixture ([`fake::FakeSession`], test-only) without a live Postgres.
//! `tokio_postgres::Row` has no public constructor, which is why the
//! trait speaks in domain structs (`ColumnInfo`, `EnumInfo`, ...) rather
//! than raw rows — a fake never needs to fabricate one.

use prax_postgres::PgTransaction;

use crate::error::MigrateResult;
use crate::introspect::{self, ColumnInfo, ConstraintInfo, EnumInfo, IndexInfo};

/// Everything a reconciliation phase needs from the live database: reads
/// of the catalog, and a single statement-at-a-time DDL sink.
#[async_trait::async_trait]
pub trait Session: Send + Sync {
    /// Base tables currently in the `public` schema.
    async fn list_tables(&self) -> MigrateResult<Vec<String>>;

    /// True iff `table` currently exists.
    async fn table_exists(&self, table: &str) -> MigrateResult<bool>;

    /// `table`'s columns, or an empty list if it does not exist.
    async fn table_columns(&self, table: &str) -> MigrateResult<Vec<ColumnInfo>>;

    /// `table`'s constraints.
    async fn table_constraints(&self, table: &str) -> MigrateResult<Vec<ConstraintInfo>>;

    /// `table`'s indexes.
    async fn table_indexes(&self, table: &str) -> MigrateResult<Vec<IndexInfo>>;

    /// Every enum type currently in the `public` schema.
    async fn enums(&self) -> MigrateResult<Vec<EnumInfo>>;

    /// Every `(table, column)` pair whose column uses the type named
    /// `type_name`, schema-wide.
    async fn columns_using_type(&self, type_name: &str) -> MigrateResult<Vec<(String, String)>>;

    /// Non-`plpgsql` extensions currently installed.
    async fn extensions(&self) -> MigrateResult<Vec<String>>;

    /// Row count for `table`, or `None` if unknown (treated as "assume
    /// has data").
    async fn row_count(&self, table: &str) -> Option<i64>;

    /// Count of non-null values in `column` of `table`, or `None` if
    /// unknown.
    async fn column_populated_count(&self, table: &str, column: &str) -> Option<i64>;

    /// Count of rows in `table` whose `column` is not null, or `None` if
    /// unknown.
    async fn enum_usage_count(&self, table: &str, column: &str) -> Option<i64>;

    /// Execute one DDL or DML statement, returning the affected row
    /// count (meaningless for most DDL, but uniform with `execute`).
    async fn execute(&self, sql: &str) -> MigrateResult<u64>;
}

/// Adapts a live [`PgTransaction`] to [`Session`] by delegating reads to
/// [`crate::introspect`] and writes to the transaction's `execute`.
pub struct PgSession<'a, 'b> {
    txn: &'b PgTransaction<'a>,
}

impl<'a, 'b> PgSession<'a, 'b> {
    /// Wrap a transaction for the duration of one reconciliation run.
    pub fn new(txn: &'b PgTransaction<'a>) -> Self {
        Self { txn }
    }
}

#[async_trait::async_trait]
impl Session for PgSession<'_, '_> {
    async fn list_tables(&self) -> MigrateResult<Vec<String>> {
        Ok(introspect::list_tables(self.txn).await?)
    }

    async fn table_exists(&self, table: &str) -> MigrateResult<bool> {
        Ok(introspect::table_exists(self.txn, table).await?)
    }

    async fn table_columns(&self, table: &str) -> MigrateResult<Vec<ColumnInfo>> {
        Ok(introspect::table_columns(self.txn, table).await?)
    }

    async fn table_constraints(&self, table: &str) -> MigrateResult<Vec<ConstraintInfo>> {
        Ok(introspect::table_constraints(self.txn, table).await?)
    }

    async fn table_indexes(&self, table: &str) -> MigrateResult<Vec<IndexInfo>> {
        Ok(introspect::table_indexes(self.txn, table).await?)
    }

    async fn enums(&self) -> MigrateResult<Vec<EnumInfo>> {
        Ok(introspect::enums(self.txn).await?)
    }

    async fn columns_using_type(&self, type_name: &str) -> MigrateResult<Vec<(String, String)>> {
        Ok(introspect::columns_using_type(self.txn, type_name).await?)
    }

    async fn extensions(&self) -> MigrateResult<Vec<String>> {
        Ok(introspect::extensions(self.txn).await?)
    }

    async fn row_count(&self, table: &str) -> Option<i64> {
        introspect::row_count(self.txn, table).await
    }

    async fn column_populated_count(&self, table: &str, column: &str) -> Option<i64> {
        introspect::column_populated_count(self.txn, table, column).await
    }

    async fn enum_usage_count(&self, table: &str, column: &str) -> Option<i64> {
        introspect::enum_usage_count(self.txn, table, column).await
    }

    async fn execute(&self, sql: &str) -> MigrateResult<u64> {
        Ok(self.txn.execute(sql, &[]).await?)
    }
}

/// An in-memory [`Session`] fixture, used by unit tests that exercise
/// reconciliation logic without a live database.
#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::Session;
    use crate::error::MigrateResult;
    use crate::introspect::{ColumnInfo, ConstraintInfo, EnumInfo, IndexInfo};

    /// One table's fixture state.
    #[derive(Debug, Clone, Default)]
    pub struct FakeTable {
        pub columns: Vec<ColumnInfo>,
        pub constraints: Vec<ConstraintInfo>,
        pub indexes: Vec<IndexInfo>,
        pub row_count: Option<i64>,
        pub populated_counts: HashMap<String, i64>,
    }

    /// An in-memory stand-in for a Postgres transaction. Constructed
    /// with the DB state a test wants to assume, then asserted against
    /// via `executed_sql()` after a phase runs.
    #[derive(Default)]
    pub struct FakeSession {
        tables: Mutex<HashMap<String, FakeTable>>,
        enums: Mutex<Vec<EnumInfo>>,
        extensions: Mutex<Vec<String>>,
        executed: Mutex<Vec<String>>,
    }

    impl FakeSession {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_table(self, name: impl Into<String>, table: FakeTable) -> Self {
            self.tables.lock().unwrap().insert(name.into(), table);
            self
        }

        pub fn with_enum(self, name: impl Into<String>, values: Vec<String>) -> Self {
            self.enums.lock().unwrap().push(EnumInfo {
                name: name.into(),
                values,
            });
            self
        }

        pub fn with_extension(self, name: impl Into<String>) -> Self {
            self.extensions.lock().unwrap().push(name.into());
            self
        }

        /// Every statement passed to `execute`, in call order.
        pub fn executed_sql(&self) -> Vec<String> {
            self.executed.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Session for FakeSession {
        async fn list_tables(&self) -> MigrateResult<Vec<String>> {
            let mut names: Vec<String> = self.tables.lock().unwrap().keys().cloned().collect();
            names.sort();
            Ok(names)
        }

        async fn table_exists(&self, table: &str) -> MigrateResult<bool> {
            Ok(self.tables.lock().unwrap().contains_key(table))
        }

        async fn table_columns(&self, table: &str) -> MigrateResult<Vec<ColumnInfo>> {
            Ok(self
                .tables
                .lock()
                .unwrap()
                .get(table)
                .map(|t| t.columns.clone())
                .unwrap_or_default())
        }

        async fn table_constraints(&self, table: &str) -> MigrateResult<Vec<ConstraintInfo>> {
            Ok(self
                .tables
                .lock()
                .unwrap()
                .get(table)
                .map(|t| t.constraints.clone())
                .unwrap_or_default())
        }

        async fn table_indexes(&self, table: &str) -> MigrateResult<Vec<IndexInfo>> {
            Ok(self
                .tables
                .lock()
                .unwrap()
                .get(table)
                .map(|t| t.indexes.clone())
                .unwrap_or_default())
        }

        async fn enums(&self) -> MigrateResult<Vec<EnumInfo>> {
            Ok(self.enums.lock().unwrap().clone())
        }

        async fn columns_using_type(&self, type_name: &str) -> MigrateResult<Vec<(String, String)>> {
            let tables = self.tables.lock().unwrap();
            let mut out = Vec::new();
            for (table_name, table) in tables.iter() {
                for col in &table.columns {
                    if col.udt_name == type_name {
                        out.push((table_name.clone(), col.name.clone()));
                    }
                }
            }
            out.sort();
            Ok(out)
        }

        async fn extensions(&self) -> MigrateResult<Vec<String>> {
            Ok(self.extensions.lock().unwrap().clone())
        }

        async fn row_count(&self, table: &str) -> Option<i64> {
            self.tables.lock().unwrap().get(table).and_then(|t| t.row_count)
        }

        async fn column_populated_count(&self, table: &str, column: &str) -> Option<i64> {
            self.tables
                .lock()
                .unwrap()
                .get(table)
                .and_then(|t| t.populated_counts.get(column).copied())
        }

        async fn enum_usage_count(&self, table: &str, column: &str) -> Option<i64> {
            self.column_populated_count(table, column).await
        }

        async fn execute(&self, sql: &str) -> MigrateResult<u64> {
            self.executed.lock().unwrap().push(sql.to_string());
            Ok(1)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn records_every_executed_statement_in_order() {
            let session = FakeSession::new();
            session.execute("CREATE TABLE \"a\" ()").await.unwrap();
            session.execute("CREATE TABLE \"b\" ()").await.unwrap();
            assert_eq!(
                session.executed_sql(),
                vec![
                    "CREATE TABLE \"a\" ()".to_string(),
                    "CREATE TABLE \"b\" ()".to_string(),
                ]
            );
        }

        #[tokio::test]
        async fn missing_table_reports_empty_columns_not_an_error() {
            let session = FakeSession::new();
            assert!(session.table_columns("ghost").await.unwrap().is_empty());
            assert!(!session.table_exists("ghost").await.unwrap());
        }
    }
}
