//! Reads the live shape of the `public` schema: tables, columns,
//! constraints, indexes, and enum types. Every reconciliation phase
//! decides what to do against a snapshot taken here; nothing in this
//! module writes.

use prax_postgres::{PgError, PgTransaction};

/// One column as reported by `information_schema.columns`.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// `udt_name`, upper-cased (e.g. `INT4`, `VARCHAR`, or an enum's
    /// `typname`).
    pub udt_name: String,
    /// True iff the underlying type is an array (`_`-prefixed `udt_name`
    /// in Postgres's catalog, or `data_type = 'ARRAY'`).
    pub is_array: bool,
    /// True iff nullable.
    pub is_nullable: bool,
    /// Raw `column_default` expression, if any.
    pub column_default: Option<String>,
    /// True iff the column is `GENERATED ALWAYS AS IDENTITY`.
    pub is_identity: bool,
}

/// One constraint as reported by `information_schema.table_constraints`.
#[derive(Debug, Clone)]
pub struct ConstraintInfo {
    /// Constraint name.
    pub name: String,
    /// `PRIMARY KEY`, `UNIQUE`, `FOREIGN KEY`, or `CHECK`.
    pub kind: String,
    /// The column this constraint covers (single-column constraints only).
    pub column: Option<String>,
    /// FK target table, if this is a foreign key.
    pub referenced_table: Option<String>,
    /// FK target column, if this is a foreign key.
    pub referenced_column: Option<String>,
    /// FK `ON DELETE` rule, if this is a foreign key.
    pub delete_rule: Option<String>,
    /// FK `ON UPDATE` rule, if this is a foreign key.
    pub update_rule: Option<String>,
    /// CHECK clause body, if this is a check constraint.
    pub check_clause: Option<String>,
}

/// One index as reported by `pg_index`.
#[derive(Debug, Clone)]
pub struct IndexInfo {
    /// Index name.
    pub name: String,
    /// Indexed columns, in index order.
    pub columns: Vec<String>,
    /// True iff this is the table's primary key index.
    pub is_primary: bool,
}

/// One enum type as reported by `pg_enum`.
#[derive(Debug, Clone)]
pub struct EnumInfo {
    /// `typname`, as stored (not case-folded).
    pub name: String,
    /// Ordered label list.
    pub values: Vec<String>,
}

/// Raw SQL used by the functions below, kept as named constants so the
/// shape of each query is reviewable independent of the plumbing that
/// runs it.
mod queries {
    pub const TABLES: &str = r#"
        SELECT table_name
        FROM information_schema.tables
        WHERE table_schema = 'public' AND table_type = 'BASE TABLE'
        ORDER BY table_name
    "#;

    pub const COLUMNS: &str = r#"
        SELECT
            column_name,
            udt_name,
            data_type = 'ARRAY' AS is_array,
            is_nullable = 'YES' AS is_nullable,
            column_default,
            is_identity = 'YES' AS is_identity
        FROM information_schema.columns
        WHERE table_schema = 'public' AND table_name = $1
        ORDER BY ordinal_position
    "#;

    pub const CONSTRAINTS: &str = r#"
        SELECT
            tc.constraint_name,
            tc.constraint_type,
            kcu.column_name,
            ccu.table_name AS referenced_table,
            ccu.column_name AS referenced_column,
            rc.delete_rule,
            rc.update_rule,
            cc.check_clause
        FROM information_schema.table_constraints tc
        LEFT JOIN information_schema.key_column_usage kcu
            ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema
        LEFT JOIN information_schema.constraint_column_usage ccu
            ON tc.constraint_name = ccu.constraint_name AND tc.table_schema = ccu.table_schema
            AND tc.constraint_type = 'FOREIGN KEY'
        LEFT JOIN information_schema.referential_constraints rc
            ON tc.constraint_name = rc.constraint_name AND tc.table_schema = rc.constraint_schema
        LEFT JOIN information_schema.check_constraints cc
            ON tc.constraint_name = cc.constraint_name AND tc.table_schema = cc.constraint_schema
        WHERE tc.table_schema = 'public' AND tc.table_name = $1
        ORDER BY tc.constraint_name, kcu.ordinal_position
    "#;

    pub const INDEXES: &str = r#"
        SELECT
            i.relname AS index_name,
            array_agg(a.attname ORDER BY array_position(ix.indkey, a.attnum)) AS columns,
            ix.indisprimary AS is_primary
        FROM pg_index ix
        JOIN pg_class i ON ix.indexrelid = i.oid
        JOIN pg_class t ON ix.indrelid = t.oid
        JOIN pg_namespace n ON t.relnamespace = n.oid
        JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
        WHERE n.nspname = 'public' AND t.relname = $1
        GROUP BY i.relname, ix.indisprimary
    "#;

    pub const ENUMS: &str = r#"
        SELECT t.typname, array_agg(e.enumlabel ORDER BY e.enumsortorder) AS values
        FROM pg_type t
        JOIN pg_namespace n ON t.typnamespace = n.oid
        JOIN pg_enum e ON t.oid = e.enumtypid
        WHERE n.nspname = 'public'
        GROUP BY t.typname
    "#;

    pub const TABLE_EXISTS: &str = r#"
        SELECT EXISTS (
            SELECT 1 FROM information_schema.tables
            WHERE table_schema = 'public' AND table_name = $1
        ) AS exists
    "#;

    pub const COLUMNS_USING_TYPE: &str = r#"
        SELECT c.table_name, c.column_name
        FROM information_schema.columns c
        WHERE c.table_schema = 'public' AND c.udt_name = $1
        ORDER BY c.table_name, c.column_name
    "#;

    pub const EXTENSIONS: &str = r#"
        SELECT extname FROM pg_extension WHERE extname <> 'plpgsql' ORDER BY extname
    "#;

    pub const ROW_COUNT: &str = r#"SELECT count(*) AS n FROM "{table}""#;

    pub const COLUMN_POPULATED_COUNT: &str =
        r#"SELECT count("{column}") AS n FROM "{table}""#;

    pub const ENUM_USAGE_COUNT: &str =
        r#"SELECT count(*) AS n FROM "{table}" WHERE "{column}" IS NOT NULL"#;
}

/// List base tables in the `public` schema.
pub async fn list_tables(session: &PgTransaction<'_>) -> Result<Vec<String>, PgError> {
    let rows = session.query(queries::TABLES, &[]).await?;
    Ok(rows.iter().map(|r| r.get("table_name")).collect())
}

/// Fetch a table's columns, or an empty list if the table does not exist.
pub async fn table_columns(
    session: &PgTransaction<'_>,
    table: &str,
) -> Result<Vec<ColumnInfo>, PgError> {
    let rows = session.query(queries::COLUMNS, &[&table]).await?;
    Ok(rows
        .iter()
        .map(|r| ColumnInfo {
            name: r.get("column_name"),
            udt_name: {
                let udt: String = r.get("udt_name");
                udt.trim_start_matches('_').to_uppercase()
            },
            is_array: r.get("is_array"),
            is_nullable: r.get("is_nullable"),
            column_default: r.get("column_default"),
            is_identity: r.get("is_identity"),
        })
        .collect())
}

/// Fetch a table's constraints.
pub async fn table_constraints(
    session: &PgTransaction<'_>,
    table: &str,
) -> Result<Vec<ConstraintInfo>, PgError> {
    let rows = session.query(queries::CONSTRAINTS, &[&table]).await?;
    Ok(rows
        .iter()
        .map(|r| ConstraintInfo {
            name: r.get("constraint_name"),
            kind: r.get("constraint_type"),
            column: r.get("column_name"),
            referenced_table: r.get("referenced_table"),
            referenced_column: r.get("referenced_column"),
            delete_rule: r.get("delete_rule"),
            update_rule: r.get("update_rule"),
            check_clause: r.get("check_clause"),
        })
        .collect())
}

/// Fetch a table's indexes.
pub async fn table_indexes(
    session: &PgTransaction<'_>,
    table: &str,
) -> Result<Vec<IndexInfo>, PgError> {
    let rows = session.query(queries::INDEXES, &[&table]).await?;
    Ok(rows
        .iter()
        .map(|r| IndexInfo {
            name: r.get("index_name"),
            columns: r.get("columns"),
            is_primary: r.get("is_primary"),
        })
        .collect())
}

/// Fetch all enum types currently in the `public` schema, keyed by
/// `typname` as stored (not case-folded).
pub async fn enums(session: &PgTransaction<'_>) -> Result<Vec<EnumInfo>, PgError> {
    let rows = session.query(queries::ENUMS, &[]).await?;
    Ok(rows
        .iter()
        .map(|r| EnumInfo {
            name: r.get("typname"),
            values: r.get("values"),
        })
        .collect())
}

/// True iff `table` currently exists in the `public` schema.
pub async fn table_exists(session: &PgTransaction<'_>, table: &str) -> Result<bool, PgError> {
    let row = session.query_one(queries::TABLE_EXISTS, &[&table]).await?;
    Ok(row.get("exists"))
}

/// Every `(table, column)` pair whose column's `udt_name` is `type_name`
/// (case-sensitive, matching how the type was created), schema-wide.
/// Used to decide whether an enum value removal or type drop is safe.
pub async fn columns_using_type(
    session: &PgTransaction<'_>,
    type_name: &str,
) -> Result<Vec<(String, String)>, PgError> {
    let rows = session.query(queries::COLUMNS_USING_TYPE, &[&type_name]).await?;
    Ok(rows
        .iter()
        .map(|r| (r.get("table_name"), r.get("column_name")))
        .collect())
}

/// Non-`plpgsql` extensions currently installed, in name order.
pub async fn extensions(session: &PgTransaction<'_>) -> Result<Vec<String>, PgError> {
    let rows = session.query(queries::EXTENSIONS, &[]).await?;
    Ok(rows.iter().map(|r| r.get("extname")).collect())
}

/// Row count for `table`, or `None` if the count failed (treated by
/// callers as "unknown, assume has data").
pub async fn row_count(session: &PgTransaction<'_>, table: &str) -> Option<i64> {
    let sql = queries::ROW_COUNT.replace("{table}", table);
    session
        .query_one(&sql, &[])
        .await
        .ok()
        .map(|row| row.get::<_, i64>("n"))
}

/// Count of non-null values in `column` of `table`, or `None` if the
/// count failed.
pub async fn column_populated_count(
    session: &PgTransaction<'_>,
    table: &str,
    column: &str,
) -> Option<i64> {
    let sql = queries::COLUMN_POPULATED_COUNT
        .replace("{table}", table)
        .replace("{column}", column);
    session
        .query_one(&sql, &[])
        .await
        .ok()
        .map(|row| row.get::<_, i64>("n"))
}

/// Count of rows in `table` whose `column` (of the enum type being
/// considered) is not null — used to decide whether an enum value
/// removal is safe.
pub async fn enum_usage_count(
    session: &PgTransaction<'_>,
    table: &str,
    column: &str,
) -> Option<i64> {
    let sql = queries::ENUM_USAGE_COUNT
        .replace("{table}", table)
        .replace("{column}", column);
    session
        .query_one(&sql, &[])
        .await
        .ok()
        .map(|row| row.get::<_, i64>("n"))
}

#[cfg(test)]
mod tests {
    use super::queries;

    #[test]
    fn table_exists_query_is_parameterized() {
        assert!(queries::TABLE_EXISTS.contains("$1"));
        assert!(queries::TABLE_EXISTS.contains("information_schema.tables"));
    }

    #[test]
    fn columns_using_type_query_scans_the_whole_schema() {
        assert!(queries::COLUMNS_USING_TYPE.contains("information_schema.columns"));
        assert!(!queries::COLUMNS_USING_TYPE.contains("table_name = $1"));
    }

    #[test]
    fn extensions_query_excludes_plpgsql() {
        assert!(queries::EXTENSIONS.contains("plpgsql"));
    }
}
