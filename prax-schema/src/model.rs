//! Model declaration and normalization.

use crate::canon::TypeCanonicalizer;
use crate::check;
use crate::column::{ColumnConfig, ColumnSqlBuilder, NormalizedColumn};
use crate::default_value::{DeclaredDefault, DefaultValidator};
use crate::enum_registry::EnumRegistry;
use crate::error::SchemaError;
use crate::relation::{ModelRelations, RelationKind};

/// A model as declared by the caller: a table name, its columns, and
/// optional single-column indexes.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Table name, as declared.
    pub table: String,
    /// Declared columns.
    pub columns: Vec<ColumnConfig>,
    /// Column names to index (single-column only).
    pub indexes: Vec<String>,
}

impl ModelConfig {
    /// Construct a model with no columns or indexes.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }
}

/// A fully normalized model: validated columns, derived metadata, and
/// the SQL to create the table from scratch.
pub struct ModelRuntime {
    /// Lower-cased table name.
    pub table: String,
    /// Normalized columns, in declared order with `created_at`/`updated_at`
    /// appended if absent.
    pub columns: Vec<NormalizedColumn>,
    /// Declared index column names.
    pub indexes: Vec<String>,
    /// Accumulated validation errors. Non-empty means this model is not
    /// migrated — its `create_table_sql` is empty and `is_valid()` is
    /// false.
    pub errors: Vec<SchemaError>,
}

impl ModelRuntime {
    /// Normalize `config` against the given enum registry. Always
    /// returns a runtime; check `errors`/`is_valid()` to see whether it
    /// may be migrated.
    pub fn build(config: &ModelConfig, enums: &EnumRegistry) -> Self {
        let table = config.table.to_lowercase();
        let mut errors = Vec::new();
        let mut seen_names = std::collections::HashSet::new();

        let mut declared = config.columns.clone();
        ensure_timestamp_column(&mut declared, "created_at");
        ensure_timestamp_column(&mut declared, "updated_at");

        let mut columns = Vec::with_capacity(declared.len());
        let mut primary_names = Vec::new();

        for col in &declared {
            let name = col.name.to_lowercase();
            if !seen_names.insert(name.clone()) {
                errors.push(SchemaError::DuplicateColumnName {
                    model: table.clone(),
                    column: name.clone(),
                });
                continue;
            }

            let canonical = TypeCanonicalizer::canon(&col.r#type);
            let known_enum_names = enums.names();
            let recognized = TypeCanonicalizer::is_recognized(&col.r#type, &known_enum_names);
            if !recognized {
                errors.push(SchemaError::type_unknown(&table, &name, &col.r#type));
            }

            let is_many_to_many = col
                .references
                .as_ref()
                .map(|r| matches!(r.kind, RelationKind::ManyToMany))
                .unwrap_or(false);
            let is_one_to_one = col
                .references
                .as_ref()
                .map(|r| matches!(r.kind, RelationKind::OneToOne))
                .unwrap_or(false);

            if col.primary {
                primary_names.push(name.clone());
            }

            let not_null = if col.primary {
                true
            } else if is_one_to_one {
                col.references
                    .as_ref()
                    .and_then(|r| r.not_null_override)
                    .unwrap_or(true)
            } else {
                col.not_null.unwrap_or(false)
            };

            let unique = if col.primary {
                false
            } else {
                col.unique || is_one_to_one
            };

            let enum_values = match &canonical.base {
                crate::canon::ResolvedType::Enum(name) => enums.get(name).map(|v| v.to_vec()),
                crate::canon::ResolvedType::Scalar(_) => None,
            };

            let is_identity = matches!(col.default, Some(DeclaredDefault::IdentitySentinel));

            let default = match &col.default {
                Some(decl) => match DefaultValidator::validate(decl, &canonical, enum_values.as_deref())
                {
                    Ok(v) => Some(v),
                    Err(message) => {
                        errors.push(SchemaError::default_invalid(&table, &name, message));
                        None
                    }
                },
                None => None,
            };

            let check_sql = match &col.check {
                Some(src) => match check::parse_for_column(&table, &name, src) {
                    Ok(sql) => Some(sql),
                    Err(e) => {
                        errors.push(e);
                        None
                    }
                },
                None => None,
            };

            columns.push(NormalizedColumn {
                name,
                canonical,
                primary: col.primary,
                unique,
                not_null,
                default,
                check_sql,
                references: col.references.clone(),
                is_virtual: is_many_to_many,
                is_identity,
            });
        }

        if primary_names.len() > 1 {
            errors.push(SchemaError::MultiplePrimaryKeys {
                model: table.clone(),
                columns: primary_names,
            });
        }

        Self {
            table,
            columns,
            indexes: config.indexes.clone(),
            errors,
        }
    }

    /// True iff normalization produced no validation errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The primary key column name, defaulting to `"id"` if no column
    /// was declared primary.
    pub fn primary_key(&self) -> String {
        self.columns
            .iter()
            .find(|c| c.primary)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "id".to_string())
    }

    /// The canonical type of the primary key column, used by junction-table
    /// FK emission. Falls back to UUID if no primary column is declared
    /// (matching the default `"id"` name's conventional type).
    pub fn primary_key_sql(&self) -> String {
        self.columns
            .iter()
            .find(|c| c.primary)
            .map(|c| c.canonical.emit_sql())
            .unwrap_or_else(|| "UUID".to_string())
    }

    /// The view of this model [`crate::relation::RelationGraph`] needs:
    /// its table name, declared references, and every column's canonical
    /// type.
    pub fn relation_view(&self) -> ModelRelations<'_> {
        ModelRelations {
            table: &self.table,
            references: self
                .columns
                .iter()
                .filter_map(|c| c.references.as_ref().map(|r| (c.name.as_str(), r)))
                .collect(),
            columns: self
                .columns
                .iter()
                .map(|c| (c.name.clone(), c.canonical.clone()))
                .collect(),
        }
    }

    /// Full `CREATE TABLE` statement. Empty if `!is_valid()`.
    pub fn create_table_sql(&self) -> String {
        if !self.is_valid() {
            return String::new();
        }

        let fragments: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !c.is_virtual)
            .map(|c| ColumnSqlBuilder::build(c, &self.table))
            .collect();

        format!(
            "CREATE TABLE \"{}\" (\n    {}\n)",
            self.table,
            fragments.join(",\n    ")
        )
    }
}

fn ensure_timestamp_column(columns: &mut Vec<ColumnConfig>, name: &str) {
    if columns.iter().any(|c| c.name.eq_ignore_ascii_case(name)) {
        return;
    }
    let mut col = ColumnConfig::new(name, "timestamptz");
    col.not_null = Some(true);
    col.default = Some(DeclaredDefault::NowSentinel);
    columns.push(col);
}
