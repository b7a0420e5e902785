//! Declared and normalized column representations, and the SQL
//! fragment builder for a single normalized column.

use crate::canon::{Canonical, ResolvedType, TypeCanonicalizer};
use crate::default_value::{DeclaredDefault, DefaultValidator, ValidatedDefault};
use crate::relation::{FkAction, Reference};

/// A column as declared by the caller, before normalization.
#[derive(Debug, Clone)]
pub struct ColumnConfig {
    /// Column name, as declared.
    pub name: String,
    /// Surface type string.
    pub r#type: String,
    /// Declared primary-key flag.
    pub primary: bool,
    /// Declared unique flag.
    pub unique: bool,
    /// Declared NOT NULL flag (`None` means unspecified: defaults to
    /// nullable, except where a relation kind implies otherwise).
    pub not_null: Option<bool>,
    /// Declared default value, if any.
    pub default: Option<DeclaredDefault>,
    /// Declared CHECK expression source, if any.
    pub check: Option<String>,
    /// Declared FK reference, if any.
    pub references: Option<Reference>,
}

impl ColumnConfig {
    /// Construct a plain column with only a name and type.
    pub fn new(name: impl Into<String>, r#type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            r#type: r#type.into(),
            primary: false,
            unique: false,
            not_null: None,
            default: None,
            check: None,
            references: None,
        }
    }
}

/// A column after [`crate::model::ModelRuntime`] normalization.
#[derive(Debug, Clone)]
pub struct NormalizedColumn {
    /// Lower-cased column name.
    pub name: String,
    /// Canonicalized type.
    pub canonical: Canonical,
    /// True iff primary key.
    pub primary: bool,
    /// True iff UNIQUE (explicit or implied by a ONE-TO-ONE reference).
    pub unique: bool,
    /// True iff NOT NULL (explicit, implied by primary key, or implied
    /// by a ONE-TO-ONE reference).
    pub not_null: bool,
    /// Validated default, if any.
    pub default: Option<ValidatedDefault>,
    /// Parsed CHECK SQL, if any.
    pub check_sql: Option<String>,
    /// FK reference, if any.
    pub references: Option<Reference>,
    /// True iff this column exists only in metadata (many-to-many
    /// marker) and produces no DDL.
    pub is_virtual: bool,
    /// True iff this column became an identity column (suppresses
    /// DEFAULT emission, emits `GENERATED ALWAYS AS IDENTITY`).
    pub is_identity: bool,
}

impl NormalizedColumn {
    /// True iff this is an array-typed column.
    pub fn is_array(&self) -> bool {
        self.canonical.is_array
    }

    /// True iff this column's base type is a registered enum.
    pub fn is_enum_type(&self) -> bool {
        matches!(self.canonical.base, ResolvedType::Enum(_))
    }
}

/// Emits the DDL fragment for one normalized column.
pub struct ColumnSqlBuilder;

impl ColumnSqlBuilder {
    /// Build the column fragment used inside `CREATE TABLE (...)`.
    /// Virtual columns emit an empty string.
    pub fn build(column: &NormalizedColumn, table: &str) -> String {
        if column.is_virtual {
            return String::new();
        }

        let mut parts = Vec::new();
        parts.push(format!("\"{}\"", escape_ident(&column.name)));

        if column.is_identity {
            let base = TypeCanonicalizer::canon(&column.canonical.emit_sql());
            let type_name = match base.base {
                ResolvedType::Scalar(scalar) => scalar.sql_name(),
                ResolvedType::Enum(_) => unreachable!("identity columns are integer-family scalars"),
            };
            parts.push(format!("{type_name} GENERATED ALWAYS AS IDENTITY"));
        } else {
            parts.push(column.canonical.emit_sql());
        }

        if column.primary {
            parts.push("PRIMARY KEY".to_string());
        } else {
            if column.not_null {
                parts.push("NOT NULL".to_string());
            }
            if column.unique {
                parts.push("UNIQUE".to_string());
            }
        }

        if !column.is_identity {
            if let Some(default) = &column.default {
                if let Some(sql) = default.emit_sql() {
                    parts.push(format!("DEFAULT {sql}"));
                }
            }
        }

        if let Some(check_sql) = &column.check_sql {
            parts.push(format!(
                "CONSTRAINT \"{}\" CHECK ({check_sql})",
                check_constraint_name(table, &column.name)
            ));
        }

        if let (false, Some(reference)) = (column.is_virtual, &column.references) {
            parts.push(format!(
                "REFERENCES \"{}\"(\"{}\") ON DELETE {} ON UPDATE {}",
                escape_ident(&reference.target_model.to_lowercase()),
                escape_ident(&reference.target_column.to_lowercase()),
                reference.on_delete.sql(),
                reference.on_update.sql(),
            ));
        }

        parts.join(" ")
    }
}

/// Double any embedded `"` in a SQL identifier.
pub fn escape_ident(ident: &str) -> String {
    ident.replace('"', "\"\"")
}

/// Canonical FK constraint name: `<table>_<col>_fkey`.
pub fn fk_constraint_name(table: &str, column: &str) -> String {
    format!("{table}_{column}_fkey")
}

/// Canonical CHECK constraint name: `<table>_<col>_check`.
pub fn check_constraint_name(table: &str, column: &str) -> String {
    format!("{table}_{column}_check")
}

/// Canonical index name: `<table>_<col>_idx`.
pub fn index_name(table: &str, column: &str) -> String {
    format!("{table}_{column}_idx")
}
