//! Canonical scalar types and the surface-string canonicalizer.
//!
//! A declared column carries a surface type string (`"int"`, `"INT4"`,
//! `"text[]"`, `"USER_ROLE"`, ...). Every other subsystem in this crate
//! works against the canonical form produced here: a closed
//! [`CanonicalType`] scalar set plus an array bit, or an opaque
//! case-folded enum name when the surface string does not match a known
//! scalar or alias.

use std::fmt;

/// The closed set of built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalType {
    /// `TEXT`.
    Text,
    /// `INTEGER`.
    Integer,
    /// `SMALLINT`.
    SmallInt,
    /// `BIGINT`.
    BigInt,
    /// `NUMERIC`.
    Numeric,
    /// `BOOLEAN`.
    Boolean,
    /// `UUID`.
    Uuid,
    /// `JSON`.
    Json,
    /// `JSONB`.
    Jsonb,
    /// `DATE`.
    Date,
    /// `TIME`.
    Time,
    /// `TIMETZ`.
    TimeTz,
    /// `TIMESTAMP`.
    Timestamp,
    /// `TIMESTAMPTZ`.
    TimestampTz,
}

impl CanonicalType {
    /// The SQL keyword used both for `CREATE TYPE`-less column emission
    /// and for casts (`::<sql_name>`).
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::SmallInt => "SMALLINT",
            Self::BigInt => "BIGINT",
            Self::Numeric => "NUMERIC",
            Self::Boolean => "BOOLEAN",
            Self::Uuid => "UUID",
            Self::Json => "JSON",
            Self::Jsonb => "JSONB",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::TimeTz => "TIMETZ",
            Self::Timestamp => "TIMESTAMP",
            Self::TimestampTz => "TIMESTAMPTZ",
        }
    }

    /// True for `INTEGER`/`SMALLINT`/`BIGINT` — the family eligible for
    /// identity-sentinel defaults and the `GENERATED ALWAYS AS IDENTITY`
    /// column form.
    pub fn is_integer_family(self) -> bool {
        matches!(self, Self::Integer | Self::SmallInt | Self::BigInt)
    }

    /// True for the four temporal scalars eligible for `now()` defaults.
    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            Self::Date | Self::Time | Self::TimeTz | Self::Timestamp | Self::TimestampTz
        )
    }

    fn from_base(base: &str) -> Option<Self> {
        Some(match base {
            "TEXT" => Self::Text,
            "INTEGER" | "INT" | "INT4" => Self::Integer,
            "SMALLINT" | "INT2" => Self::SmallInt,
            "BIGINT" | "INT8" => Self::BigInt,
            "NUMERIC" | "DECIMAL" => Self::Numeric,
            "BOOLEAN" | "BOOL" => Self::Boolean,
            "UUID" => Self::Uuid,
            "JSON" => Self::Json,
            "JSONB" => Self::Jsonb,
            "DATE" => Self::Date,
            "TIME" | "TIME WITHOUT TIME ZONE" => Self::Time,
            "TIMETZ" | "TIME WITH TIME ZONE" => Self::TimeTz,
            "TIMESTAMP" | "TIMESTAMP WITHOUT TIME ZONE" => Self::Timestamp,
            "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE" => Self::TimestampTz,
            _ => return None,
        })
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// The resolved shape of a surface type string: either a built-in scalar
/// or a reference to a user-declared enum (case-folded upper, opaque to
/// this module).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedType {
    /// A built-in scalar.
    Scalar(CanonicalType),
    /// An enum type, identified by its case-folded-upper name.
    Enum(String),
}

impl ResolvedType {
    /// The name used to key this type for comparisons (scalar SQL name
    /// or enum identifier) ignoring array-ness.
    pub fn base_name(&self) -> &str {
        match self {
            Self::Scalar(s) => s.sql_name(),
            Self::Enum(name) => name.as_str(),
        }
    }
}

/// A fully canonicalized type: a resolved base plus an array bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonical {
    /// The resolved scalar or enum reference.
    pub base: ResolvedType,
    /// True iff the surface string carried a trailing `[]`.
    pub is_array: bool,
}

impl Canonical {
    /// Emission SQL for this type: builtin scalars unquoted, enums
    /// double-quoted, with the array suffix preserved.
    pub fn emit_sql(&self) -> String {
        let base = match &self.base {
            ResolvedType::Scalar(s) => s.sql_name().to_string(),
            ResolvedType::Enum(name) => format!("\"{name}\""),
        };
        if self.is_array {
            format!("{base}[]")
        } else {
            base
        }
    }
}

/// Maps surface type strings (aliases, array suffix, case) to their
/// canonical form.
///
/// `canon` is idempotent: re-canonicalizing an already-canonical SQL name
/// (e.g. `"INTEGER[]"`) yields the same [`Canonical`].
pub struct TypeCanonicalizer;

impl TypeCanonicalizer {
    /// Canonicalize a surface type string. Unmapped non-scalar bases are
    /// treated as enum references (case-folded upper).
    pub fn canon(surface: &str) -> Canonical {
        let trimmed = surface.trim();
        let upper = trimmed.to_uppercase();
        let (base_str, is_array) = match upper.strip_suffix("[]") {
            Some(rest) => (rest.trim(), true),
            None => (upper.as_str(), false),
        };

        let unquoted = base_str
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(base_str);

        let base = match CanonicalType::from_base(unquoted) {
            Some(scalar) => ResolvedType::Scalar(scalar),
            None => ResolvedType::Enum(unquoted.to_string()),
        };

        Canonical { base, is_array }
    }

    /// True iff `surface` canonicalizes to a known scalar or to a name
    /// present in `known_enums` (case-folded upper comparison is the
    /// caller's responsibility — `known_enums` should already be
    /// upper-cased, as [`crate::enum_registry::EnumRegistry`] keys are).
    pub fn is_recognized(surface: &str, known_enums: &[String]) -> bool {
        match TypeCanonicalizer::canon(surface).base {
            ResolvedType::Scalar(_) => true,
            ResolvedType::Enum(name) => known_enums.iter().any(|e| e == &name),
        }
    }
}
