//! Validation of declared column default values against their canonical
//! type.

use crate::canon::{Canonical, CanonicalType, ResolvedType};

/// A default value after validation, distinguishing identity sentinels
/// (which suppress `DEFAULT` emission in favor of `GENERATED ALWAYS AS
/// IDENTITY`) from ordinary literal/function defaults.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedDefault {
    /// One of `int()`, `smallint()`, `bigint()` — emits no `DEFAULT`;
    /// the column becomes an identity column.
    Identity,
    /// `uuid()` on a `UUID` column — emits `gen_random_uuid()`.
    Uuid,
    /// `now()` on a temporal column — emits the matching `CURRENT_*`
    /// with the cast already applied.
    Now {
        /// The SQL to emit as the DEFAULT expression.
        sql: String,
    },
    /// Any other literal default, already rendered to SQL.
    Literal {
        /// The SQL to emit as the DEFAULT expression.
        sql: String,
    },
    /// An array literal default; each element independently validated.
    Array {
        /// The SQL array literal, e.g. `'{1,2,3}'`.
        sql: String,
    },
}

impl ValidatedDefault {
    /// True for identity sentinels, which never contribute a `DEFAULT`
    /// clause: they mark the column as database-generated rather than
    /// supplying an emittable default expression.
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    /// The SQL fragment to place after `DEFAULT`, or `None` for identity
    /// sentinels.
    pub fn emit_sql(&self) -> Option<&str> {
        match self {
            Self::Identity => None,
            Self::Uuid => Some("gen_random_uuid()"),
            Self::Now { sql } | Self::Literal { sql } | Self::Array { sql } => Some(sql),
        }
    }
}

/// Declared default source forms accepted from the caller before
/// validation: either a raw scalar/array literal, or one of the three
/// identity/uuid/now sentinel function calls.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredDefault {
    /// `int()` / `smallint()` / `bigint()`.
    IdentitySentinel,
    /// `uuid()`.
    UuidSentinel,
    /// `now()`.
    NowSentinel,
    /// A boolean literal.
    Bool(bool),
    /// A numeric literal (kept as text to avoid float/decimal rounding).
    Number(String),
    /// A string literal.
    Text(String),
    /// An ordered list of nested defaults (array default).
    Array(Vec<DeclaredDefault>),
    /// An enum member name.
    EnumValue(String),
}

/// Validates a [`DeclaredDefault`] against a column's canonical type,
/// producing a [`ValidatedDefault`] or a human-readable rejection
/// reason.
pub struct DefaultValidator;

impl DefaultValidator {
    /// Validate `default` against `canonical`. `enum_values`, when the
    /// column's base is an enum, is the registered ordered value list
    /// (already case-folded upper) used to check enum-default membership.
    pub fn validate(
        default: &DeclaredDefault,
        canonical: &Canonical,
        enum_values: Option<&[String]>,
    ) -> Result<ValidatedDefault, String> {
        if canonical.is_array {
            let DeclaredDefault::Array(elements) = default else {
                return Err("array column requires an array default".to_string());
            };
            let scalar_shape = Canonical {
                base: canonical.base.clone(),
                is_array: false,
            };
            let mut rendered = Vec::with_capacity(elements.len());
            for element in elements {
                let validated = Self::validate(element, &scalar_shape, enum_values)?;
                let sql = validated
                    .emit_sql()
                    .ok_or("array elements cannot be identity sentinels")?
                    .to_string();
                rendered.push(Self::array_element_text(&sql));
            }
            return Ok(ValidatedDefault::Array {
                sql: format!("'{{{}}}'", rendered.join(",")),
            });
        }

        match (&canonical.base, default) {
            (_, DeclaredDefault::IdentitySentinel) => {
                let ResolvedType::Scalar(scalar) = &canonical.base else {
                    return Err("identity sentinel is only valid on integer-family types".to_string());
                };
                if scalar.is_integer_family() {
                    Ok(ValidatedDefault::Identity)
                } else {
                    Err("identity sentinel is only valid on integer-family types".to_string())
                }
            }
            (ResolvedType::Scalar(CanonicalType::Uuid), DeclaredDefault::UuidSentinel) => {
                Ok(ValidatedDefault::Uuid)
            }
            (_, DeclaredDefault::UuidSentinel) => {
                Err("uuid() is only valid on UUID columns".to_string())
            }
            (ResolvedType::Scalar(scalar), DeclaredDefault::NowSentinel) if scalar.is_temporal() => {
                let sql = match scalar {
                    CanonicalType::Date => "CURRENT_DATE".to_string(),
                    CanonicalType::Time => "(CURRENT_TIME::time)".to_string(),
                    CanonicalType::TimeTz => "CURRENT_TIME".to_string(),
                    CanonicalType::Timestamp => "(CURRENT_TIMESTAMP::timestamp)".to_string(),
                    CanonicalType::TimestampTz => "CURRENT_TIMESTAMP".to_string(),
                    _ => unreachable!("is_temporal() guards this match"),
                };
                Ok(ValidatedDefault::Now { sql })
            }
            (_, DeclaredDefault::NowSentinel) => {
                Err("now() is only valid on temporal types".to_string())
            }
            (ResolvedType::Scalar(scalar), DeclaredDefault::Number(n))
                if scalar.is_integer_family() || matches!(scalar, CanonicalType::Numeric) =>
            {
                Ok(ValidatedDefault::Literal { sql: n.clone() })
            }
            (_, DeclaredDefault::Number(_)) => {
                Err("numeric default is only valid on integer or numeric types".to_string())
            }
            (ResolvedType::Scalar(CanonicalType::Boolean), DeclaredDefault::Bool(b)) => {
                Ok(ValidatedDefault::Literal {
                    sql: if *b { "TRUE" } else { "FALSE" }.to_string(),
                })
            }
            (_, DeclaredDefault::Bool(_)) => {
                Err("boolean default is only valid on BOOLEAN columns".to_string())
            }
            (ResolvedType::Scalar(CanonicalType::Text), DeclaredDefault::Text(s)) => {
                Ok(ValidatedDefault::Literal {
                    sql: format!("'{}'", s.replace('\'', "''")),
                })
            }
            (ResolvedType::Scalar(scalar), DeclaredDefault::Text(s)) if scalar.is_temporal() => {
                if chrono::DateTime::parse_from_rfc3339(s).is_ok()
                    || chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                    || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
                {
                    Ok(ValidatedDefault::Literal {
                        sql: format!("'{}'::{}", s.replace('\'', "''"), scalar.sql_name()),
                    })
                } else {
                    Err(format!("`{s}` is not an ISO-parsable value for {scalar}"))
                }
            }
            (_, DeclaredDefault::Text(_)) => {
                Err("string default is only valid on TEXT or temporal types".to_string())
            }
            (ResolvedType::Enum(name), DeclaredDefault::EnumValue(v)) => {
                let upper = v.to_uppercase();
                let Some(values) = enum_values else {
                    return Err(format!("enum `{name}` has no registered values"));
                };
                if values.iter().any(|existing| existing == &upper) {
                    Ok(ValidatedDefault::Literal {
                        sql: format!("'{}'", upper.replace('\'', "''")),
                    })
                } else {
                    Err(format!("`{v}` is not a member of enum `{name}`"))
                }
            }
            (_, DeclaredDefault::EnumValue(v)) => {
                Err(format!("`{v}` is an enum value but the column is not an enum type"))
            }
            (_, DeclaredDefault::Array(_)) => {
                Err("array default on a non-array column".to_string())
            }
        }
    }

    fn array_element_text(sql: &str) -> String {
        match sql {
            "TRUE" => "t".to_string(),
            "FALSE" => "f".to_string(),
            s if s.starts_with('\'') && s.ends_with('\'') => {
                format!("\"{}\"", &s[1..s.len() - 1])
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::TypeCanonicalizer;

    fn canon(s: &str) -> Canonical {
        TypeCanonicalizer::canon(s)
    }

    #[test]
    fn identity_sentinel_on_integer_family() {
        let result =
            DefaultValidator::validate(&DeclaredDefault::IdentitySentinel, &canon("integer"), None)
                .unwrap();
        assert!(result.is_identity());
        assert_eq!(result.emit_sql(), None);
    }

    #[test]
    fn identity_sentinel_rejected_on_text() {
        assert!(
            DefaultValidator::validate(&DeclaredDefault::IdentitySentinel, &canon("text"), None)
                .is_err()
        );
    }

    #[test]
    fn uuid_sentinel_only_on_uuid() {
        let ok = DefaultValidator::validate(&DeclaredDefault::UuidSentinel, &canon("uuid"), None)
            .unwrap();
        assert_eq!(ok.emit_sql(), Some("gen_random_uuid()"));
        assert!(
            DefaultValidator::validate(&DeclaredDefault::UuidSentinel, &canon("text"), None)
                .is_err()
        );
    }

    #[test]
    fn now_sentinel_emits_cast_per_temporal_type() {
        let ts = DefaultValidator::validate(&DeclaredDefault::NowSentinel, &canon("timestamptz"), None)
            .unwrap();
        assert_eq!(ts.emit_sql(), Some("CURRENT_TIMESTAMP"));

        let time = DefaultValidator::validate(&DeclaredDefault::NowSentinel, &canon("time"), None)
            .unwrap();
        assert_eq!(time.emit_sql(), Some("(CURRENT_TIME::time)"));
    }

    #[test]
    fn numeric_literal_on_integer_and_numeric() {
        assert!(
            DefaultValidator::validate(
                &DeclaredDefault::Number("42".to_string()),
                &canon("integer"),
                None
            )
            .is_ok()
        );
        assert!(
            DefaultValidator::validate(
                &DeclaredDefault::Number("3.14".to_string()),
                &canon("numeric"),
                None
            )
            .is_ok()
        );
        assert!(
            DefaultValidator::validate(
                &DeclaredDefault::Number("42".to_string()),
                &canon("text"),
                None
            )
            .is_err()
        );
    }

    #[test]
    fn enum_default_must_match_case_insensitively() {
        let values = vec!["ADMIN".to_string(), "STUDENT".to_string()];
        let ok = DefaultValidator::validate(
            &DeclaredDefault::EnumValue("admin".to_string()),
            &canon("user_role"),
            Some(&values),
        )
        .unwrap();
        assert_eq!(ok.emit_sql(), Some("'ADMIN'"));

        assert!(
            DefaultValidator::validate(
                &DeclaredDefault::EnumValue("guest".to_string()),
                &canon("user_role"),
                Some(&values)
            )
            .is_err()
        );
    }

    #[test]
    fn array_default_validates_each_element() {
        let values = vec!["ADMIN".to_string(), "STUDENT".to_string()];
        let result = DefaultValidator::validate(
            &DeclaredDefault::Array(vec![
                DeclaredDefault::EnumValue("admin".to_string()),
                DeclaredDefault::EnumValue("student".to_string()),
            ]),
            &canon("user_role[]"),
            Some(&values),
        )
        .unwrap();
        assert_eq!(result.emit_sql(), Some("'{\"ADMIN\",\"STUDENT\"}'"));
    }

    #[test]
    fn array_default_rejects_bad_element() {
        assert!(
            DefaultValidator::validate(
                &DeclaredDefault::Array(vec![DeclaredDefault::Bool(true)]),
                &canon("text[]"),
                None
            )
            .is_err()
        );
    }

    #[test]
    fn iso_parsable_string_accepted_on_date() {
        assert!(
            DefaultValidator::validate(
                &DeclaredDefault::Text("2024-01-01".to_string()),
                &canon("date"),
                None
            )
            .is_ok()
        );
        assert!(
            DefaultValidator::validate(
                &DeclaredDefault::Text("not-a-date".to_string()),
                &canon("date"),
                None
            )
            .is_err()
        );
    }
}
