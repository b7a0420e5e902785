//! Error types for schema declaration and validation.

use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while registering and validating a declared schema
/// (models, enums, relations) before any DDL is considered.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    /// An enum name was registered twice with different value lists.
    #[error("enum `{name}` was redefined with different values")]
    EnumRedefined {
        /// Case-folded enum name.
        name: String,
    },

    /// Two differently-named enums declared the same ordered value list.
    #[error("enum `{name}` duplicates the value list of `{other}`")]
    EnumDuplicateValues {
        /// The enum being registered.
        name: String,
        /// The enum it collides with.
        other: String,
    },

    /// A relation's target model does not exist.
    #[error("relation `{model}.{column}` references unknown model `{target}`")]
    RelationTargetMissing {
        /// Source model.
        model: String,
        /// Source column.
        column: String,
        /// Referenced model name.
        target: String,
    },

    /// A relation's target column does not exist on the target model.
    #[error("relation `{model}.{column}` references unknown column `{target_model}.{target_column}`")]
    RelationColumnMissing {
        /// Source model.
        model: String,
        /// Source column.
        column: String,
        /// Referenced model.
        target_model: String,
        /// Referenced column.
        target_column: String,
    },

    /// A relation kind alias did not resolve to ONE-TO-ONE/ONE-TO-MANY/MANY-TO-MANY.
    #[error("relation `{model}.{column}` has an invalid relation kind `{kind}`")]
    RelationKindInvalid {
        /// Source model.
        model: String,
        /// Source column.
        column: String,
        /// The unrecognized surface string.
        kind: String,
    },

    /// The referenced column's base canonical type does not match.
    #[error(
        "relation `{model}.{column}` type `{column_type}` does not match target `{target_model}.{target_column}` type `{target_type}`"
    )]
    RelationTypeMismatch {
        /// Source model.
        model: String,
        /// Source column.
        column: String,
        /// Source column's canonical type.
        column_type: String,
        /// Target model.
        target_model: String,
        /// Target column.
        target_column: String,
        /// Target column's canonical type.
        target_type: String,
    },

    /// Array-ness did not match the relation kind's requirement.
    #[error("relation `{model}.{column}` array-ness is incompatible with relation kind {kind}")]
    RelationArrayMismatch {
        /// Source model.
        model: String,
        /// Source column.
        column: String,
        /// The relation kind that was violated.
        kind: String,
    },

    /// An FK action string did not match one of the accepted actions.
    #[error("relation `{model}.{column}` has an invalid FK action `{action}`")]
    FkActionInvalid {
        /// Source model.
        model: String,
        /// Source column.
        column: String,
        /// The unrecognized action string.
        action: String,
    },

    /// The relation graph's dependency edges contain a cycle.
    #[error("cyclic relations detected among models: {models:?}")]
    CyclicRelations {
        /// The models involved in the residual cycle, after Kahn's
        /// algorithm has removed every resolvable node.
        models: Vec<String>,
    },

    /// Two columns in one model share a case-insensitive name.
    #[error("model `{model}` declares duplicate column `{column}`")]
    DuplicateColumnName {
        /// Model name.
        model: String,
        /// The duplicated column name.
        column: String,
    },

    /// A declared default value does not fit the column's canonical type.
    #[error("model `{model}` column `{column}` has an invalid default: {message}")]
    DefaultInvalid {
        /// Model name.
        model: String,
        /// Column name.
        column: String,
        /// Why the default was rejected.
        message: String,
    },

    /// A CHECK expression failed to parse.
    #[error("model `{model}` column `{column}` has an invalid CHECK expression: {message}")]
    CheckSyntax {
        /// Model name.
        model: String,
        /// Column name.
        column: String,
        /// Parser diagnostic.
        message: String,
    },

    /// A surface type string did not canonicalize to a known scalar or
    /// registered enum.
    #[error("model `{model}` column `{column}` has unknown type `{type_name}`")]
    TypeUnknown {
        /// Model name.
        model: String,
        /// Column name.
        column: String,
        /// The unrecognized surface type string.
        type_name: String,
    },

    /// More than one column in a model was marked primary.
    #[error("model `{model}` declares multiple primary key columns: {columns:?}")]
    MultiplePrimaryKeys {
        /// Model name.
        model: String,
        /// The offending column names.
        columns: Vec<String>,
    },
}

impl SchemaError {
    /// Create an [`SchemaError::EnumRedefined`].
    pub fn enum_redefined(name: impl Into<String>) -> Self {
        Self::EnumRedefined { name: name.into() }
    }

    /// Create an [`SchemaError::EnumDuplicateValues`].
    pub fn enum_duplicate_values(name: impl Into<String>, other: impl Into<String>) -> Self {
        Self::EnumDuplicateValues {
            name: name.into(),
            other: other.into(),
        }
    }

    /// Create a [`SchemaError::DefaultInvalid`].
    pub fn default_invalid(
        model: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DefaultInvalid {
            model: model.into(),
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a [`SchemaError::CheckSyntax`].
    pub fn check_syntax(
        model: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::CheckSyntax {
            model: model.into(),
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a [`SchemaError::TypeUnknown`].
    pub fn type_unknown(
        model: impl Into<String>,
        column: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self::TypeUnknown {
            model: model.into(),
            column: column.into(),
            type_name: type_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = SchemaError::enum_redefined("USER_ROLE");
        assert!(err.to_string().contains("USER_ROLE"));

        let err = SchemaError::default_invalid("users", "role", "not a member of the enum");
        let msg = err.to_string();
        assert!(msg.contains("users"));
        assert!(msg.contains("role"));
    }

    #[test]
    fn cyclic_relations_lists_models() {
        let err = SchemaError::CyclicRelations {
            models: vec!["a".to_string(), "b".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains('a') && msg.contains('b'));
    }
}
