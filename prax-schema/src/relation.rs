//! Relation kinds, foreign-key actions, and the relation dependency
//! graph.

use std::collections::{BTreeMap, BTreeSet};

use crate::canon::Canonical;
use crate::error::SchemaError;

/// The three relation kinds a reference column may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// `nn` / `1:1` / `o2o`.
    OneToOne,
    /// `nm` / `1:m` / `one-to-many`.
    OneToMany,
    /// `mm` / `m:m` / `many-to-many`.
    ManyToMany,
}

impl RelationKind {
    /// Parse a surface alias (case-insensitive).
    pub fn parse(surface: &str) -> Option<Self> {
        Some(match surface.to_lowercase().as_str() {
            "nn" | "1:1" | "o2o" | "one-to-one" => Self::OneToOne,
            "nm" | "1:m" | "one-to-many" => Self::OneToMany,
            "mm" | "m:m" | "many-to-many" => Self::ManyToMany,
            _ => return None,
        })
    }

    /// Human-readable label used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::OneToOne => "ONE-TO-ONE",
            Self::OneToMany => "ONE-TO-MANY",
            Self::ManyToMany => "MANY-TO-MANY",
        }
    }
}

/// Accepted foreign-key referential actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FkAction {
    /// `CASCADE` — the default.
    Cascade,
    /// `SET NULL`.
    SetNull,
    /// `SET DEFAULT`.
    SetDefault,
    /// `RESTRICT`.
    Restrict,
    /// `NO ACTION`.
    NoAction,
}

impl Default for FkAction {
    fn default() -> Self {
        Self::Cascade
    }
}

impl FkAction {
    /// Parse a surface action string (case-insensitive).
    pub fn parse(surface: &str) -> Option<Self> {
        Some(match surface.to_uppercase().as_str() {
            "CASCADE" => Self::Cascade,
            "SET NULL" => Self::SetNull,
            "SET DEFAULT" => Self::SetDefault,
            "RESTRICT" => Self::Restrict,
            "NO ACTION" => Self::NoAction,
            _ => return None,
        })
    }

    /// SQL keyword text.
    pub fn sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
        }
    }
}

/// A declared reference from one column to another model's column.
#[derive(Debug, Clone)]
pub struct Reference {
    /// Target model name, as declared (not yet case-folded).
    pub target_model: String,
    /// Target column name.
    pub target_column: String,
    /// Relation kind.
    pub kind: RelationKind,
    /// `ON DELETE` action.
    pub on_delete: FkAction,
    /// `ON UPDATE` action.
    pub on_update: FkAction,
    /// Explicit `notNull` opt-out for a ONE-TO-ONE relation (`None`
    /// means "use the implied NOT NULL").
    pub not_null_override: Option<bool>,
}

impl Reference {
    /// Build a reference from the surface strings a model declaration
    /// carries for `relation`/`onDelete`/`onUpdate`. `model`/`column` are
    /// only used to label diagnostics.
    pub fn from_surface(
        model: &str,
        column: &str,
        target_model: impl Into<String>,
        target_column: impl Into<String>,
        kind: &str,
        on_delete: Option<&str>,
        on_update: Option<&str>,
        not_null_override: Option<bool>,
    ) -> Result<Self, SchemaError> {
        let parsed_kind = RelationKind::parse(kind).ok_or_else(|| SchemaError::RelationKindInvalid {
            model: model.to_string(),
            column: column.to_string(),
            kind: kind.to_string(),
        })?;

        let parse_action = |surface: &str| {
            FkAction::parse(surface).ok_or_else(|| SchemaError::FkActionInvalid {
                model: model.to_string(),
                column: column.to_string(),
                action: surface.to_string(),
            })
        };

        let on_delete = on_delete.map(parse_action).transpose()?.unwrap_or_default();
        let on_update = on_update.map(parse_action).transpose()?.unwrap_or_default();

        Ok(Self {
            target_model: target_model.into(),
            target_column: target_column.into(),
            kind: parsed_kind,
            on_delete,
            on_update,
            not_null_override,
        })
    }
}

/// A resolved outgoing or incoming relation descriptor attached to a
/// model after [`RelationGraph`] validation.
#[derive(Debug, Clone)]
pub struct RelationDescriptor {
    /// The relation kind.
    pub kind: RelationKind,
    /// The other model's name (case-folded as declared).
    pub other_table: String,
    /// The column on this model carrying the reference (for outgoing)
    /// or owning the column for the FK (for incoming).
    pub column: String,
    /// True iff source and target model are the same (self-reference).
    pub is_self: bool,
}

/// Minimal view of a model the graph needs: its name, declared
/// references, and every column's canonical type. [`crate::model::ModelRuntime`]
/// implements the translation from a full model into this shape.
pub struct ModelRelations<'a> {
    /// Case-folded table name.
    pub table: &'a str,
    /// `(column_name, reference)` pairs declared on this model.
    pub references: Vec<(&'a str, &'a Reference)>,
    /// `(column_name, canonical_type)` for every column declared on this
    /// model (case-folded), used both for existence checks and to confirm
    /// a reference's column matches its target's base type and array-ness.
    pub columns: Vec<(String, Canonical)>,
}

impl ModelRelations<'_> {
    fn column_type(&self, name: &str) -> Option<&Canonical> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }
}

/// Per-model outgoing/incoming relation lists, plus an ordering of
/// model names safe to create tables in (dependency targets first).
#[derive(Debug, Default)]
pub struct RelationGraph {
    /// `table -> outgoing relations`.
    pub outgoing: BTreeMap<String, Vec<RelationDescriptor>>,
    /// `table -> incoming relations`.
    pub incoming: BTreeMap<String, Vec<RelationDescriptor>>,
    /// Topologically sorted table names (targets before sources),
    /// alphabetical tiebreak among simultaneously-ready nodes.
    pub order: Vec<String>,
}

impl RelationGraph {
    /// Build and validate the graph from a set of models. Returns the
    /// first validation error encountered rather than accumulating all
    /// of them (unlike `EnumRegistry`/`ModelRuntime` validation), since a
    /// cyclic or dangling reference blocks the whole run regardless.
    pub fn build(models: &[ModelRelations<'_>]) -> Result<Self, SchemaError> {
        let table_names: BTreeSet<String> = models.iter().map(|m| m.table.to_string()).collect();
        let mut graph = RelationGraph::default();
        let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for table in &table_names {
            edges.insert(table.clone(), BTreeSet::new());
        }

        for model in models {
            for (column, reference) in &model.references {
                let target = reference.target_model.to_lowercase();
                if !table_names.contains(&target) {
                    return Err(SchemaError::RelationTargetMissing {
                        model: model.table.to_string(),
                        column: column.to_string(),
                        target: reference.target_model.clone(),
                    });
                }

                let target_model = models.iter().find(|m| m.table == target).unwrap();
                let target_col_lower = reference.target_column.to_lowercase();
                let Some(target_type) = target_model.column_type(&target_col_lower) else {
                    return Err(SchemaError::RelationColumnMissing {
                        model: model.table.to_string(),
                        column: column.to_string(),
                        target_model: target.clone(),
                        target_column: reference.target_column.clone(),
                    });
                };

                let source_type = model
                    .column_type(column)
                    .expect("referencing column is declared on its own model")
                    .clone();

                if source_type.base.base_name() != target_type.base.base_name() {
                    return Err(SchemaError::RelationTypeMismatch {
                        model: model.table.to_string(),
                        column: column.to_string(),
                        column_type: source_type.emit_sql(),
                        target_model: target.clone(),
                        target_column: reference.target_column.clone(),
                        target_type: target_type.emit_sql(),
                    });
                }

                let array_ok = match reference.kind {
                    RelationKind::ManyToMany => source_type.is_array,
                    RelationKind::OneToOne | RelationKind::OneToMany => !source_type.is_array,
                };
                if !array_ok {
                    return Err(SchemaError::RelationArrayMismatch {
                        model: model.table.to_string(),
                        column: column.to_string(),
                        kind: reference.kind.label().to_string(),
                    });
                }

                let is_self = target == model.table;
                let descriptor = RelationDescriptor {
                    kind: reference.kind,
                    other_table: target.clone(),
                    column: column.to_string(),
                    is_self,
                };

                graph
                    .outgoing
                    .entry(model.table.to_string())
                    .or_default()
                    .push(descriptor.clone());
                graph.incoming.entry(target.clone()).or_default().push(RelationDescriptor {
                    kind: reference.kind,
                    other_table: model.table.to_string(),
                    column: column.to_string(),
                    is_self,
                });

                if !is_self && !matches!(reference.kind, RelationKind::ManyToMany) {
                    // Target must be created before source: edge target -> source.
                    edges
                        .entry(target.clone())
                        .or_default()
                        .insert(model.table.to_string());
                }
            }
        }

        graph.order = topo_sort(&table_names, &edges)?;
        Ok(graph)
    }
}

/// Kahn's algorithm with alphabetical tiebreak among zero-in-degree
/// nodes. Edge `a -> b` means "a must come before b" (a is a
/// prerequisite of b).
fn topo_sort(
    nodes: &BTreeSet<String>,
    edges: &BTreeMap<String, BTreeSet<String>>,
) -> Result<Vec<String>, SchemaError> {
    let mut in_degree: BTreeMap<String, usize> = nodes.iter().map(|n| (n.clone(), 0)).collect();
    for targets in edges.values() {
        for t in targets {
            *in_degree.entry(t.clone()).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<String> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(n, _)| n.clone())
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(next) = ready.iter().next().cloned() {
        ready.remove(&next);
        order.push(next.clone());
        if let Some(targets) = edges.get(&next) {
            for t in targets {
                let deg = in_degree.get_mut(t).unwrap();
                *deg -= 1;
                if *deg == 0 {
                    ready.insert(t.clone());
                }
            }
        }
    }

    if order.len() != nodes.len() {
        let residual: Vec<String> = nodes
            .iter()
            .filter(|n| !order.contains(n))
            .cloned()
            .collect();
        return Err(SchemaError::CyclicRelations { models: residual });
    }

    Ok(order)
}
