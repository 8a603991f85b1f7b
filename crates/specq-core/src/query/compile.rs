//! Predicate compilation: schema-validated, backend-ready query shapes.
//!
//! Compilation resolves every field path and relation against the schema,
//! collects the joins a predicate and fetch list need (deduplicated by
//! alias), and produces the condition tree store backends consume. All
//! schema failures surface here, before any store call is made.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SchemaError;
use crate::schema::{RelationDef, Schema};
use specq_ir::{
    Assignment, BulkUpdate, JoinKind, OrderSpec, Predicate, Query, SortDirection, Value,
};

/// A schema-resolved column reference: the root entity or a join alias,
/// plus the column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Join alias owning the column; `None` for the root entity.
    pub join: Option<String>,
    /// Column name on the owning entity.
    pub column: String,
}

impl ColumnRef {
    /// Reference a root-entity column.
    pub fn root(column: impl Into<String>) -> Self {
        Self {
            join: None,
            column: column.into(),
        }
    }

    /// Reference a joined entity's column.
    pub fn joined(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            join: Some(alias.into()),
            column: column.into(),
        }
    }
}

/// One join required by a compiled query.
///
/// Aliases are dotted paths (`team`, `team.league`); a join's parent always
/// precedes it in the join list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledJoin {
    /// Alias path identifying this join.
    pub alias: String,
    /// Parent join alias; `None` when joined directly off the root.
    pub parent: Option<String>,
    /// The relation being joined.
    pub relation: RelationDef,
    /// Inner or left.
    pub kind: JoinKind,
}

/// A fully resolved condition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompiledCondition {
    /// Column equals value.
    Eq { column: ColumnRef, value: Value },
    /// Column not equals value.
    Ne { column: ColumnRef, value: Value },
    /// Column less than value.
    Lt { column: ColumnRef, value: Value },
    /// Column less than or equal to value.
    Le { column: ColumnRef, value: Value },
    /// Column greater than value.
    Gt { column: ColumnRef, value: Value },
    /// Column greater than or equal to value.
    Ge { column: ColumnRef, value: Value },
    /// Column is in a set of values.
    In {
        column: ColumnRef,
        values: Vec<Value>,
    },
    /// Column is null.
    IsNull { column: ColumnRef },
    /// Column is not null.
    IsNotNull { column: ColumnRef },
    /// Column matches a SQL LIKE pattern.
    Like { column: ColumnRef, pattern: String },
    /// All conditions hold. An empty conjunction is vacuously true.
    And(Vec<CompiledCondition>),
    /// At least one condition holds.
    Or(Vec<CompiledCondition>),
    /// The condition does not hold.
    Not(Box<CompiledCondition>),
}

/// A compiled order clause entry (root-entity columns only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledOrder {
    /// Root-entity column to order by.
    pub column: String,
    /// Sort direction.
    pub direction: SortDirection,
}

/// An executable query: filter, joins, order, and slice parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    /// Root entity type.
    pub entity: String,
    /// Deduplicated joins, parents before children.
    pub joins: Vec<CompiledJoin>,
    /// Filter condition; `None` means unfiltered.
    pub condition: Option<CompiledCondition>,
    /// Order clause.
    pub order_by: Vec<CompiledOrder>,
    /// Maximum number of rows to return.
    pub limit: Option<u64>,
    /// Number of matching rows to skip.
    pub offset: u64,
    /// Join aliases whose columns are projected into result rows under
    /// dotted paths.
    pub fetch: Vec<String>,
}

/// An executable set-based mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledMutation {
    /// Entity type to update.
    pub entity: String,
    /// Joins needed by the selection predicate.
    pub joins: Vec<CompiledJoin>,
    /// Row selection; `None` selects every row.
    pub condition: Option<CompiledCondition>,
    /// Validated assignments.
    pub assignments: Vec<Assignment>,
}

impl CompiledMutation {
    /// The count query selecting the same rows this mutation would touch.
    /// Used for dry runs.
    pub fn to_count_query(&self) -> CompiledQuery {
        CompiledQuery {
            entity: self.entity.clone(),
            joins: self.joins.clone(),
            condition: self.condition.clone(),
            order_by: vec![],
            limit: None,
            offset: 0,
            fetch: vec![],
        }
    }
}

#[derive(Default)]
struct JoinSet {
    joins: Vec<CompiledJoin>,
}

impl JoinSet {
    /// Register a join under `parent_alias`, reusing an existing alias.
    ///
    /// When the same relation is requested both inner (filter) and left
    /// (fetch), the inner kind wins: rows the filter excludes cannot
    /// reappear for fetching. Returns the alias and the target entity.
    fn ensure(
        &mut self,
        schema: &Schema,
        parent_alias: Option<&str>,
        parent_entity: &str,
        name: &str,
        kind: JoinKind,
    ) -> Result<(String, String), SchemaError> {
        let alias = match parent_alias {
            Some(parent) => format!("{parent}.{name}"),
            None => name.to_string(),
        };
        if let Some(existing) = self.joins.iter_mut().find(|j| j.alias == alias) {
            if kind == JoinKind::Inner {
                existing.kind = JoinKind::Inner;
            }
            return Ok((alias, existing.relation.to_entity.clone()));
        }
        let relation = schema.relation_from(parent_entity, name)?.clone();
        let target = relation.to_entity.clone();
        self.joins.push(CompiledJoin {
            alias: alias.clone(),
            parent: parent_alias.map(str::to_string),
            relation,
            kind,
        });
        Ok((alias, target))
    }
}

/// Compiles predicates, sort keys, and fetch lists against a schema.
pub struct Compiler<'a> {
    schema: &'a Schema,
}

impl<'a> Compiler<'a> {
    /// Create a compiler over a schema.
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Compile a query and its sort keys. Limit and offset are left unset;
    /// the executor fills them per page.
    pub fn compile_query(
        &self,
        query: &Query,
        sort: &[OrderSpec],
    ) -> Result<CompiledQuery, SchemaError> {
        let entity_def = self.schema.entity(&query.entity)?;
        let mut joins = JoinSet::default();

        let predicate = query.predicate.clone().normalize();
        let condition = if predicate.is_empty() {
            None
        } else {
            Some(self.condition(&mut joins, None, &query.entity, &predicate)?)
        };

        let mut fetch = Vec::new();
        for path in &query.fetch {
            let mut alias: Option<String> = None;
            let mut entity = query.entity.clone();
            for segment in path.split('.') {
                let (next_alias, target) = joins.ensure(
                    self.schema,
                    alias.as_deref(),
                    &entity,
                    segment,
                    JoinKind::Left,
                )?;
                alias = Some(next_alias);
                entity = target;
            }
            if let Some(alias) = alias {
                if !fetch.contains(&alias) {
                    fetch.push(alias);
                }
            }
        }

        let mut order_by = Vec::with_capacity(sort.len());
        for spec in sort {
            if entity_def.get_field(&spec.field).is_none() {
                return Err(SchemaError::UnknownField {
                    entity: query.entity.clone(),
                    path: spec.field.clone(),
                });
            }
            order_by.push(CompiledOrder {
                column: spec.field.clone(),
                direction: spec.direction,
            });
        }

        debug!(
            entity = %query.entity,
            joins = joins.joins.len(),
            filtered = condition.is_some(),
            "compiled query"
        );

        Ok(CompiledQuery {
            entity: query.entity.clone(),
            joins: joins.joins,
            condition,
            order_by,
            limit: None,
            offset: 0,
            fetch,
        })
    }

    /// Compile a bulk update: selection predicate plus validated
    /// assignments.
    pub fn compile_mutation(&self, update: &BulkUpdate) -> Result<CompiledMutation, SchemaError> {
        let entity_def = self.schema.entity(&update.entity)?;
        let mut joins = JoinSet::default();

        let predicate = update.predicate.clone().normalize();
        let condition = if predicate.is_empty() {
            None
        } else {
            Some(self.condition(&mut joins, None, &update.entity, &predicate)?)
        };

        for assignment in &update.assignments {
            let field = entity_def.get_field(assignment.field()).ok_or_else(|| {
                SchemaError::UnknownField {
                    entity: update.entity.clone(),
                    path: assignment.field().to_string(),
                }
            })?;
            if matches!(assignment, Assignment::Increment { .. }) && !field.scalar.is_integer() {
                return Err(SchemaError::TypeMismatch {
                    entity: update.entity.clone(),
                    field: field.name.clone(),
                    expected: "an integer",
                });
            }
        }

        debug!(
            entity = %update.entity,
            assignments = update.assignments.len(),
            "compiled mutation"
        );

        Ok(CompiledMutation {
            entity: update.entity.clone(),
            joins: joins.joins,
            condition,
            assignments: update.assignments.clone(),
        })
    }

    fn condition(
        &self,
        joins: &mut JoinSet,
        ctx_alias: Option<&str>,
        ctx_entity: &str,
        predicate: &Predicate,
    ) -> Result<CompiledCondition, SchemaError> {
        Ok(match predicate {
            // Normalized input cannot contain Empty; an empty conjunction
            // is vacuously true, so this stays a no-op either way.
            Predicate::Empty => CompiledCondition::And(Vec::new()),
            Predicate::Eq { field, value } => CompiledCondition::Eq {
                column: self.resolve_column(joins, ctx_alias, ctx_entity, field)?,
                value: value.clone(),
            },
            Predicate::Ne { field, value } => CompiledCondition::Ne {
                column: self.resolve_column(joins, ctx_alias, ctx_entity, field)?,
                value: value.clone(),
            },
            Predicate::Lt { field, value } => CompiledCondition::Lt {
                column: self.resolve_column(joins, ctx_alias, ctx_entity, field)?,
                value: value.clone(),
            },
            Predicate::Le { field, value } => CompiledCondition::Le {
                column: self.resolve_column(joins, ctx_alias, ctx_entity, field)?,
                value: value.clone(),
            },
            Predicate::Gt { field, value } => CompiledCondition::Gt {
                column: self.resolve_column(joins, ctx_alias, ctx_entity, field)?,
                value: value.clone(),
            },
            Predicate::Ge { field, value } => CompiledCondition::Ge {
                column: self.resolve_column(joins, ctx_alias, ctx_entity, field)?,
                value: value.clone(),
            },
            Predicate::In { field, values } => CompiledCondition::In {
                column: self.resolve_column(joins, ctx_alias, ctx_entity, field)?,
                values: values.clone(),
            },
            Predicate::IsNull { field } => CompiledCondition::IsNull {
                column: self.resolve_column(joins, ctx_alias, ctx_entity, field)?,
            },
            Predicate::IsNotNull { field } => CompiledCondition::IsNotNull {
                column: self.resolve_column(joins, ctx_alias, ctx_entity, field)?,
            },
            Predicate::Like { field, pattern } => CompiledCondition::Like {
                column: self.resolve_column(joins, ctx_alias, ctx_entity, field)?,
                pattern: pattern.clone(),
            },
            Predicate::Join {
                relation,
                kind,
                predicate,
            } => {
                let (alias, target) =
                    joins.ensure(self.schema, ctx_alias, ctx_entity, relation, *kind)?;
                self.condition(joins, Some(alias.as_str()), &target, predicate)?
            }
            Predicate::And(children) => CompiledCondition::And(
                children
                    .iter()
                    .map(|p| self.condition(joins, ctx_alias, ctx_entity, p))
                    .collect::<Result<_, _>>()?,
            ),
            Predicate::Or(children) => CompiledCondition::Or(
                children
                    .iter()
                    .map(|p| self.condition(joins, ctx_alias, ctx_entity, p))
                    .collect::<Result<_, _>>()?,
            ),
            Predicate::Not(inner) => CompiledCondition::Not(Box::new(self.condition(
                joins, ctx_alias, ctx_entity, inner,
            )?)),
        })
    }

    /// Resolve a (possibly dotted) field path relative to `ctx_entity`,
    /// registering an inner join for every relation segment.
    fn resolve_column(
        &self,
        joins: &mut JoinSet,
        ctx_alias: Option<&str>,
        ctx_entity: &str,
        path: &str,
    ) -> Result<ColumnRef, SchemaError> {
        let unknown_field = || SchemaError::UnknownField {
            entity: ctx_entity.to_string(),
            path: path.to_string(),
        };

        let mut alias = ctx_alias.map(str::to_string);
        let mut entity = ctx_entity.to_string();
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                let def = self.schema.entity(&entity)?;
                if def.get_field(segment).is_none() {
                    return Err(unknown_field());
                }
                return Ok(ColumnRef {
                    join: alias,
                    column: segment.to_string(),
                });
            }
            let (next_alias, target) = joins
                .ensure(self.schema, alias.as_deref(), &entity, segment, JoinKind::Inner)
                .map_err(|_| unknown_field())?;
            alias = Some(next_alias);
            entity = target;
        }
        Err(unknown_field())
    }
}
