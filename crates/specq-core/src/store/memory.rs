//! In-memory reference store.
//!
//! Tables of rows behind a read-write lock. Each session clones the table
//! map (cheap: tables are shared `Arc`s, copied on write), so count and
//! content queries issued on one session always observe the same snapshot.
//! Mutations apply to the live tables and evaluate their selection against
//! the pre-update state.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Store, StoreSession};
use crate::error::StoreError;
use crate::query::{
    ColumnRef, CompiledCondition, CompiledJoin, CompiledMutation, CompiledOrder, CompiledQuery,
};
use specq_ir::{Assignment, JoinKind, Row, SortDirection, Value};

type Tables = HashMap<String, Arc<Vec<Row>>>;

/// An embedded store backend keeping rows in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row to an entity's table.
    pub fn insert(&self, entity: impl Into<String>, row: Row) {
        let mut tables = self.tables.write();
        let table = tables.entry(entity.into()).or_default();
        Arc::make_mut(table).push(row);
    }
}

impl Store for MemoryStore {
    fn session(&self) -> Result<Box<dyn StoreSession + '_>, StoreError> {
        let snapshot = self.tables.read().clone();
        Ok(Box::new(MemorySession {
            store: self,
            snapshot,
        }))
    }
}

struct MemorySession<'a> {
    store: &'a MemoryStore,
    snapshot: Tables,
}

impl StoreSession for MemorySession<'_> {
    fn execute_query(&self, query: &CompiledQuery) -> Result<Vec<Row>, StoreError> {
        let table = self
            .snapshot
            .get(&query.entity)
            .map(|t| t.as_slice())
            .unwrap_or(&[]);

        let mut out = Vec::new();
        for root in table {
            let Some(combo) =
                matching_combo(root, &query.joins, query.condition.as_ref(), &self.snapshot)
            else {
                continue;
            };
            let mut row = root.clone();
            for alias in &query.fetch {
                if let Some(Some(joined)) = combo.joined.get(alias.as_str()) {
                    for (name, value) in joined.iter() {
                        row.set(format!("{alias}.{name}"), value.clone());
                    }
                }
            }
            out.push(row);
        }

        sort_rows(&mut out, &query.order_by);

        let offset = query.offset as usize;
        if offset >= out.len() {
            out.clear();
        } else if offset > 0 {
            out.drain(0..offset);
        }
        if let Some(limit) = query.limit {
            let limit = limit as usize;
            if limit < out.len() {
                out.truncate(limit);
            }
        }
        Ok(out)
    }

    fn execute_count(&self, query: &CompiledQuery) -> Result<u64, StoreError> {
        let table = self
            .snapshot
            .get(&query.entity)
            .map(|t| t.as_slice())
            .unwrap_or(&[]);
        let count = table
            .iter()
            .filter(|root| {
                matching_combo(root, &query.joins, query.condition.as_ref(), &self.snapshot)
                    .is_some()
            })
            .count();
        Ok(count as u64)
    }

    fn execute_mutation(&self, mutation: &CompiledMutation) -> Result<u64, StoreError> {
        let mut tables = self.store.tables.write();
        // Selection evaluates against the pre-update state.
        let view = tables.clone();
        let Some(existing) = view.get(&mutation.entity) else {
            return Ok(0);
        };

        let mut updated: Vec<Row> = existing.as_ref().clone();
        let mut affected = 0u64;
        for row in updated.iter_mut() {
            if matching_combo(row, &mutation.joins, mutation.condition.as_ref(), &view).is_some() {
                for assignment in &mutation.assignments {
                    apply_assignment(row, assignment);
                }
                affected += 1;
            }
        }
        if affected > 0 {
            tables.insert(mutation.entity.clone(), Arc::new(updated));
        }
        Ok(affected)
    }
}

/// One joined-row combination for a root row: alias → related row, or
/// `None` when a left join found nothing.
#[derive(Clone)]
struct Combo<'a> {
    joined: HashMap<&'a str, Option<&'a Row>>,
}

/// Resolve join combinations for a root row and return the first one
/// satisfying the condition, if any.
///
/// A root row matches when any combination of its joined rows satisfies
/// the condition — the row-level semantics of a deduplicated SQL join.
fn matching_combo<'a>(
    root: &'a Row,
    joins: &'a [CompiledJoin],
    condition: Option<&CompiledCondition>,
    tables: &'a Tables,
) -> Option<Combo<'a>> {
    let combos = resolve_combos(root, joins, tables);
    match condition {
        None => combos.into_iter().next(),
        Some(cond) => combos.into_iter().find(|c| eval(cond, root, c)),
    }
}

fn resolve_combos<'a>(
    root: &'a Row,
    joins: &'a [CompiledJoin],
    tables: &'a Tables,
) -> Vec<Combo<'a>> {
    let mut combos = vec![Combo {
        joined: HashMap::new(),
    }];

    for join in joins {
        let candidates: &'a [Row] = tables
            .get(&join.relation.to_entity)
            .map(|t| t.as_slice())
            .unwrap_or(&[]);

        let mut next = Vec::new();
        for combo in combos {
            let parent_row = match &join.parent {
                None => Some(root),
                Some(parent) => combo.joined.get(parent.as_str()).copied().flatten(),
            };
            // A null or missing foreign key matches nothing.
            let key = parent_row
                .and_then(|r| r.get(&join.relation.from_field))
                .filter(|v| !v.is_null());

            let matches: Vec<&Row> = match key {
                Some(key) => candidates
                    .iter()
                    .filter(|c| {
                        c.get(&join.relation.to_field)
                            .is_some_and(|v| values_equal(v, key))
                    })
                    .collect(),
                None => Vec::new(),
            };

            if matches.is_empty() {
                if join.kind == JoinKind::Left {
                    let mut combo = combo;
                    combo.joined.insert(join.alias.as_str(), None);
                    next.push(combo);
                }
                // An inner join without a match drops the combination.
            } else {
                for related in matches {
                    let mut combo = combo.clone();
                    combo.joined.insert(join.alias.as_str(), Some(related));
                    next.push(combo);
                }
            }
        }
        combos = next;
    }
    combos
}

fn lookup<'a>(column: &ColumnRef, root: &'a Row, combo: &Combo<'a>) -> Option<&'a Value> {
    let row = match &column.join {
        None => Some(root),
        Some(alias) => combo.joined.get(alias.as_str()).copied().flatten(),
    }?;
    row.get(&column.column)
}

fn eval(condition: &CompiledCondition, root: &Row, combo: &Combo<'_>) -> bool {
    match condition {
        CompiledCondition::Eq { column, value } => lookup(column, root, combo)
            .is_some_and(|v| values_equal(v, value)),
        CompiledCondition::Ne { column, value } => lookup(column, root, combo)
            .is_some_and(|v| !values_equal(v, value)),
        CompiledCondition::Lt { column, value } => lookup(column, root, combo)
            .is_some_and(|v| compare_values(v, value).is_some_and(Ordering::is_lt)),
        CompiledCondition::Le { column, value } => lookup(column, root, combo)
            .is_some_and(|v| compare_values(v, value).is_some_and(Ordering::is_le)),
        CompiledCondition::Gt { column, value } => lookup(column, root, combo)
            .is_some_and(|v| compare_values(v, value).is_some_and(Ordering::is_gt)),
        CompiledCondition::Ge { column, value } => lookup(column, root, combo)
            .is_some_and(|v| compare_values(v, value).is_some_and(Ordering::is_ge)),
        CompiledCondition::In { column, values } => lookup(column, root, combo)
            .is_some_and(|v| values.iter().any(|candidate| values_equal(v, candidate))),
        CompiledCondition::IsNull { column } => {
            matches!(lookup(column, root, combo), None | Some(Value::Null))
        }
        CompiledCondition::IsNotNull { column } => {
            !matches!(lookup(column, root, combo), None | Some(Value::Null))
        }
        CompiledCondition::Like { column, pattern } => match lookup(column, root, combo) {
            Some(Value::String(s)) => like_match(s, pattern),
            _ => false,
        },
        CompiledCondition::And(children) => children.iter().all(|c| eval(c, root, combo)),
        CompiledCondition::Or(children) => children.iter().any(|c| eval(c, root, combo)),
        CompiledCondition::Not(inner) => !eval(inner, root, combo),
    }
}

fn apply_assignment(row: &mut Row, assignment: &Assignment) {
    match assignment {
        Assignment::Set { field, value } => row.set(field.clone(), value.clone()),
        Assignment::Increment { field, by } => {
            let current = row.get(field).cloned();
            match current {
                Some(Value::Int32(i)) => row.set(field.clone(), Value::Int32(i + *by as i32)),
                Some(Value::Int64(i)) => row.set(field.clone(), Value::Int64(i + by)),
                // Null stays null under arithmetic.
                _ => {}
            }
        }
    }
}

/// Check if two values are equal, coercing Int32/Int64.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int32(a), Value::Int32(b)) => a == b,
        (Value::Int64(a), Value::Int64(b)) => a == b,
        (Value::Int32(a), Value::Int64(b)) => i64::from(*a) == *b,
        (Value::Int64(a), Value::Int32(b)) => *a == i64::from(*b),
        (Value::Float64(a), Value::Float64(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
        (Value::Uuid(a), Value::Uuid(b)) => a == b,
        _ => false,
    }
}

/// Compare two values, returning their ordering if comparable.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int32(a), Value::Int32(b)) => Some(a.cmp(b)),
        (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
        (Value::Int32(a), Value::Int64(b)) => Some(i64::from(*a).cmp(b)),
        (Value::Int64(a), Value::Int32(b)) => Some(a.cmp(&i64::from(*b))),
        (Value::Float64(a), Value::Float64(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Compare for sorting: NULLs and missing fields first.
fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(a, b).unwrap_or(Ordering::Equal),
    }
}

fn sort_rows(rows: &mut [Row], order_by: &[CompiledOrder]) {
    if order_by.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for spec in order_by {
            let cmp = compare_for_sort(a.get(&spec.column), b.get(&spec.column));
            let cmp = match spec.direction {
                SortDirection::Asc => cmp,
                SortDirection::Desc => cmp.reverse(),
            };
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        Ordering::Equal
    });
}

/// Match a string against a SQL LIKE pattern.
///
/// `%` matches zero or more characters, `_` exactly one, and a backslash
/// escapes the next pattern character.
fn like_match(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    like_match_at(&value, &pattern)
}

fn like_match_at(value: &[char], pattern: &[char]) -> bool {
    match pattern.split_first() {
        None => value.is_empty(),
        Some((&'%', rest)) => {
            if rest.is_empty() {
                return true;
            }
            (0..=value.len()).any(|skip| like_match_at(&value[skip..], rest))
        }
        Some((&'_', rest)) => !value.is_empty() && like_match_at(&value[1..], rest),
        Some((&'\\', rest)) => match (rest.split_first(), value.split_first()) {
            (Some((pc, prest)), Some((vc, vrest))) if pc == vc => like_match_at(vrest, prest),
            _ => false,
        },
        Some((pc, rest)) => match value.split_first() {
            Some((vc, vrest)) if vc == pc => like_match_at(vrest, rest),
            _ => false,
        },
    }
}
