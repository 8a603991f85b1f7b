//! Field-level specification constructors.
//!
//! These are the explicit, statically checkable replacements for derived
//! query methods: each constructor captures its parameters and validates
//! the field path at build time. The `_opt` variants treat an absent or
//! blank governing parameter as "no constraint" and build to `Empty`.

use super::Specification;
use crate::schema::Schema;
use specq_ir::{Predicate, Value};

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Field equals a value.
pub fn field_equals(
    path: impl Into<String>,
    value: impl Into<Value>,
) -> impl Specification + Send + Sync {
    let path = path.into();
    let value = value.into();
    move |schema: &Schema, entity: &str| {
        schema.resolve_path(entity, &path)?;
        Ok(Predicate::eq(path.clone(), value.clone()))
    }
}

/// Field equals a value, or no constraint when the value is absent/blank.
pub fn field_equals_opt(
    path: impl Into<String>,
    value: impl Into<Value>,
) -> impl Specification + Send + Sync {
    let path = path.into();
    let value = value.into();
    move |schema: &Schema, entity: &str| {
        schema.resolve_path(entity, &path)?;
        if is_blank(&value) {
            Ok(Predicate::Empty)
        } else {
            Ok(Predicate::eq(path.clone(), value.clone()))
        }
    }
}

/// Field strictly greater than a value.
pub fn field_greater_than(
    path: impl Into<String>,
    value: impl Into<Value>,
) -> impl Specification + Send + Sync {
    let path = path.into();
    let value = value.into();
    move |schema: &Schema, entity: &str| {
        schema.resolve_path(entity, &path)?;
        Ok(Predicate::gt(path.clone(), value.clone()))
    }
}

/// Field greater than or equal to a value.
pub fn field_at_least(
    path: impl Into<String>,
    value: impl Into<Value>,
) -> impl Specification + Send + Sync {
    let path = path.into();
    let value = value.into();
    move |schema: &Schema, entity: &str| {
        schema.resolve_path(entity, &path)?;
        Ok(Predicate::ge(path.clone(), value.clone()))
    }
}

/// Field strictly less than a value.
pub fn field_less_than(
    path: impl Into<String>,
    value: impl Into<Value>,
) -> impl Specification + Send + Sync {
    let path = path.into();
    let value = value.into();
    move |schema: &Schema, entity: &str| {
        schema.resolve_path(entity, &path)?;
        Ok(Predicate::lt(path.clone(), value.clone()))
    }
}

/// Field less than or equal to a value.
pub fn field_at_most(
    path: impl Into<String>,
    value: impl Into<Value>,
) -> impl Specification + Send + Sync {
    let path = path.into();
    let value = value.into();
    move |schema: &Schema, entity: &str| {
        schema.resolve_path(entity, &path)?;
        Ok(Predicate::le(path.clone(), value.clone()))
    }
}

/// Field is one of the given values, or no constraint when the list is
/// empty (an empty candidate list means the filter is not in play).
pub fn field_in(
    path: impl Into<String>,
    values: Vec<Value>,
) -> impl Specification + Send + Sync {
    let path = path.into();
    move |schema: &Schema, entity: &str| {
        schema.resolve_path(entity, &path)?;
        if values.is_empty() {
            Ok(Predicate::Empty)
        } else {
            Ok(Predicate::in_values(path.clone(), values.clone()))
        }
    }
}

/// Field matches a SQL LIKE pattern, or no constraint for an absent/blank
/// pattern.
pub fn field_like_opt(
    path: impl Into<String>,
    pattern: Option<String>,
) -> impl Specification + Send + Sync {
    let path = path.into();
    move |schema: &Schema, entity: &str| {
        schema.resolve_path(entity, &path)?;
        match &pattern {
            Some(p) if !p.trim().is_empty() => Ok(Predicate::like(path.clone(), p.clone())),
            _ => Ok(Predicate::Empty),
        }
    }
}
