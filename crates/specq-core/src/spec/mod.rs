//! Specifications: named, reusable predicate factories.
//!
//! A specification builds a [`Predicate`] for a target entity against a
//! caller-supplied [`Schema`]. Specifications are pure: building has no
//! side effects, and a specification whose governing parameter is absent
//! builds to [`Predicate::Empty`] so combinators can drop it silently.
//!
//! Plain closures of the right shape are specifications too, so ad-hoc
//! criteria can be written inline:
//!
//! ```
//! use specq_core::error::SchemaError;
//! use specq_core::schema::{EntityDef, FieldDef, ScalarType, Schema};
//! use specq_core::spec::Specification;
//! use specq_ir::Predicate;
//!
//! let schema = Schema::new().with_entity(
//!     EntityDef::new("member", "id")
//!         .with_field(FieldDef::new("id", ScalarType::Int64))
//!         .with_field(FieldDef::new("age", ScalarType::Int32)),
//! );
//! let adults = |_: &Schema, _: &str| -> Result<Predicate, SchemaError> {
//!     Ok(Predicate::ge("age", 18))
//! };
//! let predicate = adults.build(&schema, "member").unwrap();
//! assert_eq!(predicate, Predicate::ge("age", 18));
//! ```

mod combine;
mod field;

pub use combine::{all_of, any_of, not, AllOf, AnyOf, Not};
pub use field::{
    field_at_least, field_at_most, field_equals, field_equals_opt, field_greater_than,
    field_in, field_less_than, field_like_opt,
};

use crate::error::SchemaError;
use crate::schema::Schema;
use specq_ir::Predicate;

/// A named predicate-building function parameterized by caller values.
pub trait Specification {
    /// Build the predicate for `entity`, validating every field reference
    /// against `schema`.
    fn build(&self, schema: &Schema, entity: &str) -> Result<Predicate, SchemaError>;
}

/// A heap-allocated specification, as stored by combinators.
pub type BoxedSpec = Box<dyn Specification + Send + Sync>;

impl<F> Specification for F
where
    F: Fn(&Schema, &str) -> Result<Predicate, SchemaError>,
{
    fn build(&self, schema: &Schema, entity: &str) -> Result<Predicate, SchemaError> {
        self(schema, entity)
    }
}

impl Specification for BoxedSpec {
    fn build(&self, schema: &Schema, entity: &str) -> Result<Predicate, SchemaError> {
        (**self).build(schema, entity)
    }
}

/// Wrap an inner specification on a related entity in an inner join.
///
/// The inner specification is built against the relation's target entity.
/// An empty inner predicate stays empty: a join around no constraint is no
/// constraint.
pub fn related(
    relation: impl Into<String>,
    spec: impl Specification + Send + Sync + 'static,
) -> impl Specification + Send + Sync {
    let relation = relation.into();
    move |schema: &Schema, entity: &str| {
        let rel = schema.relation_from(entity, &relation)?;
        let inner = spec.build(schema, &rel.to_entity)?;
        if inner.is_empty() {
            Ok(Predicate::Empty)
        } else {
            Ok(Predicate::join(relation.clone(), inner))
        }
    }
}

/// Like [`related`], but with left-join semantics: root rows without a
/// matching related row see null columns instead of being excluded.
pub fn related_left(
    relation: impl Into<String>,
    spec: impl Specification + Send + Sync + 'static,
) -> impl Specification + Send + Sync {
    let relation = relation.into();
    move |schema: &Schema, entity: &str| {
        let rel = schema.relation_from(entity, &relation)?;
        let inner = spec.build(schema, &rel.to_entity)?;
        if inner.is_empty() {
            Ok(Predicate::Empty)
        } else {
            Ok(Predicate::left_join(relation.clone(), inner))
        }
    }
}
