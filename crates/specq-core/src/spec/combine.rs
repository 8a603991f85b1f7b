//! Combinators over specifications.
//!
//! Combining drops empty children before wrapping: zero survivors build to
//! `Empty`, a single survivor is returned unwrapped, and only genuine
//! conjunctions/disjunctions produce And/Or nodes.

use super::{BoxedSpec, Specification};
use crate::error::SchemaError;
use crate::schema::Schema;
use specq_ir::Predicate;

/// Conjunction of specifications.
pub struct AllOf {
    specs: Vec<BoxedSpec>,
}

/// Disjunction of specifications.
pub struct AnyOf {
    specs: Vec<BoxedSpec>,
}

/// Negation of a specification. `Not` of an empty build stays empty.
pub struct Not {
    spec: BoxedSpec,
}

impl AllOf {
    /// Combine specifications with AND.
    pub fn new(specs: Vec<BoxedSpec>) -> Self {
        Self { specs }
    }
}

impl AnyOf {
    /// Combine specifications with OR.
    pub fn new(specs: Vec<BoxedSpec>) -> Self {
        Self { specs }
    }
}

impl Not {
    /// Negate a specification.
    pub fn new(spec: impl Specification + Send + Sync + 'static) -> Self {
        Self {
            spec: Box::new(spec),
        }
    }
}

impl Specification for AllOf {
    fn build(&self, schema: &Schema, entity: &str) -> Result<Predicate, SchemaError> {
        let children = self
            .specs
            .iter()
            .map(|s| s.build(schema, entity))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Predicate::and(children))
    }
}

impl Specification for AnyOf {
    fn build(&self, schema: &Schema, entity: &str) -> Result<Predicate, SchemaError> {
        let children = self
            .specs
            .iter()
            .map(|s| s.build(schema, entity))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Predicate::or(children))
    }
}

impl Specification for Not {
    fn build(&self, schema: &Schema, entity: &str) -> Result<Predicate, SchemaError> {
        Ok(Predicate::not(self.spec.build(schema, entity)?))
    }
}

/// Combine specifications with AND.
pub fn all_of(specs: Vec<BoxedSpec>) -> AllOf {
    AllOf::new(specs)
}

/// Combine specifications with OR.
pub fn any_of(specs: Vec<BoxedSpec>) -> AnyOf {
    AnyOf::new(specs)
}

/// Negate a specification.
pub fn not(spec: impl Specification + Send + Sync + 'static) -> Not {
    Not::new(spec)
}
