//! Relation definitions between entities.

use serde::{Deserialize, Serialize};

/// Cardinality of a relation, seen from the entity declaring it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    /// One related row, foreign key on the declaring side.
    OneToOne,
    /// One related row shared by many declarers, foreign key on the
    /// declaring side.
    ManyToOne,
    /// Many related rows, foreign key on the target side.
    OneToMany,
}

/// A named relation from one entity to another.
///
/// `from_field` lives on the declaring entity and `to_field` on the target;
/// a join matches rows where the two are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDef {
    /// Relation name (unique per declaring entity).
    pub name: String,
    /// Declaring entity.
    pub from_entity: String,
    /// Field on the declaring entity.
    pub from_field: String,
    /// Target entity.
    pub to_entity: String,
    /// Field on the target entity.
    pub to_field: String,
    /// Relation cardinality.
    pub cardinality: Cardinality,
}

impl RelationDef {
    /// Create a one-to-one relation.
    pub fn one_to_one(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_entity: from_entity.into(),
            from_field: from_field.into(),
            to_entity: to_entity.into(),
            to_field: to_field.into(),
            cardinality: Cardinality::OneToOne,
        }
    }

    /// Create a many-to-one relation (e.g. member → team).
    pub fn many_to_one(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_entity: from_entity.into(),
            from_field: from_field.into(),
            to_entity: to_entity.into(),
            to_field: to_field.into(),
            cardinality: Cardinality::ManyToOne,
        }
    }

    /// Create a one-to-many relation (e.g. team → members).
    pub fn one_to_many(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_entity: from_entity.into(),
            from_field: from_field.into(),
            to_entity: to_entity.into(),
            to_field: to_field.into(),
            cardinality: Cardinality::OneToMany,
        }
    }

    /// Whether the target side can hold multiple rows per declarer.
    pub fn is_to_many(&self) -> bool {
        self.cardinality == Cardinality::OneToMany
    }
}
