//! The schema registry: entities, relations, and dotted-path resolution.

use std::collections::HashMap;

use super::{EntityDef, FieldDef, RelationDef};
use crate::error::SchemaError;
use serde::{Deserialize, Serialize};

/// A caller-supplied description of the queryable schema.
///
/// Field paths in predicates and sort keys resolve against this registry;
/// anything it does not define fails with a [`SchemaError`] before the
/// store is touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    entities: HashMap<String, EntityDef>,
    relations: Vec<RelationDef>,
}

/// A dotted field path resolved against the schema: the join chain walked
/// and the terminal field.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath<'a> {
    /// Relations traversed for each dotted segment, in path order.
    pub relations: Vec<&'a RelationDef>,
    /// Entity owning the terminal field.
    pub entity: &'a str,
    /// The terminal field definition.
    pub field: &'a FieldDef,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity to the schema.
    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Add a relation to the schema.
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Get an entity by name.
    pub fn entity(&self, name: &str) -> Result<&EntityDef, SchemaError> {
        self.entities
            .get(name)
            .ok_or_else(|| SchemaError::UnknownEntity(name.to_string()))
    }

    /// Get a named relation declared by an entity.
    pub fn relation_from(&self, entity: &str, name: &str) -> Result<&RelationDef, SchemaError> {
        self.relations
            .iter()
            .find(|r| r.from_entity == entity && r.name == name)
            .ok_or_else(|| SchemaError::UnknownRelation {
                entity: entity.to_string(),
                relation: name.to_string(),
            })
    }

    /// Resolve a dotted field path starting at `entity`.
    ///
    /// Every segment except the last must name a relation of the entity
    /// reached so far; the last must name a field. Failures report the
    /// full original path.
    pub fn resolve_path<'a>(
        &'a self,
        entity: &str,
        path: &str,
    ) -> Result<ResolvedPath<'a>, SchemaError> {
        let root = self.entity(entity)?;
        let unknown_field = || SchemaError::UnknownField {
            entity: entity.to_string(),
            path: path.to_string(),
        };

        let mut relations = Vec::new();
        let mut current = root;
        let mut segments = path.split('.').peekable();

        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                let field = current.get_field(segment).ok_or_else(unknown_field)?;
                return Ok(ResolvedPath {
                    relations,
                    entity: current.name.as_str(),
                    field,
                });
            }
            let relation = self
                .relations
                .iter()
                .find(|r| r.from_entity == current.name && r.name == segment)
                .ok_or_else(unknown_field)?;
            current = self.entity(&relation.to_entity)?;
            relations.push(relation);
        }

        Err(unknown_field())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Cardinality, ScalarType};

    fn member_team_schema() -> Schema {
        let member = EntityDef::new("member", "id")
            .with_field(FieldDef::new("id", ScalarType::Int64))
            .with_field(FieldDef::new("username", ScalarType::String))
            .with_field(FieldDef::new("age", ScalarType::Int32))
            .with_field(FieldDef::optional("team_id", ScalarType::Int64));

        let team = EntityDef::new("team", "id")
            .with_field(FieldDef::new("id", ScalarType::Int64))
            .with_field(FieldDef::new("name", ScalarType::String));

        Schema::new()
            .with_entity(member)
            .with_entity(team)
            .with_relation(RelationDef::many_to_one(
                "team", "member", "team_id", "team", "id",
            ))
            .with_relation(RelationDef::one_to_many(
                "members", "team", "id", "member", "team_id",
            ))
    }

    #[test]
    fn test_entity_lookup() {
        let schema = member_team_schema();
        assert!(schema.entity("member").is_ok());
        assert_eq!(
            schema.entity("account").unwrap_err(),
            SchemaError::UnknownEntity("account".into())
        );
    }

    #[test]
    fn test_relation_lookup() {
        let schema = member_team_schema();
        let rel = schema.relation_from("member", "team").unwrap();
        assert_eq!(rel.cardinality, Cardinality::ManyToOne);
        assert!(schema.relation_from("member", "league").is_err());
    }

    #[test]
    fn test_resolve_plain_field() {
        let schema = member_team_schema();
        let resolved = schema.resolve_path("member", "username").unwrap();
        assert!(resolved.relations.is_empty());
        assert_eq!(resolved.entity, "member");
        assert_eq!(resolved.field.scalar, ScalarType::String);
    }

    #[test]
    fn test_resolve_dotted_path() {
        let schema = member_team_schema();
        let resolved = schema.resolve_path("member", "team.name").unwrap();
        assert_eq!(resolved.relations.len(), 1);
        assert_eq!(resolved.relations[0].name, "team");
        assert_eq!(resolved.entity, "team");
        assert_eq!(resolved.field.name, "name");
    }

    #[test]
    fn test_unknown_path_names_full_path() {
        let schema = member_team_schema();
        let err = schema.resolve_path("member", "team.color").unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownField {
                entity: "member".into(),
                path: "team.color".into(),
            }
        );

        let err = schema.resolve_path("member", "league.name").unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownField {
                entity: "member".into(),
                path: "league.name".into(),
            }
        );
    }
}
