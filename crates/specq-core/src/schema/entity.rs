//! Entity definitions.

use super::field::FieldDef;
use serde::{Deserialize, Serialize};

/// An entity definition (table schema).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    /// Entity name (unique within a schema).
    pub name: String,
    /// Name of the primary identity field.
    pub identity_field: String,
    /// Field definitions.
    pub fields: Vec<FieldDef>,
}

impl EntityDef {
    /// Create a new entity definition.
    pub fn new(name: impl Into<String>, identity_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity_field: identity_field.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field to the entity.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get the identity field definition.
    pub fn identity(&self) -> Option<&FieldDef> {
        self.get_field(&self.identity_field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ScalarType;

    #[test]
    fn test_entity_builder() {
        let entity = EntityDef::new("member", "id")
            .with_field(FieldDef::new("id", ScalarType::Int64))
            .with_field(FieldDef::new("username", ScalarType::String))
            .with_field(FieldDef::new("age", ScalarType::Int32));

        assert_eq!(entity.name, "member");
        assert_eq!(entity.fields.len(), 3);
        assert!(entity.get_field("username").is_some());
        assert!(entity.get_field("missing").is_none());
        assert_eq!(entity.identity().unwrap().name, "id");
    }
}
