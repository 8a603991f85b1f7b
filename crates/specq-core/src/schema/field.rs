//! Field definitions for entities.

use serde::{Deserialize, Serialize};

/// Scalar type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarType {
    /// Boolean.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 string.
    String,
    /// Microseconds since Unix epoch.
    Timestamp,
    /// 16-byte UUID.
    Uuid,
}

impl ScalarType {
    /// Whether this type accepts integer arithmetic (bulk increments).
    pub fn is_integer(self) -> bool {
        matches!(self, ScalarType::Int32 | ScalarType::Int64)
    }
}

/// A field definition within an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Scalar type.
    pub scalar: ScalarType,
    /// Whether the field is required (non-nullable at the application level).
    pub required: bool,
}

impl FieldDef {
    /// Create a required field.
    pub fn new(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            name: name.into(),
            scalar,
            required: true,
        }
    }

    /// Create an optional field.
    pub fn optional(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            name: name.into(),
            scalar,
            required: false,
        }
    }
}
