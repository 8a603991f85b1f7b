//! Bulk-mutation IR: set-based updates selected by a predicate.

use crate::predicate::Predicate;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A single field assignment within a bulk update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Assignment {
    /// Set a field to a constant value.
    Set { field: String, value: Value },
    /// Add a signed delta to an integer field.
    Increment { field: String, by: i64 },
}

impl Assignment {
    /// Create a set assignment.
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Assignment::Set {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an increment assignment.
    pub fn increment(field: impl Into<String>, by: i64) -> Self {
        Assignment::Increment {
            field: field.into(),
            by,
        }
    }

    /// The field this assignment writes.
    pub fn field(&self) -> &str {
        match self {
            Assignment::Set { field, .. } => field,
            Assignment::Increment { field, .. } => field,
        }
    }
}

/// Whether a bulk update mutates the store or only reports what it would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateMode {
    /// Execute the mutation.
    #[default]
    Apply,
    /// Compile and validate, then count the rows that would be affected
    /// without writing anything.
    DryRun,
}

/// A set-based update: one statement affecting all rows matching the
/// predicate, bypassing per-row object tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkUpdate {
    /// The entity type to update.
    pub entity: String,
    /// Row selection. `Empty` selects every row.
    pub predicate: Predicate,
    /// Assignments applied to each selected row.
    pub assignments: Vec<Assignment>,
    /// Apply or dry-run.
    pub mode: UpdateMode,
}

impl BulkUpdate {
    /// Create a bulk update affecting every row of an entity.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            predicate: Predicate::Empty,
            assignments: vec![],
            mode: UpdateMode::Apply,
        }
    }

    /// Restrict the update to rows matching a predicate.
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Add an assignment.
    pub fn with_assignment(mut self, assignment: Assignment) -> Self {
        self.assignments.push(assignment);
        self
    }

    /// Switch to dry-run mode.
    pub fn dry_run(mut self) -> Self {
        self.mode = UpdateMode::DryRun;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_update_builder() {
        let update = BulkUpdate::new("member")
            .with_predicate(Predicate::ge("age", 20))
            .with_assignment(Assignment::increment("age", 1));

        assert_eq!(update.entity, "member");
        assert_eq!(update.assignments.len(), 1);
        assert_eq!(update.assignments[0].field(), "age");
        assert_eq!(update.mode, UpdateMode::Apply);
    }

    #[test]
    fn test_dry_run() {
        let update = BulkUpdate::new("member").dry_run();
        assert_eq!(update.mode, UpdateMode::DryRun);
    }
}
