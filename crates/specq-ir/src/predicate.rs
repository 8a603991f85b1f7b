//! The composable predicate tree.
//!
//! A [`Predicate`] is a boolean condition over named fields, independent of
//! any specific entity shape. Field names may be dotted paths (`team.name`),
//! which compile as an inner join around a single-field condition.
//!
//! `Empty` means "no constraint". Combinators drop `Empty` children rather
//! than passing a no-op down to the executor; [`Predicate::normalize`]
//! restores that invariant for hand-built trees.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Join kind for predicates on related entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    /// Inner join: rows without a matching related row are excluded.
    Inner,
    /// Left join: missing related rows evaluate as null columns.
    Left,
}

/// A boolean condition tree over entity fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// No constraint. Eliminated during normalization.
    Empty,
    /// Field equals value.
    Eq { field: String, value: Value },
    /// Field not equals value.
    Ne { field: String, value: Value },
    /// Field less than value.
    Lt { field: String, value: Value },
    /// Field less than or equal to value.
    Le { field: String, value: Value },
    /// Field greater than value.
    Gt { field: String, value: Value },
    /// Field greater than or equal to value.
    Ge { field: String, value: Value },
    /// Field is in a set of values.
    In { field: String, values: Vec<Value> },
    /// Field is null.
    IsNull { field: String },
    /// Field is not null.
    IsNotNull { field: String },
    /// Field matches a SQL LIKE pattern (`%`, `_`, `\` escapes).
    Like { field: String, pattern: String },
    /// A condition on a related entity's fields, reached via `relation`.
    Join {
        relation: String,
        kind: JoinKind,
        predicate: Box<Predicate>,
    },
    /// All conditions must hold.
    And(Vec<Predicate>),
    /// At least one condition must hold.
    Or(Vec<Predicate>),
    /// The condition must not hold.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Create an equality predicate.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a not-equal predicate.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a less-than predicate.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Lt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a less-than-or-equal predicate.
    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Le {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a greater-than predicate.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a greater-than-or-equal predicate.
    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Ge {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an IN predicate.
    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        Predicate::In {
            field: field.into(),
            values,
        }
    }

    /// Create an IS NULL predicate.
    pub fn is_null(field: impl Into<String>) -> Self {
        Predicate::IsNull {
            field: field.into(),
        }
    }

    /// Create an IS NOT NULL predicate.
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Predicate::IsNotNull {
            field: field.into(),
        }
    }

    /// Create a LIKE predicate.
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Predicate::Like {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// Create an inner-join predicate on a related entity.
    pub fn join(relation: impl Into<String>, predicate: Predicate) -> Self {
        Predicate::Join {
            relation: relation.into(),
            kind: JoinKind::Inner,
            predicate: Box::new(predicate),
        }
    }

    /// Create a left-join predicate on a related entity.
    pub fn left_join(relation: impl Into<String>, predicate: Predicate) -> Self {
        Predicate::Join {
            relation: relation.into(),
            kind: JoinKind::Left,
            predicate: Box::new(predicate),
        }
    }

    /// Conjunction of predicates. Empty children are dropped.
    pub fn and(predicates: Vec<Predicate>) -> Self {
        Self::combine(predicates, Predicate::And)
    }

    /// Disjunction of predicates. Empty children are dropped.
    pub fn or(predicates: Vec<Predicate>) -> Self {
        Self::combine(predicates, Predicate::Or)
    }

    /// Negation. `Not(Empty)` stays `Empty`: negating "no filter" is still
    /// "no filter".
    pub fn not(predicate: Predicate) -> Self {
        match predicate {
            Predicate::Empty => Predicate::Empty,
            Predicate::Not(inner) => *inner,
            p => Predicate::Not(Box::new(p)),
        }
    }

    fn combine(predicates: Vec<Predicate>, wrap: fn(Vec<Predicate>) -> Predicate) -> Self {
        let mut remaining: Vec<Predicate> = predicates
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect();
        match remaining.len() {
            0 => Predicate::Empty,
            1 => remaining.remove(0),
            _ => wrap(remaining),
        }
    }

    /// Check if this predicate is the no-constraint marker.
    pub fn is_empty(&self) -> bool {
        matches!(self, Predicate::Empty)
    }

    /// Restore the no-Empty-inside invariant on an arbitrary tree.
    ///
    /// Drops `Empty` children of And/Or, unwraps singleton And/Or, maps
    /// `Not(Empty)` to `Empty`, and collapses double negation.
    pub fn normalize(self) -> Self {
        match self {
            Predicate::And(children) => {
                Predicate::and(children.into_iter().map(Predicate::normalize).collect())
            }
            Predicate::Or(children) => {
                Predicate::or(children.into_iter().map(Predicate::normalize).collect())
            }
            Predicate::Not(inner) => Predicate::not(inner.normalize()),
            Predicate::Join {
                relation,
                kind,
                predicate,
            } => match predicate.normalize() {
                // A join around no constraint is no constraint.
                Predicate::Empty => Predicate::Empty,
                p => Predicate::Join {
                    relation,
                    kind,
                    predicate: Box::new(p),
                },
            },
            p => p,
        }
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Predicate::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_drops_empty() {
        let p = Predicate::and(vec![
            Predicate::Empty,
            Predicate::eq("username", "alice"),
            Predicate::Empty,
        ]);
        assert_eq!(p, Predicate::eq("username", "alice"));
    }

    #[test]
    fn test_and_of_nothing_is_empty() {
        assert!(Predicate::and(vec![]).is_empty());
        assert!(Predicate::and(vec![Predicate::Empty, Predicate::Empty]).is_empty());
    }

    #[test]
    fn test_and_preserves_order() {
        let p = Predicate::and(vec![
            Predicate::eq("username", "alice"),
            Predicate::Empty,
            Predicate::gt("age", 18),
        ]);
        match p {
            Predicate::And(children) => {
                assert_eq!(children.len(), 2);
                assert_eq!(children[0], Predicate::eq("username", "alice"));
                assert_eq!(children[1], Predicate::gt("age", 18));
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_not_empty_is_empty() {
        assert!(Predicate::not(Predicate::Empty).is_empty());
    }

    #[test]
    fn test_double_negation() {
        let p = Predicate::eq("username", "alice");
        assert_eq!(Predicate::not(Predicate::not(p.clone())), p);
    }

    #[test]
    fn test_normalize_nested() {
        let raw = Predicate::And(vec![
            Predicate::Or(vec![Predicate::Empty]),
            Predicate::Not(Box::new(Predicate::Not(Box::new(Predicate::gt(
                "age", 20,
            ))))),
        ]);
        assert_eq!(raw.normalize(), Predicate::gt("age", 20));
    }

    #[test]
    fn test_normalize_join_around_empty() {
        let raw = Predicate::join("team", Predicate::And(vec![Predicate::Empty]));
        assert!(raw.normalize().is_empty());
    }

    #[test]
    fn test_join_builder() {
        let p = Predicate::join("team", Predicate::eq("name", "teamA"));
        match p {
            Predicate::Join {
                relation, kind, ..
            } => {
                assert_eq!(relation, "team");
                assert_eq!(kind, JoinKind::Inner);
            }
            other => panic!("expected Join, got {other:?}"),
        }
    }
}
