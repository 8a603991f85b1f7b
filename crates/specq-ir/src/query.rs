//! Query IR: the executable query description and its sort/page parameters.

use crate::predicate::Predicate;
use serde::{Deserialize, Serialize};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// Order specification for sorting results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Field to order by.
    pub field: String,
    /// Sort direction.
    pub direction: SortDirection,
}

impl OrderSpec {
    /// Create an ascending order spec.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Create a descending order spec.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// A query against one entity type: a predicate plus an eager-fetch list.
///
/// Relations named in `fetch` are left-joined into the result rows, with
/// their columns appearing under dotted paths (`team.name`). This is the
/// explicit replacement for implicit lazy loading: related data arrives in
/// the same query or not at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// The entity type to query.
    pub entity: String,
    /// Filter predicate. `Empty` means unfiltered.
    pub predicate: Predicate,
    /// Relations to eager-join into result rows.
    pub fetch: Vec<String>,
}

impl Query {
    /// Create an unfiltered query for an entity.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            predicate: Predicate::Empty,
            fetch: vec![],
        }
    }

    /// Set the filter predicate.
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Add a relation to eager-fetch.
    pub fn fetch(mut self, relation: impl Into<String>) -> Self {
        self.fetch.push(relation.into());
        self
    }
}

/// Page parameters: zero-based page index, page size, and sort keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Zero-based page index.
    pub page: u32,
    /// Number of rows per page. Must be positive; enforced at execution.
    pub size: u32,
    /// Sort keys applied before slicing the page.
    pub sort: Vec<OrderSpec>,
}

impl PageRequest {
    /// Create a page request without sorting.
    pub fn of(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            sort: vec![],
        }
    }

    /// Add a sort key.
    pub fn with_sort(mut self, order: OrderSpec) -> Self {
        self.sort.push(order);
        self
    }

    /// Row offset of the first row on this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = Query::new("member")
            .with_predicate(Predicate::eq("age", 10))
            .fetch("team");

        assert_eq!(query.entity, "member");
        assert_eq!(query.fetch, vec!["team".to_string()]);
        assert!(!query.predicate.is_empty());
    }

    #[test]
    fn test_page_request_offset() {
        assert_eq!(PageRequest::of(0, 3).offset(), 0);
        assert_eq!(PageRequest::of(2, 3).offset(), 6);
    }

    #[test]
    fn test_serde_roundtrip() {
        let query = Query::new("member")
            .with_predicate(Predicate::and(vec![
                Predicate::eq("username", "alice"),
                Predicate::ge("age", 20),
            ]))
            .fetch("team");
        let json = serde_json::to_string(&query).unwrap();
        let decoded: Query = serde_json::from_str(&json).unwrap();
        assert_eq!(query, decoded);

        let page = PageRequest::of(0, 3).with_sort(OrderSpec::desc("username"));
        let json = serde_json::to_string(&page).unwrap();
        let decoded: PageRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(page, decoded);
    }
}
