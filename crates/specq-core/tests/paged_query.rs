//! Integration tests for the specification engine and paged executor.

use std::sync::atomic::{AtomicUsize, Ordering};

use specq_core::error::{Error, SchemaError, StoreError};
use specq_core::ir::{
    Assignment, BulkUpdate, OrderSpec, PageRequest, Predicate, Query, Row, Value,
};
use specq_core::query::{CompiledMutation, CompiledQuery, Compiler, Executor};
use specq_core::schema::{EntityDef, FieldDef, RelationDef, ScalarType, Schema};
use specq_core::spec::{all_of, field_equals, field_equals_opt, not, related, Specification};
use specq_core::store::{MemoryStore, Store, StoreSession};

struct TestContext {
    store: MemoryStore,
    schema: Schema,
}

impl TestContext {
    fn new() -> Self {
        Self {
            store: MemoryStore::new(),
            schema: member_team_schema(),
        }
    }

    fn executor(&self) -> Executor<'_> {
        Executor::new(&self.store, &self.schema)
    }
}

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

fn insert_member(ctx: &TestContext, id: i64, username: &str, age: i32, team_id: Option<i64>) {
    ctx.store.insert(
        "member",
        Row::new()
            .with("id", id)
            .with("username", username)
            .with("age", age)
            .with("team_id", team_id),
    );
}

fn insert_team(ctx: &TestContext, id: i64, name: &str) {
    ctx.store
        .insert("team", Row::new().with("id", id).with("name", name));
}

/// Specification: member belongs to a team with the given name. A blank
/// name disables the filter.
fn team_name(name: Option<&str>) -> impl Specification + Send + Sync {
    let name = Value::from(name.map(str::to_string));
    related("team", field_equals_opt("name", name))
}

/// Specification: member has the given username.
fn username(name: &str) -> impl Specification + Send + Sync {
    field_equals("username", name.to_string())
}

// ============== Paging ==============

#[test]
fn test_paging_first_of_two_pages() {
    let ctx = TestContext::new();
    for i in 1..=5 {
        insert_member(&ctx, i, &format!("member{i}"), 10, None);
    }

    let query = Query::new("member").with_predicate(Predicate::eq("age", 10));
    let page_request = PageRequest::of(0, 3).with_sort(OrderSpec::desc("username"));
    let page = ctx.executor().execute(&query, &page_request).unwrap();

    assert_eq!(page.content().len(), 3);
    assert_eq!(page.total_elements(), 5);
    assert_eq!(page.page(), 0);
    assert_eq!(page.total_pages(), 2);
    assert!(page.is_first());
    assert!(page.has_next());
    assert!(!page.is_last());

    let usernames: Vec<&str> = page
        .content()
        .iter()
        .map(|row| row.get("username").unwrap().as_str().unwrap())
        .collect();
    assert_eq!(usernames, vec!["member5", "member4", "member3"]);
}

#[test]
fn test_paging_no_matches() {
    let ctx = TestContext::new();
    for i in 1..=5 {
        insert_member(&ctx, i, &format!("member{i}"), 10, None);
    }

    let query = Query::new("member").with_predicate(Predicate::eq("age", 99));
    let page = ctx
        .executor()
        .execute(&query, &PageRequest::of(0, 3))
        .unwrap();

    assert!(page.content().is_empty());
    assert_eq!(page.total_elements(), 0);
    assert_eq!(page.total_pages(), 0);
    assert!(!page.has_next());
    assert!(page.is_last());
}

#[test]
fn test_paging_count_uses_same_filter_as_content() {
    let ctx = TestContext::new();
    for i in 1..=5 {
        insert_member(&ctx, i, &format!("member{i}"), if i <= 3 { 10 } else { 20 }, None);
    }

    let query = Query::new("member").with_predicate(Predicate::eq("age", 10));
    let page = ctx
        .executor()
        .execute(&query, &PageRequest::of(0, 2))
        .unwrap();

    assert_eq!(page.content().len(), 2);
    assert_eq!(page.total_elements(), 3);
    assert_eq!(page.total_pages(), 2);
}

// ============== Bulk updates ==============

#[test]
fn test_bulk_age_increment() {
    let ctx = TestContext::new();
    insert_member(&ctx, 1, "member1", 10, None);
    insert_member(&ctx, 2, "member2", 19, None);
    insert_member(&ctx, 3, "member3", 20, None);
    insert_member(&ctx, 4, "member4", 21, None);
    insert_member(&ctx, 5, "member5", 40, None);

    let update = BulkUpdate::new("member")
        .with_predicate(Predicate::ge("age", 20))
        .with_assignment(Assignment::increment("age", 1));
    let affected = ctx.executor().execute_bulk_update(&update).unwrap();
    assert_eq!(affected, 3);

    // The store reflects the set-based write.
    let rows = ctx
        .executor()
        .find_all(
            &Query::new("member").with_predicate(Predicate::eq("username", "member5")),
            &[],
        )
        .unwrap();
    assert_eq!(rows[0].get("age"), Some(&Value::Int32(41)));
    let untouched = ctx
        .executor()
        .find_all(
            &Query::new("member").with_predicate(Predicate::eq("username", "member2")),
            &[],
        )
        .unwrap();
    assert_eq!(untouched[0].get("age"), Some(&Value::Int32(19)));
}

#[test]
fn test_bulk_update_dry_run_counts_without_writing() {
    let ctx = TestContext::new();
    insert_member(&ctx, 1, "member1", 10, None);
    insert_member(&ctx, 2, "member2", 20, None);
    insert_member(&ctx, 3, "member3", 40, None);

    let update = BulkUpdate::new("member")
        .with_predicate(Predicate::ge("age", 20))
        .with_assignment(Assignment::increment("age", 1))
        .dry_run();
    let would_affect = ctx.executor().execute_bulk_update(&update).unwrap();
    assert_eq!(would_affect, 2);

    let rows = ctx
        .executor()
        .find_all(
            &Query::new("member").with_predicate(Predicate::eq("username", "member3")),
            &[],
        )
        .unwrap();
    assert_eq!(rows[0].get("age"), Some(&Value::Int32(40)));
}

// ============== Specifications ==============

#[test]
fn test_specification_with_join_filters_by_team() {
    let ctx = TestContext::new();
    insert_team(&ctx, 1, "teamA");
    insert_team(&ctx, 2, "teamB");
    insert_member(&ctx, 1, "m1", 0, Some(1));
    insert_member(&ctx, 2, "m2", 0, Some(2));
    insert_member(&ctx, 3, "m1", 0, Some(2));

    let spec = all_of(vec![
        Box::new(username("m1")),
        Box::new(team_name(Some("teamA"))),
    ]);
    let predicate = spec.build(&ctx.schema, "member").unwrap();
    let page = ctx
        .executor()
        .execute(
            &Query::new("member").with_predicate(predicate),
            &PageRequest::of(0, 10),
        )
        .unwrap();

    assert_eq!(page.total_elements(), 1);
    assert_eq!(page.content()[0].get("id"), Some(&Value::Int64(1)));
}

#[test]
fn test_blank_specification_parameter_disables_filter() {
    let ctx = TestContext::new();
    insert_team(&ctx, 1, "teamA");
    insert_member(&ctx, 1, "m1", 0, Some(1));
    insert_member(&ctx, 2, "m2", 0, None);

    let spec = all_of(vec![Box::new(team_name(None))]);
    let predicate = spec.build(&ctx.schema, "member").unwrap();
    assert!(predicate.is_empty());

    // No filter: the teamless member is returned too.
    let page = ctx
        .executor()
        .execute(
            &Query::new("member").with_predicate(predicate),
            &PageRequest::of(0, 10),
        )
        .unwrap();
    assert_eq!(page.total_elements(), 2);
}

#[test]
fn test_negated_specification() {
    let ctx = TestContext::new();
    insert_member(&ctx, 1, "m1", 0, None);
    insert_member(&ctx, 2, "m2", 0, None);

    let predicate = not(username("m1")).build(&ctx.schema, "member").unwrap();
    let rows = ctx
        .executor()
        .find_all(&Query::new("member").with_predicate(predicate), &[])
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("username").unwrap().as_str(), Some("m2"));
}

#[test]
fn test_two_specs_on_same_relation_compile_to_one_join() {
    let schema = member_team_schema();
    let spec = all_of(vec![
        Box::new(team_name(Some("teamA"))),
        Box::new(related("team", field_equals("name", "teamA"))),
    ]);
    let predicate = spec.build(&schema, "member").unwrap();
    let compiled = Compiler::new(&schema)
        .compile_query(&Query::new("member").with_predicate(predicate), &[])
        .unwrap();
    assert_eq!(compiled.joins.len(), 1);
    assert_eq!(compiled.joins[0].alias, "team");
}

// ============== Fetch graph ==============

#[test]
fn test_fetch_projects_joined_columns() {
    let ctx = TestContext::new();
    insert_team(&ctx, 1, "teamA");
    insert_member(&ctx, 1, "m1", 0, Some(1));
    insert_member(&ctx, 2, "m2", 0, None);

    let rows = ctx
        .executor()
        .find_all(
            &Query::new("member").fetch("team"),
            &[OrderSpec::asc("username")],
        )
        .unwrap();

    // Left join: the teamless member survives, without team columns.
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0].get("team.name"),
        Some(&Value::String("teamA".into()))
    );
    assert_eq!(rows[1].get("team.name"), None);
}

#[test]
fn test_filter_join_drops_teamless_members() {
    let ctx = TestContext::new();
    insert_team(&ctx, 1, "teamA");
    insert_member(&ctx, 1, "m1", 0, Some(1));
    insert_member(&ctx, 2, "m2", 0, None);

    let rows = ctx
        .executor()
        .find_all(
            &Query::new("member")
                .with_predicate(Predicate::is_not_null("team.name"))
                .fetch("team"),
            &[],
        )
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("id"), Some(&Value::Int64(1)));
}

#[test]
fn test_to_many_join_matches_any_related_row() {
    let ctx = TestContext::new();
    insert_team(&ctx, 1, "teamA");
    insert_team(&ctx, 2, "teamB");
    insert_member(&ctx, 1, "m1", 30, Some(1));
    insert_member(&ctx, 2, "m2", 10, Some(1));
    insert_member(&ctx, 3, "m3", 10, Some(2));

    // Teams having at least one member aged 30; each team appears once.
    let rows = ctx
        .executor()
        .find_all(
            &Query::new("team").with_predicate(Predicate::eq("members.age", 30)),
            &[],
        )
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::String("teamA".into())));
}

// ============== Failure ordering ==============

#[derive(Default)]
struct StubStore {
    sessions: AtomicUsize,
    queries: AtomicUsize,
    counts: AtomicUsize,
    mutations: AtomicUsize,
}

struct StubSession<'a> {
    store: &'a StubStore,
}

impl Store for StubStore {
    fn session(&self) -> Result<Box<dyn StoreSession + '_>, StoreError> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubSession { store: self }))
    }
}

impl StoreSession for StubSession<'_> {
    fn execute_query(&self, _query: &CompiledQuery) -> Result<Vec<Row>, StoreError> {
        self.store.queries.fetch_add(1, Ordering::SeqCst);
        Ok(vec![])
    }

    fn execute_count(&self, _query: &CompiledQuery) -> Result<u64, StoreError> {
        self.store.counts.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }

    fn execute_mutation(&self, _mutation: &CompiledMutation) -> Result<u64, StoreError> {
        self.store.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }
}

#[test]
fn test_schema_error_reaches_no_store_call() {
    let schema = member_team_schema();
    let store = StubStore::default();
    let executor = Executor::new(&store, &schema);

    let err = executor
        .execute(
            &Query::new("member").with_predicate(Predicate::eq("team.color", "red")),
            &PageRequest::of(0, 3),
        )
        .unwrap_err();
    assert!(matches!(err, Error::Schema(SchemaError::UnknownField { .. })));

    let err = executor
        .execute_bulk_update(
            &BulkUpdate::new("member").with_assignment(Assignment::increment("height", 1)),
        )
        .unwrap_err();
    assert!(matches!(err, Error::Schema(_)));

    assert_eq!(store.sessions.load(Ordering::SeqCst), 0);
    assert_eq!(store.queries.load(Ordering::SeqCst), 0);
    assert_eq!(store.counts.load(Ordering::SeqCst), 0);
    assert_eq!(store.mutations.load(Ordering::SeqCst), 0);
}

#[test]
fn test_dry_run_issues_no_mutation_call() {
    let schema = member_team_schema();
    let store = StubStore::default();
    let executor = Executor::new(&store, &schema);

    let update = BulkUpdate::new("member")
        .with_predicate(Predicate::ge("age", 20))
        .with_assignment(Assignment::increment("age", 1))
        .dry_run();
    executor.execute_bulk_update(&update).unwrap();

    assert_eq!(store.mutations.load(Ordering::SeqCst), 0);
    assert_eq!(store.counts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_store_failure_is_propagated_verbatim() {
    struct FailingStore;
    impl Store for FailingStore {
        fn session(&self) -> Result<Box<dyn StoreSession + '_>, StoreError> {
            Err(StoreError::new("session", "connection refused"))
        }
    }

    let schema = member_team_schema();
    let store = FailingStore;
    let executor = Executor::new(&store, &schema);
    let err = executor
        .execute(&Query::new("member"), &PageRequest::of(0, 3))
        .unwrap_err();
    assert_eq!(
        err,
        Error::Store(StoreError::new("session", "connection refused"))
    );
}
