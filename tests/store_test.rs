use std::sync::Arc;
use std::time::Duration;

use resource_store::client::mock::{ApiCall, MockApi};
use resource_store::client::{ApiError, ClientError};
use resource_store::model::{Filter, NewResource, ParentKey, QueryOptions, Resource, Status};
use resource_store::store::{Record, ResourceStore};
use serde_json::json;

fn setup() -> (Arc<MockApi>, ResourceStore) {
    let api = Arc::new(MockApi::new());
    let store = ResourceStore::new("widgets", api.clone());
    (api, store)
}

fn include_customers() -> QueryOptions {
    QueryOptions::new().include("customers")
}

fn widget(id: &str, title: &str) -> Resource {
    Resource::new("widgets", id).with_attribute("title", title)
}

fn ids(records: &[Record]) -> Vec<&str> {
    records.iter().map(Record::id).collect()
}

#[tokio::test]
async fn test_load_all_passes_options_and_stores_records() {
    let (api, store) = setup();
    api.expect_all().return_ok(vec![Resource::new("widgets", "1")]);

    let loaded = store.load_all(include_customers()).await.unwrap();

    assert_eq!(ids(&loaded), vec!["1"]);
    assert_eq!(ids(&store.all()), vec!["1"]);
    assert_eq!(api.calls(), vec![ApiCall::All { options: include_customers() }]);
    assert_eq!(store.status(), Status::Success);
    api.verify();
}

#[tokio::test]
async fn test_all_returns_seeded_records_in_order() {
    let (_api, store) = setup();
    store.store_records(vec![Resource::new("widgets", "27"), Resource::new("widgets", "42")]);

    let all = store.all();

    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id(), "27");
}

#[tokio::test]
async fn test_load_by_id_appends_unknown_record() {
    let (api, store) = setup();
    store.store_records(vec![Resource::new("widgets", "27")]);
    api.expect_find("42").return_ok(widget("42", "New Title"));

    store.load_by_id("42", include_customers()).await.unwrap();

    assert_eq!(store.len(), 2);
    let stored = store.by_id("42").unwrap();
    assert_eq!(stored.attribute("title"), Some(json!("New Title")));
    assert_eq!(
        api.calls(),
        vec![ApiCall::Find { id: "42".into(), options: include_customers() }]
    );
}

#[tokio::test]
async fn test_load_by_id_overwrites_existing_record_in_place() {
    let (api, store) = setup();
    store.store_records(vec![widget("42", "Old Title")]);
    let held = store.by_id("42").unwrap();
    api.expect_find("42").return_ok(widget("42", "New Title"));

    let loaded = store.load_by_id("42", include_customers()).await.unwrap();

    assert_eq!(store.len(), 1);
    assert!(Record::ptr_eq(&held, &loaded));
    assert_eq!(held.attribute("title"), Some(json!("New Title")));
}

#[tokio::test]
async fn test_by_id() {
    let (_api, store) = setup();
    store.store_records(vec![Resource::new("widgets", "1"), widget("2", "Matching")]);

    let found = store.by_id("2").unwrap();
    assert_eq!(found.attribute("title"), Some(json!("Matching")));
    assert!(store.by_id("3").is_none());
}

#[tokio::test]
async fn test_repeated_loads_never_duplicate_an_id() {
    let (api, store) = setup();
    let drafts = Filter::new().with("status", "draft");
    api.expect_all().return_ok(vec![widget("1", "A"), widget("2", "B")]);
    api.expect_find("1").return_ok(widget("1", "A2"));
    api.expect_where(drafts.clone()).return_ok(vec![widget("2", "B2"), widget("1", "A3")]);

    store.load_all(QueryOptions::new()).await.unwrap();
    store.load_by_id("1", QueryOptions::new()).await.unwrap();
    store.load_where(drafts, QueryOptions::new()).await.unwrap();

    assert_eq!(ids(&store.all()), vec!["1", "2"]);
    assert_eq!(store.by_id("1").unwrap().attribute("title"), Some(json!("A3")));
    assert_eq!(store.by_id("2").unwrap().attribute("title"), Some(json!("B2")));
}

#[tokio::test]
async fn test_load_where_caches_results_by_filter() {
    let (api, store) = setup();
    let filter = Filter::new().with("status", "draft");
    store.store_records(vec![widget("1", "Non-Matching")]);
    api.expect_where(filter.clone())
        .return_ok(vec![widget("2", "Foo"), widget("3", "Bar")]);

    let resolved = store.load_where(filter.clone(), include_customers()).await.unwrap();

    assert_eq!(ids(&resolved), vec!["2", "3"]);
    assert_eq!(ids(&store.where_(&filter)), vec!["2", "3"]);
    assert_eq!(ids(&store.all()), vec!["1", "2", "3"]);
    assert_eq!(
        api.calls(),
        vec![ApiCall::Where { filter, options: include_customers() }]
    );
}

#[tokio::test]
async fn test_load_where_replaces_previous_results_for_same_filter() {
    let (api, store) = setup();
    let filter = Filter::new().with("status", "draft");
    api.expect_where(filter.clone()).return_ok(vec![widget("2", "Foo"), widget("3", "Bar")]);
    api.expect_where(filter.clone()).return_ok(vec![widget("3", "Bar"), widget("4", "Baz")]);

    store.load_where(filter.clone(), QueryOptions::new()).await.unwrap();
    store.load_where(filter.clone(), QueryOptions::new()).await.unwrap();

    assert_eq!(ids(&store.where_(&filter)), vec!["3", "4"]);
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn test_where_requires_the_exact_filter() {
    let (api, store) = setup();
    let loaded = Filter::new().with("status", "draft").with("author", "7");
    api.expect_where(loaded.clone()).return_ok(vec![widget("2", "Foo")]);
    store.load_where(loaded, QueryOptions::new()).await.unwrap();

    let reordered = Filter::new().with("author", "7").with("status", "draft");
    assert_eq!(ids(&store.where_(&reordered)), vec!["2"]);
    assert!(store.where_(&Filter::new().with("status", "draft")).is_empty());
    assert!(store.where_(&Filter::new().with("status", "published")).is_empty());
}

#[tokio::test]
async fn test_where_reflects_local_edits() {
    let (api, store) = setup();
    let filter = Filter::new().with("status", "draft");
    api.expect_where(filter.clone()).return_ok(vec![widget("2", "Foo")]);
    store.load_where(filter.clone(), QueryOptions::new()).await.unwrap();

    store.by_id("2").unwrap().set_attribute("title", "Edited");

    assert_eq!(store.where_(&filter)[0].attribute("title"), Some(json!("Edited")));
}

#[tokio::test]
async fn test_load_related_caches_results_by_parent() {
    let (api, store) = setup();
    let parent = ParentKey::new("users", "5");
    store.store_records(vec![widget("1", "Non-Matching")]);
    api.expect_related(parent.clone())
        .return_ok(vec![widget("2", "Foo"), widget("3", "Bar")]);

    let resolved = store.load_related(parent.clone(), include_customers()).await.unwrap();

    assert_eq!(ids(&resolved), vec!["2", "3"]);
    assert_eq!(ids(&store.related(&parent)), vec!["2", "3"]);
    assert_eq!(store.len(), 3);
    assert!(store.related(&ParentKey::new("users", "6")).is_empty());
    assert!(store.related(&ParentKey::new("teams", "5")).is_empty());
    assert_eq!(
        api.calls(),
        vec![ApiCall::Related { parent, options: include_customers() }]
    );
}

#[tokio::test]
async fn test_load_related_replaces_previous_results_for_same_parent() {
    let (api, store) = setup();
    let parent = ParentKey::new("users", "5");
    api.expect_related(parent.clone()).return_ok(vec![widget("2", "Foo"), widget("3", "Bar")]);
    api.expect_related(parent.clone()).return_ok(vec![widget("4", "Baz")]);

    store.load_related(parent.clone(), QueryOptions::new()).await.unwrap();
    store.load_related(parent.clone(), QueryOptions::new()).await.unwrap();

    assert_eq!(ids(&store.related(&parent)), vec!["4"]);
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn test_repeated_ids_in_a_response_are_cached_once() {
    let (api, store) = setup();
    let filter = Filter::new().with("status", "draft");
    let parent = ParentKey::new("users", "5");
    api.expect_where(filter.clone())
        .return_ok(vec![widget("2", "Foo"), widget("3", "Bar"), widget("2", "Foo")]);
    api.expect_related(parent.clone())
        .return_ok(vec![widget("3", "Bar"), widget("3", "Bar")]);

    store.load_where(filter.clone(), QueryOptions::new()).await.unwrap();
    store.load_related(parent.clone(), QueryOptions::new()).await.unwrap();

    assert_eq!(ids(&store.where_(&filter)), vec!["2", "3"]);
    assert_eq!(ids(&store.related(&parent)), vec!["3"]);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_create_stores_record_with_server_id() {
    let (api, store) = setup();
    let new = NewResource::new("widgets").with_attribute("title", "Baz");
    api.expect_create().return_ok(widget("27", "Baz"));

    let created = store.create(new.clone()).await.unwrap();

    assert_eq!(created.id(), "27");
    assert!(Record::ptr_eq(&store.by_id("27").unwrap(), &created));
    assert_eq!(api.calls(), vec![ApiCall::Create { resource: new }]);
}

#[tokio::test]
async fn test_create_error_leaves_records_untouched() {
    let (api, store) = setup();
    let errors = vec![ApiError::new("422", "can't be blank").with_attribute_pointer("title")];
    api.expect_create().return_err(ClientError::Api(errors.clone()));

    let result = store.create(NewResource::new("widgets")).await;

    assert_eq!(result.unwrap_err(), ClientError::Api(errors));
    assert!(store.is_empty());
    assert!(store.error());
}

#[tokio::test]
async fn test_status_is_loading_before_first_poll() {
    let (api, store) = setup();
    api.expect_all().return_ok(vec![]);
    assert_eq!(store.status(), Status::Initial);

    let pending = store.load_all(QueryOptions::new());
    assert!(store.loading());

    pending.await.unwrap();
    assert!(!store.loading());
    assert!(!store.error());
}

#[tokio::test]
async fn test_failed_load_sets_error_and_returns_original_error() {
    let (api, store) = setup();
    api.expect_all().return_err(ClientError::Transport("connection reset".into()));

    let result = store.load_all(QueryOptions::new()).await;

    assert_eq!(result.unwrap_err(), ClientError::Transport("connection reset".into()));
    assert!(store.error());
    assert!(!store.loading());
}

#[tokio::test]
async fn test_success_is_published_together_with_records() {
    let (api, store) = setup();
    let mut changes = store.subscribe();
    api.expect_all().return_ok(vec![widget("1", "Foo")]);

    let pending = store.load_all(QueryOptions::new());
    assert_eq!(changes.borrow_and_update().status(), Status::Loading);
    pending.await.unwrap();

    let state = changes.borrow_and_update();
    assert_eq!(state.status(), Status::Success);
    assert_eq!(state.records().len(), 1);
}

#[tokio::test]
async fn test_overlapping_loads_last_settlement_wins() {
    let (api, store) = setup();
    api.expect_all()
        .after(Duration::from_millis(50))
        .return_err(ClientError::Transport("slow failure".into()));
    api.expect_find("1").return_ok(widget("1", "Fast"));

    let slow = store.load_all(QueryOptions::new());
    let fast = async {
        let result = store.load_by_id("1", QueryOptions::new()).await;
        (result, store.status())
    };
    let (slow_result, (fast_result, status_after_fast)) = tokio::join!(slow, fast);

    assert!(fast_result.is_ok());
    assert_eq!(status_after_fast, Status::Success);
    assert!(slow_result.is_err());
    assert!(store.error());
    assert!(store.by_id("1").is_some());
}

#[tokio::test]
async fn test_record_delete_removes_it_from_store() {
    let (api, store) = setup();
    store.store_records(vec![widget("1", "Foo"), widget("2", "Bar")]);
    api.expect_delete("1").return_ok(());

    let record = store.by_id("1").unwrap();
    record.delete().await.unwrap();

    assert_eq!(ids(&store.all()), vec!["2"]);
    assert!(store.by_id("1").is_none());
    assert_eq!(api.calls(), vec![ApiCall::Delete { id: "1".into() }]);
}

#[tokio::test]
async fn test_record_delete_failure_keeps_it_in_store() {
    let (api, store) = setup();
    store.store_records(vec![widget("1", "Foo")]);
    api.expect_delete("1").return_err(ClientError::Transport("dummy error".into()));

    let record = store.by_id("1").unwrap();
    let result = record.delete().await;

    assert!(result.is_err());
    assert!(record.error());
    assert!(store.by_id("1").is_some());
}

#[tokio::test]
async fn test_removed_ids_are_skipped_by_cached_queries() {
    let (api, store) = setup();
    let filter = Filter::new().with("status", "draft");
    let parent = ParentKey::new("users", "5");
    api.expect_where(filter.clone()).return_ok(vec![widget("2", "Foo"), widget("3", "Bar")]);
    api.expect_related(parent.clone()).return_ok(vec![widget("3", "Bar")]);
    store.load_where(filter.clone(), QueryOptions::new()).await.unwrap();
    store.load_related(parent.clone(), QueryOptions::new()).await.unwrap();

    let removed = store.by_id("3").unwrap();
    assert!(store.remove(&removed));
    assert!(!store.remove(&removed));

    assert_eq!(ids(&store.where_(&filter)), vec!["2"]);
    assert!(store.related(&parent).is_empty());
    assert_eq!(store.subscribe().borrow().filtered_ids(&filter).unwrap().len(), 2);
}

#[tokio::test]
async fn test_record_save_sends_full_attribute_set() {
    let (api, store) = setup();
    store.store_records(vec![widget("42", "Old Title").with_attribute("status", "draft")]);
    let record = store.by_id("42").unwrap();
    let expected = widget("42", "New Title").with_attribute("status", "draft");
    api.expect_update("42").return_ok(expected.clone());

    record.set_attribute("title", "New Title");
    record.save().await.unwrap();

    assert_eq!(api.calls(), vec![ApiCall::Update { resource: expected }]);
    assert!(!record.loading());
    assert!(!record.error());
    assert_eq!(store.status(), Status::Initial);
}
