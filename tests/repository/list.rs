use serde_json::{json, Value};
use sieve_core::config::QueryConfig;
use sieve_core::models::FlatQuery;
use sieve_core::query_builder::{ConditionLeaf, ConditionNode, Operator};
use sieve_core::repository::Repository;
use sieve_core::schema::SchemaRegistry;
use sieve_core::service::EntityService;
use sieve_core::store::{MemoryStore, Record, RelationValue};
use sieve_core::test_utils::{seeded_store, Hero};
use sieve_core::{QueryError, StoreError};

fn heroes() -> Repository<Hero> {
    Repository::new(&SchemaRegistry::new(), QueryConfig::default())
}

fn ids(items: &[Record]) -> Vec<i64> {
    items
        .iter()
        .filter_map(|record| record.get("id").and_then(Value::as_i64))
        .collect()
}

async fn list(store: &MemoryStore, pairs: &[(&str, &str)]) -> Result<(i64, Vec<i64>), QueryError> {
    let query = FlatQuery::from_pairs(pairs.iter().copied())?;
    let page = heroes().list(store, &query, None).await?;
    Ok((page.count, ids(&page.items)))
}

#[tokio::test]
async fn test_name_and_age_in() {
    let store = seeded_store();
    let (count, ids) = list(&store, &[("name", "n1"), ("age__in", "3,4"), ("count", "true")])
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(ids, vec![3]);
}

#[tokio::test]
async fn test_name_filter_with_counted_field_selection() {
    let store = seeded_store();
    let service: EntityService<Hero> =
        EntityService::new(&SchemaRegistry::new(), QueryConfig::default());
    let query =
        FlatQuery::from_pairs([("name", "n1"), ("count", "true"), ("fields", "id,name")]).unwrap();

    let shaped = service.list(&store, &query).await.unwrap();
    assert_eq!(shaped["count"], json!(1));
    let items = shaped["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    for item in items {
        let mut keys: Vec<&str> = item
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["id", "name"]);
    }
    assert_eq!(items[0], json!({"id": 3, "name": "n1"}));
}

#[tokio::test]
async fn test_single_value_in() {
    let store = seeded_store();
    let (_, ids) = list(&store, &[("age__in", "3")]).await.unwrap();
    assert_eq!(ids, vec![3]);
}

#[tokio::test]
async fn test_count_is_independent_of_window() {
    let store = seeded_store();
    let (count, ids) = list(
        &store,
        &[
            ("page", "2"),
            ("page_size", "2"),
            ("sort_by", "id"),
            ("count", "true"),
        ],
    )
    .await
    .unwrap();
    assert_eq!(count, 6);
    assert_eq!(ids, vec![3, 4]);

    let (count, ids) = list(&store, &[("page", "9"), ("page_size", "2"), ("count", "1")])
        .await
        .unwrap();
    assert_eq!(count, 6);
    assert!(ids.is_empty());
}

#[tokio::test]
async fn test_count_sentinel_skips_count_query() {
    let store = seeded_store();
    let (count, ids) = list(&store, &[]).await.unwrap();
    assert_eq!(count, -1);
    assert_eq!(ids.len(), 6);
    assert_eq!(store.count_calls(), 0);
    assert_eq!(store.fetch_calls(), 1);
}

#[tokio::test]
async fn test_default_page_size_is_ten() {
    let store = MemoryStore::new();
    for id in 1..=25 {
        store.insert("hero", json!({"id": id, "name": format!("h{id}")})).unwrap();
    }
    let (count, ids) = list(&store, &[("count", "true")]).await.unwrap();
    assert_eq!(count, 25);
    assert_eq!(ids.len(), 10);
}

#[tokio::test]
async fn test_operator_suffixes_against_rows() {
    let store = seeded_store();

    let (_, ids) = list(&store, &[("pets__json_contains", "cat"), ("sort_by", "id")])
        .await
        .unwrap();
    assert_eq!(ids, vec![1, 3]);

    let (_, ids) = list(
        &store,
        &[("create_time__le", "2024-09-03 23:59:59"), ("sort_by", "id")],
    )
    .await
    .unwrap();
    assert_eq!(ids, vec![1, 2, 3]);

    let (_, ids) = list(&store, &[("age__not_in", "3,4"), ("sort_by", "id")])
        .await
        .unwrap();
    assert_eq!(ids, vec![1, 2, 6]);

    let (_, ids) = list(&store, &[("age__gt", "4"), ("age__lt", "48"), ("sort_by", "id")])
        .await
        .unwrap();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn test_sort_descending_applies_to_every_key() {
    let store = seeded_store();
    let (_, ids) = list(
        &store,
        &[("team_id__in", "1,2"), ("sort_by", "team_id,age"), ("sort_order", "desc")],
    )
    .await
    .unwrap();
    assert_eq!(ids, vec![4, 3, 6, 2, 1]);
}

#[tokio::test]
async fn test_caller_condition_is_anded_with_flat_params() {
    let store = seeded_store();
    let query = FlatQuery::new()
        .with_param("team_id", json!(1))
        .with_count(true);
    let condition: ConditionNode = ConditionLeaf::new("age", Operator::Ge, json!(20)).into();

    let page = heroes().list(&store, &query, Some(&condition)).await.unwrap();
    assert_eq!(page.count, 2);
    let mut found = ids(&page.items);
    found.sort_unstable();
    assert_eq!(found, vec![2, 6]);
}

#[tokio::test]
async fn test_excluded_keys_are_ignored() {
    let store = seeded_store();
    let query = FlatQuery::from_pairs([("name", "n2"), ("token", "abc")])
        .unwrap()
        .exclude_keys(["token"]);
    let page = heroes().list(&store, &query, None).await.unwrap();
    assert_eq!(ids(&page.items), vec![4]);
}

#[tokio::test]
async fn test_projection_and_relation_loading() {
    let store = seeded_store();
    let query = FlatQuery::from_pairs([("fields", "name,team"), ("sort_by", "id")]).unwrap();
    let page = heroes().list(&store, &query, None).await.unwrap();

    let first = &page.items[0];
    assert!(first.get("age").is_none());
    assert_eq!(first.get("team_id"), Some(&json!(1)));
    match first.relation("team") {
        Some(RelationValue::One(team)) => assert_eq!(team.get("name"), Some(&json!("Preventers"))),
        other => panic!("expected a loaded team, got {other:?}"),
    }

    let deadpond = page
        .items
        .iter()
        .find(|record| record.get("id") == Some(&json!(5)))
        .unwrap();
    assert_eq!(deadpond.relation("team"), Some(&RelationValue::Null));
}

#[tokio::test]
async fn test_client_errors_abort_before_store_io() {
    let store = seeded_store();

    let err = list(&store, &[("sort_by", "nonexistent"), ("count", "true")])
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidSortField { .. }));

    let err = list(&store, &[("nickname", "x"), ("count", "true")])
        .await
        .unwrap_err();
    assert!(err.is_field_not_found());

    let err = list(&store, &[("age__between", "1,2")]).await.unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedOperator { .. }));

    assert_eq!(store.fetch_calls(), 0);
    assert_eq!(store.count_calls(), 0);
}

#[tokio::test]
async fn test_store_failures_propagate_unchanged() {
    let store = seeded_store();
    store.set_unavailable(true);
    let err = list(&store, &[("count", "true")]).await.unwrap_err();
    assert_eq!(
        err,
        QueryError::Store(StoreError::Unavailable(
            "memory store is offline".to_string()
        ))
    );
    assert_eq!(err.status_code(), 500);
}
