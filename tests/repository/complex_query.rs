use serde_json::{json, Value};
use sieve_core::config::QueryConfig;
use sieve_core::models::ComplexQuery;
use sieve_core::schema::SchemaRegistry;
use sieve_core::service::EntityService;
use sieve_core::test_utils::{seeded_store, Hero, Team};
use sieve_core::QueryError;

fn hero_service() -> EntityService<Hero> {
    EntityService::new(&SchemaRegistry::new(), QueryConfig::default())
}

fn query(body: Value) -> ComplexQuery {
    serde_json::from_value(body).unwrap()
}

fn item_ids(shaped: &Value) -> Vec<i64> {
    shaped["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|item| item["id"].as_i64())
        .collect()
}

#[tokio::test]
async fn test_or_of_like_and_ge() {
    let store = seeded_store();
    let shaped = hero_service()
        .complex_query(
            &store,
            &query(json!({
                "count": true,
                "sort_by": "id",
                "condition": {"or_": [
                    {"field": "name", "operator": "like", "value": "浩"},
                    {"field": "age", "operator": "ge", "value": 40}
                ]}
            })),
        )
        .await
        .unwrap();

    assert_eq!(shaped["count"], json!(3));
    assert_eq!(item_ids(&shaped), vec![1, 2, 6]);
}

#[tokio::test]
async fn test_vacuous_condition_matches_everything() {
    let store = seeded_store();
    let service = hero_service();
    for condition in [json!({}), json!({"and_": [], "or_": []}), Value::Null] {
        let shaped = service
            .complex_query(&store, &query(json!({"count": true, "condition": condition})))
            .await
            .unwrap();
        assert_eq!(shaped["count"], json!(6));
    }
}

#[tokio::test]
async fn test_like_escapes_wildcards() {
    let store = seeded_store();
    let shaped = hero_service()
        .complex_query(
            &store,
            &query(json!({
                "count": true,
                "condition": {"field": "name", "operator": "like", "value": "%"}
            })),
        )
        .await
        .unwrap();
    assert_eq!(shaped["count"], json!(0));
}

#[tokio::test]
async fn test_number_against_text_column_matches_nothing() {
    let store = seeded_store();
    let shaped = hero_service()
        .complex_query(
            &store,
            &query(json!({"count": true, "condition": {"field": "name", "value": 42}})),
        )
        .await
        .unwrap();
    assert_eq!(shaped["count"], json!(0));
}

#[tokio::test]
async fn test_ne_range_and_not_in() {
    let store = seeded_store();
    let service = hero_service();

    let shaped = service
        .complex_query(
            &store,
            &query(json!({
                "sort_by": "id",
                "condition": {"and_": [
                    {"field": "team_id", "operator": "ne", "value": 2},
                    {"field": "age", "operator": "ge", "value": 10},
                    {"field": "age", "operator": "le", "value": "30"}
                ]}
            })),
        )
        .await
        .unwrap();
    assert_eq!(item_ids(&shaped), vec![1, 2]);

    let shaped = service
        .complex_query(
            &store,
            &query(json!({
                "sort_by": "id",
                "condition": {"field": "team_id", "operator": "not_in", "value": "1,3"}
            })),
        )
        .await
        .unwrap();
    assert_eq!(item_ids(&shaped), vec![3, 4]);
}

#[tokio::test]
async fn test_requested_relation_is_shaped_to_one() {
    let store = seeded_store();
    let shaped = hero_service()
        .complex_query(
            &store,
            &query(json!({
                "fields": ["name", "team"],
                "sort_by": "id",
                "condition": {"field": "id", "operator": "in", "value": [1, 5]}
            })),
        )
        .await
        .unwrap();

    assert_eq!(shaped["count"], json!(-1));
    let items = shaped["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], json!("李浩然"));
    assert_eq!(items[0]["team"]["name"], json!("Preventers"));
    assert!(items[0].get("age").is_none());
    assert_eq!(items[1]["team"], Value::Null);
}

#[tokio::test]
async fn test_to_many_relation_is_shaped_to_list() {
    let store = seeded_store();
    let service: EntityService<Team> =
        EntityService::new(&SchemaRegistry::new(), QueryConfig::default());
    let shaped = service
        .complex_query(
            &store,
            &query(json!({"fields": ["name", "heroes"], "sort_by": "id"})),
        )
        .await
        .unwrap();

    let items = shaped["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["heroes"].as_array().map(Vec::len), Some(3));
    assert_eq!(items[1]["heroes"].as_array().map(Vec::len), Some(2));
    assert_eq!(items[2]["heroes"], json!([]));
}

#[tokio::test]
async fn test_invalid_condition_never_reaches_the_store() {
    let store = seeded_store();
    let service = hero_service();

    let err = service
        .complex_query(
            &store,
            &query(json!({
                "count": true,
                "condition": {"or_": [
                    {"field": "age", "value": 3},
                    {"field": "nickname", "value": "x"}
                ]}
            })),
        )
        .await
        .unwrap_err();
    assert!(err.is_field_not_found());
    assert_eq!(err.status_code(), 400);

    let err = service
        .complex_query(
            &store,
            &query(json!({
                "condition": {"field": "age", "operator": "in", "value": {"a": 1}}
            })),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidValue { .. }));

    assert_eq!(store.fetch_calls(), 0);
    assert_eq!(store.count_calls(), 0);
}

#[test]
fn test_unknown_body_keys_are_rejected() {
    let parsed: Result<ComplexQuery, _> =
        serde_json::from_value(json!({"condition": {}, "limit": 5}));
    assert!(parsed.is_err());
}
