//! PostgreSQL round trips; run with `cargo test -- --ignored` against a scratch database.

use serde_json::{json, Value};
use sieve_core::config::QueryConfig;
use sieve_core::models::{ComplexQuery, FlatQuery};
use sieve_core::schema::SchemaRegistry;
use sieve_core::service::EntityService;
use sieve_core::store::PgSession;
use sieve_core::test_utils::{get_test_database_url, Hero};
use sqlx::postgres::PgPoolOptions;

const FIXTURE: &[&str] = &[
    "CREATE TEMPORARY TABLE team (
        id BIGINT PRIMARY KEY,
        name TEXT NOT NULL,
        headquarters TEXT
    )",
    "CREATE TEMPORARY TABLE hero (
        id BIGINT PRIMARY KEY,
        parent_id BIGINT,
        name TEXT NOT NULL,
        secret_name TEXT,
        age INTEGER,
        is_deprecated BOOLEAN NOT NULL DEFAULT false,
        intro TEXT,
        pets JSONB,
        address_info JSONB,
        create_time TIMESTAMPTZ NOT NULL,
        update_time TIMESTAMPTZ NOT NULL,
        team_id BIGINT
    )",
    "INSERT INTO team (id, name, headquarters) VALUES
        (1, 'Preventers', 'Sharp Tower'),
        (2, 'Z-Force', 'Sister Margaret''s Bar')",
    "INSERT INTO hero (id, name, secret_name, age, pets, create_time, update_time, team_id) VALUES
        (1, '李浩然', 's1', 18, '[\"cat\"]', '2024-09-01 10:00:00+00', '2024-09-01 10:00:00+00', 1),
        (2, '王浩', 's2', 25, '[\"dog\"]', '2024-09-02 10:00:00+00', '2024-09-02 10:00:00+00', 1),
        (3, 'n1', 's3', 3, '[\"cat\", \"dog\"]', '2024-09-03 10:00:00+00', '2024-09-03 10:00:00+00', 2),
        (4, 'n2', 's4', 4, '[]', '2024-09-04 10:00:00+00', '2024-09-04 10:00:00+00', 2),
        (5, 'Deadpond', 's5', NULL, NULL, '2024-09-05 10:00:00+00', '2024-09-05 10:00:00+00', NULL)",
];

/// One connection so the temporary tables stay visible for the whole test
async fn session() -> PgSession {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&get_test_database_url())
        .await
        .expect("Failed to connect to test database");
    for statement in FIXTURE {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .expect("Failed to create fixture");
    }
    PgSession::new(pool)
}

fn heroes() -> EntityService<Hero> {
    EntityService::new(&SchemaRegistry::new(), QueryConfig::default())
}

fn item_ids(shaped: &Value) -> Vec<i64> {
    shaped["items"]
        .as_array()
        .map(|items| items.iter().filter_map(|item| item["id"].as_i64()).collect())
        .unwrap_or_default()
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_flat_list_round_trip() {
    let session = session().await;
    let query = FlatQuery::from_pairs([
        ("name", "n1"),
        ("age__in", "3,4"),
        ("count", "true"),
    ])
    .unwrap();

    let shaped = heroes().list(&session, &query).await.unwrap();
    assert_eq!(shaped["count"], json!(1));
    assert_eq!(item_ids(&shaped), vec![3]);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_typed_text_parameters() {
    let session = session().await;
    let query = FlatQuery::from_pairs([
        ("create_time__le", "2024-09-03 23:59:59"),
        ("pets__json_contains", "cat"),
        ("sort_by", "id"),
    ])
    .unwrap();

    let shaped = heroes().list(&session, &query).await.unwrap();
    assert_eq!(item_ids(&shaped), vec![1, 3]);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_condition_tree_with_relation() {
    let session = session().await;
    let query: ComplexQuery = serde_json::from_value(json!({
        "count": true,
        "fields": ["name", "team"],
        "sort_by": "id",
        "condition": {"or_": [
            {"field": "name", "operator": "like", "value": "浩"},
            {"field": "age", "operator": "lt", "value": 4}
        ]}
    }))
    .unwrap();

    let shaped = heroes().complex_query(&session, &query).await.unwrap();
    assert_eq!(shaped["count"], json!(3));
    assert_eq!(item_ids(&shaped), vec![1, 2, 3]);
    assert_eq!(shaped["items"][0]["team"]["name"], json!("Preventers"));
    assert_eq!(shaped["items"][2]["team"]["name"], json!("Z-Force"));
    assert!(shaped["items"][0].get("secret_name").is_none());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_number_against_text_column_matches_nothing() {
    let session = session().await;
    let query: ComplexQuery = serde_json::from_value(json!({
        "count": true,
        "condition": {"field": "name", "value": 42}
    }))
    .unwrap();

    let shaped = heroes().complex_query(&session, &query).await.unwrap();
    assert_eq!(shaped["count"], json!(0));
    assert!(item_ids(&shaped).is_empty());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_get_by_primary_key() {
    let session = session().await;
    let hero = heroes().get(&session, "5").await.unwrap().unwrap();
    assert_eq!(hero["name"], json!("Deadpond"));
    assert_eq!(hero["age"], Value::Null);
    assert!(heroes().get(&session, "42").await.unwrap().is_none());
}
