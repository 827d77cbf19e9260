use serde_json::{json, Value};
use sieve_core::query_builder::{
    build_conditions, parse_flat_key, CompileOptions, Operator, Predicate,
};
use sieve_core::test_utils::hero_schema;
use sieve_core::QueryError;
use std::collections::BTreeMap;

fn compile(pairs: &[(&str, Value)]) -> Result<Vec<Predicate>, QueryError> {
    let params: BTreeMap<String, Value> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect();
    build_conditions(&hero_schema(), &params, CompileOptions::default())
}

fn sql(pairs: &[(&str, Value)]) -> Vec<String> {
    compile(pairs)
        .unwrap()
        .iter()
        .map(Predicate::to_sql)
        .collect()
}

#[test]
fn test_every_flat_suffix_parses() {
    let schema = hero_schema();
    let cases = [
        ("age", Operator::Eq),
        ("age__in", Operator::In),
        ("age__not_in", Operator::NotIn),
        ("age__lt", Operator::Lt),
        ("age__gt", Operator::Gt),
        ("age__le", Operator::Le),
        ("age__ge", Operator::Ge),
        ("pets__json_contains", Operator::JsonContains),
    ];
    for (key, operator) in cases {
        let parsed = parse_flat_key(key, &schema).unwrap();
        assert_eq!(parsed.operator, operator, "key {key}");
    }
}

#[test]
fn test_leaf_only_operators_are_not_flat_suffixes() {
    let schema = hero_schema();
    for key in ["name__like", "age__ne", "age__between"] {
        let err = parse_flat_key(key, &schema).unwrap_err();
        assert_eq!(
            err,
            QueryError::UnsupportedOperator {
                key: key.to_string()
            }
        );
    }
}

#[test]
fn test_name_and_age_in_example() {
    // ?name=n1&age__in=3,4
    let compiled = sql(&[("name", json!("n1")), ("age__in", json!("3,4"))]);
    assert_eq!(compiled.len(), 2);
    assert!(compiled.contains(&"name = 'n1'".to_string()));
    assert!(compiled.contains(&"age IN (3, 4)".to_string()));
}

#[test]
fn test_single_value_in_is_equality() {
    // ?age__in=3
    assert_eq!(sql(&[("age__in", json!("3"))]), vec!["age = 3"]);
}

#[test]
fn test_create_time_upper_bound() {
    // ?create_time__le=2024-09-03 23:59:59
    assert_eq!(
        sql(&[("create_time__le", json!("2024-09-03 23:59:59"))]),
        vec!["create_time <= '2024-09-03 23:59:59'"]
    );
}

#[test]
fn test_unknown_field_names_the_key() {
    let err = compile(&[("nickname", json!("x"))]).unwrap_err();
    assert_eq!(err, QueryError::field_not_found("nickname"));
    assert!(err.is_client_error());

    let err = compile(&[("nickname__ge", json!(1))]).unwrap_err();
    assert!(err.is_field_not_found());
    assert!(err.to_string().contains("nickname__ge"));
}

#[test]
fn test_sequence_values_are_accepted_for_in() {
    assert_eq!(
        sql(&[("name__in", json!(["a", "b"]))]),
        vec!["name IN ('a', 'b')"]
    );
}

#[test]
fn test_malformed_multi_value_is_a_client_error() {
    let err = compile(&[("age__in", json!({"a": 1}))]).unwrap_err();
    assert!(matches!(err, QueryError::InvalidValue { .. }));
    assert_eq!(err.status_code(), 400);
}
