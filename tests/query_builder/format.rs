use sieve_core::query_builder::{format_fields, format_sort, FieldSelection, SortOrder};
use sieve_core::test_utils::{hero_schema, team_schema};
use sieve_core::QueryError;

#[test]
fn test_field_selection_is_permissive() {
    let schema = hero_schema();
    let formatted = format_fields(
        &schema,
        &FieldSelection::List(vec!["secret_name".to_string(), "bogus_field".to_string()]),
    );
    assert_eq!(formatted.columns, vec!["secret_name"]);
    assert!(formatted.relations.is_empty());
}

#[test]
fn test_relation_fields_are_classified() {
    let formatted = format_fields(&team_schema(), &FieldSelection::from("name,heroes"));
    assert_eq!(formatted.columns, vec!["name"]);
    assert_eq!(formatted.relations, vec!["heroes"]);
}

#[test]
fn test_sort_validation() {
    let schema = hero_schema();
    assert!(format_sort(&schema, Some(""), SortOrder::Asc).unwrap().is_empty());

    let err = format_sort(&schema, Some("nonexistent_field"), SortOrder::Asc).unwrap_err();
    assert!(matches!(err, QueryError::InvalidSortField { ref field } if field == "nonexistent_field"));
    assert!(err.is_field_not_found());

    let keys = format_sort(&schema, Some("team_id,create_time"), SortOrder::Desc).unwrap();
    assert_eq!(keys.len(), 2);
    assert!(keys.iter().all(|key| key.order == SortOrder::Desc));
}
