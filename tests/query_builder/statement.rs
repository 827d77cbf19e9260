use serde_json::json;
use sieve_core::config::QueryConfig;
use sieve_core::models::{ComplexQuery, FlatQuery};
use sieve_core::query_builder::{Pagination, SortOrder};
use sieve_core::repository::Repository;
use sieve_core::schema::SchemaRegistry;
use sieve_core::test_utils::{hero_schema, Hero};
use sieve_core::QueryError;

fn heroes() -> Repository<Hero> {
    Repository::new(&SchemaRegistry::new(), QueryConfig::default())
}

#[test]
fn test_flat_query_compiles_to_one_statement() {
    let query = FlatQuery::from_pairs([
        ("name", "n1"),
        ("age__in", "3,4"),
        ("sort_by", "age,id"),
        ("sort_order", "desc"),
        ("page", "2"),
        ("page_size", "5"),
    ])
    .unwrap();

    let compiled = heroes().compile_flat(&query, None).unwrap();
    assert_eq!(
        compiled.statement.build_sql(),
        "SELECT * FROM hero WHERE (age IN (3, 4) AND name = 'n1') \
         ORDER BY age DESC, id DESC LIMIT 5 OFFSET 5"
    );
}

#[test]
fn test_bound_statement_casts_text_parameters() {
    let query = FlatQuery::from_pairs([
        ("age__in", "3,4"),
        ("create_time__le", "2024-09-03 23:59:59"),
    ])
    .unwrap();
    let compiled = heroes().compile_flat(&query, None).unwrap();
    let bound = compiled.statement.to_query_builder(&hero_schema());
    assert_eq!(
        bound.sql(),
        "SELECT to_jsonb(hero.*) AS record FROM hero \
         WHERE (age IN ($1, $2) AND create_time <= $3::timestamptz) LIMIT $4 OFFSET $5"
    );
}

#[test]
fn test_pagination_bounds_are_enforced() {
    let repo = heroes();
    for (page, page_size) in [(0, 10), (1001, 10), (1, 1_000_001)] {
        let query = FlatQuery::new().with_page(page, page_size);
        let err = repo.compile_flat(&query, None).unwrap_err();
        assert!(matches!(err, QueryError::InvalidPagination { .. }));
    }

    let query = FlatQuery::new().with_page(1000, 0);
    let compiled = repo.compile_flat(&query, None).unwrap();
    assert_eq!(compiled.statement.pagination(), Some(Pagination::new(1000, 0)));
}

#[test]
fn test_complex_query_projection_includes_keys() {
    let query: ComplexQuery = serde_json::from_value(json!({
        "fields": ["name", "team", "not_a_field"],
        "sort_by": "name",
        "sort_order": "asc",
        "condition": {"field": "age", "operator": "ge", "value": 18}
    }))
    .unwrap();

    let compiled = heroes().compile_complex(&query).unwrap();
    assert_eq!(
        compiled.statement.build_sql(),
        "SELECT id, name, team_id FROM hero WHERE age >= 18 ORDER BY name ASC LIMIT 10 OFFSET 0"
    );
    assert_eq!(compiled.statement.relations(), ["team"]);
    assert_eq!(query.sort_order, SortOrder::Asc);
}
