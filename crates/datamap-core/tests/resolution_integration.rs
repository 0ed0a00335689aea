//! End-to-end template resolution tests
//!
//! These tests drive the public `resolve` surface over realistic
//! multi-source fixtures, covering the wildcard operator pipeline and the
//! alias resolution behavior.

use datamap_core::{resolve, resolve_with, ResolveOptions, SourceMap};
use serde_json::{json, Value};

fn store() -> SourceMap {
    let mut sources = SourceMap::new();
    sources.insert(
        "crm".to_string(),
        json!({
            "customers": [
                {"name": "Ann Smith", "age": 34, "city": "Oslo", "vip": true},
                {"name": "Bob Smithson", "age": 17, "city": "Bergen", "vip": false},
                {"name": "Cleo Smith", "age": 51, "city": "Oslo", "vip": false},
                {"name": "Dan Brown", "age": 28, "city": "Bergen", "vip": true}
            ]
        }),
    );
    sources.insert(
        "sales".to_string(),
        json!([
            {"cat": "a", "amt": 10},
            {"cat": "a", "amt": 5},
            {"cat": "b", "amt": 7}
        ]),
    );
    sources
}

#[test]
fn test_full_pipeline_where_order_limit() {
    let output = resolve(
        &json!({
            "picks": {
                "*": {
                    "who": "{{ crm.customers.*.name }}",
                    "where": "{{ crm.customers.*.city }}"
                },
                "WHERE": {"age": [">=", 18]},
                "ORDER BY": {"age": "DESC"},
                "LIMIT": 2
            }
        }),
        &store(),
    )
    .unwrap();

    assert_eq!(
        output,
        json!({
            "picks": [
                {"who": "Cleo Smith", "where": "Oslo"},
                {"who": "Ann Smith", "where": "Oslo"}
            ]
        })
    );
}

#[test]
fn test_where_or_of_ands_matches_exactly_one() {
    // Exactly one customer is both a VIP and from Bergen; the second OR
    // branch matches nobody.
    let output = resolve(
        &json!({
            "hits": {
                "*": {"who": "{{ crm.customers.*.name }}"},
                "WHERE": {
                    "OR": [
                        {"AND": [{"vip": true}, {"city": "Bergen"}]},
                        {"age": [">", 100]}
                    ]
                }
            }
        }),
        &store(),
    )
    .unwrap();

    assert_eq!(output["hits"], json!([{"who": "Dan Brown"}]));
}

#[test]
fn test_group_by_sum_with_having() {
    let output = resolve(
        &json!({
            "totals": {
                "*": {
                    "cat": "{{ sales.*.cat }}",
                    "total": "{{ sales.*.total }}"
                },
                "GROUP BY": {
                    "field": "cat",
                    "aggregations": {"total": "SUM(amt)"},
                    "HAVING": {"total": [">", 10]}
                }
            }
        }),
        &store(),
    )
    .unwrap();

    assert_eq!(output["totals"], json!([{"cat": "a", "total": 15}]));
}

#[test]
fn test_like_case_insensitive_suffix_anchor() {
    let output = resolve(
        &json!({
            "smiths": {
                "*": {"who": "{{ crm.customers.*.name }}"},
                "LIKE": {"name": "%smith"}
            }
        }),
        &store(),
    )
    .unwrap();

    // "%smith" is anchored at the end: matches "Ann Smith" and "Cleo Smith"
    // but not "Bob Smithson".
    assert_eq!(
        output["smiths"],
        json!([{"who": "Ann Smith"}, {"who": "Cleo Smith"}])
    );
}

#[test]
fn test_distinct_on_field() {
    let output = resolve(
        &json!({
            "cities": {
                "*": {"name": "{{ crm.customers.*.city }}"},
                "DISTINCT": "city"
            }
        }),
        &store(),
    )
    .unwrap();

    assert_eq!(output["cities"], json!([{"name": "Oslo"}, {"name": "Bergen"}]));
}

#[test]
fn test_offset_and_limit_slice() {
    let output = resolve(
        &json!({
            "page": {
                "*": {"who": "{{ crm.customers.*.name }}"},
                "OFFSET": 1,
                "LIMIT": 2
            }
        }),
        &store(),
    )
    .unwrap();

    assert_eq!(
        output["page"],
        json!([{"who": "Bob Smithson"}, {"who": "Cleo Smith"}])
    );
}

#[test]
fn test_out_of_range_slice_clamps() {
    let output = resolve(
        &json!({
            "page": {
                "*": {"who": "{{ crm.customers.*.name }}"},
                "OFFSET": 99,
                "LIMIT": 5
            }
        }),
        &store(),
    )
    .unwrap();
    assert_eq!(output["page"], json!([]));
}

#[test]
fn test_alias_references_across_declaration_order() {
    let output = resolve(
        &json!({
            "summary": "{{ @report.head }}",
            "report": {
                "head": "{{ crm.customers.0.name | upper }}"
            }
        }),
        &store(),
    )
    .unwrap();

    assert_eq!(output["summary"], json!("ANN SMITH"));
}

#[test]
fn test_aliases_can_reference_wildcard_block_output() {
    let output = resolve(
        &json!({
            "first_adult": "{{ @adults.0.who }}",
            "adults": {
                "*": {"who": "{{ crm.customers.*.name }}"},
                "WHERE": {"age": [">=", 18]}
            }
        }),
        &store(),
    )
    .unwrap();

    assert_eq!(output["first_adult"], json!("Ann Smith"));
}

#[test]
fn test_plain_wildcard_expression_collects_array() {
    let output = resolve(&json!({"names": "{{ crm.customers.*.name }}"}), &store()).unwrap();
    assert_eq!(
        output["names"],
        json!(["Ann Smith", "Bob Smithson", "Cleo Smith", "Dan Brown"])
    );
}

#[test]
fn test_nested_wildcards_do_not_collide() {
    let mut sources = SourceMap::new();
    sources.insert(
        "org".to_string(),
        json!({
            "teams": [
                {"users": [{"email": "a@x"}, {"email": "b@x"}]},
                {"users": [{"email": "c@x"}]}
            ]
        }),
    );

    let options = ResolveOptions::default().with_reindex_wildcards(false);
    let output = resolve_with(
        &json!({"mails": "{{ org.teams.*.users.*.email }}"}),
        &sources,
        &options,
    )
    .unwrap();

    // Two wildcard generations keep their compound keys; nothing overwrites.
    assert_eq!(
        output["mails"],
        json!({
            "0.users.0.email": "a@x",
            "0.users.1.email": "b@x",
            "1.users.0.email": "c@x"
        })
    );
}

#[test]
fn test_resolution_is_deterministic_and_idempotent() {
    let template = json!({
        "totals": {
            "*": {"cat": "{{ sales.*.cat }}"},
            "GROUP BY": {"field": "cat", "aggregations": {"n": "COUNT"}}
        },
        "echo": "{{ @totals }}"
    });

    let first = resolve(&template, &store()).unwrap();
    let second = resolve(&template, &store()).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_sources_are_not_mutated_by_group_by() {
    let sources = store();
    let before = Value::Object(sources.clone());

    resolve(
        &json!({
            "totals": {
                "*": {"cat": "{{ sales.*.cat }}"},
                "GROUP BY": {"field": "cat", "aggregations": {"n": "COUNT"}}
            }
        }),
        &sources,
    )
    .unwrap();

    assert_eq!(Value::Object(sources), before);
}
