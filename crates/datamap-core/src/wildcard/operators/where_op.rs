//! WHERE operator
//!
//! Keeps the items matching a condition tree. Field paths containing `*`
//! are resolved against the sources with `*` replaced by the current item's
//! position; wildcard-free fields resolve inside the item itself. Config
//! values may be `{{ ... }}` expressions.
//!
//! Copyright (c) 2026 Datamap Team
//! Licensed under the Apache-2.0 license

use super::condition::{self, FieldResolver};
use super::OperatorContext;
use crate::error::Result;
use crate::path::{self, PathValue};
use crate::wildcard::{WildcardKey, WildcardResult};
use serde_json::Value;

struct WhereResolver<'a, 'b> {
    ctx: &'a OperatorContext<'b>,
    item: &'a Value,
    key: &'a WildcardKey,
}

impl FieldResolver for WhereResolver<'_, '_> {
    fn field(&mut self, field: &str) -> Option<Value> {
        if field.split('.').any(|seg| seg == "*") {
            let concrete = field.replacen('*', &self.key.substitution(), 1);
            self.ctx.lookup(&concrete).map(PathValue::into_single)
        } else {
            path::get(self.item, field).map(PathValue::into_single)
        }
    }

    fn expected(&mut self, value: &Value) -> Result<Value> {
        self.ctx.resolve_config(value)
    }
}

/// Apply a WHERE condition to the collection
pub fn apply(
    items: WildcardResult,
    config: &Value,
    ctx: &mut OperatorContext,
) -> Result<WildcardResult> {
    let mut kept = WildcardResult::new();
    for (key, item) in items {
        let mut resolver = WhereResolver {
            ctx,
            item: &item,
            key: &key,
        };
        if condition::evaluate(config, &mut resolver)? {
            kept.push(key, item);
        }
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::FilterRegistry;
    use crate::SourceMap;
    use serde_json::json;

    fn run(items: Vec<Value>, config: Value, sources: SourceMap) -> Vec<Value> {
        let mut working = sources;
        let aliases = SourceMap::new();
        let filters = FilterRegistry::default();
        let mut ctx = OperatorContext {
            sources: &mut working,
            aliases: &aliases,
            alias: "users",
            base_path: "",
            filters: &filters,
        };
        let collection: WildcardResult = items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (WildcardKey::Index(i), v))
            .collect();
        apply(collection, &config, &mut ctx)
            .unwrap()
            .into_iter()
            .map(|(_, v)| v)
            .collect()
    }

    #[test]
    fn test_item_relative_fields() {
        let kept = run(
            vec![
                json!({"name": "Ann", "age": 30}),
                json!({"name": "Bob", "age": 17}),
            ],
            json!({"age": [">=", 18]}),
            SourceMap::new(),
        );
        assert_eq!(kept, vec![json!({"name": "Ann", "age": 30})]);
    }

    #[test]
    fn test_wildcard_fields_resolve_against_sources() {
        let mut sources = SourceMap::new();
        sources.insert(
            "users".to_string(),
            json!([
                {"name": "Ann", "score": 9},
                {"name": "Bob", "score": 3}
            ]),
        );

        let kept = run(
            vec![json!({"name": "Ann"}), json!({"name": "Bob"})],
            json!({"users.*.score": [">", 5]}),
            sources,
        );
        assert_eq!(kept, vec![json!({"name": "Ann"})]);
    }

    #[test]
    fn test_numeric_string_coercion_in_where() {
        let kept = run(
            vec![json!({"age": "30"}), json!({"age": "17"})],
            json!({"age": [">=", 18]}),
            SourceMap::new(),
        );
        assert_eq!(kept, vec![json!({"age": "30"})]);
    }

    #[test]
    fn test_three_item_or_and_fixture() {
        // Exactly one item satisfies the inner AND; one more matches the
        // second OR branch.
        let kept = run(
            vec![
                json!({"role": "admin", "active": true,  "age": 30}),
                json!({"role": "admin", "active": false, "age": 30}),
                json!({"role": "user",  "active": false, "age": 70}),
            ],
            json!({
                "OR": [
                    {"AND": [{"role": "admin"}, {"active": true}]},
                    {"age": [">", 64]}
                ]
            }),
            SourceMap::new(),
        );
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0]["role"], json!("admin"));
        assert_eq!(kept[1]["age"], json!(70));
    }
}
