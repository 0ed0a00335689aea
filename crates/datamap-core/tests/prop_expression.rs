//! Property-based tests for the expression parser
//!
//! These verify invariants that should hold for all well-formed
//! `{{ path | filters ?? default }}` strings.

use datamap_core::expression::{is_expression, parse};
use proptest::prelude::*;

/// Strategy for plausible dot-paths, including alias and wildcard forms
fn path_strategy() -> impl Strategy<Value = String> {
    let segment = "[a-zA-Z][a-zA-Z0-9_]{0,8}";
    (
        proptest::option::of(Just("@")),
        proptest::collection::vec(
            prop_oneof![segment.prop_map(String::from), Just("*".to_string())],
            1..4,
        ),
    )
        .prop_filter_map("path must not start with *", |(at, segments)| {
            if segments[0] == "*" {
                return None;
            }
            Some(format!("{}{}", at.unwrap_or(""), segments.join(".")))
        })
}

fn filters_strategy() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-z]{2,10}".prop_map(String::from), 0..3)
}

proptest! {
    #[test]
    fn parse_recovers_path_and_filters(
        path in path_strategy(),
        filters in filters_strategy(),
    ) {
        let mut body = path.clone();
        for filter in &filters {
            body.push_str(" | ");
            body.push_str(filter);
        }
        let input = format!("{{{{ {} }}}}", body);

        prop_assert!(is_expression(&input));
        let parsed = parse(&input).unwrap();
        prop_assert_eq!(&parsed.path, &path);
        prop_assert_eq!(&parsed.filters, &filters);
        prop_assert_eq!(parsed.default, None);
    }

    #[test]
    fn whitespace_around_segments_is_insignificant(
        path in path_strategy(),
        filter in "[a-z]{2,8}",
    ) {
        let tight = parse(&format!("{{{{{}|{}}}}}", path, filter)).unwrap();
        let loose = parse(&format!("{{{{   {}   |   {}   }}}}", path, filter)).unwrap();
        prop_assert_eq!(tight, loose);
    }

    #[test]
    fn default_splits_off_cleanly(
        path in path_strategy(),
        default in "[a-zA-Z][a-zA-Z0-9]{0,10}"
            .prop_filter("JSON keywords parse as literals, not strings", |d| {
                !matches!(d.as_str(), "true" | "false" | "null")
            }),
    ) {
        let parsed = parse(&format!("{{{{ {} ?? {} }}}}", path, default)).unwrap();
        prop_assert_eq!(&parsed.path, &path);
        prop_assert_eq!(parsed.default, Some(serde_json::Value::String(default)));
    }

    #[test]
    fn parsing_is_deterministic(path in path_strategy()) {
        let input = format!("{{{{ {} }}}}", path);
        prop_assert_eq!(parse(&input).unwrap(), parse(&input).unwrap());
    }

    #[test]
    fn non_delimited_strings_are_never_expressions(text in "[^{}]*") {
        prop_assert!(!is_expression(&text));
    }
}
