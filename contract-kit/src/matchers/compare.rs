use super::rules::{render_path, MatchRule, MatchingRules, PathToken};
use crate::mismatch::Mismatch;
use regex::Regex;
use serde_json::Value;

/// Compares an actual response body against the recorded example, honouring the matching rules.
/// Objects in the actual body may carry keys the example doesn't mention.
pub fn compare_body(expected: &Value, actual: &Value, rules: &MatchingRules) -> Vec<Mismatch> {
    let mut path = vec![PathToken::Root, PathToken::Field("body".into())];
    let mut mismatches = Vec::new();

    compare(expected, actual, &mut path, rules, &mut mismatches);

    mismatches
}

fn compare(
    expected: &Value,
    actual: &Value,
    path: &mut Vec<PathToken>,
    rules: &MatchingRules,
    mismatches: &mut Vec<Mismatch>,
) {
    match rules.resolve(path) {
        Some(MatchRule::Regex(regex)) => compare_regex(regex, actual, path, mismatches),
        Some(MatchRule::Type { min }) => {
            let min = *min;
            compare_type(expected, actual, min, path, rules, mismatches)
        }
        None => compare_equality(expected, actual, path, rules, mismatches),
    }
}

fn compare_regex(regex: &str, actual: &Value, path: &[PathToken], mismatches: &mut Vec<Mismatch>) {
    let text = match actual {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => {
            mismatches.push(body_mismatch(
                path,
                format!("expected a value matching /{}/ but got {}", regex, type_name(other)),
            ));
            return;
        }
    };

    match Regex::new(regex) {
        Ok(compiled) if compiled.is_match(&text) => {}
        Ok(_) => mismatches.push(body_mismatch(
            path,
            format!("expected \"{}\" to match /{}/", text, regex),
        )),
        Err(e) => mismatches.push(body_mismatch(path, format!("invalid regex: {}", e))),
    }
}

fn compare_type(
    expected: &Value,
    actual: &Value,
    min: Option<usize>,
    path: &mut Vec<PathToken>,
    rules: &MatchingRules,
    mismatches: &mut Vec<Mismatch>,
) {
    match (expected, actual) {
        (Value::Object(_), Value::Object(_)) => {
            compare_fields(expected, actual, path, rules, mismatches)
        }
        (Value::Array(expected_items), Value::Array(actual_items)) => {
            if let Some(min) = min {
                if actual_items.len() < min {
                    mismatches.push(body_mismatch(
                        path,
                        format!(
                            "expected at least {} items but got {}",
                            min,
                            actual_items.len()
                        ),
                    ));
                }
            }

            if let Some(template) = expected_items.first() {
                for (index, item) in actual_items.iter().enumerate() {
                    path.push(PathToken::Index(index));
                    compare(template, item, path, rules, mismatches);
                    path.pop();
                }
            }
        }
        (expected, actual) if type_name(expected) == type_name(actual) => {}
        (expected, actual) => mismatches.push(body_mismatch(
            path,
            format!(
                "expected {} but got {}",
                type_name(expected),
                type_name(actual)
            ),
        )),
    }
}

fn compare_equality(
    expected: &Value,
    actual: &Value,
    path: &mut Vec<PathToken>,
    rules: &MatchingRules,
    mismatches: &mut Vec<Mismatch>,
) {
    match (expected, actual) {
        (Value::Object(_), Value::Object(_)) => {
            compare_fields(expected, actual, path, rules, mismatches)
        }
        (Value::Array(expected_items), Value::Array(actual_items)) => {
            if expected_items.len() != actual_items.len() {
                mismatches.push(body_mismatch(
                    path,
                    format!(
                        "expected {} items but got {}",
                        expected_items.len(),
                        actual_items.len()
                    ),
                ));
                return;
            }

            for (index, (expected_item, actual_item)) in
                expected_items.iter().zip(actual_items).enumerate()
            {
                path.push(PathToken::Index(index));
                compare(expected_item, actual_item, path, rules, mismatches);
                path.pop();
            }
        }
        (expected, actual) if expected == actual => {}
        (expected, actual) => mismatches.push(body_mismatch(
            path,
            format!("expected {} but got {}", expected, actual),
        )),
    }
}

fn compare_fields(
    expected: &Value,
    actual: &Value,
    path: &mut Vec<PathToken>,
    rules: &MatchingRules,
    mismatches: &mut Vec<Mismatch>,
) {
    let (expected, actual) = match (expected.as_object(), actual.as_object()) {
        (Some(expected), Some(actual)) => (expected, actual),
        _ => return,
    };

    for (key, expected_value) in expected {
        path.push(PathToken::Field(key.clone()));
        match actual.get(key) {
            Some(actual_value) => compare(expected_value, actual_value, path, rules, mismatches),
            None => mismatches.push(body_mismatch(
                path,
                format!("expected key \"{}\" is missing", key),
            )),
        }
        path.pop();
    }
}

fn body_mismatch(path: &[PathToken], message: String) -> Mismatch {
    Mismatch::Body {
        path: render_path(path),
        message,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::{each_like, like, term, Pattern};
    use serde_json::json;

    fn joke_shape() -> Pattern {
        like(json!({
            "icon_url": "https://api.chucknorris.io/img/avatar/chuck-norris.png",
            "id": "dU8JS-1VR1ilWmcydiGu3g",
            "url": "",
            "value": "Chuck Norris can divide by zero."
        }))
    }

    fn check(pattern: &Pattern, actual: Value) -> Vec<Mismatch> {
        compare_body(&pattern.example(), &actual, &pattern.matching_rules("$.body"))
    }

    #[test]
    fn shape_match_ignores_literal_values() {
        let mismatches = check(
            &joke_shape(),
            json!({
                "icon_url": "http://x/img.png",
                "id": "abc123",
                "url": "https://api.chucknorris.io/jokes/abc123",
                "value": "Chuck Norris joke text",
                "categories": [],
                "created_at": "2020-01-05 13:42:19.576875"
            }),
        );

        assert!(mismatches.is_empty(), "{:?}", mismatches);
    }

    #[test]
    fn missing_field_is_a_structural_mismatch() {
        let mismatches = check(
            &joke_shape(),
            json!({ "icon_url": "", "id": "abc123", "url": "" }),
        );

        assert_eq!(
            mismatches,
            vec![Mismatch::Body {
                path: "$.body.value".into(),
                message: "expected key \"value\" is missing".into(),
            }]
        );
    }

    #[test]
    fn wrong_type_is_reported() {
        let mismatches = check(
            &joke_shape(),
            json!({ "icon_url": "", "id": 42, "url": "", "value": "v" }),
        );

        assert_eq!(
            mismatches,
            vec![Mismatch::Body {
                path: "$.body.id".into(),
                message: "expected string but got number".into(),
            }]
        );
    }

    #[test]
    fn literal_values_must_be_equal_without_rules() {
        let pattern = Pattern::from(json!({ "id": "abc123" }));

        assert!(check(&pattern, json!({ "id": "abc123", "extra": true })).is_empty());
        assert_eq!(check(&pattern, json!({ "id": "zzz" })).len(), 1);
    }

    #[test]
    fn each_like_checks_minimum_and_every_item() {
        let pattern = Pattern::object(vec![("categories", each_like(json!({ "name": "dev" }), 2))]);

        let mismatches = check(&pattern, json!({ "categories": [{ "name": "x" }] }));
        assert_eq!(mismatches.len(), 1);
        assert!(matches!(&mismatches[0], Mismatch::Body { path, .. } if path == "$.body.categories"));

        let mismatches = check(
            &pattern,
            json!({ "categories": [{ "name": "x" }, { "name": 3 }] }),
        );
        assert_eq!(mismatches.len(), 1);
        assert!(matches!(&mismatches[0], Mismatch::Body { path, .. } if path == "$.body.categories[1].name"));
    }

    #[test]
    fn term_checks_regex() {
        let pattern = Pattern::object(vec![("id", term("^[a-z0-9]+$", "abc123").unwrap())]);

        assert!(check(&pattern, json!({ "id": "zz9" })).is_empty());
        assert_eq!(check(&pattern, json!({ "id": "NOPE!" })).len(), 1);
    }
}
