mod compare;
mod rules;

pub use compare::compare_body;
pub use rules::{parse_path, render_path, MatchRule, MatchingRules, PathToken};

use crate::error::Error;
use regex::Regex;
use rules::child_key;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Describes an expected JSON body. Literal parts must be equal, matcher parts only need the
/// same shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Value(Value),
    Object(BTreeMap<String, Pattern>),
    Array(Vec<Pattern>),
    Like(Box<Pattern>),
    EachLike { template: Box<Pattern>, min: usize },
    Term { regex: String, example: String },
}

/// Matches any value with the same JSON type as `example`, recursively.
pub fn like<P: Into<Pattern>>(example: P) -> Pattern {
    Pattern::Like(Box::new(example.into()))
}

/// Matches an array with at least `min` items, each shaped like `template`.
pub fn each_like<P: Into<Pattern>>(template: P, min: usize) -> Pattern {
    Pattern::EachLike {
        template: Box::new(template.into()),
        min,
    }
}

/// Matches any string matching `regex`. `example` is what the mock server responds with.
pub fn term<S1: Into<String>, S2: Into<String>>(regex: S1, example: S2) -> Result<Pattern, Error> {
    let regex = regex.into();
    let example = example.into();

    if !Regex::new(&regex)?.is_match(&example) {
        return Err(Error::InvalidMatchingRule(format!(
            "example {} doesn't match /{}/",
            example, regex
        )));
    }

    Ok(Pattern::Term { regex, example })
}

impl Pattern {
    pub fn object<K: Into<String>, P: Into<Pattern>, I: IntoIterator<Item = (K, P)>>(
        fields: I,
    ) -> Self {
        Pattern::Object(
            fields
                .into_iter()
                .map(|(key, pattern)| (key.into(), pattern.into()))
                .collect(),
        )
    }

    /// The concrete body the mock server sends back for this pattern.
    pub fn example(&self) -> Value {
        match self {
            Pattern::Value(value) => value.clone(),
            Pattern::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, pattern)| (key.clone(), pattern.example()))
                    .collect::<Map<_, _>>(),
            ),
            Pattern::Array(items) => Value::Array(items.iter().map(Pattern::example).collect()),
            Pattern::Like(inner) => inner.example(),
            Pattern::EachLike { template, min } => {
                let item = template.example();
                Value::Array(vec![item; (*min).max(1)])
            }
            Pattern::Term { example, .. } => Value::String(example.clone()),
        }
    }

    /// Collects the rules this pattern implies, rooted at `path` (usually `$.body`).
    pub fn matching_rules(&self, path: &str) -> MatchingRules {
        let mut rules = MatchingRules::new();
        self.collect_rules(path, &mut rules);
        rules
    }

    fn collect_rules(&self, path: &str, rules: &mut MatchingRules) {
        match self {
            Pattern::Value(_) => {}
            Pattern::Object(fields) => {
                for (key, pattern) in fields {
                    pattern.collect_rules(&format!("{}{}", path, child_key(key)), rules);
                }
            }
            Pattern::Array(items) => {
                for (index, pattern) in items.iter().enumerate() {
                    pattern.collect_rules(&format!("{}[{}]", path, index), rules);
                }
            }
            Pattern::Like(inner) => {
                rules.insert(path, MatchRule::Type { min: None });
                inner.collect_rules(path, rules);
            }
            Pattern::EachLike { template, min } => {
                rules.insert(path, MatchRule::Type { min: Some(*min) });
                template.collect_rules(&format!("{}[*]", path), rules);
            }
            Pattern::Term { regex, .. } => rules.insert(path, MatchRule::Regex(regex.clone())),
        }
    }
}

impl From<Value> for Pattern {
    fn from(value: Value) -> Self {
        Pattern::Value(value)
    }
}

impl From<&str> for Pattern {
    fn from(value: &str) -> Self {
        Pattern::Value(Value::String(value.into()))
    }
}
