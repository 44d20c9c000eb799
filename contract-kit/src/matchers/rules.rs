use crate::error::Error;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

lazy_static! {
    static ref PATH_TOKEN_REGEX: Regex =
        Regex::new(r"\.(?P<field>[^.\[\]']+)|\['(?P<quoted>[^']*)'\]|\[(?P<index>[0-9]+|\*)\]")
            .unwrap();
    static ref PLAIN_KEY_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_\-]+$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathToken {
    Root,
    Field(String),
    Index(usize),
    AnyField,
    AnyIndex,
}

impl PathToken {
    fn matches(&self, concrete: &PathToken) -> bool {
        match (self, concrete) {
            (PathToken::AnyField, PathToken::Field(_)) => true,
            (PathToken::AnyIndex, PathToken::Index(_)) => true,
            (rule, concrete) => rule == concrete,
        }
    }

    fn is_wildcard(&self) -> bool {
        matches!(self, PathToken::AnyField | PathToken::AnyIndex)
    }
}

/// Parses a matching rule path such as `$.body.items[*].id` or `$.body['icon url']`.
pub fn parse_path(path: &str) -> Result<Vec<PathToken>, Error> {
    let rest = path
        .strip_prefix('$')
        .ok_or_else(|| Error::InvalidMatchingRule(format!("path {} must start with $", path)))?;

    let mut tokens = vec![PathToken::Root];
    let mut position = 0;

    for captures in PATH_TOKEN_REGEX.captures_iter(rest) {
        let whole = captures.get(0).ok_or_else(|| invalid_path(path))?;
        if whole.start() != position {
            return Err(invalid_path(path));
        }
        position = whole.end();

        let token = if let Some(field) = captures.name("field") {
            match field.as_str() {
                "*" => PathToken::AnyField,
                name => PathToken::Field(name.into()),
            }
        } else if let Some(quoted) = captures.name("quoted") {
            PathToken::Field(quoted.as_str().into())
        } else {
            match captures.name("index").map(|index| index.as_str()) {
                Some("*") => PathToken::AnyIndex,
                Some(index) => PathToken::Index(index.parse().map_err(|_| invalid_path(path))?),
                None => return Err(invalid_path(path)),
            }
        };
        tokens.push(token);
    }

    if position != rest.len() {
        return Err(invalid_path(path));
    }

    Ok(tokens)
}

fn invalid_path(path: &str) -> Error {
    Error::InvalidMatchingRule(format!("can't parse path {}", path))
}

pub fn render_path(tokens: &[PathToken]) -> String {
    let mut rendered = String::new();

    for token in tokens {
        match token {
            PathToken::Root => rendered.push('$'),
            PathToken::Field(name) => rendered.push_str(&child_key(name)),
            PathToken::Index(index) => rendered.push_str(&format!("[{}]", index)),
            PathToken::AnyField => rendered.push_str(".*"),
            PathToken::AnyIndex => rendered.push_str("[*]"),
        }
    }

    rendered
}

pub(crate) fn child_key(name: &str) -> String {
    if PLAIN_KEY_REGEX.is_match(name) {
        format!(".{}", name)
    } else {
        format!("['{}']", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRule", into = "RawRule")]
pub enum MatchRule {
    /// Values only need to have the same JSON type. Applies to every descendant as well.
    Type { min: Option<usize> },
    Regex(String),
}

impl MatchRule {
    fn cascades(&self) -> bool {
        matches!(self, MatchRule::Type { .. })
    }
}

#[derive(Serialize, Deserialize)]
struct RawRule {
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<usize>,
}

impl TryFrom<RawRule> for MatchRule {
    type Error = String;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        match (raw.kind.as_deref(), raw.regex) {
            (Some("regex") | None, Some(regex)) => {
                Regex::new(&regex).map_err(|e| e.to_string())?;
                Ok(MatchRule::Regex(regex))
            }
            (Some("type"), _) => Ok(MatchRule::Type { min: raw.min }),
            (None, None) if raw.min.is_some() => Ok(MatchRule::Type { min: raw.min }),
            (kind, _) => Err(format!("unsupported matcher {}", kind.unwrap_or("<none>"))),
        }
    }
}

impl From<MatchRule> for RawRule {
    fn from(rule: MatchRule) -> Self {
        match rule {
            MatchRule::Type { min } => RawRule {
                kind: Some("type".into()),
                regex: None,
                min,
            },
            MatchRule::Regex(regex) => RawRule {
                kind: Some("regex".into()),
                regex: Some(regex),
                min: None,
            },
        }
    }
}

#[derive(Deserialize)]
struct V3RuleList {
    matchers: Vec<MatchRule>,
}

/// Matching rules keyed by the full path they apply to (`$.body`, `$.body.id`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchingRules(BTreeMap<String, MatchRule>);

impl MatchingRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, path: S, rule: MatchRule) {
        self.0.insert(path.into(), rule);
    }

    pub fn get(&self, path: &str) -> Option<&MatchRule> {
        self.0.get(path)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Finds the rule governing a concrete path: a rule on the path itself, or the closest
    /// cascading rule on one of its ancestors. Wildcards lose against named segments.
    pub fn resolve(&self, path: &[PathToken]) -> Option<&MatchRule> {
        let mut best: Option<((usize, usize), &MatchRule)> = None;

        for (key, rule) in &self.0 {
            let tokens = match parse_path(key) {
                Ok(tokens) => tokens,
                Err(_) => continue,
            };

            if tokens.len() > path.len()
                || !tokens.iter().zip(path).all(|(rule_token, concrete)| {
                    rule_token.matches(concrete)
                })
            {
                continue;
            }

            if tokens.len() < path.len() && !rule.cascades() {
                continue;
            }

            let weight = (
                tokens.len(),
                tokens.iter().filter(|token| !token.is_wildcard()).count(),
            );
            if best.map_or(true, |(best_weight, _)| weight > best_weight) {
                best = Some((weight, rule));
            }
        }

        best.map(|(_, rule)| rule)
    }

    pub fn from_v2(rules: BTreeMap<String, MatchRule>) -> Result<Self, Error> {
        for path in rules.keys() {
            parse_path(path)?;
        }

        Ok(Self(rules))
    }

    pub fn to_v2(&self) -> Value {
        let rules = self
            .0
            .iter()
            .map(|(path, rule)| (path.clone(), json!(RawRule::from(rule.clone()))))
            .collect::<Map<_, _>>();

        Value::Object(rules)
    }

    /// Reads the `{category: {path: {matchers: [...]}}}` layout. Only body rules are kept.
    pub fn from_v3(value: Value) -> Result<Self, Error> {
        let categories: BTreeMap<String, BTreeMap<String, V3RuleList>> =
            serde_json::from_value(value)?;
        let mut rules = BTreeMap::new();

        if let Some(body_rules) = categories.get("body") {
            for (path, list) in body_rules {
                let full_path = match path.strip_prefix('$') {
                    Some(rest) => format!("$.body{}", rest),
                    None => return Err(invalid_path(path)),
                };
                if let Some(rule) = list.matchers.first() {
                    rules.insert(full_path, rule.clone());
                }
            }
        }

        Self::from_v2(rules)
    }

    pub fn to_v3(&self) -> Value {
        let mut body = Map::new();

        for (path, rule) in &self.0 {
            if let Some(rest) = path.strip_prefix("$.body") {
                body.insert(
                    format!("${}", rest),
                    json!({ "matchers": [RawRule::from(rule.clone())] }),
                );
            }
        }

        json!({ "body": body })
    }
}
