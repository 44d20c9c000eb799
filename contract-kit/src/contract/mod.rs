mod pact_file;
mod store;

pub use store::{ContractStore, PactDirectory, WriteMode};

use crate::{
    data::{RequestData, ResponseData},
    error::Error,
    matchers::{compare_body, MatchingRules, Pattern},
    mismatch::Mismatch,
    util,
};
use pact_file::PactFile;
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    fs,
    io::Write,
    path::Path,
};
use tempfile::NamedTempFile;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SpecVersion {
    V2,
    V3,
}

impl SpecVersion {
    pub fn version_string(self) -> &'static str {
        match self {
            SpecVersion::V2 => "2.0.0",
            SpecVersion::V3 => "3.0.0",
        }
    }
}

impl Default for SpecVersion {
    fn default() -> Self {
        SpecVersion::V2
    }
}

impl TryFrom<u8> for SpecVersion {
    type Error = Error;

    fn try_from(version: u8) -> Result<Self, Self::Error> {
        match version {
            2 => Ok(SpecVersion::V2),
            3 => Ok(SpecVersion::V3),
            other => Err(Error::UnsupportedSpecVersion(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestPattern {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl RequestPattern {
    pub fn new<S1: Into<String>, S2: Into<String>>(method: S1, path: S2) -> Self {
        Self {
            method: method.into().to_uppercase(),
            path: path.into(),
            query: None,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get<S: Into<String>>(path: S) -> Self {
        Self::new("GET", path)
    }

    pub fn with_query<S: Into<String>>(mut self, query: S) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_header<S1: Into<String>, S2: Into<String>>(mut self, name: S1, value: S2) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn uri(&self) -> String {
        match &self.query {
            Some(query) if !query.is_empty() => format!("{}?{}", self.path, query),
            _ => self.path.clone(),
        }
    }

    /// Lists every way `request` deviates from this pattern. Extra headers are allowed.
    pub fn check(&self, request: &RequestData) -> Vec<Mismatch> {
        let mut mismatches = Vec::new();

        if !self.method.eq_ignore_ascii_case(&request.method) {
            mismatches.push(Mismatch::Method {
                expected: self.method.clone(),
                actual: request.method.clone(),
            });
        }

        if self.path != request.path() {
            mismatches.push(Mismatch::Path {
                expected: self.path.clone(),
                actual: request.path().into(),
            });
        }

        if normalize_query(self.query.as_deref()) != normalize_query(request.query()) {
            mismatches.push(Mismatch::Query {
                expected: self.query.clone(),
                actual: request.query().map(String::from),
            });
        }

        check_headers(&self.headers, &request.headers, &mut mismatches);

        if let Some(expected) = &self.body {
            check_json_body(expected, &request.body, &MatchingRules::new(), &mut mismatches);
        }

        mismatches
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponsePattern {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub matching_rules: MatchingRules,
}

impl ResponsePattern {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: None,
            matching_rules: MatchingRules::new(),
        }
    }

    pub fn with_header<S1: Into<String>, S2: Into<String>>(mut self, name: S1, value: S2) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body<P: Into<Pattern>>(mut self, body: P) -> Self {
        let pattern = body.into();
        self.body = Some(pattern.example());
        self.matching_rules = pattern.matching_rules("$.body");
        self
    }

    pub fn check(&self, response: &ResponseData) -> Vec<Mismatch> {
        let mut mismatches = Vec::new();

        if self.status != response.status_code {
            mismatches.push(Mismatch::Status {
                expected: self.status,
                actual: response.status_code,
            });
        }

        check_headers(&self.headers, &response.headers, &mut mismatches);

        if let Some(expected) = &self.body {
            check_json_body(expected, &response.body, &self.matching_rules, &mut mismatches);
        }

        mismatches
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub description: String,
    pub provider_state: Option<String>,
    pub request: RequestPattern,
    pub response: ResponsePattern,
}

impl Interaction {
    pub fn new<S: Into<String>>(description: S) -> Self {
        Self {
            description: description.into(),
            provider_state: None,
            request: RequestPattern::get("/"),
            response: ResponsePattern::new(200),
        }
    }

    pub fn given<S: Into<String>>(mut self, state: S) -> Self {
        self.provider_state = Some(state.into());
        self
    }

    pub fn upon_receiving(mut self, request: RequestPattern) -> Self {
        self.request = request;
        self
    }

    pub fn will_respond_with(mut self, response: ResponsePattern) -> Self {
        self.response = response;
        self
    }

    fn same_key(&self, other: &Interaction) -> bool {
        self.description == other.description && self.provider_state == other.provider_state
    }
}

/// The recorded agreement between one consumer and one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    pub consumer: String,
    pub provider: String,
    pub interactions: Vec<Interaction>,
    pub spec_version: SpecVersion,
}

impl Contract {
    pub fn new<S1: Into<String>, S2: Into<String>>(
        consumer: S1,
        provider: S2,
        spec_version: SpecVersion,
    ) -> Self {
        Self {
            consumer: consumer.into(),
            provider: provider.into(),
            interactions: Vec::new(),
            spec_version,
        }
    }

    pub fn file_name(&self) -> String {
        file_name(&self.consumer, &self.provider)
    }

    /// Adds an interaction, replacing one with the same description and provider state.
    pub fn add_interaction(&mut self, interaction: Interaction) {
        match self
            .interactions
            .iter_mut()
            .find(|existing| existing.same_key(&interaction))
        {
            Some(existing) => *existing = interaction,
            None => self.interactions.push(interaction),
        }
    }

    pub fn merge(&mut self, other: Contract) {
        for interaction in other.interactions {
            self.add_interaction(interaction);
        }
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(&PactFile::from_contract(self))?)
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str::<PactFile>(json)?.into_contract()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Replaces the file at `path` in one rename, so readers never see a partial contract.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(self.to_json()?.as_bytes())?;
        file.persist(path).map_err(|e| e.error)?;

        Ok(())
    }
}

pub fn file_name(consumer: &str, provider: &str) -> String {
    format!("{}-{}.json", consumer, provider)
}

fn check_headers(
    expected: &BTreeMap<String, String>,
    actual: &HashMap<String, String>,
    mismatches: &mut Vec<Mismatch>,
) {
    for (name, expected_value) in expected {
        let actual_value = util::find_header(actual, name);

        if !actual_value.map_or(false, |value| {
            util::header_values_match(name, expected_value, value)
        }) {
            mismatches.push(Mismatch::Header {
                name: name.clone(),
                expected: expected_value.clone(),
                actual: actual_value.cloned(),
            });
        }
    }
}

fn check_json_body(
    expected: &Value,
    actual: &str,
    rules: &MatchingRules,
    mismatches: &mut Vec<Mismatch>,
) {
    match serde_json::from_str::<Value>(actual) {
        Ok(actual) => mismatches.extend(compare_body(expected, &actual, rules)),
        Err(e) => mismatches.push(Mismatch::Body {
            path: "$.body".into(),
            message: format!("body isn't valid JSON: {}", e),
        }),
    }
}

fn normalize_query(query: Option<&str>) -> Vec<&str> {
    let mut pairs = query
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .collect::<Vec<_>>();
    pairs.sort_unstable();
    pairs
}
