use super::{Contract, Interaction, RequestPattern, ResponsePattern, SpecVersion};
use crate::{error::Error, matchers::MatchingRules};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize)]
struct Pacticipant {
    name: String,
}

#[derive(Serialize, Deserialize)]
struct ProviderState {
    name: String,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum Query {
    Raw(String),
    Map(BTreeMap<String, Vec<String>>),
}

impl Query {
    fn from_raw(raw: &str, spec_version: SpecVersion) -> Self {
        match spec_version {
            SpecVersion::V2 => Query::Raw(raw.into()),
            SpecVersion::V3 => {
                let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
                for pair in raw.split('&').filter(|pair| !pair.is_empty()) {
                    let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
                    map.entry(name.into()).or_default().push(value.into());
                }
                Query::Map(map)
            }
        }
    }

    fn into_raw(self) -> String {
        match self {
            Query::Raw(raw) => raw,
            Query::Map(map) => map
                .iter()
                .flat_map(|(name, values)| {
                    values.iter().map(move |value| format!("{}={}", name, value))
                })
                .collect::<Vec<_>>()
                .join("&"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PactRequest {
    method: String,
    path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    query: Option<Query>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PactResponse {
    status: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    matching_rules: Option<Value>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PactInteraction {
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provider_state: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    provider_states: Vec<ProviderState>,
    request: PactRequest,
    response: PactResponse,
}

/// On-disk layout of a contract, following the Pact JSON format.
#[derive(Serialize, Deserialize)]
pub(super) struct PactFile {
    consumer: Pacticipant,
    provider: Pacticipant,
    #[serde(default)]
    interactions: Vec<PactInteraction>,
    #[serde(default)]
    metadata: Value,
}

impl PactFile {
    pub(super) fn from_contract(contract: &Contract) -> Self {
        let spec_version = contract.spec_version;

        PactFile {
            consumer: Pacticipant {
                name: contract.consumer.clone(),
            },
            provider: Pacticipant {
                name: contract.provider.clone(),
            },
            interactions: contract
                .interactions
                .iter()
                .map(|interaction| PactInteraction::from_interaction(interaction, spec_version))
                .collect(),
            metadata: json!({
                "pactSpecification": { "version": spec_version.version_string() }
            }),
        }
    }

    pub(super) fn into_contract(self) -> Result<Contract, Error> {
        let spec_version = self.spec_version();

        Ok(Contract {
            consumer: self.consumer.name,
            provider: self.provider.name,
            interactions: self
                .interactions
                .into_iter()
                .map(PactInteraction::into_interaction)
                .collect::<Result<_, _>>()?,
            spec_version,
        })
    }

    fn spec_version(&self) -> SpecVersion {
        let version = ["pactSpecification", "pact-specification"]
            .iter()
            .find_map(|key| self.metadata.get(key))
            .and_then(|specification| specification.get("version"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        if version.starts_with('3') {
            SpecVersion::V3
        } else {
            SpecVersion::V2
        }
    }
}

impl PactInteraction {
    fn from_interaction(interaction: &Interaction, spec_version: SpecVersion) -> Self {
        let request = &interaction.request;
        let response = &interaction.response;

        let (provider_state, provider_states) = match spec_version {
            SpecVersion::V2 => (interaction.provider_state.clone(), Vec::new()),
            SpecVersion::V3 => (
                None,
                interaction
                    .provider_state
                    .iter()
                    .map(|name| ProviderState { name: name.clone() })
                    .collect(),
            ),
        };

        let matching_rules = if response.matching_rules.is_empty() {
            None
        } else {
            Some(match spec_version {
                SpecVersion::V2 => response.matching_rules.to_v2(),
                SpecVersion::V3 => response.matching_rules.to_v3(),
            })
        };

        PactInteraction {
            description: interaction.description.clone(),
            provider_state,
            provider_states,
            request: PactRequest {
                method: request.method.clone(),
                path: request.path.clone(),
                query: request
                    .query
                    .as_deref()
                    .map(|raw| Query::from_raw(raw, spec_version)),
                headers: request.headers.clone(),
                body: request.body.clone(),
            },
            response: PactResponse {
                status: response.status,
                headers: response.headers.clone(),
                body: response.body.clone(),
                matching_rules,
            },
        }
    }

    fn into_interaction(self) -> Result<Interaction, Error> {
        let provider_state = self
            .provider_state
            .or_else(|| self.provider_states.into_iter().next().map(|state| state.name));

        Ok(Interaction {
            description: self.description,
            provider_state,
            request: RequestPattern {
                method: self.request.method.to_uppercase(),
                path: self.request.path,
                query: self.request.query.map(Query::into_raw),
                headers: self.request.headers,
                body: self.request.body,
            },
            response: ResponsePattern {
                status: self.response.status,
                headers: self.response.headers,
                body: self.response.body,
                matching_rules: parse_matching_rules(self.response.matching_rules)?,
            },
        })
    }
}

/// Accepts both the flat `{"$.body": {...}}` layout and the categorised one, whatever version
/// the metadata claims.
fn parse_matching_rules(rules: Option<Value>) -> Result<MatchingRules, Error> {
    let rules = match rules {
        Some(Value::Object(rules)) => rules,
        Some(Value::Null) | None => return Ok(MatchingRules::new()),
        Some(other) => {
            return Err(Error::InvalidMatchingRule(format!(
                "matchingRules should be an object, got {}",
                other
            )))
        }
    };

    if rules.keys().all(|key| key.starts_with('$')) {
        let rules = serde_json::from_value(Value::Object(rules))?;
        MatchingRules::from_v2(rules)
    } else {
        MatchingRules::from_v3(Value::Object(rules))
    }
}
