use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A joke as returned by `GET /jokes/random`. Fields the upstream adds beyond the four known ones
/// are kept in `extra`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Joke {
    pub icon_url: String,
    pub id: String,
    pub url: String,
    pub value: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
