use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The JSON object returned by a token endpoint, kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenResponse {
    data: Map<String, Value>,
}

impl TokenResponse {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// The `access_token` field, or `""` when it is missing or not a string.
    pub fn access_token(&self) -> &str {
        self.data
            .get("access_token")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn token_type(&self) -> Option<&str> {
        self.data.get("token_type").and_then(Value::as_str)
    }

    pub fn expires_in(&self) -> Option<u64> {
        self.data.get("expires_in").and_then(Value::as_u64)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }
}
