//! Model reference types shared across the AI-facing tiers

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to a model artifact and how to serve it
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelSpec {
    /// Format of the model, e.g. `pytorch`
    #[serde(default)]
    pub model_format: ModelFormat,

    /// URI the model artifact is fetched from
    #[serde(default)]
    pub uri: String,

    /// Explicit runtime name. When set, that runtime's containers are used
    /// regardless of format compatibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_runtime: Option<String>,

    /// Service account whose secrets supply storage credentials for the fetch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_ref: Option<String>,
}

/// A model format identifier
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ModelFormat(
    /// The format name, e.g. `pytorch` or `onnx`
    pub String,
);

impl ModelFormat {
    /// The pytorch model format
    pub fn pytorch() -> Self {
        Self("pytorch".to_string())
    }
}

impl From<&str> for ModelFormat {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
