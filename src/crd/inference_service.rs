//! InferenceService Custom Resource Definition
//!
//! An InferenceService wraps a model reference and an App template. The
//! engine resolves the model against the runtime registry, injects the
//! artifact-fetch plumbing, and materializes an App carrying the merged
//! workload.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::app::AppTemplateSpec;
use super::model::ModelSpec;
use super::Condition;

/// Specification for an InferenceService
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "ai.strata.dev",
    version = "v1alpha1",
    kind = "InferenceService",
    plural = "inferenceservices",
    namespaced,
    status = "InferenceServiceStatus",
    printcolumn = r#"{"name":"Format","type":"string","jsonPath":".spec.model.modelFormat"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InferenceServiceSpec {
    /// Model to serve
    pub model: ModelSpec,

    /// Template for the materialized App
    #[serde(default)]
    pub template: AppTemplateSpec,
}

/// Status for an InferenceService
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InferenceServiceStatus {
    /// Conditions representing the InferenceService's state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}
