//! Pipeline Custom Resource Definition
//!
//! A Pipeline is an ordered sequence of Step templates. Step identity is
//! positional: the child at index `i` is named `{pipeline}-step-{i}`, so
//! reordering the template list changes which existing Step a template maps
//! to.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::step::StepSpec;
use super::Condition;

/// Template for one Step of a Pipeline
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepTemplateSpec {
    /// Metadata carried onto the stamped Step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMeta>,

    /// Desired Step spec
    #[serde(default)]
    pub spec: StepSpec,
}

/// Specification for a Pipeline
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.strata.dev",
    version = "v1alpha1",
    kind = "Pipeline",
    plural = "pipelines",
    namespaced,
    status = "PipelineStatus",
    printcolumn = r#"{"name":"Steps","type":"integer","jsonPath":".status.reconciledSteps"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSpec {
    /// Ordered Step templates; order is identity
    pub steps: Vec<StepTemplateSpec>,
}

/// Status for a Pipeline
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    /// Number of steps reconciled by the most recent complete pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciled_steps: Option<i32>,

    /// Conditions representing the Pipeline's state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}
