//! Step Custom Resource Definition
//!
//! A Step is a standalone workload snapshot, like a Version but with an
//! optional model reference of its own. Owned by a Pipeline (positionally)
//! or created directly; drives its own Deployment/Service/Autoscaler triad.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::model::ModelSpec;
use super::version::WorkloadSpec;
use super::Condition;

/// Specification for a Step
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.strata.dev",
    version = "v1alpha1",
    kind = "Step",
    plural = "steps",
    namespaced,
    status = "StepStatus",
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct StepSpec {
    /// Workload definition. When a model is also set, caller-supplied values
    /// here override the matched runtime's defaults.
    #[serde(flatten)]
    pub workload: WorkloadSpec,

    /// Model to serve; resolved against the runtime registry when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelSpec>,
}

/// Status for a Step
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepStatus {
    /// Conditions representing the state of the derived triad
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}
